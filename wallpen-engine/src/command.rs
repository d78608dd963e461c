use std::collections::HashMap;

use crate::holes::{HoleReport, HoleSettings, run_add_holes};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
    pub report: Option<HoleReport>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            report: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            report: None,
        }
    }

    pub fn with_report(mut self, report: HoleReport) -> Self {
        self.report = Some(report);
        self
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub session: &'a mut Session,
    pub settings: &'a HoleSettings,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(AddHolesCommand);
        bus.register(ListDocumentsCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

/// 在活动文档中为穿墙的风管与水管放置洞口。
struct AddHolesCommand;

impl CommandHandler for AddHolesCommand {
    fn name(&self) -> &'static str {
        "add_holes"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        match run_add_holes(context.session, context.settings) {
            Ok(report) => {
                let skipped: usize = report.batches.iter().map(|b| b.skipped.len()).sum();
                let message = format!(
                    "已放置 {} 个洞口，跳过 {} 根管线",
                    report.total_created(),
                    skipped
                );
                let response = if report.is_complete() {
                    CommandResponse::ok(message)
                } else {
                    CommandResponse::err(format!("{message}，部分批次已回滚"))
                };
                response.with_report(report)
            }
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct ListDocumentsCommand;

impl CommandHandler for ListDocumentsCommand {
    fn name(&self) -> &'static str {
        "list_documents"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let active = context.session.active();
        let titles: Vec<String> = context
            .session
            .documents()
            .map(|(id, document)| {
                if Some(id) == active {
                    format!("*{}", document.title())
                } else {
                    document.title().to_string()
                }
            })
            .collect();
        CommandResponse::ok(titles.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    #[test]
    fn add_holes_and_list_documents_work() {
        let mut session = Session::new();
        session.populate_demo();
        let settings = HoleSettings::default();

        let bus = CommandBus::new();
        let mut context = CommandContext {
            session: &mut session,
            settings: &settings,
        };

        let response = bus.dispatch(&CommandRequest::new("add_holes"), &mut context);
        assert!(response.success);
        let report = response.report.expect("report attached");
        assert_eq!(report.total_created(), 6);

        let response = bus.dispatch(&CommandRequest::new("list_documents"), &mut context);
        assert!(response.success);
        assert_eq!(
            response.message.as_deref(),
            Some("*Корпус 1 - АР, Корпус 1 - ОВ, Корпус 1 - КЖ")
        );
    }

    #[test]
    fn precondition_failure_is_reported() {
        let mut session = Session::new();
        let settings = HoleSettings::default();
        let bus = CommandBus::new();
        let mut context = CommandContext {
            session: &mut session,
            settings: &settings,
        };

        let response = bus.dispatch(&CommandRequest::new("add_holes"), &mut context);
        assert!(!response.success);
        assert!(response.report.is_none());

        let response = bus.dispatch(&CommandRequest::new("unknown"), &mut context);
        assert!(!response.success);
    }
}
