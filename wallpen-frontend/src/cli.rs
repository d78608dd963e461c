use std::fmt::Write as _;
use std::path::PathBuf;

use tracing::{info, warn};
use wallpen_config::AppConfig;
use wallpen_core::penetration::SegmentCategory;
use wallpen_engine::command::{CommandBus, CommandContext, CommandRequest};
use wallpen_engine::holes::HoleReport;
use wallpen_io::{JsonFacade, Project, ProjectSaver};

use crate::errors::FrontendError;
use crate::loader::{ProjectSource, hole_settings, load_project};

/// 命令行选项，由二进制入口解析后传入。
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub project: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// 加载项目，在活动文档中放置洞口并打印报告；指定 `output` 时写回修改后的项目。
pub fn run(options: &CliOptions, config: &AppConfig) -> Result<HoleReport, FrontendError> {
    let loaded = load_project(options.project.as_deref())?;
    let settings = hole_settings(config);
    let mut session = loaded.session;

    println!("墙体洞口放置");
    match &loaded.source {
        ProjectSource::Json(path) => println!("已从 JSON 加载项目：{}", path.display()),
        ProjectSource::Demo => println!("未指定项目，使用内置示例项目"),
    }

    let command_bus = CommandBus::new();
    let mut context = CommandContext {
        session: &mut session,
        settings: &settings,
    };
    let commands: Vec<&str> = command_bus.available_commands().copied().collect();
    info!(commands = %commands.join(", "), "命令已注册");

    if let Err(message) = dispatch_cli_command(&command_bus, "list_documents", &mut context) {
        warn!("CLI 命令执行失败: {message}");
    }

    let response = command_bus.dispatch(&CommandRequest::new("add_holes"), &mut context);
    let Some(report) = response.report else {
        return Err(FrontendError::Command {
            name: "add_holes".to_string(),
            message: response
                .message
                .unwrap_or_else(|| "未知错误".to_string()),
        });
    };
    if let Some(message) = &response.message {
        println!("[命令] {message}");
    }
    print!("{}", format_report(&report));

    if let Some(output) = &options.output {
        JsonFacade::new().save(&Project::from_session(session), output)?;
        info!(path = %output.display(), "已写出项目");
        println!("已写出项目：{}", output.display());
    }

    Ok(report)
}

fn dispatch_cli_command(
    bus: &CommandBus,
    name: &str,
    context: &mut CommandContext<'_>,
) -> Result<(), String> {
    let response = bus.dispatch(&CommandRequest::new(name), context);
    if response.success {
        if let Some(message) = response.message {
            println!("[命令] {message}");
        }
        Ok(())
    } else {
        Err(response.message.unwrap_or_else(|| "未知错误".to_string()))
    }
}

fn category_label(category: SegmentCategory) -> &'static str {
    match category {
        SegmentCategory::Duct => "风管",
        SegmentCategory::Pipe => "水管",
    }
}

/// 按批次汇总报告，列出被跳过的管线及原因。
pub fn format_report(report: &HoleReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "目标文档：{}", report.target_title);
    let _ = writeln!(out, "源文档：{}", report.source_title);
    for batch in &report.batches {
        let _ = writeln!(
            out,
            "  - {}: 管线 {}, 计划 {}, 已创建 {}, 跳过 {}",
            category_label(batch.category),
            batch.segments,
            batch.planned,
            batch.created,
            batch.skipped.len()
        );
        for skipped in &batch.skipped {
            let _ = writeln!(out, "      跳过 #{}: {}", skipped.element.get(), skipped.reason);
        }
        if let Some(error) = &batch.error {
            let _ = writeln!(out, "      已回滚: {error}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::demo_project;
    use wallpen_io::ProjectLoader;

    #[test]
    fn run_places_holes_and_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.json");
        let output = dir.path().join("output.json");
        JsonFacade::new()
            .save(&Project::from_session(demo_project().session), &input)
            .unwrap();

        let options = CliOptions {
            project: Some(input),
            output: Some(output.clone()),
        };
        let report = run(&options, &AppConfig::default()).unwrap();
        assert_eq!(report.total_created(), 6);

        let written = JsonFacade::new().load(&output).unwrap();
        let target = written
            .documents
            .iter()
            .find(|document| Some(document.title()) == written.active.as_deref())
            .unwrap();
        assert_eq!(target.instances().count(), 6);
    }

    #[test]
    fn missing_source_is_a_command_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.json");
        JsonFacade::new()
            .save(&Project::from_session(demo_project().session), &input)
            .unwrap();

        let mut config = AppConfig::default();
        config.host.source_title_pattern = "ВК".to_string();
        let options = CliOptions {
            project: Some(input),
            output: None,
        };
        let err = run(&options, &config).unwrap_err();
        assert!(matches!(err, FrontendError::Command { .. }));
    }

    #[test]
    fn report_lists_skipped_segments() {
        let mut loaded = demo_project();
        let settings = hole_settings(&AppConfig::default());
        let report =
            wallpen_engine::holes::run_add_holes(&mut loaded.session, &settings).unwrap();

        let text = format_report(&report);
        assert!(text.contains("目标文档：Корпус 1 - АР"));
        assert!(text.contains("风管: 管线 3, 计划 3, 已创建 3, 跳过 1"));
        assert!(text.contains("centerline is not a straight line"));
        assert!(!text.contains("已回滚"));
    }
}
