use std::env;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use wallpen_config::AppConfig;
use wallpen_engine::holes::HoleSettings;
use wallpen_engine::host::ParameterLabels;
use wallpen_engine::query::TargetFilter;
use wallpen_engine::session::{DemoProject, Session};
use wallpen_io::{JsonFacade, ProjectLoader};

use crate::errors::FrontendError;

/// 项目来源，便于前端呈现加载信息。
#[derive(Debug, Clone)]
pub enum ProjectSource {
    Json(PathBuf),
    Demo,
}

/// 统一封装加载后的会话与元信息。
#[derive(Debug)]
pub struct LoadedProject {
    pub session: Session,
    pub source: ProjectSource,
    pub demo: Option<DemoProject>,
}

/// 加载项目：显式路径失败即报错；否则尝试环境变量 `WALLPEN_PROJECT`，
/// 失败时回退到内置示例。
pub fn load_project(explicit: Option<&Path>) -> Result<LoadedProject, FrontendError> {
    if let Some(path) = explicit {
        return load_project_file(path);
    }

    if let Some(path) = env::var_os("WALLPEN_PROJECT") {
        let path = PathBuf::from(path);
        match load_project_file(&path) {
            Ok(loaded) => return Ok(loaded),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载项目失败，回退到内置示例");
            }
        }
    }

    Ok(demo_project())
}

fn load_project_file(path: &Path) -> Result<LoadedProject, FrontendError> {
    let session = JsonFacade::new().load(path)?.into_session()?;
    info!(path = %path.display(), documents = session.documents().count(), "从 JSON 加载项目成功");
    Ok(LoadedProject {
        session,
        source: ProjectSource::Json(path.to_path_buf()),
        demo: None,
    })
}

pub fn demo_project() -> LoadedProject {
    let mut session = Session::new();
    let demo = session.populate_demo();
    LoadedProject {
        session,
        source: ProjectSource::Demo,
        demo: Some(demo),
    }
}

/// 把配置文件中的宿主约定转换为洞口放置设置。
pub fn hole_settings(config: &AppConfig) -> HoleSettings {
    let host = &config.host;
    let filter = if host.search_links {
        TargetFilter::walls()
    } else {
        TargetFilter::host_walls()
    };
    HoleSettings {
        source_title_pattern: host.source_title_pattern.clone(),
        family_name: host.family_name.clone(),
        duct_transaction: host.duct_transaction.clone(),
        pipe_transaction: host.pipe_transaction.clone(),
        labels: ParameterLabels {
            width: config.parameters.width.clone(),
            height: config.parameters.height.clone(),
        },
        filter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallpen_io::{Project, ProjectSaver};

    #[test]
    fn default_config_matches_default_settings() {
        assert_eq!(hole_settings(&AppConfig::default()), HoleSettings::default());
    }

    #[test]
    fn search_links_toggles_filter() {
        let mut config = AppConfig::default();
        config.host.search_links = false;
        config.parameters.width = "Width".to_string();

        let settings = hole_settings(&config);
        assert_eq!(settings.filter, TargetFilter::host_walls());
        assert_eq!(settings.labels.width, "Width");
    }

    #[test]
    fn explicit_project_path_is_loaded_or_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        let saved = demo_project();
        JsonFacade::new()
            .save(&Project::from_session(saved.session), &path)
            .unwrap();

        let loaded = load_project(Some(&path)).unwrap();
        assert!(matches!(loaded.source, ProjectSource::Json(_)));
        assert!(loaded.demo.is_none());
        assert_eq!(loaded.session.documents().count(), 3);

        let missing = dir.path().join("absent.json");
        assert!(matches!(
            load_project(Some(&missing)),
            Err(FrontendError::Io(_))
        ));
    }
}
