use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wallpen_core::document::Document;
use wallpen_engine::session::Session;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid project structure: {0}")]
    InvalidProject(String),
}

/// 项目文件：一组文档以及活动（目标）文档的标题。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    /// 缺省时第一份文档为活动文档。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl Project {
    /// 把会话写回项目结构，记录当前活动文档。
    pub fn from_session(session: Session) -> Self {
        let active = session
            .active()
            .and_then(|id| session.document(id).ok())
            .map(|document| document.title().to_string());
        Self {
            active,
            documents: session.into_documents(),
        }
    }

    /// 按顺序打开全部文档，并把 `active` 指定的文档设为活动文档。
    pub fn into_session(self) -> Result<Session, IoError> {
        if self.documents.is_empty() {
            return Err(IoError::InvalidProject("project has no documents".into()));
        }

        let active_index = match &self.active {
            Some(title) => self
                .documents
                .iter()
                .position(|document| document.title() == title)
                .ok_or_else(|| {
                    IoError::InvalidProject(format!("active document {title:?} not found"))
                })?,
            None => 0,
        };

        let mut session = Session::new();
        let ids: Vec<_> = self
            .documents
            .into_iter()
            .map(|document| session.open(document))
            .collect();
        session
            .set_active(ids[active_index])
            .map_err(|err| IoError::InvalidProject(err.to_string()))?;
        Ok(session)
    }
}

pub trait ProjectLoader {
    fn load(&self, path: &Path) -> Result<Project, IoError>;
}

pub trait ProjectSaver {
    fn save(&self, project: &Project, path: &Path) -> Result<(), IoError>;
}

/// JSON 格式的项目读写。
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFacade;

impl JsonFacade {
    pub fn new() -> Self {
        Self
    }
}

impl ProjectLoader for JsonFacade {
    fn load(&self, path: &Path) -> Result<Project, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|err| {
            IoError::InvalidProject(format!("{}: {err}", path.display()))
        })
    }
}

impl ProjectSaver for JsonFacade {
    fn save(&self, project: &Project, path: &Path) -> Result<(), IoError> {
        let data = serde_json::to_string_pretty(project)
            .map_err(|err| IoError::InvalidProject(err.to_string()))?;
        fs::write(path, data).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }
}
