use thiserror::Error;
use wallpen_engine::errors::EngineError;
use wallpen_io::IoError;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("项目文件处理失败: {0}")]
    Io(#[from] IoError),
    #[error("{0}")]
    Engine(#[from] EngineError),
    #[error("命令 `{name}` 执行失败: {message}")]
    Command { name: String, message: String },
}
