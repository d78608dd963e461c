pub mod cli;
pub mod errors;
pub mod loader;

use errors::FrontendError;
use tracing::info;
use wallpen_config::AppConfig;
use wallpen_engine::holes::HoleReport;

pub use cli::CliOptions;

/// 以命令行前端执行一次洞口放置。
pub fn run_cli(options: &CliOptions, config: &AppConfig) -> Result<HoleReport, FrontendError> {
    info!("启动 CLI 前端");
    cli::run(options, config)
}
