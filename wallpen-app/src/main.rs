use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use wallpen_config::{AppConfig, ConfigError};
use wallpen_frontend::CliOptions;

#[derive(Parser, Debug)]
#[command(name = "wallpen", version, about = "为穿墙风管与水管放置洞口")]
struct Args {
    #[arg(long, help = "配置文件路径，缺省时读取 WALLPEN_CONFIG 或 ./config/default.toml")]
    config: Option<PathBuf>,
    #[arg(long, help = "JSON 项目文件，缺省时读取 WALLPEN_PROJECT 或使用内置示例")]
    project: Option<PathBuf>,
    #[arg(long, help = "写出修改后的项目")]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 配置失败先记下，待日志初始化后再输出
    let (config, config_error) = match load_configuration(args.config.as_deref()) {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    init_logging(&config);
    if let Some(err) = config_error {
        warn!(error = %err, "加载配置失败，使用内建默认值");
    }
    info!("启动墙体洞口放置工具");

    let options = CliOptions {
        project: args.project,
        output: args.output,
    };
    let report = wallpen_frontend::run_cli(&options, &config).context("放置洞口失败")?;
    if !report.is_complete() {
        error!(created = report.total_created(), "部分批次已回滚");
        bail!("部分批次已回滚，已提交的洞口保留在模型中");
    }
    Ok(())
}

/// 显式路径优先；否则按 `WALLPEN_CONFIG` 与 `./config/default.toml` 自动发现。
fn load_configuration(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = fmt().with_env_filter(filter).try_init() {
        warn!(error = %err, "日志订阅器已存在，沿用现有配置");
    }
}
