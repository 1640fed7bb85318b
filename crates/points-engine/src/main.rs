//! 积分引擎 CLI
//!
//! 加载配置与规则目录后执行子命令。

use anyhow::Context;
use clap::Parser;
use loyalty_shared::AppConfig;
use loyalty_shared::observability;
use points_engine::PointsEngine;
use points_engine::cli::{Cli, CommandRunner, Commands};
use tracing::info;

const SERVICE_NAME: &str = "points-engine";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config_dir {
        Some(dir) => AppConfig::load_from(SERVICE_NAME, dir),
        None => AppConfig::load(SERVICE_NAME),
    }
    .context("加载配置失败")?;

    // 命令行参数优先于配置文件，RUST_LOG 仍然优先于两者
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }
    let _guard = observability::init(&config.observability)?;

    info!(
        environment = %config.environment,
        rules_dir = %config.engine.rules_dir.display(),
        "积分引擎启动"
    );

    let engine = PointsEngine::from_config(&config).context("装配积分引擎失败")?;
    let runner = CommandRunner::new(engine).with_retry_policy(config.retry.clone());

    match cli.command {
        Commands::Process { events, save } => {
            runner.run_process(&events, save.as_deref()).await?;
        }
        Commands::Summary { consumer } => {
            runner.run_summary(&consumer).await?;
        }
        Commands::CheckRedemption { consumer, points } => {
            runner.run_check_redemption(&consumer, points).await?;
        }
        Commands::CheckRecycling { consumer, count } => {
            runner.run_check_recycling(&consumer, count).await?;
        }
        Commands::Catalog => {
            runner.run_catalog()?;
        }
    }

    Ok(())
}
