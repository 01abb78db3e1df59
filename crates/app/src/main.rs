mod cli;
mod commands;
mod settings;
mod telemetry;

use clap::Parser;
use cli::{Cli, Command, WatchlistCommand};
use std::process::ExitCode;
use tracing::{error, info};

/// # Summary
/// 应用启动入口。
///
/// # Logic
/// 1. 解析命令行并加载 `.env`。
/// 2. 分层加载并校验配置，失败即退出 (此时日志尚未初始化，直接写 stderr)。
/// 3. 初始化全局日志与 TLS 加密后端。
/// 4. 分发子命令，默认执行一次监控周期。
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let config = match settings::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("candlewatch: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = telemetry::init_logging(&config.log);
    candlewatch_feed::install_crypto_provider();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        exchange = %config.exchange.id,
        "candlewatch starting"
    );

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => commands::run_cycle(&config).await,
        Command::Watchlist(WatchlistCommand::List) => commands::list_watchlist(&config).await,
        Command::Watchlist(WatchlistCommand::Add { ticker }) => {
            commands::add_to_watchlist(&config, &ticker).await
        }
        Command::Watchlist(WatchlistCommand::Remove { ticker }) => {
            commands::remove_from_watchlist(&config, &ticker).await
        }
    };

    result.unwrap_or_else(|e| {
        error!(error = %e, "Command failed");
        ExitCode::FAILURE
    })
}
