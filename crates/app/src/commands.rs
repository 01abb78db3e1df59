use candlewatch_core::config::AppConfig;
use candlewatch_core::store::port::WatchlistStore;
use candlewatch_feed::client_for;
use candlewatch_market::{RetryPolicy, SymbolNormalizer};
use candlewatch_monitor::{CycleSettings, MonitorCycle};
use candlewatch_notify::build_notifier;
use candlewatch_store::{JsonPriceStateStore, JsonWatchlistStore};
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

pub type CommandResult = Result<ExitCode, Box<dyn Error>>;

/// # Summary
/// 执行一次监控周期，纯粹的 DI 组装。
///
/// # Logic
/// 1. 校验通知渠道凭据，再实例化基础设施层（交易所客户端、JSON 存储、通知通道）。
/// 2. 通过 `Arc<dyn Trait>` 注入 MonitorCycle。
/// 3. 只有目录加载失败返回非零退出码。
pub async fn run_cycle(config: &AppConfig) -> CommandResult {
    config.validate_notify()?;
    let client = client_for(config.exchange.id)?;
    let notifier = build_notifier(&config.notify)?;
    let watchlist = Arc::new(JsonWatchlistStore::new(config.storage.watchlist_path()));
    let state = Arc::new(JsonPriceStateStore::new(config.storage.snapshot_path()));

    let cycle = MonitorCycle::new(
        client,
        watchlist,
        state,
        notifier,
        CycleSettings::from(&config.monitor),
    );

    match cycle.run().await {
        Ok(report) => {
            info!(
                evaluated = report.evaluated.len(),
                skipped = report.skipped.len(),
                alerts = report.alerts.len(),
                "Cycle complete"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "Monitor cycle aborted");
            Ok(ExitCode::FAILURE)
        }
    }
}

pub async fn list_watchlist(config: &AppConfig) -> CommandResult {
    let store = JsonWatchlistStore::new(config.storage.watchlist_path());
    let tickers = store.load().await?;
    if tickers.is_empty() {
        println!("No symbols in watchlist");
    }
    for ticker in tickers {
        println!("{}", ticker);
    }
    Ok(ExitCode::SUCCESS)
}

/// # Summary
/// 校验代码可在当前交易所解析为永续合约后加入自选列表。
///
/// # Logic
/// 1. 加载市场目录 (限流时退避重试)。
/// 2. 通过规范化器解析代码，失败时不写入。
/// 3. 写入自选列表 (大小写不敏感去重)。
pub async fn add_to_watchlist(config: &AppConfig, ticker: &str) -> CommandResult {
    let client = client_for(config.exchange.id)?;
    let catalog = RetryPolicy::from(&config.monitor.retry)
        .run("load markets", || client.load_markets())
        .await?;

    let market = match SymbolNormalizer::for_exchange(config.exchange.id).resolve(ticker, &catalog) {
        Ok(market) => market,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let store = JsonWatchlistStore::new(config.storage.watchlist_path());
    if store.add(ticker).await? {
        println!("Added {} ({})", ticker.trim().to_uppercase(), market.symbol);
    } else {
        println!("{} is already in the watchlist", ticker.trim().to_uppercase());
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn remove_from_watchlist(config: &AppConfig, ticker: &str) -> CommandResult {
    let store = JsonWatchlistStore::new(config.storage.watchlist_path());
    if store.remove(ticker).await? {
        println!("Removed {}", ticker.trim().to_uppercase());
    } else {
        println!("{} is not in the watchlist", ticker.trim().to_uppercase());
    }
    Ok(ExitCode::SUCCESS)
}
