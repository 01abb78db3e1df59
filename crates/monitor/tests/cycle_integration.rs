use async_trait::async_trait;
use candlewatch_core::alert::entity::AlertKind;
use candlewatch_core::common::time::FakeClockProvider;
use candlewatch_core::common::{ExchangeId, TimeFrame};
use candlewatch_core::config::{CatalogReport, DropMode};
use candlewatch_core::market::entity::{Candle, MarketCatalog, MarketInfo};
use candlewatch_core::market::error::MarketError;
use candlewatch_core::market::port::MarketDataClient;
use candlewatch_core::store::port::PriceSnapshot;
use candlewatch_core::testing::{
    FakeMarketClient, MemPriceStore, MemWatchlistStore, RecordingNotifier, candles_from_closes,
    perpetual,
};
use candlewatch_market::RetryPolicy;
use candlewatch_monitor::{CycleError, CycleSettings, MonitorCycle};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn settings(drop_mode: DropMode) -> CycleSettings {
    CycleSettings {
        drop_mode,
        drop_threshold_pct: -1.0,
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        },
        inter_symbol_delay: Duration::ZERO,
        catalog_report: CatalogReport::Off,
        notify_symbol_errors: true,
        notify_empty_watchlist: false,
    }
}

/// 30m 前一根阴线 (开 100 收 90 高 105)，当前收 110。
fn breakout_candles() -> Vec<Candle> {
    let mut candles = candles_from_closes(&[90.0, 110.0]);
    candles[0].open = 100.0;
    candles[0].high = 105.0;
    candles[0].low = 89.0;
    candles
}

struct Harness {
    client: Arc<FakeMarketClient>,
    watchlist: Arc<MemWatchlistStore>,
    state: Arc<MemPriceStore>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn new(client: FakeMarketClient, tickers: &[&str]) -> Self {
        Self::with_parts(
            client,
            MemWatchlistStore::new(tickers),
            MemPriceStore::new(),
            RecordingNotifier::new(),
        )
    }

    fn with_parts(
        client: FakeMarketClient,
        watchlist: MemWatchlistStore,
        state: MemPriceStore,
        notifier: RecordingNotifier,
    ) -> Self {
        Self {
            client: Arc::new(client),
            watchlist: Arc::new(watchlist),
            state: Arc::new(state),
            notifier: Arc::new(notifier),
        }
    }

    fn cycle(&self, settings: CycleSettings) -> MonitorCycle {
        MonitorCycle::new(
            self.client.clone(),
            self.watchlist.clone(),
            self.state.clone(),
            self.notifier.clone(),
            settings,
        )
        .with_clock(Arc::new(FakeClockProvider::new(now())))
    }
}

/// # Summary
/// 三个标的中第二个无法解析：第一、三个照常评估并写入快照。
#[tokio::test]
async fn test_unresolvable_symbol_is_isolated() {
    let client = FakeMarketClient::new(ExchangeId::Binance)
        .with_market(perpetual("ETH"))
        .with_market(perpetual("BTC"))
        .with_candles("ETH/USDT", TimeFrame::Hour1, candles_from_closes(&[100.0, 101.0]))
        .with_candles("BTC/USDT", TimeFrame::Hour1, candles_from_closes(&[60000.0, 60100.0]));
    let harness = Harness::new(client, &["ETH", "NOPE", "BTC"]);

    let report = harness.cycle(settings(DropMode::Candle)).run().await.unwrap();

    assert_eq!(report.watched, 3);
    assert_eq!(report.evaluated, vec!["ETH/USDT", "BTC/USDT"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].ticker, "NOPE");
    assert!(report.alerts.is_empty());
    assert!(report.snapshot_saved);

    let stored = harness.state.stored().unwrap();
    assert_eq!(stored.captured_at, now());
    assert_eq!(stored.get("ETH/USDT"), Some(101.0));
    assert_eq!(stored.get("BTC/USDT"), Some(60100.0));
    assert_eq!(stored.len(), 2);

    let messages = harness.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Error with NOPE: "));
}

/// # Summary
/// 目录加载失败：不做任何标的处理，不写快照，只发送一条致命通知。
#[tokio::test]
async fn test_catalog_failure_aborts_cycle() {
    let client = FakeMarketClient::new(ExchangeId::Binance)
        .with_market(perpetual("ETH"))
        .fail_catalog("connection refused");
    let harness = Harness::with_parts(
        client,
        MemWatchlistStore::new(&["ETH", "BTC"]),
        MemPriceStore::with_snapshot(PriceSnapshot::empty(now())),
        RecordingNotifier::new(),
    );

    let result = harness.cycle(settings(DropMode::Candle)).run().await;

    assert!(matches!(
        result,
        Err(CycleError::MarketsUnavailable {
            exchange: ExchangeId::Binance,
            ..
        })
    ));
    assert_eq!(harness.client.calls(), vec!["markets"]);
    assert_eq!(harness.state.save_count(), 0);
    assert_eq!(
        harness.notifier.messages(),
        vec!["Error in Binance monitor: Network error: connection refused"]
    );
}

/// # Summary
/// 目录加载限流时退避重试，成功后周期照常进行。
#[tokio::test]
async fn test_catalog_rate_limit_is_retried() {
    let client = FakeMarketClient::new(ExchangeId::Binance)
        .with_market(perpetual("ETH"))
        .fail_next("*catalog", MarketError::RateLimited("429".to_string()));
    let harness = Harness::new(client, &["ETH"]);

    let report = harness.cycle(settings(DropMode::Candle)).run().await.unwrap();

    assert_eq!(report.evaluated, vec!["ETH/USDT"]);
    let calls = harness.client.calls();
    assert_eq!(calls.iter().filter(|c| c.as_str() == "markets").count(), 2);
}

/// # Summary
/// 1h 收盘价 100 -> 98：跌幅 2.00%，消息格式固定。
#[tokio::test]
async fn test_candle_drop_alert() {
    let client = FakeMarketClient::new(ExchangeId::Binance)
        .with_market(perpetual("ETH"))
        .with_candles("ETH/USDT", TimeFrame::Hour1, candles_from_closes(&[100.0, 98.0]));
    let harness = Harness::new(client, &["eth"]);

    let report = harness.cycle(settings(DropMode::Candle)).run().await.unwrap();

    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].kind, AlertKind::Drop);
    assert!((report.alerts[0].value - 2.0).abs() < 1e-9);
    assert_eq!(report.alerts[0].at, now());
    assert_eq!(
        harness.notifier.messages(),
        vec!["ETH/USDT 1h candle dropped by 2.00% (price 98)"]
    );
    assert_eq!(harness.state.stored().unwrap().get("ETH/USDT"), Some(98.0));
}

/// # Summary
/// 跌幅 -0.99% 不触发，K 线模式不请求最新价。
#[tokio::test]
async fn test_drop_below_threshold_is_silent() {
    let client = FakeMarketClient::new(ExchangeId::Binance)
        .with_market(perpetual("ETH"))
        .with_candles("ETH/USDT", TimeFrame::Hour1, candles_from_closes(&[100.0, 99.01]));
    let harness = Harness::new(client, &["ETH"]);

    let report = harness.cycle(settings(DropMode::Candle)).run().await.unwrap();

    assert!(report.alerts.is_empty());
    assert!(harness.notifier.messages().is_empty());
    assert_eq!(
        harness.client.calls(),
        vec!["markets", "candles:ETH/USDT:1h", "candles:ETH/USDT:30m"]
    );
}

/// # Summary
/// 30m 阴线高点突破：价位 105，当前价 110。
#[tokio::test]
async fn test_breakout_alert() {
    let client = FakeMarketClient::new(ExchangeId::Binance)
        .with_market(perpetual("ETH"))
        .with_candles("ETH/USDT", TimeFrame::Hour1, candles_from_closes(&[100.0, 100.5]))
        .with_candles("ETH/USDT", TimeFrame::Minute30, breakout_candles());
    let harness = Harness::new(client, &["ETH"]);

    let report = harness.cycle(settings(DropMode::Candle)).run().await.unwrap();

    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].kind, AlertKind::Breakout);
    assert_eq!(report.alerts[0].value, 105.0);
    assert_eq!(
        harness.notifier.messages(),
        vec!["ETH/USDT 30m candle broke above previous bearish candle high (105) (price 110)"]
    );
}

/// # Summary
/// 差值模式：与上一周期快照比较，无历史价格的标的只记录基线。
#[tokio::test]
async fn test_ticker_mode_compares_against_previous_snapshot() {
    let mut previous = PriceSnapshot::empty(Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap());
    previous.record("ETH/USDT", 100.0);
    previous.record("DOGE/USDT", 0.2);

    let client = FakeMarketClient::new(ExchangeId::Binance)
        .with_market(perpetual("ETH"))
        .with_market(perpetual("BTC"))
        .with_price("ETH/USDT", 97.0)
        .with_price("BTC/USDT", 60000.0);
    let harness = Harness::with_parts(
        client,
        MemWatchlistStore::new(&["ETH", "BTC"]),
        MemPriceStore::with_snapshot(previous),
        RecordingNotifier::new(),
    );

    let report = harness.cycle(settings(DropMode::Ticker)).run().await.unwrap();

    assert_eq!(report.alerts.len(), 1);
    assert_eq!(
        harness.notifier.messages(),
        vec!["ETH/USDT price dropped by 3.00% since last check (100 -> 97)"]
    );

    // 新快照整体替换：只包含本周期观测到的标的
    let stored = harness.state.stored().unwrap();
    assert_eq!(stored.get("ETH/USDT"), Some(97.0));
    assert_eq!(stored.get("BTC/USDT"), Some(60000.0));
    assert_eq!(stored.get("DOGE/USDT"), None);

    // 差值模式不请求 1h K 线
    assert!(!harness.client.calls().iter().any(|c| c.ends_with(":1h")));
}

/// # Summary
/// 同一规范标识在自选列表中出现两次 (新旧写法)，告警只投递一次。
#[tokio::test]
async fn test_duplicate_alerts_are_suppressed() {
    let client = FakeMarketClient::new(ExchangeId::Binance)
        .with_market(perpetual("ETH"))
        .with_candles("ETH/USDT", TimeFrame::Hour1, candles_from_closes(&[100.0, 98.0]))
        .with_candles("ETH/USDT", TimeFrame::Minute30, breakout_candles());
    let harness = Harness::new(client, &["ETH", "ETH/USDT"]);

    let report = harness.cycle(settings(DropMode::Candle)).run().await.unwrap();

    assert_eq!(report.evaluated.len(), 2);
    assert_eq!(report.alerts.len(), 2);
    let messages = harness.notifier.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("1h candle dropped"));
    assert!(messages[1].contains("30m candle broke above"));
}

/// # Summary
/// 投递失败只记录，不中断周期，快照照常保存。
#[tokio::test]
async fn test_delivery_failure_is_tolerated() {
    let client = FakeMarketClient::new(ExchangeId::Binance)
        .with_market(perpetual("ETH"))
        .with_candles("ETH/USDT", TimeFrame::Hour1, candles_from_closes(&[100.0, 98.0]));
    let harness = Harness::with_parts(
        client,
        MemWatchlistStore::new(&["ETH"]),
        MemPriceStore::new(),
        RecordingNotifier::failing(),
    );

    let report = harness.cycle(settings(DropMode::Candle)).run().await.unwrap();

    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.delivery_failures, 1);
    assert!(report.snapshot_saved);
    assert_eq!(harness.notifier.messages().len(), 1);
}

/// # Summary
/// 限流在次数内恢复；次数耗尽后视为跳过。
#[tokio::test]
async fn test_symbol_rate_limit_retry_and_skip() {
    let mut client = FakeMarketClient::new(ExchangeId::Binance)
        .with_market(perpetual("ETH"))
        .with_market(perpetual("BTC"))
        .with_candles("ETH/USDT", TimeFrame::Hour1, candles_from_closes(&[100.0, 100.0]))
        .fail_next("ETH/USDT", MarketError::RateLimited("429".to_string()));
    for _ in 0..3 {
        client = client.fail_next("BTC/USDT", MarketError::RateLimited("429".to_string()));
    }
    let harness = Harness::new(client, &["ETH", "BTC"]);

    let report = harness.cycle(settings(DropMode::Candle)).run().await.unwrap();

    assert_eq!(report.evaluated, vec!["ETH/USDT"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].ticker, "BTC");
    assert!(report.skipped[0].reason.contains("Rate limited"));
    assert_eq!(harness.state.stored().unwrap().len(), 1);
}

/// # Summary
/// 空自选列表提前结束：可选通知，不写快照。
#[tokio::test]
async fn test_empty_watchlist_ends_early() {
    let client = FakeMarketClient::new(ExchangeId::Binance).with_market(perpetual("ETH"));
    let harness = Harness::new(client, &[]);
    let mut settings = settings(DropMode::Candle);
    settings.notify_empty_watchlist = true;

    let report = harness.cycle(settings).run().await.unwrap();

    assert_eq!(report.watched, 0);
    assert!(!report.snapshot_saved);
    assert_eq!(harness.state.save_count(), 0);
    assert_eq!(harness.notifier.messages(), vec!["No symbols in watchlist"]);
}

/// # Summary
/// 自选列表损坏按空列表处理并记入报告，周期不失败。
#[tokio::test]
async fn test_corrupted_watchlist_is_reported() {
    let client = FakeMarketClient::new(ExchangeId::Binance).with_market(perpetual("ETH"));
    let harness = Harness::with_parts(
        client,
        MemWatchlistStore::corrupted(),
        MemPriceStore::new(),
        RecordingNotifier::new(),
    );

    let report = harness.cycle(settings(DropMode::Candle)).run().await.unwrap();

    assert!(report.watchlist_error.is_some());
    assert_eq!(report.watched, 0);
    assert_eq!(harness.state.save_count(), 0);
    let messages = harness.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Error loading watchlist"));
}

/// # Summary
/// 快照保存失败只记入报告，不升级为周期错误。
#[tokio::test]
async fn test_snapshot_save_failure_is_reported() {
    let client = FakeMarketClient::new(ExchangeId::Binance)
        .with_market(perpetual("ETH"))
        .with_candles("ETH/USDT", TimeFrame::Hour1, candles_from_closes(&[100.0, 100.0]));
    let harness = Harness::with_parts(
        client,
        MemWatchlistStore::new(&["ETH"]),
        MemPriceStore::new().failing_save(),
        RecordingNotifier::new(),
    );

    let report = harness.cycle(settings(DropMode::Candle)).run().await.unwrap();

    assert_eq!(report.evaluated, vec!["ETH/USDT"]);
    assert!(!report.snapshot_saved);
    assert!(report.snapshot_error.is_some());
}

/// # Summary
/// 完整目录报告按通道长度上限分片发送。
#[tokio::test]
async fn test_full_catalog_report_is_chunked() {
    let mut client = FakeMarketClient::new(ExchangeId::Binance);
    for base in ["AAA", "BBB", "CCC", "DDD", "EEE"] {
        client = client.with_market(perpetual(base));
    }
    let harness = Harness::with_parts(
        client,
        MemWatchlistStore::new(&[]),
        MemPriceStore::new(),
        RecordingNotifier::new().with_max_len(64),
    );
    let mut settings = settings(DropMode::Candle);
    settings.catalog_report = CatalogReport::Full;

    let report = harness.cycle(settings).run().await.unwrap();

    assert_eq!(report.catalog_size, 5);
    let messages = harness.notifier.messages();
    assert!(messages.len() > 1);
    assert_eq!(
        messages[0],
        "Total number of trading symbols in Binance futures market: 5"
    );
    assert!(messages.iter().all(|m| m.chars().count() <= 64));
    let listed: Vec<&str> = messages.iter().flat_map(|m| m.lines()).skip(1).collect();
    assert_eq!(
        listed,
        vec!["AAA/USDT", "BBB/USDT", "CCC/USDT", "DDD/USDT", "EEE/USDT"]
    );
}

/// 记录每次 K 线请求发生时的 (标识, 相对起点的虚拟时间)。
struct TimedClient {
    inner: FakeMarketClient,
    origin: Instant,
    fetches: Mutex<Vec<(String, Duration)>>,
}

impl TimedClient {
    fn fetches(&self) -> Vec<(String, Duration)> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataClient for TimedClient {
    fn exchange(&self) -> ExchangeId {
        self.inner.exchange()
    }

    async fn load_markets(&self) -> Result<MarketCatalog, MarketError> {
        self.inner.load_markets().await
    }

    async fn fetch_candles(
        &self,
        market: &MarketInfo,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        if timeframe == TimeFrame::Hour1 {
            self.fetches
                .lock()
                .unwrap()
                .push((market.symbol.clone(), self.origin.elapsed()));
        }
        self.inner.fetch_candles(market, timeframe, limit).await
    }

    async fn fetch_last_price(&self, market: &MarketInfo) -> Result<f64, MarketError> {
        self.inner.fetch_last_price(market).await
    }
}

/// # Summary
/// 标的之间按配置间隔等待：N 个标的等待 N-1 次，第一个标的之前不等待。
#[tokio::test(start_paused = true)]
async fn test_inter_symbol_delay_between_symbols() {
    let delay = Duration::from_secs(2);
    let mut inner = FakeMarketClient::new(ExchangeId::Binance);
    for base in ["ETH", "BTC", "SOL"] {
        let symbol = format!("{}/USDT", base);
        inner = inner
            .with_market(perpetual(base))
            .with_candles(&symbol, TimeFrame::Hour1, candles_from_closes(&[100.0, 101.0]));
    }
    let origin = Instant::now();
    let client = Arc::new(TimedClient {
        inner,
        origin,
        fetches: Mutex::new(Vec::new()),
    });

    let mut settings = settings(DropMode::Candle);
    settings.inter_symbol_delay = delay;
    let cycle = MonitorCycle::new(
        client.clone(),
        Arc::new(MemWatchlistStore::new(&["ETH", "BTC", "SOL"])),
        Arc::new(MemPriceStore::new()),
        Arc::new(RecordingNotifier::new()),
        settings,
    )
    .with_clock(Arc::new(FakeClockProvider::new(now())));

    let report = cycle.run().await.unwrap();

    assert_eq!(report.evaluated.len(), 3);
    assert_eq!(
        client.fetches(),
        vec![
            ("ETH/USDT".to_string(), Duration::ZERO),
            ("BTC/USDT".to_string(), delay),
            ("SOL/USDT".to_string(), delay * 2),
        ]
    );
    // 最后一个标的之后不再等待
    assert_eq!(origin.elapsed(), delay * 2);
}
