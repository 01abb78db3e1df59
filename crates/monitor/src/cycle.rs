use crate::error::CycleError;
use crate::report::{CycleReport, SkippedSymbol, chunk_lines};
use candlewatch_core::alert::entity::{AlertEvent, AlertKind};
use candlewatch_core::common::TimeFrame;
use candlewatch_core::common::time::{RealTimeProvider, TimeProvider};
use candlewatch_core::config::{CatalogReport, DropMode, MonitorConfig};
use candlewatch_core::market::entity::{Candle, MarketCatalog, MarketInfo};
use candlewatch_core::market::error::MarketError;
use candlewatch_core::market::port::MarketDataClient;
use candlewatch_core::notify::port::Notifier;
use candlewatch_core::store::port::{PriceSnapshot, PriceStateStore, WatchlistStore};
use candlewatch_market::{RetryPolicy, SymbolNormalizer};
use candlewatch_signal::{CandleAnalyzer, DropSignal};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 每次请求的 K 线根数：当前周期加最近一根已收盘 K 线。
const CANDLE_LIMIT: usize = 2;

/// # Summary
/// 周期运行参数，由 `[monitor]` 配置段转换而来。
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub drop_mode: DropMode,
    pub drop_threshold_pct: f64,
    pub retry: RetryPolicy,
    pub inter_symbol_delay: Duration,
    pub catalog_report: CatalogReport,
    pub notify_symbol_errors: bool,
    pub notify_empty_watchlist: bool,
}

impl From<&MonitorConfig> for CycleSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            drop_mode: config.drop_mode,
            drop_threshold_pct: config.drop_threshold_pct,
            retry: RetryPolicy::from(&config.retry),
            inter_symbol_delay: Duration::from_millis(config.inter_symbol_delay_ms),
            catalog_report: config.catalog_report,
            notify_symbol_errors: config.notify_symbol_errors,
            notify_empty_watchlist: config.notify_empty_watchlist,
        }
    }
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

/// 单次周期内的可变状态。
struct CycleRun {
    report: CycleReport,
    next: PriceSnapshot,
    dispatched: HashSet<(AlertKind, String)>,
}

/// # Summary
/// 监控周期编排器：对自选列表完整地执行一遍检查。
/// 编译期仅依赖 `candlewatch-core` 中的 Trait 定义，所有具体实现通过构造函数注入。
///
/// # Invariants
/// - 标的严格顺序处理，单个标的失败不影响其他标的。
/// - 上一周期快照在开始时只读一次，新快照在结束时只写一次。
/// - 同一周期内 `(kind, symbol)` 的告警最多投递一次。
/// - 只有目录加载失败会让 `run` 返回错误。
pub struct MonitorCycle {
    client: Arc<dyn MarketDataClient>,
    watchlist: Arc<dyn WatchlistStore>,
    state: Arc<dyn PriceStateStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn TimeProvider>,
    normalizer: SymbolNormalizer,
    analyzer: CandleAnalyzer,
    settings: CycleSettings,
}

impl MonitorCycle {
    /// # Summary
    /// 创建监控周期实例。
    ///
    /// # Logic
    /// 1. 按客户端所属交易所选择规范化描述符。
    /// 2. 以配置的阈值构建分析器，时钟默认为系统时钟。
    ///
    /// # Arguments
    /// * `client` - 交易所行情客户端。
    /// * `watchlist` - 自选列表存储。
    /// * `state` - 价格快照存储。
    /// * `notifier` - 告警投递通道。
    /// * `settings` - 周期运行参数。
    pub fn new(
        client: Arc<dyn MarketDataClient>,
        watchlist: Arc<dyn WatchlistStore>,
        state: Arc<dyn PriceStateStore>,
        notifier: Arc<dyn Notifier>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            normalizer: SymbolNormalizer::for_exchange(client.exchange()),
            analyzer: CandleAnalyzer::new(settings.drop_threshold_pct),
            client,
            watchlist,
            state,
            notifier,
            clock: Arc::new(RealTimeProvider),
            settings,
        }
    }

    /// 替换时钟 (测试注入固定时间)。
    pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    /// # Summary
    /// 执行一次完整的监控周期。
    ///
    /// # Logic
    /// 1. 加载市场目录 (限流时退避重试)，失败则通知运维并返回 `MarketsUnavailable`，不触碰状态。
    /// 2. 按配置发送目录汇总报告。
    /// 3. 加载自选列表，为空则提前结束 (不写快照)。读取失败按空列表处理并记入报告。
    /// 4. 加载上一周期快照，失败按空快照处理。
    /// 5. 顺序处理每个标的，标的之间协作式暂停，单个标的的错误只记录与可选通知。
    /// 6. 保存新快照，失败只记入报告。
    ///
    /// # Returns
    /// 成功返回周期摘要，仅目录加载失败返回 `CycleError`。
    pub async fn run(&self) -> Result<CycleReport, CycleError> {
        let exchange = self.client.exchange();
        let started_at = self.clock.now();
        let mut report = CycleReport::new(exchange, started_at);
        info!(exchange = %exchange, mode = ?self.settings.drop_mode, "Monitor cycle started");

        let catalog = match self
            .settings
            .retry
            .run("load markets", || self.client.load_markets())
            .await
        {
            Ok(catalog) => catalog,
            Err(e) => {
                error!(exchange = %exchange, error = %e, "Failed to load market catalog");
                self.send(&format!("Error in {} monitor: {}", exchange, e)).await;
                return Err(CycleError::MarketsUnavailable {
                    exchange,
                    source: e,
                });
            }
        };

        let descriptor = self.normalizer.descriptor();
        let perpetuals = catalog.live_markets(descriptor.quote, descriptor.derivative_kind);
        report.catalog_size = perpetuals.len();
        info!(
            exchange = %exchange,
            markets = catalog.len(),
            perpetuals = perpetuals.len(),
            "Market catalog loaded"
        );
        report.delivery_failures += self.send_catalog_report(&perpetuals).await;

        let tickers = match self.watchlist.load().await {
            Ok(tickers) => tickers,
            Err(e) => {
                warn!(error = %e, "Watchlist unreadable, treating as empty");
                if self.settings.notify_symbol_errors {
                    report.delivery_failures += self.send(&format!("Error loading watchlist: {}", e)).await;
                }
                report.watchlist_error = Some(e.to_string());
                Vec::new()
            }
        };
        report.watched = tickers.len();

        if tickers.is_empty() {
            info!("No symbols in watchlist");
            if self.settings.notify_empty_watchlist {
                report.delivery_failures += self.send("No symbols in watchlist").await;
            }
            return Ok(report);
        }

        let previous = self.state.load().await.unwrap_or_else(|e| {
            warn!(error = %e, "Previous price snapshot unavailable, starting from empty");
            PriceSnapshot::empty(DateTime::<Utc>::UNIX_EPOCH)
        });

        let mut run = CycleRun {
            report,
            next: PriceSnapshot::empty(started_at),
            dispatched: HashSet::new(),
        };

        for (index, ticker) in tickers.iter().enumerate() {
            if index > 0 && !self.settings.inter_symbol_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_symbol_delay).await;
            }

            match self.process_symbol(ticker, &catalog, &previous, &mut run).await {
                Ok(symbol) => run.report.evaluated.push(symbol),
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "Skipping symbol this cycle");
                    if self.settings.notify_symbol_errors {
                        run.report.delivery_failures +=
                            self.send(&format!("Error with {}: {}", ticker, e)).await;
                    }
                    run.report.skipped.push(SkippedSymbol {
                        ticker: ticker.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let CycleRun { mut report, next, .. } = run;
        match self.state.save(&next).await {
            Ok(()) => report.snapshot_saved = true,
            Err(e) => {
                error!(error = %e, "Failed to persist price snapshot");
                report.snapshot_error = Some(e.to_string());
            }
        }

        info!("Monitor cycle finished: {}", report);
        Ok(report)
    }

    /// # Summary
    /// 处理单个自选标的。
    ///
    /// # Logic
    /// 1. 规范化为目录中的永续合约。
    /// 2. K 线模式：抓取 1h K 线并评估跌幅。
    /// 3. 抓取 30m K 线并评估阴线高点突破。
    /// 4. 差值模式：抓取最新价并与上一周期快照比较。
    /// 5. 信号产生即去重投递，全部成功后把观测价格记入新快照。
    ///
    /// # Returns
    /// 成功返回规范标识，任一步失败返回对应的 `MarketError`。
    async fn process_symbol(
        &self,
        ticker: &str,
        catalog: &MarketCatalog,
        previous: &PriceSnapshot,
        run: &mut CycleRun,
    ) -> Result<String, MarketError> {
        let market = self.normalizer.resolve(ticker, catalog)?;
        debug!(ticker, symbol = %market.symbol, id = %market.id, "Ticker resolved");

        let mut observed = None;

        if self.settings.drop_mode == DropMode::Candle {
            let hourly = self.fetch_candles(market, TimeFrame::Hour1).await?;
            if let Some(signal) = self.analyzer.evaluate_drop(&hourly) {
                let event = self.drop_event(market, signal, None);
                self.dispatch(event, run).await;
            }
            observed = hourly.last().map(|c| c.close);
        }

        let half_hourly = self.fetch_candles(market, TimeFrame::Minute30).await?;
        if let Some(signal) = self.analyzer.evaluate_breakout(&half_hourly) {
            let event = AlertEvent {
                kind: AlertKind::Breakout,
                symbol: market.symbol.clone(),
                value: signal.level,
                price: signal.price,
                previous_price: None,
                at: self.clock.now(),
            };
            self.dispatch(event, run).await;
        }

        if self.settings.drop_mode == DropMode::Ticker {
            let price = self
                .settings
                .retry
                .run("last price", || self.client.fetch_last_price(market))
                .await?;
            match previous.get(&market.symbol) {
                Some(prev) => {
                    if let Some(signal) = self.analyzer.evaluate_price_change(prev, price) {
                        let event = self.drop_event(market, signal, Some(prev));
                        self.dispatch(event, run).await;
                    }
                }
                None => debug!(symbol = %market.symbol, "No previous price, recording baseline"),
            }
            observed = Some(price);
        }

        if let Some(price) = observed {
            run.next.record(&market.symbol, price);
        }
        Ok(market.symbol.clone())
    }

    async fn fetch_candles(
        &self,
        market: &MarketInfo,
        timeframe: TimeFrame,
    ) -> Result<Vec<Candle>, MarketError> {
        let what = format!("{} candles {}", timeframe, market.symbol);
        self.settings
            .retry
            .run(&what, || self.client.fetch_candles(market, timeframe, CANDLE_LIMIT))
            .await
    }

    fn drop_event(&self, market: &MarketInfo, signal: DropSignal, previous_price: Option<f64>) -> AlertEvent {
        AlertEvent {
            kind: AlertKind::Drop,
            symbol: market.symbol.clone(),
            value: signal.magnitude(),
            price: signal.price,
            previous_price,
            at: self.clock.now(),
        }
    }

    /// 去重后投递告警，重复事件只记录调试日志。
    async fn dispatch(&self, event: AlertEvent, run: &mut CycleRun) {
        if !run.dispatched.insert(event.dedup_key()) {
            debug!(kind = ?event.kind, symbol = %event.symbol, "Duplicate alert suppressed");
            return;
        }
        info!(kind = ?event.kind, symbol = %event.symbol, "Alert: {}", event);
        run.report.delivery_failures += self.send(&event.to_string()).await;
        run.report.alerts.push(event);
    }

    /// # Summary
    /// 发送目录汇总报告。
    ///
    /// # Returns
    /// 投递失败的片段数。
    async fn send_catalog_report(&self, perpetuals: &[&MarketInfo]) -> usize {
        let headline = format!(
            "Total number of trading symbols in {} futures market: {}",
            self.client.exchange(),
            perpetuals.len()
        );
        match self.settings.catalog_report {
            CatalogReport::Off => 0,
            CatalogReport::Count => self.send(&headline).await,
            CatalogReport::Full => {
                let mut text = headline;
                for market in perpetuals {
                    text.push('\n');
                    text.push_str(&market.symbol);
                }
                self.send(&text).await
            }
        }
    }

    /// # Summary
    /// 按通道长度上限分片投递文本，失败只记录日志，不重试。
    ///
    /// # Returns
    /// 投递失败的片段数。
    async fn send(&self, text: &str) -> usize {
        let chunks = match self.notifier.max_message_len() {
            Some(max_len) => chunk_lines(text, max_len),
            None => vec![text.to_string()],
        };

        let mut failures = 0;
        for chunk in chunks {
            if let Err(e) = self.notifier.deliver(&chunk).await {
                warn!(error = %e, "Notification delivery failed");
                failures += 1;
            }
        }
        failures
    }
}
