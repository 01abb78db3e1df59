//! 测试替身：内存版的行情客户端、通知器与存储，供各 crate 的集成测试注入。

use crate::common::{ExchangeId, TimeFrame};
use crate::market::entity::{Candle, MarketCatalog, MarketInfo, MarketKind};
use crate::market::error::MarketError;
use crate::market::port::MarketDataClient;
use crate::notify::error::NotifyError;
use crate::notify::port::Notifier;
use crate::store::error::StoreError;
use crate::store::port::{PriceSnapshot, PriceStateStore, WatchlistStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 构造一个活跃的 USDT 永续合约条目，规范标识为 `BASE/USDT`。
pub fn perpetual(base: &str) -> MarketInfo {
    MarketInfo {
        symbol: format!("{}/USDT", base),
        id: format!("{}USDT", base),
        base: base.to_string(),
        quote: "USDT".to_string(),
        kind: MarketKind::Swap,
        active: true,
        expiry: None,
    }
}

/// 由收盘价序列构造 K 线，开高低均取收盘价。
pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .zip(0i64..)
        .map(|(&close, i)| Candle {
            time: DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::hours(i),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        })
        .collect()
}

/// # Summary
/// 可编排的内存行情客户端。
///
/// # Invariants
/// - `fail_next` 编排的错误按调用顺序逐个弹出，弹空后恢复正常应答。
pub struct FakeMarketClient {
    exchange: ExchangeId,
    markets: Vec<MarketInfo>,
    catalog_error: Option<String>,
    candles: HashMap<(String, TimeFrame), Vec<Candle>>,
    prices: HashMap<String, f64>,
    failures: Mutex<HashMap<String, VecDeque<MarketError>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeMarketClient {
    pub fn new(exchange: ExchangeId) -> Self {
        Self {
            exchange,
            markets: Vec::new(),
            catalog_error: None,
            candles: HashMap::new(),
            prices: HashMap::new(),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_market(mut self, market: MarketInfo) -> Self {
        self.markets.push(market);
        self
    }

    pub fn with_candles(mut self, symbol: &str, timeframe: TimeFrame, candles: Vec<Candle>) -> Self {
        self.candles.insert((symbol.to_string(), timeframe), candles);
        self
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    /// 让 `load_markets` 以网络错误失败。
    pub fn fail_catalog(mut self, message: &str) -> Self {
        self.catalog_error = Some(message.to_string());
        self
    }

    /// 为指定规范标识 (目录加载用 `"*catalog"`) 编排下一次调用的错误。
    pub fn fail_next(self, symbol: &str, error: MarketError) -> Self {
        guard(&self.failures)
            .entry(symbol.to_string())
            .or_default()
            .push_back(error);
        self
    }

    /// 已发生的调用记录，格式为 `操作:标识[:周期]`。
    pub fn calls(&self) -> Vec<String> {
        guard(&self.calls).clone()
    }

    fn record(&self, call: String) {
        guard(&self.calls).push(call);
    }

    fn take_failure(&self, key: &str) -> Option<MarketError> {
        guard(&self.failures)
            .get_mut(key)
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl MarketDataClient for FakeMarketClient {
    fn exchange(&self) -> ExchangeId {
        self.exchange
    }

    async fn load_markets(&self) -> Result<MarketCatalog, MarketError> {
        self.record("markets".to_string());
        if let Some(err) = self.take_failure("*catalog") {
            return Err(err);
        }
        if let Some(message) = &self.catalog_error {
            return Err(MarketError::Network(message.clone()));
        }
        Ok(MarketCatalog::new(self.markets.clone()))
    }

    async fn fetch_candles(
        &self,
        market: &MarketInfo,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        self.record(format!("candles:{}:{}", market.symbol, timeframe));
        if let Some(err) = self.take_failure(&market.symbol) {
            return Err(err);
        }
        let series = self
            .candles
            .get(&(market.symbol.clone(), timeframe))
            .cloned()
            .unwrap_or_default();
        let skip = series.len().saturating_sub(limit);
        Ok(series.into_iter().skip(skip).collect())
    }

    async fn fetch_last_price(&self, market: &MarketInfo) -> Result<f64, MarketError> {
        self.record(format!("price:{}", market.symbol));
        if let Some(err) = self.take_failure(&market.symbol) {
            return Err(err);
        }
        self.prices
            .get(&market.symbol)
            .copied()
            .ok_or(MarketError::NotFound)
    }
}

/// 记录所有投递文本的通知器，可设置为始终失败。
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    fail: bool,
    max_len: Option<usize>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    /// 所有尝试投递的文本 (包括失败的)。
    pub fn messages(&self) -> Vec<String> {
        guard(&self.messages).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
        guard(&self.messages).push(text.to_string());
        if self.fail {
            return Err(NotifyError::Network("recording notifier set to fail".to_string()));
        }
        Ok(())
    }

    fn max_message_len(&self) -> Option<usize> {
        self.max_len
    }
}

/// 内存自选列表。
#[derive(Default)]
pub struct MemWatchlistStore {
    tickers: Mutex<Vec<String>>,
    corrupted: bool,
}

impl MemWatchlistStore {
    pub fn new(tickers: &[&str]) -> Self {
        Self {
            tickers: Mutex::new(tickers.iter().map(|t| t.to_string()).collect()),
            corrupted: false,
        }
    }

    /// 模拟损坏的文档，`load` 始终失败。
    pub fn corrupted() -> Self {
        Self {
            tickers: Mutex::new(Vec::new()),
            corrupted: true,
        }
    }
}

#[async_trait]
impl WatchlistStore for MemWatchlistStore {
    async fn load(&self) -> Result<Vec<String>, StoreError> {
        if self.corrupted {
            return Err(StoreError::Corrupted("watchlist".to_string()));
        }
        Ok(guard(&self.tickers).clone())
    }

    async fn add(&self, ticker: &str) -> Result<bool, StoreError> {
        let ticker = ticker.trim().to_uppercase();
        let mut tickers = guard(&self.tickers);
        if tickers.iter().any(|t| t.eq_ignore_ascii_case(&ticker)) {
            return Ok(false);
        }
        tickers.push(ticker);
        Ok(true)
    }

    async fn remove(&self, ticker: &str) -> Result<bool, StoreError> {
        let ticker = ticker.trim();
        let mut tickers = guard(&self.tickers);
        let before = tickers.len();
        tickers.retain(|t| !t.eq_ignore_ascii_case(ticker));
        Ok(tickers.len() != before)
    }
}

/// 内存价格快照存储，记录保存次数，可设置为保存失败。
#[derive(Default)]
pub struct MemPriceStore {
    snapshot: Mutex<Option<PriceSnapshot>>,
    saves: Mutex<usize>,
    fail_save: bool,
}

impl MemPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: PriceSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// `save` 始终返回 I/O 错误，已有快照保持不变。
    pub fn failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }

    pub fn stored(&self) -> Option<PriceSnapshot> {
        guard(&self.snapshot).clone()
    }

    pub fn save_count(&self) -> usize {
        *guard(&self.saves)
    }
}

#[async_trait]
impl PriceStateStore for MemPriceStore {
    async fn load(&self) -> Result<PriceSnapshot, StoreError> {
        Ok(guard(&self.snapshot)
            .clone()
            .unwrap_or_else(|| PriceSnapshot::empty(DateTime::<Utc>::UNIX_EPOCH)))
    }

    async fn save(&self, snapshot: &PriceSnapshot) -> Result<(), StoreError> {
        if self.fail_save {
            return Err(StoreError::Io("disk full".to_string()));
        }
        *guard(&self.snapshot) = Some(snapshot.clone());
        *guard(&self.saves) += 1;
        Ok(())
    }
}
