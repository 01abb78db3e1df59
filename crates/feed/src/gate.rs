use crate::http::{build_client, parse_price, send_json};
use async_trait::async_trait;
use candlewatch_core::common::{ExchangeId, TimeFrame};
use candlewatch_core::market::entity::{Candle, MarketCatalog, MarketInfo, MarketKind};
use candlewatch_core::market::error::MarketError;
use candlewatch_core::market::port::MarketDataClient;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://api.gateio.ws/api/v4";

/// Gate.io USDT 结算永续合约行情客户端。
#[derive(Clone)]
pub struct GateFuturesClient {
    client: Client,
    base_url: String,
}

impl GateFuturesClient {
    pub fn new() -> Result<Self, MarketError> {
        Ok(Self {
            client: build_client()?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize, Debug)]
struct Contract {
    name: String,
    #[serde(default)]
    in_delisting: bool,
}

/// Gate.io 的 K 线以对象形式下发，时间为秒，价格为字符串。
#[derive(Deserialize, Debug)]
struct GateCandle {
    t: i64,
    o: String,
    h: String,
    l: String,
    c: String,
    #[serde(default)]
    v: Value,
}

#[derive(Deserialize, Debug)]
struct Ticker {
    last: String,
}

fn interval(timeframe: TimeFrame) -> &'static str {
    match timeframe {
        TimeFrame::Minute30 => "30m",
        TimeFrame::Hour1 => "1h",
    }
}

fn classify(status: StatusCode, body: &str) -> Option<MarketError> {
    (status.is_client_error() && body.contains("CONTRACT_NOT_FOUND"))
        .then(|| MarketError::SymbolNotFound(body.to_string()))
}

fn to_market(raw: Contract) -> MarketInfo {
    let (base, quote) = raw
        .name
        .split_once('_')
        .map(|(b, q)| (b.to_string(), q.to_string()))
        .unwrap_or_else(|| (raw.name.clone(), "USDT".to_string()));
    MarketInfo {
        symbol: raw.name.clone(),
        id: raw.name,
        base,
        quote,
        kind: MarketKind::Swap,
        active: !raw.in_delisting,
        expiry: None,
    }
}

fn volume(raw: &Value) -> f64 {
    match raw {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.parse().unwrap_or_default(),
        _ => 0.0,
    }
}

fn to_candle(raw: GateCandle) -> Result<Candle, MarketError> {
    Ok(Candle {
        time: DateTime::from_timestamp(raw.t, 0)
            .ok_or_else(|| MarketError::Parse(format!("bad candle time {}", raw.t)))?,
        open: parse_price(&raw.o, "o")?,
        high: parse_price(&raw.h, "h")?,
        low: parse_price(&raw.l, "l")?,
        close: parse_price(&raw.c, "c")?,
        volume: volume(&raw.v),
    })
}

#[async_trait]
impl MarketDataClient for GateFuturesClient {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Gate
    }

    async fn load_markets(&self) -> Result<MarketCatalog, MarketError> {
        let url = format!("{}/futures/usdt/contracts", self.base_url);
        let contracts: Vec<Contract> = send_json(self.client.get(&url), classify).await?;
        Ok(MarketCatalog::new(contracts.into_iter().map(to_market)))
    }

    async fn fetch_candles(
        &self,
        market: &MarketInfo,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let url = format!("{}/futures/usdt/candlesticks", self.base_url);
        let limit = limit.to_string();
        let rows: Vec<GateCandle> = send_json(
            self.client.get(&url).query(&[
                ("contract", market.id.as_str()),
                ("interval", interval(timeframe)),
                ("limit", limit.as_str()),
            ]),
            classify,
        )
        .await?;
        rows.into_iter().map(to_candle).collect()
    }

    async fn fetch_last_price(&self, market: &MarketInfo) -> Result<f64, MarketError> {
        let url = format!("{}/futures/usdt/tickers", self.base_url);
        let tickers: Vec<Ticker> = send_json(
            self.client.get(&url).query(&[("contract", market.id.as_str())]),
            classify,
        )
        .await?;
        let ticker = tickers.into_iter().next().ok_or(MarketError::NotFound)?;
        parse_price(&ticker.last, "last")
    }
}
