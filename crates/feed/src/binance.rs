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

const DEFAULT_BASE_URL: &str = "https://fapi.binance.com";

/// # Summary
/// Binance U 本位合约行情客户端。
///
/// # Invariants
/// - 永续合约的规范标识为 `BASE/QUOTE`，交割合约为 `BASE/QUOTE:MARGIN-YYMMDD`。
#[derive(Clone)]
pub struct BinanceFuturesClient {
    client: Client,
    base_url: String,
}

impl BinanceFuturesClient {
    pub fn new() -> Result<Self, MarketError> {
        Ok(Self {
            client: build_client()?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// 替换 REST 根地址 (例如测试网)。
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize, Debug)]
struct ExchangeInfo {
    symbols: Vec<BinanceSymbol>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BinanceSymbol {
    symbol: String,
    #[serde(default)]
    contract_type: String,
    #[serde(default)]
    delivery_date: i64,
    status: String,
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    margin_asset: String,
}

#[derive(Deserialize, Debug)]
struct PriceTicker {
    price: String,
}

fn interval(timeframe: TimeFrame) -> &'static str {
    match timeframe {
        TimeFrame::Minute30 => "30m",
        TimeFrame::Hour1 => "1h",
    }
}

/// -1121 Invalid symbol
fn classify(status: StatusCode, body: &str) -> Option<MarketError> {
    (status == StatusCode::BAD_REQUEST && body.contains("-1121"))
        .then(|| MarketError::SymbolNotFound(body.to_string()))
}

fn to_market(raw: BinanceSymbol) -> MarketInfo {
    let active = raw.status == "TRADING";
    if raw.contract_type == "PERPETUAL" {
        return MarketInfo {
            symbol: format!("{}/{}", raw.base_asset, raw.quote_asset),
            id: raw.symbol,
            base: raw.base_asset,
            quote: raw.quote_asset,
            kind: MarketKind::Swap,
            active,
            expiry: None,
        };
    }

    let expiry = DateTime::from_timestamp_millis(raw.delivery_date);
    let suffix = expiry
        .map(|t| t.format("%y%m%d").to_string())
        .unwrap_or_else(|| raw.contract_type.clone());
    let margin = if raw.margin_asset.is_empty() {
        raw.quote_asset.clone()
    } else {
        raw.margin_asset.clone()
    };
    MarketInfo {
        symbol: format!("{}/{}:{}-{}", raw.base_asset, raw.quote_asset, margin, suffix),
        id: raw.symbol,
        base: raw.base_asset,
        quote: raw.quote_asset,
        kind: MarketKind::Future,
        active,
        expiry,
    }
}

fn value_as_str<'a>(row: &'a [Value], index: usize, field: &str) -> Result<&'a str, MarketError> {
    row.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| MarketError::Parse(format!("kline field {} missing", field)))
}

/// K 线数组: [openTime, open, high, low, close, volume, closeTime, ...]
fn parse_kline(row: &[Value]) -> Result<Candle, MarketError> {
    let open_time = row
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| MarketError::Parse("kline open time missing".to_string()))?;
    Ok(Candle {
        time: DateTime::from_timestamp_millis(open_time)
            .ok_or_else(|| MarketError::Parse(format!("bad open time {}", open_time)))?,
        open: parse_price(value_as_str(row, 1, "open")?, "open")?,
        high: parse_price(value_as_str(row, 2, "high")?, "high")?,
        low: parse_price(value_as_str(row, 3, "low")?, "low")?,
        close: parse_price(value_as_str(row, 4, "close")?, "close")?,
        volume: parse_price(value_as_str(row, 5, "volume")?, "volume")?,
    })
}

#[async_trait]
impl MarketDataClient for BinanceFuturesClient {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Binance
    }

    async fn load_markets(&self) -> Result<MarketCatalog, MarketError> {
        let url = format!("{}/fapi/v1/exchangeInfo", self.base_url);
        let info: ExchangeInfo = send_json(self.client.get(&url), classify).await?;
        Ok(MarketCatalog::new(info.symbols.into_iter().map(to_market)))
    }

    async fn fetch_candles(
        &self,
        market: &MarketInfo,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let url = format!("{}/fapi/v1/klines", self.base_url);
        let limit = limit.to_string();
        let rows: Vec<Vec<Value>> = send_json(
            self.client.get(&url).query(&[
                ("symbol", market.id.as_str()),
                ("interval", interval(timeframe)),
                ("limit", limit.as_str()),
            ]),
            classify,
        )
        .await?;
        rows.iter().map(|row| parse_kline(row)).collect()
    }

    async fn fetch_last_price(&self, market: &MarketInfo) -> Result<f64, MarketError> {
        let url = format!("{}/fapi/v1/ticker/price", self.base_url);
        let ticker: PriceTicker = send_json(
            self.client.get(&url).query(&[("symbol", market.id.as_str())]),
            classify,
        )
        .await?;
        parse_price(&ticker.price, "price")
    }
}
