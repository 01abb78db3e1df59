use crate::http::{build_client, parse_price, send_json};
use async_trait::async_trait;
use candlewatch_core::common::{ExchangeId, TimeFrame};
use candlewatch_core::market::entity::{Candle, MarketCatalog, MarketInfo, MarketKind};
use candlewatch_core::market::error::MarketError;
use candlewatch_core::market::port::MarketDataClient;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://www.okx.com";

/// # Summary
/// OKX 永续合约行情客户端。
///
/// # Invariants
/// - 规范标识直接沿用 OKX 的 instId (例如: ETH-USDT-SWAP)。
/// - OKX K 线按时间倒序下发，返回前统一反转为升序。
#[derive(Clone)]
pub struct OkxSwapClient {
    client: Client,
    base_url: String,
}

impl OkxSwapClient {
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

/// OKX 统一响应信封，`code == "0"` 表示成功。
#[derive(Deserialize, Debug)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Instrument {
    inst_id: String,
    #[serde(default)]
    uly: String,
    #[serde(default)]
    settle_ccy: String,
    state: String,
    #[serde(default)]
    exp_time: String,
}

#[derive(Deserialize, Debug)]
struct Ticker {
    last: String,
}

fn bar(timeframe: TimeFrame) -> &'static str {
    match timeframe {
        TimeFrame::Minute30 => "30m",
        TimeFrame::Hour1 => "1H",
    }
}

fn classify(status: StatusCode, body: &str) -> Option<MarketError> {
    (status == StatusCode::TOO_MANY_REQUESTS || body.contains("\"50011\""))
        .then(|| MarketError::RateLimited(body.to_string()))
}

/// 50011 限流，51001 合约不存在。
fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<Vec<T>, MarketError> {
    match envelope.code.as_str() {
        "0" => Ok(envelope.data),
        "50011" => Err(MarketError::RateLimited(envelope.msg)),
        "51001" => Err(MarketError::SymbolNotFound(envelope.msg)),
        code => Err(MarketError::Unknown(format!("OKX {}: {}", code, envelope.msg))),
    }
}

fn to_market(raw: Instrument) -> MarketInfo {
    let mut parts = raw.uly.split('-');
    let base = parts.next().unwrap_or_default().to_string();
    let quote = parts
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| raw.settle_ccy.clone());
    let expiry = raw
        .exp_time
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis);
    MarketInfo {
        symbol: raw.inst_id.clone(),
        id: raw.inst_id,
        base,
        quote,
        kind: MarketKind::Swap,
        active: raw.state == "live",
        expiry,
    }
}

/// K 线数组: [ts, o, h, l, c, vol, volCcy, volCcyQuote, confirm]
fn parse_candle(row: &[String]) -> Result<Candle, MarketError> {
    let field = |index: usize, name: &str| {
        row.get(index)
            .ok_or_else(|| MarketError::Parse(format!("candle field {} missing", name)))
    };
    let ts = field(0, "ts")?
        .parse::<i64>()
        .map_err(|e| MarketError::Parse(format!("ts: {}", e)))?;
    Ok(Candle {
        time: DateTime::from_timestamp_millis(ts)
            .ok_or_else(|| MarketError::Parse(format!("bad ts {}", ts)))?,
        open: parse_price(field(1, "open")?, "open")?,
        high: parse_price(field(2, "high")?, "high")?,
        low: parse_price(field(3, "low")?, "low")?,
        close: parse_price(field(4, "close")?, "close")?,
        volume: parse_price(field(5, "volume")?, "volume")?,
    })
}

fn parse_candles(rows: Vec<Vec<String>>) -> Result<Vec<Candle>, MarketError> {
    let mut candles = rows
        .iter()
        .map(|row| parse_candle(row))
        .collect::<Result<Vec<_>, _>>()?;
    candles.sort_by_key(|c| c.time);
    Ok(candles)
}

#[async_trait]
impl MarketDataClient for OkxSwapClient {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Okx
    }

    async fn load_markets(&self) -> Result<MarketCatalog, MarketError> {
        let url = format!("{}/api/v5/public/instruments", self.base_url);
        let envelope: Envelope<Instrument> =
            send_json(self.client.get(&url).query(&[("instType", "SWAP")]), classify).await?;
        let instruments = unwrap_envelope(envelope)?;
        Ok(MarketCatalog::new(instruments.into_iter().map(to_market)))
    }

    async fn fetch_candles(
        &self,
        market: &MarketInfo,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let url = format!("{}/api/v5/market/candles", self.base_url);
        let limit = limit.to_string();
        let envelope: Envelope<Vec<String>> = send_json(
            self.client.get(&url).query(&[
                ("instId", market.id.as_str()),
                ("bar", bar(timeframe)),
                ("limit", limit.as_str()),
            ]),
            classify,
        )
        .await?;
        parse_candles(unwrap_envelope(envelope)?)
    }

    async fn fetch_last_price(&self, market: &MarketInfo) -> Result<f64, MarketError> {
        let url = format!("{}/api/v5/market/ticker", self.base_url);
        let envelope: Envelope<Ticker> = send_json(
            self.client.get(&url).query(&[("instId", market.id.as_str())]),
            classify,
        )
        .await?;
        let ticker = unwrap_envelope(envelope)?
            .into_iter()
            .next()
            .ok_or(MarketError::NotFound)?;
        parse_price(&ticker.last, "last")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_mapping() {
        let json = r#"{"code": "0", "msg": "", "data": [
            {"instId": "ETH-USDT-SWAP", "instType": "SWAP", "uly": "ETH-USDT",
             "settleCcy": "USDT", "state": "live", "expTime": ""},
            {"instId": "BTC-USD-SWAP", "instType": "SWAP", "uly": "BTC-USD",
             "settleCcy": "BTC", "state": "suspend", "expTime": ""}
        ]}"#;
        let envelope: Envelope<Instrument> = serde_json::from_str(json).unwrap();
        let catalog = MarketCatalog::new(unwrap_envelope(envelope).unwrap().into_iter().map(to_market));

        let eth = catalog.get("ETH-USDT-SWAP").unwrap();
        assert_eq!(eth.base, "ETH");
        assert_eq!(eth.quote, "USDT");
        assert!(eth.is_live(MarketKind::Swap));
        assert!(!catalog.get("BTC-USD-SWAP").unwrap().active);
    }

    #[test]
    fn test_candles_are_returned_ascending() {
        let json = r#"{"code": "0", "msg": "", "data": [
            ["1700003600000", "98", "99", "97", "98.5", "10", "0", "0", "0"],
            ["1700000000000", "100", "101", "97", "98", "12", "0", "0", "1"]
        ]}"#;
        let envelope: Envelope<Vec<String>> = serde_json::from_str(json).unwrap();
        let candles = parse_candles(unwrap_envelope(envelope).unwrap()).unwrap();
        assert_eq!(candles.len(), 2);
        assert!(candles[0].time < candles[1].time);
        assert_eq!(candles[0].close, 98.0);
        assert_eq!(candles[1].close, 98.5);
    }

    #[test]
    fn test_envelope_error_codes() {
        let limited: Envelope<Ticker> =
            serde_json::from_str(r#"{"code": "50011", "msg": "Too Many Requests"}"#).unwrap();
        assert!(matches!(unwrap_envelope(limited), Err(MarketError::RateLimited(_))));

        let missing: Envelope<Ticker> =
            serde_json::from_str(r#"{"code": "51001", "msg": "Instrument ID does not exist"}"#)
                .unwrap();
        assert!(matches!(unwrap_envelope(missing), Err(MarketError::SymbolNotFound(_))));
    }
}
