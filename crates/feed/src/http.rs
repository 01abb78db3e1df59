use candlewatch_core::market::error::MarketError;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// 交易所特定错误码的映射钩子：返回 Some 时覆盖默认的状态码映射。
pub type ErrorClassifier = fn(StatusCode, &str) -> Option<MarketError>;

/// # Summary
/// 构建各适配器共用的 HTTP 客户端。
///
/// # Logic
/// 1. 配置 10 秒超时。
/// 2. 设置固定的 User-Agent。
///
/// # Returns
/// 成功返回 reqwest 客户端，失败返回 `MarketError::Unknown`。
pub fn build_client() -> Result<Client, MarketError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("candlewatch/", env!("CARGO_PKG_VERSION"))),
    );

    Client::builder()
        .timeout(Duration::from_secs(10))
        .default_headers(headers)
        .build()
        .map_err(|e| MarketError::Unknown(format!("Failed to build HTTP client: {}", e)))
}

/// # Summary
/// 发送请求并把响应体解析为 JSON。
///
/// # Logic
/// 1. 传输失败映射为 `Network`。
/// 2. 非成功状态先交给交易所钩子分类，其次 429/418 为 `RateLimited`，404 为 `NotFound`。
/// 3. 其余失败状态映射为 `Network`，附带响应体。
/// 4. 解析失败映射为 `Parse`。
///
/// # Arguments
/// * `request`: 已构建好的请求。
/// * `classify`: 交易所特定错误码钩子。
pub async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    classify: ErrorClassifier,
) -> Result<T, MarketError> {
    let resp = request
        .send()
        .await
        .map_err(|e| MarketError::Network(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        debug!(status = %status, body = %body, "Exchange request failed");
        if let Some(err) = classify(status, &body) {
            return Err(err);
        }
        return Err(match status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::IM_A_TEAPOT => {
                MarketError::RateLimited(format!("HTTP {}", status))
            }
            StatusCode::NOT_FOUND => MarketError::NotFound,
            _ => MarketError::Network(format!("HTTP {}: {}", status, body)),
        });
    }

    resp.json::<T>()
        .await
        .map_err(|e| MarketError::Parse(e.to_string()))
}

/// 解析交易所以字符串形式下发的价格字段，NaN 与无穷大视为解析失败。
pub fn parse_price(raw: &str, field: &str) -> Result<f64, MarketError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|e| MarketError::Parse(format!("{} = {:?}: {}", field, raw, e)))?;
    if !value.is_finite() {
        return Err(MarketError::Parse(format!("{} = {:?}: not a finite number", field, raw)));
    }
    Ok(value)
}
