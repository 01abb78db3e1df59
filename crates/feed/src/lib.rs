//! 交易所 REST 行情适配器，实现 `MarketDataClient`。

pub mod binance;
pub mod gate;
pub mod http;
pub mod okx;

use candlewatch_core::common::ExchangeId;
use candlewatch_core::market::error::MarketError;
use candlewatch_core::market::port::MarketDataClient;
use std::sync::Arc;
use tracing::debug;

/// # Summary
/// 安装进程级 rustls 加密后端 (ring)。
///
/// # Logic
/// 1. reqwest 以 `rustls-no-provider` 构建，必须在创建任何 HTTP 客户端前安装后端。
/// 2. 重复安装视为无操作。
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// # Summary
/// 按交易所标识构造对应的行情客户端。
///
/// # Returns
/// 成功返回可注入的客户端，HTTP 客户端构建失败返回 `MarketError`。
pub fn client_for(id: ExchangeId) -> Result<Arc<dyn MarketDataClient>, MarketError> {
    Ok(match id {
        ExchangeId::Binance => Arc::new(binance::BinanceFuturesClient::new()?),
        ExchangeId::Okx => Arc::new(okx::OkxSwapClient::new()?),
        ExchangeId::Gate => Arc::new(gate::GateFuturesClient::new()?),
    })
}
