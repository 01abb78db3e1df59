use crate::common::{ExchangeId, TimeFrame};
use crate::market::entity::{Candle, MarketCatalog, MarketInfo};
use crate::market::error::MarketError;
use async_trait::async_trait;

/// # Summary
/// 交易所行情数据客户端接口（外部协作方）。
///
/// # Invariants
/// - 实现者必须是 `Send + Sync`，以 `Arc<dyn MarketDataClient>` 注入监控周期。
/// - 限流必须映射为 `MarketError::RateLimited`，由调用方负责退避重试。
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// 该客户端对应的交易所。
    fn exchange(&self) -> ExchangeId;

    /// # Summary
    /// 加载交易所的完整市场目录。
    ///
    /// # Logic
    /// 1. 请求交易所的合约列表接口。
    /// 2. 将原生条目映射为统一的 `MarketInfo`。
    ///
    /// # Returns
    /// 成功返回市场目录，失败返回 MarketError。
    async fn load_markets(&self) -> Result<MarketCatalog, MarketError>;

    /// # Summary
    /// 获取指定市场最近的 K 线序列。
    ///
    /// # Logic
    /// 1. 映射 TimeFrame 为交易所识别的 interval。
    /// 2. 请求最近 `limit` 根 K 线。
    /// 3. 按开盘时间升序返回。
    ///
    /// # Arguments
    /// * `market`: 已解析的市场条目。
    /// * `timeframe`: K 线周期。
    /// * `limit`: 请求的数量上限，返回数量可能更少。
    ///
    /// # Returns
    /// 成功返回升序 K 线列表。
    async fn fetch_candles(
        &self,
        market: &MarketInfo,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError>;

    /// # Summary
    /// 获取指定市场的最新成交价。
    ///
    /// # Arguments
    /// * `market`: 已解析的市场条目。
    ///
    /// # Returns
    /// 成功返回最新成交价。
    async fn fetch_last_price(&self, market: &MarketInfo) -> Result<f64, MarketError>;
}
