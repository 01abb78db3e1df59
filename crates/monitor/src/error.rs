use candlewatch_core::common::ExchangeId;
use candlewatch_core::market::error::MarketError;
use thiserror::Error;

/// # Summary
/// 监控周期的致命错误。单个标的的失败在周期内部消化，不会出现在这里。
#[derive(Error, Debug)]
pub enum CycleError {
    /// 市场目录加载失败，本周期未做任何标的处理，也未写入快照
    #[error("Markets unavailable on {exchange}: {source}")]
    MarketsUnavailable {
        exchange: ExchangeId,
        #[source]
        source: MarketError,
    },
}
