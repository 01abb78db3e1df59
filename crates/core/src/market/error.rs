use thiserror::Error;

/// # Summary
/// 市场数据域错误枚举，处理网络、限流、解析及标的缺失等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 只有 `RateLimited` 是可重试的。
#[derive(Error, Debug)]
pub enum MarketError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 数据解析错误，如 JSON 格式不匹配
    #[error("Parse error: {0}")]
    Parse(String),
    // 交易所限流 (HTTP 429 或等价错误码)
    #[error("Rate limited: {0}")]
    RateLimited(String),
    // 代码无法在目录中解析为可交易的永续合约
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),
    // 市场目录加载失败，整个周期无法进行
    #[error("Markets unavailable: {0}")]
    MarketsUnavailable(String),
    // 请求的数据未找到 (404 或内容为空)
    #[error("Data not found")]
    NotFound,
    // 未知或未分类的错误
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl MarketError {
    /// 是否属于可退避重试的错误。
    pub fn is_retryable(&self) -> bool {
        matches!(self, MarketError::RateLimited(_))
    }
}
