//! 交易所描述符、代码规范化与限流重试。

pub mod exchange;
pub mod normalizer;
pub mod retry;

pub use exchange::{ExchangeDescriptor, SymbolFormat};
pub use normalizer::SymbolNormalizer;
pub use retry::RetryPolicy;
