//! 纯函数式的 K 线信号评估：1 小时跌幅与 30 分钟阴线高点突破。

pub mod analyzer;

pub use analyzer::{BreakoutSignal, CandleAnalyzer, DropSignal};
