use serde::{Deserialize, Serialize};

pub mod time;

/// # Summary
/// K 线时间周期枚举，定义监控所需的时间跨度。
///
/// # Invariants
/// - 各交易所适配器负责把该枚举映射为自身的 interval 字符串。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeFrame {
    // 30分钟
    Minute30,
    // 1小时
    Hour1,
}

impl std::fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeFrame::Minute30 => write!(f, "30m"),
            TimeFrame::Hour1 => write!(f, "1h"),
        }
    }
}

/// # Summary
/// 支持的交易所标识。
///
/// # Invariants
/// - 每个标识在 `candlewatch-market` 中对应唯一的交易所描述符。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    Binance,
    Okx,
    Gate,
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeId::Binance => write!(f, "Binance"),
            ExchangeId::Okx => write!(f, "OKX"),
            ExchangeId::Gate => write!(f, "Gate.io"),
        }
    }
}
