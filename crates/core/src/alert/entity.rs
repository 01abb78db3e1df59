use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// # Summary
/// 告警种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    // 跌幅达到阈值 (K 线模式或差值模式)
    Drop,
    // 30 分钟 K 线突破前一根阴线高点
    Breakout,
}

/// # Summary
/// 单次周期内产生的瞬时告警事件，投递后即丢弃，永不持久化。
///
/// # Invariants
/// - 同一周期内 `(kind, symbol)` 组合最多投递一次。
/// - `value` 对跌幅类告警为跌幅绝对值 (百分比)，对突破告警为突破价位。
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub kind: AlertKind,
    // 规范标识
    pub symbol: String,
    // 跌幅或突破价位
    pub value: f64,
    // 当前价格
    pub price: f64,
    // 差值模式下的上一周期价格
    pub previous_price: Option<f64>,
    // 事件产生时间
    pub at: DateTime<Utc>,
}

impl AlertEvent {
    /// 去重键。
    pub fn dedup_key(&self) -> (AlertKind, String) {
        (self.kind, self.symbol.clone())
    }
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AlertKind::Drop => match self.previous_price {
                // 差值模式：与上一周期快照价格比较
                Some(prev) => write!(
                    f,
                    "{} price dropped by {:.2}% since last check ({} -> {})",
                    self.symbol, self.value, prev, self.price
                ),
                None => write!(
                    f,
                    "{} 1h candle dropped by {:.2}% (price {})",
                    self.symbol, self.value, self.price
                ),
            },
            AlertKind::Breakout => write!(
                f,
                "{} 30m candle broke above previous bearish candle high ({}) (price {})",
                self.symbol, self.value, self.price
            ),
        }
    }
}
