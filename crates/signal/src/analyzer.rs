use candlewatch_core::market::entity::Candle;
use tracing::warn;

/// 默认跌幅阈值 (百分比，含边界)。
pub const DEFAULT_DROP_THRESHOLD_PCT: f64 = -1.0;

// 浮点误差容忍度，3.00 -> 2.97 的计算结果为 -0.99999999999999
const THRESHOLD_EPSILON: f64 = 1e-9;

/// # Summary
/// 跌幅信号。
///
/// # Invariants
/// - `change_pct` 小于或等于分析器阈值，恒为负数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropSignal {
    // 涨跌幅百分比 (负数)
    pub change_pct: f64,
    // 当前价格
    pub price: f64,
}

impl DropSignal {
    /// 报告用的跌幅绝对值。
    pub fn magnitude(&self) -> f64 {
        self.change_pct.abs()
    }
}

/// # Summary
/// 阴线高点突破信号。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakoutSignal {
    // 被突破的前一根阴线最高价
    pub level: f64,
    // 当前 K 线收盘价
    pub price: f64,
}

/// # Summary
/// 无状态的 K 线分析器，每个周期对每个标的评估一次。
///
/// # Invariants
/// - 序列最后一根视为当前周期，倒数第二根视为最近一根已收盘 K 线。
/// - 少于两根 K 线不是错误，只是不产生信号。
#[derive(Debug, Clone, Copy)]
pub struct CandleAnalyzer {
    drop_threshold_pct: f64,
}

impl Default for CandleAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_DROP_THRESHOLD_PCT)
    }
}

impl CandleAnalyzer {
    pub fn new(drop_threshold_pct: f64) -> Self {
        Self { drop_threshold_pct }
    }

    /// # Summary
    /// 评估 1 小时 K 线跌幅信号。
    ///
    /// # Logic
    /// 1. 取最后两根 K 线，不足两根返回 None。
    /// 2. `change = (close[-1] - close[-2]) / close[-2] * 100`。
    /// 3. `change <= 阈值` 时触发。
    ///
    /// # Arguments
    /// * `candles`: 升序 K 线序列。
    ///
    /// # Returns
    /// 触发返回 `DropSignal`。`close[-2]` 非正属于数据异常，记录日志后返回 None。
    pub fn evaluate_drop(&self, candles: &[Candle]) -> Option<DropSignal> {
        let (prev, cur) = trailing_pair(candles)?;
        self.evaluate_price_change(prev.close, cur.close)
    }

    /// # Summary
    /// 差值模式：比较最新成交价与上一周期快照价格，阈值语义与 `evaluate_drop` 相同。
    ///
    /// # Arguments
    /// * `previous`: 上一周期快照中的价格。
    /// * `current`: 本周期最新成交价。
    pub fn evaluate_price_change(&self, previous: f64, current: f64) -> Option<DropSignal> {
        let change_pct = change_pct(previous, current)?;
        (change_pct <= self.drop_threshold_pct + THRESHOLD_EPSILON).then_some(DropSignal {
            change_pct,
            price: current,
        })
    }

    /// # Summary
    /// 评估 30 分钟 K 线的阴线高点突破信号。
    ///
    /// # Logic
    /// 1. 取 `prev = [-2]`, `cur = [-1]`，不足两根返回 None。
    /// 2. `prev` 必须为阴线 (`close < open`)。
    /// 3. `cur.close` 必须严格大于 `prev.high`，相等不触发。
    ///
    /// # Returns
    /// 触发返回 `BreakoutSignal`，价位为 `prev.high`。
    pub fn evaluate_breakout(&self, candles: &[Candle]) -> Option<BreakoutSignal> {
        let (prev, cur) = trailing_pair(candles)?;
        let bearish = prev.close < prev.open;
        (bearish && cur.close > prev.high).then_some(BreakoutSignal {
            level: prev.high,
            price: cur.close,
        })
    }
}

fn trailing_pair(candles: &[Candle]) -> Option<(&Candle, &Candle)> {
    match candles {
        [.., prev, cur] => Some((prev, cur)),
        _ => None,
    }
}

fn change_pct(previous: f64, current: f64) -> Option<f64> {
    if !previous.is_finite() || !current.is_finite() || previous <= 0.0 {
        warn!(previous, current, "Skipping drop evaluation on anomalous price data");
        return None;
    }
    Some((current - previous) / previous * 100.0)
}
