use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// # Summary
/// 单根 K 线数据实体，记录特定时段内的行情波动。
///
/// # Invariants
/// - `high` 必须大于或等于 `low`, `open`, `close`。
/// - 序列按 `time` 升序排列，最后一根为尚未收盘的当前周期。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // K 线开始时间
    pub time: DateTime<Utc>,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价 (当前周期为最新成交价)
    pub close: f64,
    // 成交量
    pub volume: f64,
}

/// # Summary
/// 市场类型，对应交易所目录中的合约种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    // 现货
    Spot,
    // 永续合约
    Swap,
    // 交割合约
    Future,
}

/// # Summary
/// 交易所目录中的单个市场条目。
///
/// # Invariants
/// - `symbol` 是统一格式的规范标识，在同一目录内唯一。
/// - `id` 是交易所原生标识，仅供适配器发起请求时使用。
/// - 永续合约的 `expiry` 为 None。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInfo {
    // 规范标识 (例如: ETH/USDT, ETH-USDT-SWAP, ETH_USDT)
    pub symbol: String,
    // 交易所原生标识 (例如: ETHUSDT)
    pub id: String,
    // 基础资产
    pub base: String,
    // 计价资产
    pub quote: String,
    // 合约种类
    pub kind: MarketKind,
    // 是否处于可交易状态
    pub active: bool,
    // 交割时间，永续合约为 None
    pub expiry: Option<DateTime<Utc>>,
}

impl MarketInfo {
    /// 是否为指定种类、仍在交易且无交割日的合约。
    pub fn is_live(&self, kind: MarketKind) -> bool {
        self.kind == kind && self.active && self.expiry.is_none()
    }
}

/// # Summary
/// 交易所市场目录，按规范标识索引。
///
/// # Invariants
/// - 加载后只读，规范化过程不得修改目录。
#[derive(Debug, Clone, Default)]
pub struct MarketCatalog {
    markets: HashMap<String, MarketInfo>,
}

impl MarketCatalog {
    /// 由市场条目列表构建目录，重复的规范标识以后出现者为准。
    pub fn new(markets: impl IntoIterator<Item = MarketInfo>) -> Self {
        Self {
            markets: markets
                .into_iter()
                .map(|m| (m.symbol.clone(), m))
                .collect(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&MarketInfo> {
        self.markets.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// # Summary
    /// 列出指定计价资产与合约种类下仍在交易的合约，按规范标识排序。
    ///
    /// # Arguments
    /// * `quote`: 计价资产，例如 "USDT"。
    /// * `kind`: 监控的合约种类。
    ///
    /// # Returns
    /// 排序后的市场条目引用列表。
    pub fn live_markets(&self, quote: &str, kind: MarketKind) -> Vec<&MarketInfo> {
        let mut list: Vec<&MarketInfo> = self
            .markets
            .values()
            .filter(|m| m.is_live(kind) && m.quote.eq_ignore_ascii_case(quote))
            .collect();
        list.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(symbol: &str, kind: MarketKind, active: bool) -> MarketInfo {
        MarketInfo {
            symbol: symbol.to_string(),
            id: symbol.replace('/', ""),
            base: symbol.split('/').next().unwrap_or_default().to_string(),
            quote: "USDT".to_string(),
            kind,
            active,
            expiry: None,
        }
    }

    #[test]
    fn test_live_markets_filters_and_sorts() {
        let catalog = MarketCatalog::new(vec![
            market("SOL/USDT", MarketKind::Swap, true),
            market("BTC/USDT", MarketKind::Swap, true),
            market("XRP/USDT", MarketKind::Swap, false),
            market("ETH/USDT", MarketKind::Spot, true),
        ]);

        let live: Vec<&str> = catalog
            .live_markets("usdt", MarketKind::Swap)
            .iter()
            .map(|m| m.symbol.as_str())
            .collect();
        assert_eq!(live, vec!["BTC/USDT", "SOL/USDT"]);

        let spot: Vec<&str> = catalog
            .live_markets("USDT", MarketKind::Spot)
            .iter()
            .map(|m| m.symbol.as_str())
            .collect();
        assert_eq!(spot, vec!["ETH/USDT"]);
        assert_eq!(catalog.len(), 4);
    }
}
