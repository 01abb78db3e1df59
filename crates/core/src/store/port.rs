use super::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// # Summary
/// 价格快照实体，记录每个规范标识在某一周期内最后观测到的价格。
///
/// # Invariants
/// - 每个周期新建一份，上一周期的快照只读。
/// - `prices` 的键为规范标识 (例如: ETH/USDT)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    // 快照采集时间
    pub captured_at: DateTime<Utc>,
    // 规范标识 -> 最新价格
    pub prices: BTreeMap<String, f64>,
}

impl PriceSnapshot {
    /// 创建一个指定时间的空快照。
    pub fn empty(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            prices: BTreeMap::new(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    pub fn record(&mut self, symbol: &str, price: f64) {
        self.prices.insert(symbol.to_string(), price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// # Summary
/// 自选列表存储接口，保存用户输入的原始代码。
///
/// # Invariants
/// - 代码在列表内大小写不敏感地唯一，唯一性在写入时保证。
/// - 监控周期只读取列表，从不修改。
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// # Summary
    /// 读取有序的自选代码列表。
    ///
    /// # Logic
    /// 1. 读取持久化文档。
    /// 2. 文档不存在时返回空列表。
    ///
    /// # Returns
    /// 返回代码列表，文档损坏时返回 `StoreError`。
    async fn load(&self) -> Result<Vec<String>, StoreError>;

    /// # Summary
    /// 将代码追加到自选列表。
    ///
    /// # Logic
    /// 1. 统一为大写并去除首尾空白。
    /// 2. 大小写不敏感地检查重复，重复时不写入。
    /// 3. 原子地替换持久化文档。
    ///
    /// # Arguments
    /// * `ticker`: 用户输入的代码。
    ///
    /// # Returns
    /// 新增返回 `true`，已存在返回 `false`。
    async fn add(&self, ticker: &str) -> Result<bool, StoreError>;

    /// # Summary
    /// 从自选列表移除代码（大小写不敏感）。
    ///
    /// # Returns
    /// 移除返回 `true`，不存在返回 `false`。
    async fn remove(&self, ticker: &str) -> Result<bool, StoreError>;
}

/// # Summary
/// 价格状态存储接口，负责跨周期保存最后观测价格。
///
/// # Invariants
/// - `save` 必须原子替换旧快照，写入中途崩溃不得破坏上一份有效快照。
#[async_trait]
pub trait PriceStateStore: Send + Sync {
    /// # Summary
    /// 加载上一周期的快照。
    ///
    /// # Logic
    /// 1. 读取持久化文档并反序列化。
    /// 2. 文档缺失或格式错误时记录警告并返回空快照。
    ///
    /// # Returns
    /// 返回上一周期快照，仅在无法访问存储介质时返回 `StoreError`。
    async fn load(&self) -> Result<PriceSnapshot, StoreError>;

    /// # Summary
    /// 用新快照整体替换已存储的快照。
    ///
    /// # Arguments
    /// * `snapshot`: 本周期产生的新快照。
    ///
    /// # Returns
    /// 操作结果。
    async fn save(&self, snapshot: &PriceSnapshot) -> Result<(), StoreError>;
}
