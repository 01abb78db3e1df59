use crate::file::{read_optional, write_atomic};
use async_trait::async_trait;
use candlewatch_core::store::error::StoreError;
use candlewatch_core::store::port::{PriceSnapshot, PriceStateStore};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// PriceStateStore 的 JSON 文件实现。
///
/// # Summary
/// 文档格式为 `{"captured_at": ..., "prices": {"ETH/USDT": 3000.5}}`。
///
/// # Invariants
/// * 缺失或损坏的文档视为空快照，不中断监控周期。
pub struct JsonPriceStateStore {
    path: PathBuf,
}

impl JsonPriceStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn empty_snapshot() -> PriceSnapshot {
    PriceSnapshot::empty(DateTime::<Utc>::UNIX_EPOCH)
}

#[async_trait]
impl PriceStateStore for JsonPriceStateStore {
    async fn load(&self) -> Result<PriceSnapshot, StoreError> {
        let Some(content) = read_optional(&self.path).await? else {
            debug!(path = %self.path.display(), "No previous price snapshot");
            return Ok(empty_snapshot());
        };

        match serde_json::from_slice::<PriceSnapshot>(&content) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Price snapshot is malformed, starting from empty"
                );
                Ok(empty_snapshot())
            }
        }
    }

    async fn save(&self, snapshot: &PriceSnapshot) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        write_atomic(&self.path, &body).await?;
        debug!(path = %self.path.display(), symbols = snapshot.len(), "Price snapshot saved");
        Ok(())
    }
}
