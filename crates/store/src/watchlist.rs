use crate::file::{read_optional, write_atomic};
use async_trait::async_trait;
use candlewatch_core::store::error::StoreError;
use candlewatch_core::store::port::WatchlistStore;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

/// WatchlistStore 的 JSON 文件实现。
///
/// # Summary
/// 文档为字符串数组 (例如: `["ETH", "BTC"]`)，按添加顺序保存。
///
/// # Invariants
/// * 写操作通过内部锁串行化，读-改-写之间不会互相覆盖。
/// * 每次写入都整体原子替换文档。
pub struct JsonWatchlistStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonWatchlistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Vec<String>, StoreError> {
        let Some(content) = read_optional(&self.path).await? else {
            return Ok(Vec::new());
        };
        if content.trim_ascii().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&content)
            .map_err(|e| StoreError::Corrupted(format!("{}: {}", self.path.display(), e)))
    }

    async fn write(&self, tickers: &[String]) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(tickers)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        write_atomic(&self.path, &body).await
    }
}

fn normalize(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

#[async_trait]
impl WatchlistStore for JsonWatchlistStore {
    async fn load(&self) -> Result<Vec<String>, StoreError> {
        self.read().await
    }

    async fn add(&self, ticker: &str) -> Result<bool, StoreError> {
        let ticker = normalize(ticker);
        if ticker.is_empty() {
            return Ok(false);
        }

        let _guard = self.write_lock.lock().await;
        let mut tickers = self.read().await?;
        if tickers.iter().any(|t| t.eq_ignore_ascii_case(&ticker)) {
            return Ok(false);
        }
        tickers.push(ticker.clone());
        self.write(&tickers).await?;
        info!(ticker = %ticker, "Added to watchlist");
        Ok(true)
    }

    async fn remove(&self, ticker: &str) -> Result<bool, StoreError> {
        let ticker = normalize(ticker);

        let _guard = self.write_lock.lock().await;
        let mut tickers = self.read().await?;
        let before = tickers.len();
        tickers.retain(|t| !t.eq_ignore_ascii_case(&ticker));
        if tickers.len() == before {
            return Ok(false);
        }
        self.write(&tickers).await?;
        info!(ticker = %ticker, "Removed from watchlist");
        Ok(true)
    }
}
