use candlewatch_core::config::RetryConfig;
use candlewatch_core::market::error::MarketError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// # Summary
/// 限流退避策略：仅对 `MarketError::RateLimited` 做有界的指数退避重试。
///
/// # Invariants
/// - `max_attempts` 至少为 1 (含首次调用)。
/// - 第 n 次重试前等待 `base_delay * 2^(n-1)`，不超过 `max_delay`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// 第 `retry` 次重试 (从 1 开始) 之前的等待时长。
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32
            .checked_pow(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// # Summary
    /// 执行操作，遇到限流时退避后重试。
    ///
    /// # Logic
    /// 1. 调用 `op`，成功立即返回。
    /// 2. 限流错误且尚有剩余次数时，等待退避时长后重试。
    /// 3. 其他错误或次数耗尽时返回最后一次的错误。
    ///
    /// # Arguments
    /// * `what`: 日志中标识该操作的描述。
    /// * `op`: 每次重试都会重新调用的操作工厂。
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, MarketError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MarketError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation = what,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Rate limited, backing off: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[test]
    fn test_zero_attempts_config_still_calls_once() {
        let config = RetryConfig {
            max_attempts: 0,
            base_delay_ms: 1,
            max_delay_ms: 1,
        };
        assert_eq!(RetryPolicy::from(&config).max_attempts, 1);
    }
}
