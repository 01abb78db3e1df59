use crate::common::ExchangeId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// # Summary
/// 配置错误，在任何周期工作开始之前即为致命错误。
#[derive(Error, Debug)]
pub enum ConfigError {
    // 缺少必填项 (如 Telegram Token)
    #[error("Missing configuration: {0}")]
    Missing(String),
    // 配置值不合法
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    // 配置源加载失败
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub exchange: ExchangeConfig,
    pub monitor: MonitorConfig,
    pub storage: StorageConfig,
    pub notify: NotifyConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub id: ExchangeId,
}

/// 跌幅的度量方式，每个部署只能选择其一。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropMode {
    // 比较 1 小时 K 线的前后收盘价
    Candle,
    // 比较最新成交价与上一周期快照价格
    Ticker,
}

/// 目录加载后发送的汇总报告级别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogReport {
    Off,
    // 仅发送永续合约数量
    Count,
    // 数量加完整列表 (按行分片)
    Full,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub drop_mode: DropMode,
    // 跌幅阈值 (百分比，含边界)
    pub drop_threshold_pct: f64,
    // 相邻标的之间的协作式暂停
    pub inter_symbol_delay_ms: u64,
    pub retry: RetryConfig,
    pub catalog_report: CatalogReport,
    // 单个标的失败时是否发送低优先级告警
    pub notify_symbol_errors: bool,
    // 自选列表为空时是否通知
    pub notify_empty_watchlist: bool,
}

/// 限流重试策略
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub watchlist_file: String,
    pub snapshot_file: String,
}

impl StorageConfig {
    pub fn watchlist_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.watchlist_file)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.snapshot_file)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyChannel {
    Telegram,
    Email,
    // 仅写日志，用于演练
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub channel: NotifyChannel,
    pub telegram: TelegramConfig,
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub host: String,
    pub user: String,
    pub pass: String,
    pub from: String,
    pub to: String,
    #[serde(default = "default_email_subject")]
    pub subject: String,
}

fn default_email_subject() -> String {
    "candlewatch alert".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    // tracing EnvFilter 指令，RUST_LOG 优先
    pub filter: String,
    // 设置后额外写入按天滚动的日志文件
    pub dir: Option<String>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            id: ExchangeId::Binance,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            drop_mode: DropMode::Candle,
            drop_threshold_pct: -1.0,
            inter_symbol_delay_ms: 1000,
            retry: RetryConfig::default(),
            catalog_report: CatalogReport::Off,
            notify_symbol_errors: true,
            notify_empty_watchlist: false,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 8000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            watchlist_file: "watchlist.json".to_string(),
            snapshot_file: "price_state.json".to_string(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            channel: NotifyChannel::Telegram,
            telegram: TelegramConfig::default(),
            email: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            dir: None,
        }
    }
}

impl AppConfig {
    /// # Summary
    /// 校验所有命令共用的配置项。
    ///
    /// # Logic
    /// 1. 跌幅阈值必须为有限负数。
    /// 2. 重试次数至少为 1。
    ///
    /// # Returns
    /// 合法返回 Ok，否则返回 `ConfigError`。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.monitor.drop_threshold_pct;
        if !threshold.is_finite() || threshold >= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "monitor.drop_threshold_pct must be negative, got {}",
                threshold
            )));
        }
        if self.monitor.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "monitor.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// # Summary
    /// 校验所选通知渠道的凭据是否齐全，只有会发送通知的命令需要。
    ///
    /// # Returns
    /// 缺失凭据返回 `ConfigError::Missing`。
    pub fn validate_notify(&self) -> Result<(), ConfigError> {
        match self.notify.channel {
            NotifyChannel::Telegram => {
                let tg = &self.notify.telegram;
                if tg.bot_token.as_deref().is_none_or(str::is_empty) {
                    return Err(ConfigError::Missing("TELEGRAM_BOT_TOKEN".to_string()));
                }
                if tg.chat_id.as_deref().is_none_or(str::is_empty) {
                    return Err(ConfigError::Missing("TELEGRAM_CHAT_ID".to_string()));
                }
            }
            NotifyChannel::Email => {
                if self.notify.email.is_none() {
                    return Err(ConfigError::Missing("notify.email".to_string()));
                }
            }
            NotifyChannel::Log => {}
        }
        Ok(())
    }
}
