use candlewatch_core::config::{AppConfig, ConfigError};
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

const ENV_PREFIX: &str = "CANDLEWATCH";

/// # Summary
/// 分层加载应用配置。
///
/// # Logic
/// 1. 以 `AppConfig::default()` 作为最底层。
/// 2. 叠加 TOML 配置文件 (不存在时跳过)。
/// 3. 叠加 `CANDLEWATCH__SECTION__KEY` 形式的环境变量。
/// 4. `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID` 覆盖 Telegram 凭据。
/// 5. 校验最终配置。
///
/// # Arguments
/// * `path` - 配置文件路径。
///
/// # Returns
/// 校验通过的配置，任何一步失败返回 `ConfigError`。
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let defaults = Config::try_from(&AppConfig::default())
        .map_err(|e| ConfigError::Load(format!("defaults: {}", e)))?;

    let mut builder = Config::builder().add_source(defaults);
    if Path::new(path).exists() {
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    }

    let mut config: AppConfig = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?
        .try_deserialize()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

    apply_telegram_env(&mut config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// 空字符串视为未设置。
fn apply_telegram_env(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    if let Some(token) = non_empty("TELEGRAM_BOT_TOKEN") {
        config.notify.telegram.bot_token = Some(token);
    }
    if let Some(chat_id) = non_empty("TELEGRAM_CHAT_ID") {
        config.notify.telegram.chat_id = Some(chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlewatch_core::common::ExchangeId;
    use candlewatch_core::config::{CatalogReport, DropMode, NotifyChannel};
    use std::io::Write;

    #[test]
    fn test_toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[exchange]
id = "okx"

[monitor]
drop_mode = "ticker"
catalog_report = "count"
inter_symbol_delay_ms = 250

[storage]
data_dir = "/var/lib/candlewatch"

[notify]
channel = "log"
"#
        )
        .unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.exchange.id, ExchangeId::Okx);
        assert_eq!(config.monitor.drop_mode, DropMode::Ticker);
        assert_eq!(config.monitor.catalog_report, CatalogReport::Count);
        assert_eq!(config.monitor.inter_symbol_delay_ms, 250);
        // 未出现在文件中的字段保持默认值
        assert_eq!(config.monitor.retry.max_attempts, 3);
        assert_eq!(config.storage.watchlist_file, "watchlist.json");
        assert_eq!(config.notify.channel, NotifyChannel::Log);
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[monitor]\ndrop_threshold_pct = 2.0\n[notify]\nchannel = \"log\"").unwrap();

        assert!(matches!(
            load_config(file.path().to_str().unwrap()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_notify_credentials_do_not_block_loading() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[exchange]\nid = \"gate\"\n[notify]\nchannel = \"email\"").unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.exchange.id, ExchangeId::Gate);
        assert!(matches!(config.validate_notify(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_telegram_env_overrides() {
        let mut config = AppConfig::default();
        apply_telegram_env(&mut config, |key| match key {
            "TELEGRAM_BOT_TOKEN" => Some("123:abc".to_string()),
            "TELEGRAM_CHAT_ID" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.notify.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.notify.telegram.chat_id, None);
    }
}
