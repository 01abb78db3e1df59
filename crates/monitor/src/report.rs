use candlewatch_core::alert::entity::AlertEvent;
use candlewatch_core::common::ExchangeId;
use chrono::{DateTime, Utc};
use std::fmt;

/// 本周期被跳过的标的及原因。
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub ticker: String,
    pub reason: String,
}

/// # Summary
/// 一次监控周期的执行摘要，供二进制记录日志与决定退出码。
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub exchange: ExchangeId,
    pub started_at: DateTime<Utc>,
    // 目录中的活跃 USDT 永续合约数量
    pub catalog_size: usize,
    // 自选列表条目数
    pub watched: usize,
    // 成功评估的规范标识，按处理顺序
    pub evaluated: Vec<String>,
    pub skipped: Vec<SkippedSymbol>,
    // 去重后实际投递的告警
    pub alerts: Vec<AlertEvent>,
    // 投递失败的消息片段数
    pub delivery_failures: usize,
    pub watchlist_error: Option<String>,
    pub snapshot_saved: bool,
    pub snapshot_error: Option<String>,
}

impl CycleReport {
    pub fn new(exchange: ExchangeId, started_at: DateTime<Utc>) -> Self {
        Self {
            exchange,
            started_at,
            catalog_size: 0,
            watched: 0,
            evaluated: Vec::new(),
            skipped: Vec::new(),
            alerts: Vec::new(),
            delivery_failures: 0,
            watchlist_error: None,
            snapshot_saved: false,
            snapshot_error: None,
        }
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} symbols evaluated, {} skipped, {} alerts, {} delivery failures, snapshot {}",
            self.exchange,
            self.evaluated.len(),
            self.watched,
            self.skipped.len(),
            self.alerts.len(),
            self.delivery_failures,
            if self.snapshot_saved { "saved" } else { "not saved" }
        )
    }
}

/// # Summary
/// 按行切分长文本，使每片不超过 `max_len` 个字符。
///
/// # Logic
/// 1. 逐行累积，加入下一行会超限时先输出当前片段。
/// 2. 单行本身超限时按字符硬切。
/// 3. `max_len == 0` 视为不限制。
///
/// # Returns
/// 非空文本至少返回一片；空文本返回空列表。
pub fn chunk_lines(text: &str, max_len: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if max_len == 0 || text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.lines() {
        let line_len = line.chars().count();

        if line_len > max_len {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = line.chars().collect();
            chunks.extend(chars.chunks(max_len).map(|piece| piece.iter().collect::<String>()));
            continue;
        }

        let needed = if current.is_empty() { line_len } else { line_len + 1 };
        if current_len + needed > max_len {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        assert_eq!(chunk_lines("hello", 4096), vec!["hello".to_string()]);
        assert!(chunk_lines("", 10).is_empty());
        assert_eq!(chunk_lines("a\nb", 0).len(), 1);
    }

    #[test]
    fn test_chunks_break_at_lines() {
        let text = "AAAA\nBBBB\nCCCC";
        let chunks = chunk_lines(text, 9);
        assert_eq!(chunks, vec!["AAAA\nBBBB".to_string(), "CCCC".to_string()]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 9));
    }

    #[test]
    fn test_overlong_line_is_hard_split() {
        let chunks = chunk_lines("AB\nCDEFGHIJ\nK", 4);
        assert_eq!(chunks, vec!["AB", "CDEF", "GHIJ", "K"]);
    }

    #[test]
    fn test_many_symbols_fit_telegram_limit() {
        let text = (0..2000)
            .map(|i| format!("SYM{}/USDT", i))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunk_lines(&text, 4096);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4096));
        assert_eq!(chunks.join("\n"), text);
    }
}
