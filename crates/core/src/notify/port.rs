use crate::notify::error::NotifyError;
use async_trait::async_trait;

/// # Summary
/// 向外部系统投递文本通知的接口定义。
///
/// # Invariants
/// - 实现必须是 `Send` 和 `Sync` 以支持注入监控周期。
/// - 实现不负责分片，超出平台长度上限的文本由调用方按行切分后再投递。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Summary
    /// 投递一条纯文本通知。
    ///
    /// # Logic
    /// 1. 根据目标平台要求封装消息。
    /// 2. 通过底层传输协议发送消息。
    ///
    /// # Arguments
    /// * `text` - 通知正文。
    ///
    /// # Returns
    /// * 成功返回 `Ok(())`。
    /// * 失败返回 `Err(NotifyError)`，调用方只记录日志，不重试。
    async fn deliver(&self, text: &str) -> Result<(), NotifyError>;

    /// 单条消息允许的最大字符数，None 表示无限制。
    fn max_message_len(&self) -> Option<usize> {
        None
    }
}
