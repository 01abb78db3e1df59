use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理文件读写、序列化失败等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 文件读写失败
    #[error("I/O error: {0}")]
    Io(String),
    /// 文档内容无法解析
    #[error("Corrupted document: {0}")]
    Corrupted(String),
    /// 序列化失败
    #[error("Serialize error: {0}")]
    Serialize(String),
}
