use candlewatch_core::store::error::StoreError;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// # Summary
/// 读取整个文档的原始字节，文档不存在时返回 None。
///
/// # Returns
/// 其余 I/O 错误映射为 `StoreError::Io`。编码问题留给 JSON 解析处理。
pub async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::Io(format!("{}: {}", path.display(), e))),
    }
}

/// 与目标文件同目录的临时文件路径，保证 rename 不跨文件系统。
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("document"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// # Summary
/// 原子地替换文档内容。
///
/// # Logic
/// 1. 确保父目录存在。
/// 2. 写入同目录下的临时文件并 fsync。
/// 3. rename 覆盖目标文件，失败时清理临时文件。
///
/// # Arguments
/// * `path`: 目标文档路径。
/// * `bytes`: 完整的新内容。
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let io_err = |e: std::io::Error| StoreError::Io(format!("{}: {}", path.display(), e));

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let tmp = temp_path(path);
    let mut file = fs::File::create(&tmp).await.map_err(io_err)?;
    file.write_all(bytes).await.map_err(io_err)?;
    file.sync_all().await.map_err(io_err)?;
    drop(file);

    if let Err(e) = fs::rename(&tmp, path).await {
        if let Err(cleanup) = fs::remove_file(&tmp).await {
            warn!(path = %tmp.display(), error = %cleanup, "Failed to remove temp file");
        }
        return Err(io_err(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_atomic_replaces_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        assert_eq!(read_optional(&path).await.unwrap(), None);

        write_atomic(&path, b"first").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();

        assert_eq!(read_optional(&path).await.unwrap().as_deref(), Some(&b"second"[..]));
        assert!(!temp_path(&path).exists());
    }
}
