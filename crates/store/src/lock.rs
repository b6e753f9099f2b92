use crate::error::{Result, StoreError};
use fs2::FileExt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Exclusive advisory lock held while a document is written
pub(crate) struct SaveLock {
    file: std::fs::File,
}

impl Drop for SaveLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

pub(crate) fn lock_path_for(document: &Path) -> PathBuf {
    let mut name = document
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    document.with_file_name(name)
}

pub(crate) fn acquire_save_lock(document: &Path) -> Result<SaveLock> {
    let path = lock_path_for(document);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .map_err(|err| StoreError::LockError(format!("open save lock {}: {err}", path.display())))?;

    let start = Instant::now();
    file.lock_exclusive().map_err(|err| {
        StoreError::LockError(format!("acquire save lock {}: {err}", path.display()))
    })?;
    log::debug!(
        "save lock {} acquired after {} ms",
        path.display(),
        start.elapsed().as_millis()
    );

    Ok(SaveLock { file })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_file_sits_next_to_the_document() {
        assert_eq!(
            lock_path_for(Path::new("/proj/.ai/pkg/AI.json")),
            PathBuf::from("/proj/.ai/pkg/AI.json.lock")
        );
    }

    #[test]
    fn lock_can_be_reacquired_after_drop() {
        let tmp = tempdir().unwrap();
        let document = tmp.path().join("AI.json");

        let first = acquire_save_lock(&document).unwrap();
        drop(first);
        let second = acquire_save_lock(&document);

        assert!(second.is_ok());
        assert!(lock_path_for(&document).exists());
    }

    #[test]
    fn missing_directory_is_a_lock_error() {
        let tmp = tempdir().unwrap();
        let document = tmp.path().join("absent").join("AI.json");
        assert!(matches!(
            acquire_save_lock(&document),
            Err(StoreError::LockError(_))
        ));
    }
}
