use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use outliner_core::{DecodeReport, Document, SerializationError};
use thiserror::Error;

use crate::util::write_atomic;

/// Document read from disk together with whatever the decoder had to drop.  
/// 從磁碟讀取的文件，以及解碼時被捨棄的資料。
#[derive(Debug, Clone)]
pub struct LoadedOutline {
    pub document: Document,
    pub report: DecodeReport,
}

/// Persists outline snapshots to disk using the canonical encoding + atomic writes.  
/// 以標準編碼搭配原子寫入方式儲存大綱快照。
#[derive(Debug, Clone)]
pub struct OutlineStore {
    path: PathBuf,
}

impl OutlineStore {
    /// Constructs a store bound to the provided path.  
    /// 建立綁定至指定路徑的儲存器。
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the backing path used for persistence.  
    /// 取得此儲存器使用的檔案路徑。
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the outline, returning `Ok(None)` when the file is absent.  
    /// 從磁碟載入大綱；若檔案不存在則回傳 `Ok(None)`。
    pub fn load(&self) -> Result<Option<LoadedOutline>, OutlineStoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let (document, report) = Document::decode_with_report(&bytes)?;
                if !report.is_lossless() {
                    tracing::warn!(
                        path = %self.path.display(),
                        dropped = report.dropped.len(),
                        dropped_favorites = report.dropped_favorites.len(),
                        "outline loaded partially"
                    );
                }
                Ok(Some(LoadedOutline { document, report }))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(OutlineStoreError::Io(err)),
        }
    }

    /// Loads the outline or falls back to `initial` when it is missing or unreadable.  
    /// 載入大綱；若檔案不存在或無法讀取則改用初始文件。
    pub fn load_or_initial(&self, initial: impl FnOnce() -> Document) -> Document {
        match self.load() {
            Ok(Some(loaded)) => loaded.document,
            Ok(None) => {
                tracing::debug!(path = %self.path.display(), "no outline on disk yet");
                initial()
            }
            Err(err) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %err,
                    "failed to load outline, starting from the initial document"
                );
                initial()
            }
        }
    }

    /// Saves the outline atomically to disk.  
    /// 將大綱以原子方式寫入磁碟。
    pub fn save(&self, document: &Document) -> Result<(), OutlineStoreError> {
        let payload = document.encode()?;
        write_atomic(&self.path, &payload)?;
        tracing::debug!(path = %self.path.display(), nodes = document.len(), "outline saved");
        Ok(())
    }
}

/// Errors emitted by [`OutlineStore`] and [`BackupStore`](crate::BackupStore).  
/// 大綱儲存與備份可能拋出的錯誤。
#[derive(Debug, Error)]
pub enum OutlineStoreError {
    #[error("outline IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid outline payload: {0}")]
    Invalid(#[from] SerializationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use outliner_core::{NodeId, NodeProps};
    use tempfile::tempdir;

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = OutlineStore::new(dir.path().join("data.json"));

        let mut doc = Document::new();
        let notes = doc.append_to(NodeProps::new("notes"), NodeId::ROOT).unwrap();
        doc.append_to(NodeProps::new("first"), notes).unwrap();
        doc.favorite(notes);

        store.save(&doc).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.report.is_lossless());
        assert_eq!(loaded.document, doc);
    }

    #[test]
    fn load_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store = OutlineStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
        let doc = store.load_or_initial(Document::initial);
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn unreadable_file_falls_back_to_initial() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, b"definitely not json").unwrap();
        let store = OutlineStore::new(&path);

        assert!(matches!(store.load(), Err(OutlineStoreError::Invalid(_))));
        let doc = store.load_or_initial(Document::initial);
        assert_eq!(doc.len(), 1);
        // the unreadable file is left alone until the next save
        assert_eq!(fs::read(&path).unwrap(), b"definitely not json");
    }
}
