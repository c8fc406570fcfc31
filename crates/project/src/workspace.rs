use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use outliner_settings::StoragePreferences;

use crate::autosave::Autosaver;
use crate::backup::BackupStore;
use crate::store::OutlineStore;

const DATA_DIR: &str = ".outliner";
const PREFERENCES_FILE: &str = "preferences.json";
const BACKUPS_DIR: &str = "backups";

/// On-disk layout of an outliner workspace: everything lives under `<root>/.outliner/`.  
/// 大綱工作區的磁碟配置：所有資料皆位於 `<root>/.outliner/` 之下。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the data file, preferences and backups.  
    /// 存放資料檔、偏好設定與備份的目錄。
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir().join(PREFERENCES_FILE)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.data_dir().join(BACKUPS_DIR)
    }

    pub fn data_path(&self, prefs: &StoragePreferences) -> PathBuf {
        self.data_dir().join(&prefs.data_file)
    }

    pub fn outline_store(&self, prefs: &StoragePreferences) -> OutlineStore {
        OutlineStore::new(self.data_path(prefs))
    }

    pub fn backup_store(&self) -> BackupStore {
        BackupStore::new(self.backups_dir())
    }

    pub fn autosaver(&self, prefs: &StoragePreferences) -> Autosaver {
        Autosaver::from_preferences(self.data_dir(), prefs)
    }

    /// Creates the data directory if needed.  
    /// 視需要建立資料目錄。
    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(self.data_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn paths_nest_under_data_dir() {
        let layout = WorkspaceLayout::new("/work");
        let prefs = StoragePreferences {
            data_file: "outline.json".to_string(),
            ..StoragePreferences::default()
        };
        assert_eq!(layout.data_dir(), PathBuf::from("/work/.outliner"));
        assert_eq!(
            layout.preferences_path(),
            PathBuf::from("/work/.outliner/preferences.json")
        );
        assert_eq!(
            layout.outline_store(&prefs).path(),
            Path::new("/work/.outliner/outline.json")
        );
        assert_eq!(
            layout.autosaver(&prefs).store().path(),
            layout.data_path(&prefs).as_path()
        );
        assert_eq!(
            layout.autosaver(&prefs).backups().map(|store| store.root()),
            Some(layout.backups_dir().as_path())
        );
    }

    #[test]
    fn ensure_creates_data_dir() {
        let dir = tempdir().unwrap();
        let layout = WorkspaceLayout::new(dir.path());
        layout.ensure().unwrap();
        assert!(layout.data_dir().is_dir());
    }
}
