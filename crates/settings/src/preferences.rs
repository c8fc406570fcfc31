use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const PREFERENCES_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse preferences {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize preferences {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub storage: StoragePreferences,
    #[serde(default)]
    pub outline: OutlinePreferences,
}

fn default_version() -> u32 {
    PREFERENCES_VERSION
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            storage: StoragePreferences::default(),
            outline: OutlinePreferences::default(),
        }
    }
}

impl Preferences {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = PREFERENCES_VERSION;
        }
        self.storage.sanitize();
        self.outline.sanitize();
    }
}

/// Where the outline lives and how often it is written.
/// 大綱的儲存位置與寫入頻率。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoragePreferences {
    #[serde(default = "default_data_file")]
    pub data_file: String,
    #[serde(default = "default_true")]
    pub backups_enabled: bool,
    #[serde(default = "default_save_throttle")]
    pub save_throttle_ms: u64,
    #[serde(default = "default_backup_interval")]
    pub backup_interval_secs: u64,
    /// Number of backups to keep; `0` keeps all of them.
    /// 保留的備份數量；`0` 表示全部保留。
    #[serde(default)]
    pub backup_retention: usize,
}

fn default_true() -> bool {
    true
}

fn default_data_file() -> String {
    "data.json".to_string()
}

fn default_save_throttle() -> u64 {
    1000
}

fn default_backup_interval() -> u64 {
    60
}

impl Default for StoragePreferences {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            backups_enabled: true,
            save_throttle_ms: default_save_throttle(),
            backup_interval_secs: default_backup_interval(),
            backup_retention: 0,
        }
    }
}

impl StoragePreferences {
    fn sanitize(&mut self) {
        if self.data_file.trim().is_empty() {
            self.data_file = default_data_file();
        }
        self.save_throttle_ms = self.save_throttle_ms.clamp(100, 60_000);
        self.backup_interval_secs = self.backup_interval_secs.clamp(10, 86_400);
    }

    pub fn save_throttle(&self) -> Duration {
        Duration::from_millis(self.save_throttle_ms)
    }

    pub fn backup_interval(&self) -> Duration {
        Duration::from_secs(self.backup_interval_secs)
    }
}

/// Outline text rendering and seeding of new documents.
/// 大綱文字輸出與新文件的初始內容。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlinePreferences {
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,
    #[serde(default = "default_initial_text")]
    pub initial_text: String,
}

fn default_indent_width() -> usize {
    2
}

fn default_initial_text() -> String {
    "Hello, world!".to_string()
}

impl Default for OutlinePreferences {
    fn default() -> Self {
        Self {
            indent_width: default_indent_width(),
            initial_text: default_initial_text(),
        }
    }
}

impl OutlinePreferences {
    fn sanitize(&mut self) {
        self.indent_width = self.indent_width.clamp(1, 8);
    }
}

#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    data: Preferences,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>, preferences: Preferences) -> Self {
        Self {
            path: path.into(),
            data: preferences,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let mut data = Preferences::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| PreferencesError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: Preferences =
            serde_json::from_str(&contents).map_err(|source| PreferencesError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn preferences(&self) -> &Preferences {
        &self.data
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.data
    }

    pub fn update<F>(&mut self, mut op: F) -> Result<(), PreferencesError>
    where
        F: FnMut(&mut Preferences),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn overwrite(&mut self, preferences: Preferences) -> Result<(), PreferencesError> {
        self.data = preferences;
        self.data.sanitize();
        self.save()
    }

    pub fn save(&self) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| PreferencesError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&self.data).map_err(|source| {
            PreferencesError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload.as_bytes()).map_err(|source| PreferencesError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| PreferencesError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn export_to(&self, path: impl AsRef<Path>) -> Result<(), PreferencesError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PreferencesError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&self.data).map_err(|source| {
            PreferencesError::Serialize {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, payload.as_bytes())
            .map_err(|source| PreferencesError::Write { path, source })
    }

    /// Replaces the preferences with a sanitised copy of `source`, keeping the
    /// previous file as `.bak`.
    /// 以 `source` 的內容取代偏好設定，並將原檔保留為 `.bak`。
    pub fn import_from(&mut self, source: impl AsRef<Path>) -> Result<(), PreferencesError> {
        let source = source.as_ref().to_path_buf();
        let contents = fs::read_to_string(&source).map_err(|err| PreferencesError::Read {
            path: source.clone(),
            source: err,
        })?;
        let mut data: Preferences =
            serde_json::from_str(&contents).map_err(|err| PreferencesError::Parse {
                path: source.clone(),
                source: err,
            })?;
        data.sanitize();
        self.backup_existing()?;
        self.data = data;
        self.save()
    }

    fn backup_existing(&self) -> Result<(), PreferencesError> {
        if self.path.exists() {
            let backup = self.path.with_extension("bak");
            fs::copy(&self.path, &backup).map_err(|source| PreferencesError::Write {
                path: backup,
                source,
            })?;
        }
        Ok(())
    }
}
