use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use outliner_core::Document;
use outliner_settings::StoragePreferences;

use crate::backup::BackupStore;
use crate::store::{OutlineStore, OutlineStoreError};
use crate::throttle::Throttle;

/// What a single autosave step wrote to disk.  
/// 單次自動儲存實際寫入的內容。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutosaveReport {
    pub saved: bool,
    pub backup: Option<PathBuf>,
}

impl AutosaveReport {
    pub fn is_empty(&self) -> bool {
        !self.saved && self.backup.is_none()
    }
}

/// Throttled persistence of document snapshots plus periodic backups.  
/// 以節流方式儲存文件快照，並定期建立備份。
///
/// Callers drive it with a monotonic `now` for throttling and a wall-clock
/// timestamp used to name backups.  
/// 呼叫端提供單調時鐘 `now` 供節流使用，並提供實際時間作為備份檔名。
#[derive(Debug)]
pub struct Autosaver {
    store: OutlineStore,
    backups: Option<BackupStore>,
    save: Throttle<Document>,
    backup: Throttle<Document>,
    retention: usize,
}

impl Autosaver {
    pub fn new(
        store: OutlineStore,
        backups: Option<BackupStore>,
        save_interval: Duration,
        backup_interval: Duration,
    ) -> Self {
        Self {
            store,
            backups,
            save: Throttle::new(save_interval, true),
            backup: Throttle::new(backup_interval, false),
            retention: 0,
        }
    }

    /// Keeps only the newest `keep` backups after each backup; `0` keeps all.  
    /// 每次備份後僅保留最新的 `keep` 份；`0` 表示全部保留。
    pub fn with_retention(mut self, keep: usize) -> Self {
        self.retention = keep;
        self
    }

    /// Builds an autosaver rooted at `root` (data file and `backups/` below it).  
    /// 依偏好設定建立以 `root` 為根目錄的自動儲存器。
    pub fn from_preferences(root: impl AsRef<Path>, prefs: &StoragePreferences) -> Self {
        let root = root.as_ref();
        let backups = prefs
            .backups_enabled
            .then(|| BackupStore::new(root.join("backups")));
        Self::new(
            OutlineStore::new(root.join(&prefs.data_file)),
            backups,
            prefs.save_throttle(),
            prefs.backup_interval(),
        )
        .with_retention(prefs.backup_retention)
    }

    pub fn store(&self) -> &OutlineStore {
        &self.store
    }

    pub fn backups(&self) -> Option<&BackupStore> {
        self.backups.as_ref()
    }

    /// Records a new document state; writes whatever is due right now.  
    /// 記錄新的文件狀態，並寫入此刻應寫入的內容。
    pub fn document_changed(
        &mut self,
        document: &Document,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Result<AutosaveReport, OutlineStoreError> {
        let snapshot = document.clone();
        let mut report = AutosaveReport::default();
        if self.backups.is_some() {
            if let Some(held) = self.backup.offer(snapshot.clone(), now) {
                report.backup = self.write_backup(&held, wall)?;
            }
        }
        if let Some(held) = self.save.offer(snapshot, now) {
            self.store.save(&held)?;
            report.saved = true;
        }
        Ok(report)
    }

    /// Writes held snapshots whose throttle window has elapsed.  
    /// 寫入節流間隔已結束的暫存快照。
    pub fn tick(
        &mut self,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Result<AutosaveReport, OutlineStoreError> {
        let mut report = AutosaveReport::default();
        if let Some(held) = self.backup.poll(now) {
            report.backup = self.write_backup(&held, wall)?;
        }
        if let Some(held) = self.save.poll(now) {
            self.store.save(&held)?;
            report.saved = true;
        }
        Ok(report)
    }

    /// Writes every held snapshot immediately, e.g. before shutdown.  
    /// 立即寫入所有暫存快照（例如結束前）。
    pub fn flush(&mut self, wall: DateTime<Utc>) -> Result<AutosaveReport, OutlineStoreError> {
        let mut report = AutosaveReport::default();
        if let Some(held) = self.backup.take_pending() {
            report.backup = self.write_backup(&held, wall)?;
        }
        if let Some(held) = self.save.take_pending() {
            self.store.save(&held)?;
            report.saved = true;
        }
        Ok(report)
    }

    /// Earliest instant at which [`tick`](Self::tick) has work to do.  
    /// 下一次 [`tick`](Self::tick) 需要執行工作的最早時間點。
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.save.deadline(), self.backup.deadline()) {
            (Some(save), Some(backup)) => Some(save.min(backup)),
            (save, backup) => save.or(backup),
        }
    }

    fn write_backup(
        &self,
        document: &Document,
        wall: DateTime<Utc>,
    ) -> Result<Option<PathBuf>, OutlineStoreError> {
        let Some(backups) = &self.backups else {
            return Ok(None);
        };
        let path = backups.write(document, wall)?;
        if self.retention > 0 {
            backups.prune(self.retention)?;
        }
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use outliner_core::{NodeId, NodeProps};
    use tempfile::tempdir;

    fn wall(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    fn saved_text(store: &OutlineStore) -> Vec<String> {
        let loaded = store.load().unwrap().unwrap();
        loaded
            .document
            .visible_nodes(None)
            .unwrap()
            .into_iter()
            .map(|row| row.props.text)
            .collect()
    }

    #[test]
    fn saves_first_change_and_latest_after_window() {
        let dir = tempdir().unwrap();
        let mut saver = Autosaver::from_preferences(dir.path(), &StoragePreferences::default());
        let start = Instant::now();

        let mut doc = Document::new();
        let a = doc.append_to(NodeProps::new("a"), NodeId::ROOT).unwrap();
        let report = saver.document_changed(&doc, start, wall(0)).unwrap();
        assert!(report.saved);
        assert!(report.backup.is_some());

        doc.set_text(a, "b").unwrap();
        let report = saver
            .document_changed(&doc, start + Duration::from_millis(100), wall(0))
            .unwrap();
        assert!(report.is_empty());
        doc.set_text(a, "c").unwrap();
        saver
            .document_changed(&doc, start + Duration::from_millis(200), wall(0))
            .unwrap();
        assert_eq!(saved_text(saver.store()), ["a"]);
        assert_eq!(saver.next_deadline(), Some(start + Duration::from_secs(1)));

        let report = saver.tick(start + Duration::from_secs(1), wall(0)).unwrap();
        assert!(report.saved);
        assert_eq!(saved_text(saver.store()), ["c"]);
    }

    #[test]
    fn backup_keeps_first_held_snapshot() {
        let dir = tempdir().unwrap();
        let mut saver = Autosaver::from_preferences(dir.path(), &StoragePreferences::default());
        let start = Instant::now();

        let mut doc = Document::new();
        let a = doc.append_to(NodeProps::new("first"), NodeId::ROOT).unwrap();
        saver.document_changed(&doc, start, wall(0)).unwrap();
        doc.set_text(a, "second").unwrap();
        saver
            .document_changed(&doc, start + Duration::from_secs(5), wall(0))
            .unwrap();
        doc.set_text(a, "third").unwrap();
        saver
            .document_changed(&doc, start + Duration::from_secs(10), wall(0))
            .unwrap();

        let report = saver.tick(start + Duration::from_secs(60), wall(1)).unwrap();
        let path = report.backup.expect("backup due");
        let backup = Document::decode(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(backup.node(a).unwrap().text, "second");
        assert_eq!(saver.backups().unwrap().list().unwrap().len(), 2);
    }

    #[test]
    fn flush_writes_held_snapshots_and_respects_disabled_backups() {
        let dir = tempdir().unwrap();
        let prefs = StoragePreferences {
            backups_enabled: false,
            ..StoragePreferences::default()
        };
        let mut saver = Autosaver::from_preferences(dir.path(), &prefs);
        let start = Instant::now();

        let mut doc = Document::initial();
        saver.document_changed(&doc, start, wall(0)).unwrap();
        doc.append_to(NodeProps::new("late"), NodeId::ROOT).unwrap();
        saver.document_changed(&doc, start, wall(0)).unwrap();

        let report = saver.flush(wall(0)).unwrap();
        assert!(report.saved);
        assert!(report.backup.is_none());
        assert!(saver.backups().is_none());
        assert!(!dir.path().join("backups").exists());
        assert_eq!(saved_text(saver.store()), ["Hello, world!", "late"]);
        assert!(saver.flush(wall(0)).unwrap().is_empty());
    }
}
