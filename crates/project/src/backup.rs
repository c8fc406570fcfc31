use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, TimeZone, Timelike, Utc};
use outliner_core::Document;
use walkdir::WalkDir;

use crate::store::OutlineStoreError;
use crate::util::write_atomic;

/// A backup file and the minute it was taken.  
/// 備份檔案及其建立時間（精確到分鐘）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub taken_at: DateTime<Utc>,
}

/// Timestamped backups laid out as `root/YYYY/M/D/HHMM.json` (UTC).  
/// 以 `root/年/月/日/時分.json`（UTC）排列的時間戳備份。
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the backup slot for the given minute.  
    /// 取得指定時間（分鐘）對應的備份路徑。
    pub fn path_for(&self, at: DateTime<Utc>) -> PathBuf {
        self.root
            .join(at.year().to_string())
            .join(at.month().to_string())
            .join(at.day().to_string())
            .join(format!("{:02}{:02}.json", at.hour(), at.minute()))
    }

    /// Writes a backup; a second backup in the same minute replaces the first.  
    /// 寫入備份；同一分鐘內的第二份備份會覆蓋前一份。
    pub fn write(
        &self,
        document: &Document,
        at: DateTime<Utc>,
    ) -> Result<PathBuf, OutlineStoreError> {
        let path = self.path_for(at);
        let payload = document.encode()?;
        write_atomic(&path, &payload)?;
        tracing::debug!(path = %path.display(), "outline backup written");
        Ok(path)
    }

    /// Lists backups, newest first. Files outside the layout are ignored.  
    /// 列出所有備份（新到舊）；不符合目錄結構的檔案會被忽略。
    pub fn list(&self) -> Result<Vec<BackupEntry>, OutlineStoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(4).max_depth(4) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if let Some(taken_at) = self.parse_timestamp(&path) {
                entries.push(BackupEntry { path, taken_at });
            }
        }

        entries.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
        Ok(entries)
    }

    pub fn latest(&self) -> Result<Option<BackupEntry>, OutlineStoreError> {
        Ok(self.list()?.into_iter().next())
    }

    /// `true` when no backup exists or the newest one is at least `interval` old.  
    /// 尚無備份或最新備份已超過間隔時回傳 `true`。
    ///
    /// The age is measured from the file's modification time when it falls
    /// inside the minute named by the file, and from the end of that minute
    /// otherwise.  
    /// 若檔案修改時間落在檔名所示的分鐘內則以其計算，否則以該分鐘結束時計算。
    pub fn is_due(
        &self,
        interval: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, OutlineStoreError> {
        Ok(match self.latest()? {
            Some(entry) => (now - written_at(&entry))
                .to_std()
                .map_or(true, |elapsed| elapsed >= interval),
            None => true,
        })
    }

    /// Keeps the newest `keep` backups and deletes the rest; `0` keeps everything.  
    /// 保留最新的 `keep` 份備份並刪除其餘；`0` 表示全部保留。
    pub fn prune(&self, keep: usize) -> Result<usize, OutlineStoreError> {
        if keep == 0 {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in self.list()?.into_iter().skip(keep) {
            fs::remove_file(&entry.path)?;
            removed += 1;
            // drop day/month/year folders that became empty
            let mut dir = entry.path.parent();
            while let Some(current) = dir {
                if current == self.root || fs::remove_dir(current).is_err() {
                    break;
                }
                dir = current.parent();
            }
        }
        if removed > 0 {
            tracing::debug!(removed, keep, "pruned outline backups");
        }
        Ok(removed)
    }

    fn parse_timestamp(&self, path: &Path) -> Option<DateTime<Utc>> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .iter()
            .map(|part| part.to_str())
            .collect::<Option<_>>()?;
        let [year, month, day, file] = parts.as_slice() else {
            return None;
        };
        let stamp = file.strip_suffix(".json")?;
        if stamp.len() != 4 || !stamp.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        let date = NaiveDate::from_ymd_opt(
            year.parse().ok()?,
            month.parse().ok()?,
            day.parse().ok()?,
        )?;
        let time = date.and_hms_opt(stamp[..2].parse().ok()?, stamp[2..].parse().ok()?, 0)?;
        Some(Utc.from_utc_datetime(&time))
    }
}

/// Latest moment the backup can have been written at.
fn written_at(entry: &BackupEntry) -> DateTime<Utc> {
    let minute_end = entry.taken_at + TimeDelta::minutes(1);
    fs::metadata(&entry.path)
        .and_then(|metadata| metadata.modified())
        .ok()
        .map(DateTime::<Utc>::from)
        .filter(|modified| (entry.taken_at..minute_end).contains(modified))
        .unwrap_or(minute_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, hour, minute, 42).unwrap()
    }

    #[test]
    fn path_follows_calendar_layout() {
        let store = BackupStore::new("/data/backups");
        assert_eq!(
            store.path_for(at(9, 5)),
            PathBuf::from("/data/backups/2024/3/7/0905.json")
        );
    }

    #[test]
    fn write_list_and_prune() {
        let dir = tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        let doc = Document::initial();

        store.write(&doc, at(8, 0)).unwrap();
        store.write(&doc, at(9, 30)).unwrap();
        store.write(&doc, at(10, 15)).unwrap();
        fs::write(dir.path().join("backups").join("stray.txt"), b"x").unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(
            listed[0].taken_at,
            Utc.with_ymd_and_hms(2024, 3, 7, 10, 15, 0).unwrap()
        );
        let restored = Document::decode(&fs::read(&listed[0].path).unwrap()).unwrap();
        assert_eq!(restored, doc);

        assert_eq!(store.prune(2).unwrap(), 1);
        let remaining = store.list().unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[1].taken_at.hour(), 9);
    }

    #[test]
    fn due_when_missing_or_stale() {
        let dir = tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        let minute = Duration::from_secs(60);
        assert!(store.is_due(minute, at(9, 0)).unwrap());

        store.write(&Document::initial(), at(9, 0)).unwrap();
        assert!(!store.is_due(minute, at(9, 0)).unwrap());
        assert!(!store.is_due(minute, at(9, 1)).unwrap());
        assert!(store.is_due(minute, at(9, 2)).unwrap());
    }

    #[test]
    fn backup_late_in_a_minute_is_not_due_a_second_later() {
        let dir = tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        let minute = Duration::from_secs(60);
        let late = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 59).unwrap();

        store.write(&Document::initial(), late).unwrap();
        assert!(!store.is_due(minute, late + TimeDelta::seconds(1)).unwrap());
        assert!(store.is_due(minute, late + TimeDelta::seconds(61)).unwrap());
    }

    #[test]
    fn fresh_backup_is_aged_by_its_modification_time() {
        let dir = tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        let minute = Duration::from_secs(60);
        let now = Utc::now();

        store.write(&Document::initial(), now).unwrap();
        assert!(!store.is_due(minute, now + TimeDelta::seconds(1)).unwrap());
        assert!(store.is_due(minute, now + TimeDelta::seconds(65)).unwrap());
    }
}
