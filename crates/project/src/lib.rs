//! Persistence for outlines: atomic document store, timestamped backups and throttled autosave.  
//! 大綱的持久化：原子寫入的文件儲存、時間戳備份與節流自動儲存。

mod util;

pub mod autosave;
pub mod backup;
pub mod store;
pub mod throttle;
pub mod workspace;

pub use autosave::{AutosaveReport, Autosaver};
pub use backup::{BackupEntry, BackupStore};
pub use store::{LoadedOutline, OutlineStore, OutlineStoreError};
pub use throttle::Throttle;
pub use workspace::WorkspaceLayout;
