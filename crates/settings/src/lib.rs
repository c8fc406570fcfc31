//! Versioned JSON preferences for the outliner.
//! 大綱工具的版本化 JSON 偏好設定。

pub mod preferences;

pub use preferences::{
    OutlinePreferences, Preferences, PreferencesError, PreferencesStore, StoragePreferences,
};
