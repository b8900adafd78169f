//! Client-local viewer preferences.
//!
//! # Responsibility
//! - Persist each viewer's 12h/24h choice under `timeFormat_<viewerId>`.
//!
//! # Invariants
//! - Lives in its own JSON file; never touches the interval database.
//! - Reads never fail: a missing, unreadable or corrupt file yields the
//!   12-hour default.

use crate::calendar::format::TimeFormat;
use crate::model::user::UserId;
use log::warn;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum PrefsError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl Display for PrefsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "preference file i/o failed: {err}"),
            Self::Json(err) => write!(f, "preference file is not valid JSON: {err}"),
        }
    }
}

impl Error for PrefsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for PrefsError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for PrefsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Storage key for a viewer's time-format choice.
pub fn preference_key(viewer_id: UserId) -> String {
    format!("timeFormat_{viewer_id}")
}

/// JSON-file backed key/value preference store.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved format for `viewer_id`, or 12-hour when none is usable.
    pub fn load_time_format(&self, viewer_id: UserId) -> TimeFormat {
        match self.read_all() {
            Ok(values) => values
                .get(&preference_key(viewer_id))
                .and_then(|value| TimeFormat::from_pref_str(value))
                .unwrap_or_default(),
            Err(err) => {
                warn!(
                    "event=prefs_load module=prefs status=error viewer_id={} error={}",
                    viewer_id, err
                );
                TimeFormat::default()
            }
        }
    }

    pub fn save_time_format(&self, viewer_id: UserId, format: TimeFormat) -> Result<(), PrefsError> {
        // A corrupt file is replaced rather than blocking the save.
        let mut values = self.read_all().unwrap_or_default();
        values.insert(preference_key(viewer_id), format.as_pref_str().to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&values)?)?;
        Ok(())
    }

    /// Flips and persists the viewer's format, returning the new value.
    pub fn toggle_time_format(&self, viewer_id: UserId) -> Result<TimeFormat, PrefsError> {
        let next = self.load_time_format(viewer_id).toggled();
        self.save_time_format(viewer_id, next)?;
        Ok(next)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, PrefsError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{preference_key, PreferenceStore};
    use crate::calendar::format::TimeFormat;

    #[test]
    fn missing_file_defaults_to_twelve_hour() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = PreferenceStore::new(dir.path().join("prefs.json"));
        assert_eq!(store.load_time_format(1), TimeFormat::TwelveHour);
    }

    #[test]
    fn preferences_are_keyed_per_viewer() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = PreferenceStore::new(dir.path().join("nested").join("prefs.json"));

        store
            .save_time_format(1, TimeFormat::TwentyFourHour)
            .expect("preference should save");
        assert_eq!(store.load_time_format(1), TimeFormat::TwentyFourHour);
        assert_eq!(store.load_time_format(2), TimeFormat::TwelveHour);

        assert_eq!(
            store.toggle_time_format(1).expect("toggle should save"),
            TimeFormat::TwelveHour
        );
        assert_eq!(store.load_time_format(1), TimeFormat::TwelveHour);

        let raw = std::fs::read_to_string(store.path()).expect("preference file should exist");
        assert!(raw.contains(&preference_key(1)));
    }

    #[test]
    fn corrupt_file_falls_back_and_is_replaced_on_save() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").expect("corrupt file should be written");
        let store = PreferenceStore::new(&path);

        assert_eq!(store.load_time_format(3), TimeFormat::TwelveHour);
        store
            .save_time_format(3, TimeFormat::TwentyFourHour)
            .expect("save should replace a corrupt file");
        assert_eq!(store.load_time_format(3), TimeFormat::TwentyFourHour);
    }
}
