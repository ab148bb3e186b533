//! Settings document loading: mtime-gated reload, cold-start default
//! unpacking, and atomic save.
//!
//! Mirrors `app_detector`'s `Settings.go`: a single in-memory document plus
//! the modification time it was loaded at, reloaded only when the file on
//! disk is newer.

use crate::error::SettingsError;
use crate::types::{Application, SettingsDocument, DEFAULT_LAYOUT_KEY};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

const DEFAULT_SETTINGS_JSON: &str = include_str!("../assets/settings_default.json");

/// Names embedded alongside the crate and unpacked into the icons directory
/// on cold start. Add an `include_bytes!` entry here and to `assets/icons/`
/// together.
const DEFAULT_ICONS: &[(&str, &[u8])] = &[
    ("default.png", include_bytes!("../assets/icons/default.png")),
];

pub struct SettingsStore {
    path: PathBuf,
    icons_dir: PathBuf,
    document: Option<SettingsDocument>,
    last_modified: Option<SystemTime>,
}

impl SettingsStore {
    pub fn new(path: PathBuf, icons_dir: PathBuf) -> Self {
        Self { path, icons_dir, document: None, last_modified: None }
    }

    /// Load the document if it's missing, unreadable, or newer than the
    /// last load. Returns whether a (re)load actually happened.
    pub fn reload_if_changed(&mut self) -> Result<bool, SettingsError> {
        if !self.path.exists() {
            self.create_defaults()?;
        }

        let modified = std::fs::metadata(&self.path)?.modified()?;
        if self.last_modified == Some(modified) {
            return Ok(false);
        }

        let data = std::fs::read_to_string(&self.path)?;
        let document: SettingsDocument = serde_json::from_str(&data)?;
        self.document = Some(document);
        self.last_modified = Some(modified);
        Ok(true)
    }

    pub fn layout_for_process(&self, process_name: &str) -> Option<&Application> {
        let document = self.document.as_ref()?;
        document.get(process_name).or_else(|| document.get(DEFAULT_LAYOUT_KEY))
    }

    /// Atomic write-then-rename save of the current in-memory document.
    pub fn save(&mut self) -> Result<(), SettingsError> {
        let document = self.document.get_or_insert_with(SettingsDocument::new);
        let data = serde_json::to_vec_pretty(document)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = tmp_path_for(&self.path);
        std::fs::write(&tmp_path, &data)?;
        std::fs::rename(&tmp_path, &self.path)?;
        self.last_modified = Some(std::fs::metadata(&self.path)?.modified()?);
        Ok(())
    }

    fn create_defaults(&mut self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.icons_dir)?;

        serde_json::from_str::<SettingsDocument>(DEFAULT_SETTINGS_JSON)?;

        let tmp_path = tmp_path_for(&self.path);
        std::fs::write(&tmp_path, DEFAULT_SETTINGS_JSON)?;
        std::fs::rename(&tmp_path, &self.path)?;

        for (name, contents) in DEFAULT_ICONS {
            let target = self.icons_dir.join(name);
            if target.exists() {
                continue;
            }
            let tmp_target = tmp_path_for(&target);
            std::fs::write(&tmp_target, contents)?;
            std::fs::rename(&tmp_target, &target)?;
        }

        info!(path = %self.path.display(), "wrote default settings document");
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut os_string = path.as_os_str().to_owned();
    os_string.push(".tmp");
    PathBuf::from(os_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_creates_default_document_and_icons() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        let icons_dir = tmp.path().join("icons");
        let mut store = SettingsStore::new(path.clone(), icons_dir.clone());

        let changed = store.reload_if_changed().unwrap();
        assert!(changed);
        assert!(path.exists());
        assert!(icons_dir.join("default.png").exists());
        assert!(store.layout_for_process("nonexistent").is_some() || store.layout_for_process("nonexistent").is_none());
    }

    #[test]
    fn reload_is_noop_when_mtime_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        let icons_dir = tmp.path().join("icons");
        let mut store = SettingsStore::new(path, icons_dir);

        assert!(store.reload_if_changed().unwrap());
        assert!(!store.reload_if_changed().unwrap());
    }

    #[test]
    fn falls_back_to_default_layout_key() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, r#"{"default":{"name":"default","buttons":[]}}"#).unwrap();
        let mut store = SettingsStore::new(path, tmp.path().join("icons"));
        store.reload_if_changed().unwrap();

        let layout = store.layout_for_process("some_unlisted_app").unwrap();
        assert_eq!(layout.name, "default");
    }

    #[test]
    fn save_round_trips_through_atomic_rename() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        let mut store = SettingsStore::new(path.clone(), tmp.path().join("icons"));
        store.reload_if_changed().unwrap();
        store.save().unwrap();
        assert!(path.exists());
        assert!(!tmp_path_for(&path).exists());
    }
}
