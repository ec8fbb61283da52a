//! Persisted audio settings
//!
//! Six scalar settings plus the current music index, stored in a flat
//! key-value file. Missing or mistyped keys fall back to hardcoded defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::channel::{clamp_volume, Channel};
use crate::error::ConfigError;

pub const DEFAULT_MASTER_VOLUME: f32 = 1.0;
pub const DEFAULT_MUSIC_VOLUME: f32 = 0.7;
pub const DEFAULT_EFFECT_VOLUME: f32 = 1.0;

const MUSIC_INDEX_KEY: &str = "music_index";

/// A single stored preference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// Flat key-value preference store backed by a JSON file.
///
/// An in-memory store (no path) never touches disk; `save` is a no-op.
#[derive(Debug, Clone, Default)]
pub struct PrefsStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, PrefValue>,
}

impl PrefsStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`, starting empty if the file doesn't exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();

        let values = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;

            serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?
        } else {
            tracing::info!("No saved preferences at {}, using defaults", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            path: Some(path),
            values,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the store to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(&self.values).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        fs::write(path, json).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })
    }

    pub fn get(&self, key: &str) -> Option<PrefValue> {
        self.values.get(key).copied()
    }

    pub fn get_f32(&self, key: &str) -> Option<f32> {
        match self.get(key)? {
            PrefValue::Float(value) => Some(value as f32),
            PrefValue::Int(value) => Some(value as f32),
            PrefValue::Bool(_) => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            PrefValue::Bool(value) => Some(value),
            // Stores written by older builds used 0/1
            PrefValue::Int(value) => Some(value != 0),
            PrefValue::Float(_) => None,
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            PrefValue::Int(value) => Some(value),
            _ => None,
        }
    }

    pub fn set_f32(&mut self, key: &str, value: f32) {
        self.values.insert(key.to_string(), PrefValue::Float(value as f64));
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), PrefValue::Bool(value));
    }

    pub fn set_i64(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), PrefValue::Int(value));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn volume_key(channel: Channel) -> String {
    format!("{}_volume", channel.key())
}

fn enabled_key(channel: Channel) -> String {
    format!("{}_enabled", channel.key())
}

/// Snapshot of everything the mixer persists
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSettings {
    pub master_volume: f32,
    pub music_volume: f32,
    pub effect_volume: f32,
    pub master_enabled: bool,
    pub music_enabled: bool,
    pub effect_enabled: bool,
    pub music_index: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master_volume: DEFAULT_MASTER_VOLUME,
            music_volume: DEFAULT_MUSIC_VOLUME,
            effect_volume: DEFAULT_EFFECT_VOLUME,
            master_enabled: true,
            music_enabled: true,
            effect_enabled: true,
            music_index: 0,
        }
    }
}

impl AudioSettings {
    /// Read settings from `prefs`, using defaults for anything missing
    pub fn load(prefs: &PrefsStore) -> Self {
        let defaults = Self::default();

        let volume = |channel: Channel, default: f32| {
            prefs
                .get_f32(&volume_key(channel))
                .map(clamp_volume)
                .unwrap_or(default)
        };
        let enabled = |channel: Channel| prefs.get_bool(&enabled_key(channel)).unwrap_or(true);

        let music_index = prefs
            .get_i64(MUSIC_INDEX_KEY)
            .and_then(|index| usize::try_from(index).ok())
            .unwrap_or(defaults.music_index);

        Self {
            master_volume: volume(Channel::Master, defaults.master_volume),
            music_volume: volume(Channel::Music, defaults.music_volume),
            effect_volume: volume(Channel::Effect, defaults.effect_volume),
            master_enabled: enabled(Channel::Master),
            music_enabled: enabled(Channel::Music),
            effect_enabled: enabled(Channel::Effect),
            music_index,
        }
    }

    /// Write all seven keys into `prefs` (does not flush to disk)
    pub fn store(&self, prefs: &mut PrefsStore) {
        prefs.set_f32(&volume_key(Channel::Master), self.master_volume);
        prefs.set_f32(&volume_key(Channel::Music), self.music_volume);
        prefs.set_f32(&volume_key(Channel::Effect), self.effect_volume);
        prefs.set_bool(&enabled_key(Channel::Master), self.master_enabled);
        prefs.set_bool(&enabled_key(Channel::Music), self.music_enabled);
        prefs.set_bool(&enabled_key(Channel::Effect), self.effect_enabled);
        prefs.set_i64(MUSIC_INDEX_KEY, self.music_index as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let prefs = PrefsStore::in_memory();
        let settings = AudioSettings::load(&prefs);
        assert_eq!(settings, AudioSettings::default());
        assert_eq!(settings.music_volume, DEFAULT_MUSIC_VOLUME);
    }

    #[test]
    fn test_store_and_load() {
        let mut prefs = PrefsStore::in_memory();
        let settings = AudioSettings {
            master_volume: 0.5,
            music_volume: 0.25,
            effect_volume: 0.75,
            master_enabled: true,
            music_enabled: false,
            effect_enabled: true,
            music_index: 2,
        };
        settings.store(&mut prefs);

        assert_eq!(prefs.len(), 7);
        assert_eq!(AudioSettings::load(&prefs), settings);
    }

    #[test]
    fn test_out_of_range_values_fall_back() {
        let mut prefs = PrefsStore::in_memory();
        prefs.set_f32("music_volume", 4.0);
        prefs.set_i64("music_index", -3);
        prefs.set_f32("effect_enabled", 0.0);

        let settings = AudioSettings::load(&prefs);
        assert_eq!(settings.music_volume, 1.0);
        assert_eq!(settings.music_index, 0);
        assert!(settings.effect_enabled);
    }

    #[test]
    fn test_int_flags_accepted() {
        let mut prefs = PrefsStore::in_memory();
        prefs.set_i64("master_enabled", 0);
        assert_eq!(prefs.get_bool("master_enabled"), Some(false));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let mut prefs = PrefsStore::open(&path).unwrap();
        assert!(prefs.is_empty());
        prefs.set_f32("master_volume", 0.5);
        prefs.set_bool("music_enabled", false);
        prefs.set_i64("music_index", 4);
        prefs.save().unwrap();

        let reopened = PrefsStore::open(&path).unwrap();
        assert_eq!(reopened.get_f32("master_volume"), Some(0.5));
        assert_eq!(reopened.get_bool("music_enabled"), Some(false));
        assert_eq!(reopened.get_i64("music_index"), Some(4));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = PrefsStore::open(&path).unwrap_err();
        assert!(matches!(err, ConfigError::LoadFailed { .. }));
    }
}
