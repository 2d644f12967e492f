//! Settings persistence layer
//!
//! Loads and saves settings overrides as versioned JSON.

use crate::{ProfileId, SettingKey, SettingValue, SettingsRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Serializable container for settings overrides
/// Uses BTreeMap for stable ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsOverridesData {
    /// Version of the settings format
    pub version: u32,
    /// Profile overrides keyed by setting name
    pub overrides: BTreeMap<ProfileId, BTreeMap<String, SettingValue>>,
}

impl SettingsOverridesData {
    /// Current version of the settings format
    pub const CURRENT_VERSION: u32 = 1;

    /// Creates empty settings data
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            overrides: BTreeMap::new(),
        }
    }

    /// Captures the overrides held by a registry
    pub fn from_registry(registry: &SettingsRegistry) -> Self {
        let mut data = Self::new();
        for (profile, settings) in registry.export_overrides() {
            let settings = settings
                .into_iter()
                .map(|(key, value)| (key.as_str().to_string(), value))
                .collect();
            data.overrides.insert(profile, settings);
        }
        data
    }

    /// Merges these overrides into a registry
    pub fn apply_to(&self, registry: &mut SettingsRegistry) {
        let overrides = self
            .overrides
            .iter()
            .map(|(profile, settings)| {
                let settings = settings
                    .iter()
                    .map(|(key, value)| (SettingKey::new(key.as_str()), value.clone()))
                    .collect();
                (profile.clone(), settings)
            })
            .collect();
        registry.import_overrides(overrides);
    }
}

impl Default for SettingsOverridesData {
    fn default() -> Self {
        Self::new()
    }
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors that can occur during persistence operations
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to serialize settings: {0}")]
    SerializationFailed(#[source] serde_json::Error),

    #[error("Failed to deserialize settings: {0}")]
    DeserializationFailed(#[source] serde_json::Error),

    #[error("Unsupported settings version: {0}")]
    UnsupportedVersion(u32),

    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializes settings overrides to JSON bytes
pub fn serialize_overrides(data: &SettingsOverridesData) -> PersistenceResult<Vec<u8>> {
    serde_json::to_vec_pretty(data).map_err(PersistenceError::SerializationFailed)
}

/// Deserializes settings overrides from JSON bytes
pub fn deserialize_overrides(bytes: &[u8]) -> PersistenceResult<SettingsOverridesData> {
    let data: SettingsOverridesData =
        serde_json::from_slice(bytes).map_err(PersistenceError::DeserializationFailed)?;

    if data.version != SettingsOverridesData::CURRENT_VERSION {
        return Err(PersistenceError::UnsupportedVersion(data.version));
    }

    Ok(data)
}

/// Loads overrides from a host file
pub fn load_from_path(path: &Path) -> PersistenceResult<SettingsOverridesData> {
    let bytes = std::fs::read(path)?;
    let data = deserialize_overrides(&bytes)?;
    log::info!("loaded settings overrides from {}", path.display());
    Ok(data)
}

/// Saves overrides to a host file
pub fn save_to_path(path: &Path, data: &SettingsOverridesData) -> PersistenceResult<()> {
    let bytes = serialize_overrides(data)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Attempts to load settings from bytes, falling back to empty overrides on error
pub fn load_overrides_safe(bytes: &[u8]) -> SettingsOverridesData {
    deserialize_overrides(bytes).unwrap_or_else(|err| {
        log::warn!("ignoring unreadable settings: {}", err);
        SettingsOverridesData::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_default_registry, keys, PROFILE};

    #[test]
    fn test_registry_round_trip_through_data() {
        let mut registry = create_default_registry();
        registry.set_override(PROFILE, keys::SHELL_USER, SettingValue::String("ada".into()));

        let data = SettingsOverridesData::from_registry(&registry);
        assert_eq!(data.overrides[PROFILE].len(), 1);

        let mut fresh = create_default_registry();
        data.apply_to(&mut fresh);
        assert_eq!(fresh.get_string(PROFILE, keys::SHELL_USER), Some("ada"));
    }

    #[test]
    fn test_unsupported_version() {
        let json = br#"{"version": 99, "overrides": {}}"#;
        let result = deserialize_overrides(json);
        assert!(matches!(result, Err(PersistenceError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_load_safe_on_garbage() {
        let data = load_overrides_safe(b"not json");
        assert_eq!(data, SettingsOverridesData::new());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut data = SettingsOverridesData::new();
        let mut profile = BTreeMap::new();
        profile.insert(
            keys::KERNEL_TICK_INTERVAL_MS.to_string(),
            SettingValue::Integer(100),
        );
        data.overrides.insert(PROFILE.to_string(), profile);

        save_to_path(&path, &data).unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_from_path(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(PersistenceError::Io(_))));
    }
}
