//! # Settings Registry Service
//!
//! A typed settings system for the simulated kernel and its shell.
//!
//! ## Philosophy
//!
//! - **Typed settings**: All settings have explicit types, not stringly-typed
//! - **Layered**: Read-only defaults + per-profile overrides
//! - **Deterministic**: Settings are serializable and reproducible
//! - **Testable**: All settings logic can be tested independently
//!
//! ## Example
//!
//! ```ignore
//! use services_settings::{create_default_registry, keys, KernelConfig, PROFILE};
//!
//! let mut registry = create_default_registry();
//! registry.set_from_str(PROFILE, keys::KERNEL_TICK_INTERVAL_MS, "250")?;
//! let config = KernelConfig::from_registry(&registry, PROFILE);
//! assert_eq!(config.tick_interval_ms, 250);
//! ```

pub mod config;
pub mod persistence;

pub use config::{KernelConfig, ShellConfig};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Profile whose overrides the host and the shell read
pub const PROFILE: &str = "default";

/// Setting key (path-like identifier)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SettingKey(String);

impl SettingKey {
    /// Creates a new setting key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks if this key starts with the given prefix
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SettingKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Setting value (strongly typed)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    StringList(Vec<String>),
}

impl SettingValue {
    /// Name of the value's type, as shown to users
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Boolean(_) => "boolean",
            SettingValue::Integer(_) => "integer",
            SettingValue::Float(_) => "float",
            SettingValue::String(_) => "string",
            SettingValue::StringList(_) => "list",
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            SettingValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SettingValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            SettingValue::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            SettingValue::StringList(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Parses `raw` into a value of the same type as `self`
    pub fn parse_like(&self, raw: &str) -> Option<SettingValue> {
        match self {
            SettingValue::Boolean(_) => match raw {
                "true" | "on" | "yes" | "1" => Some(SettingValue::Boolean(true)),
                "false" | "off" | "no" | "0" => Some(SettingValue::Boolean(false)),
                _ => None,
            },
            SettingValue::Integer(_) => raw.parse().ok().map(SettingValue::Integer),
            SettingValue::Float(_) => raw.parse().ok().map(SettingValue::Float),
            SettingValue::String(_) => Some(SettingValue::String(raw.to_string())),
            SettingValue::StringList(_) => Some(SettingValue::StringList(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Boolean(v) => write!(f, "{}", v),
            SettingValue::Integer(v) => write!(f, "{}", v),
            SettingValue::Float(v) => write!(f, "{}", v),
            SettingValue::String(v) => write!(f, "{}", v),
            SettingValue::StringList(v) => write!(f, "{}", v.join(",")),
        }
    }
}

/// Errors from typed setting updates
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SettingsError {
    #[error("Unknown setting: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: expected {expected}, got '{raw}'")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        raw: String,
    },
}

/// Profile ID type
pub type ProfileId = String;

/// Settings registry
#[derive(Debug, Clone)]
pub struct SettingsRegistry {
    /// Default settings (read-only)
    defaults: BTreeMap<SettingKey, SettingValue>,
    /// Profile-specific overrides
    overrides: BTreeMap<ProfileId, BTreeMap<SettingKey, SettingValue>>,
}

impl SettingsRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            defaults: BTreeMap::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// Registers a default setting
    pub fn register_default(&mut self, key: impl Into<SettingKey>, value: SettingValue) {
        self.defaults.insert(key.into(), value);
    }

    /// Sets a profile override
    pub fn set_override(
        &mut self,
        profile: impl Into<ProfileId>,
        key: impl Into<SettingKey>,
        value: SettingValue,
    ) {
        self.overrides
            .entry(profile.into())
            .or_default()
            .insert(key.into(), value);
    }

    /// Parses `raw` with the type of the registered default and stores it
    /// as an override
    pub fn set_from_str(
        &mut self,
        profile: &str,
        key: &str,
        raw: &str,
    ) -> Result<SettingValue, SettingsError> {
        let key = SettingKey::new(key);
        let default = self
            .defaults
            .get(&key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
        let value = default
            .parse_like(raw)
            .ok_or_else(|| SettingsError::TypeMismatch {
                key: key.to_string(),
                expected: default.type_name(),
                raw: raw.to_string(),
            })?;
        self.set_override(profile, key, value.clone());
        Ok(value)
    }

    /// Removes a profile override, returning whether one existed
    pub fn reset_to_default(&mut self, profile: &str, key: &SettingKey) -> bool {
        self.overrides
            .get_mut(profile)
            .map(|settings| settings.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Gets the effective value for a profile (override or default)
    pub fn get(&self, profile: &str, key: &SettingKey) -> Option<&SettingValue> {
        self.get_override(profile, key)
            .or_else(|| self.defaults.get(key))
    }

    /// Gets the default value for a setting
    pub fn get_default(&self, key: &SettingKey) -> Option<&SettingValue> {
        self.defaults.get(key)
    }

    /// Gets the override (if any) for a setting
    pub fn get_override(&self, profile: &str, key: &SettingKey) -> Option<&SettingValue> {
        self.overrides
            .get(profile)
            .and_then(|settings| settings.get(key))
    }

    /// Effective integer value, if the key resolves to an integer
    pub fn get_integer(&self, profile: &str, key: &str) -> Option<i64> {
        self.get(profile, &SettingKey::new(key))
            .and_then(SettingValue::as_integer)
    }

    /// Effective string value, if the key resolves to a string
    pub fn get_string(&self, profile: &str, key: &str) -> Option<&str> {
        self.get(profile, &SettingKey::new(key))
            .and_then(SettingValue::as_string)
    }

    /// Returns the effective settings with a given prefix, sorted by key
    pub fn list_with_prefix(&self, profile: &str, prefix: &str) -> Vec<(SettingKey, SettingValue)> {
        let mut merged: BTreeMap<&SettingKey, &SettingValue> = self
            .defaults
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .collect();

        if let Some(settings) = self.overrides.get(profile) {
            for (key, value) in settings {
                if key.starts_with(prefix) {
                    merged.insert(key, value);
                }
            }
        }

        merged
            .into_iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Exports all overrides for persistence
    pub fn export_overrides(&self) -> BTreeMap<ProfileId, BTreeMap<SettingKey, SettingValue>> {
        self.overrides.clone()
    }

    /// Merges imported overrides into the registry
    pub fn import_overrides(
        &mut self,
        overrides: BTreeMap<ProfileId, BTreeMap<SettingKey, SettingValue>>,
    ) {
        for (profile, settings) in overrides {
            self.overrides.entry(profile).or_default().extend(settings);
        }
    }
}

impl Default for SettingsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Known setting keys
pub mod keys {
    pub const KERNEL_MEMORY_TOTAL_MB: &str = "kernel.memory_total_mb";
    pub const KERNEL_MEMORY_KERNEL_MB: &str = "kernel.memory_kernel_mb";
    pub const KERNEL_MEMORY_SHELL_MB: &str = "kernel.memory_shell_mb";
    pub const KERNEL_TICK_INTERVAL_MS: &str = "kernel.tick_interval_ms";
    pub const KERNEL_SCHEDULER_SEED: &str = "kernel.scheduler_seed";
    pub const SHELL_STAGE_MEMORY_MB: &str = "shell.stage_memory_mb";
    pub const SHELL_USER: &str = "shell.user";
    pub const SHELL_HOSTNAME: &str = "shell.hostname";
    pub const SHELL_HISTORY_LIMIT: &str = "shell.history_limit";
}

/// Creates a settings registry with default settings
pub fn create_default_registry() -> SettingsRegistry {
    let mut registry = SettingsRegistry::new();

    // Kernel
    registry.register_default(keys::KERNEL_MEMORY_TOTAL_MB, SettingValue::Integer(1024));
    registry.register_default(keys::KERNEL_MEMORY_KERNEL_MB, SettingValue::Integer(128));
    registry.register_default(keys::KERNEL_MEMORY_SHELL_MB, SettingValue::Integer(32));
    registry.register_default(keys::KERNEL_TICK_INTERVAL_MS, SettingValue::Integer(1000));
    registry.register_default(keys::KERNEL_SCHEDULER_SEED, SettingValue::Integer(0));

    // Shell
    registry.register_default(keys::SHELL_STAGE_MEMORY_MB, SettingValue::Integer(8));
    registry.register_default(keys::SHELL_USER, SettingValue::String("user".to_string()));
    registry.register_default(
        keys::SHELL_HOSTNAME,
        SettingValue::String("simos".to_string()),
    );
    registry.register_default(keys::SHELL_HISTORY_LIMIT, SettingValue::Integer(100));

    registry
}
