//! Typed views over the settings registry

use crate::{keys, SettingsRegistry};

/// Kernel boot parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    pub memory_total_mb: u64,
    pub memory_kernel_mb: u64,
    pub memory_shell_mb: u64,
    pub tick_interval_ms: u64,
    /// `None` seeds the scheduler from entropy
    pub scheduler_seed: Option<u64>,
}

impl KernelConfig {
    /// Resolves the kernel configuration for a profile
    ///
    /// Negative or missing values fall back to the built-in defaults.
    pub fn from_registry(registry: &SettingsRegistry, profile: &str) -> Self {
        let defaults = Self::default();
        let int = |key: &str, fallback: u64| {
            registry
                .get_integer(profile, key)
                .and_then(|v| u64::try_from(v).ok())
                .unwrap_or(fallback)
        };

        let seed = int(keys::KERNEL_SCHEDULER_SEED, 0);
        Self {
            memory_total_mb: int(keys::KERNEL_MEMORY_TOTAL_MB, defaults.memory_total_mb),
            memory_kernel_mb: int(keys::KERNEL_MEMORY_KERNEL_MB, defaults.memory_kernel_mb),
            memory_shell_mb: int(keys::KERNEL_MEMORY_SHELL_MB, defaults.memory_shell_mb),
            tick_interval_ms: int(keys::KERNEL_TICK_INTERVAL_MS, defaults.tick_interval_ms).max(1),
            scheduler_seed: (seed != 0).then_some(seed),
        }
    }

    /// Pins the scheduler seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.scheduler_seed = Some(seed);
        self
    }

    /// Overrides the memory pool size
    pub fn with_memory_total(mut self, mb: u64) -> Self {
        self.memory_total_mb = mb;
        self
    }

    pub fn with_tick_interval(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            memory_total_mb: 1024,
            memory_kernel_mb: 128,
            memory_shell_mb: 32,
            tick_interval_ms: 1000,
            scheduler_seed: None,
        }
    }
}

/// Shell engine parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub stage_memory_mb: u64,
    pub user: String,
    pub hostname: String,
    pub history_limit: usize,
}

impl ShellConfig {
    /// Resolves the shell configuration for a profile
    pub fn from_registry(registry: &SettingsRegistry, profile: &str) -> Self {
        let defaults = Self::default();
        Self {
            stage_memory_mb: registry
                .get_integer(profile, keys::SHELL_STAGE_MEMORY_MB)
                .and_then(|v| u64::try_from(v).ok())
                .unwrap_or(defaults.stage_memory_mb),
            user: registry
                .get_string(profile, keys::SHELL_USER)
                .map(String::from)
                .unwrap_or(defaults.user),
            hostname: registry
                .get_string(profile, keys::SHELL_HOSTNAME)
                .map(String::from)
                .unwrap_or(defaults.hostname),
            history_limit: registry
                .get_integer(profile, keys::SHELL_HISTORY_LIMIT)
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(defaults.history_limit),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            stage_memory_mb: 8,
            user: "user".to_string(),
            hostname: "simos".to_string(),
            history_limit: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_default_registry, SettingValue, PROFILE};

    #[test]
    fn test_defaults_match_registry() {
        let registry = create_default_registry();
        assert_eq!(KernelConfig::from_registry(&registry, PROFILE), KernelConfig::default());
        assert_eq!(ShellConfig::from_registry(&registry, PROFILE), ShellConfig::default());
    }

    #[test]
    fn test_seed_zero_means_entropy() {
        let mut registry = create_default_registry();
        assert_eq!(KernelConfig::from_registry(&registry, PROFILE).scheduler_seed, None);

        registry.set_override(PROFILE, keys::KERNEL_SCHEDULER_SEED, SettingValue::Integer(42));
        assert_eq!(KernelConfig::from_registry(&registry, PROFILE).scheduler_seed, Some(42));
    }

    #[test]
    fn test_negative_values_fall_back() {
        let mut registry = create_default_registry();
        registry.set_override(PROFILE, keys::KERNEL_MEMORY_TOTAL_MB, SettingValue::Integer(-5));
        registry.set_override(PROFILE, keys::KERNEL_TICK_INTERVAL_MS, SettingValue::Integer(0));

        let config = KernelConfig::from_registry(&registry, PROFILE);
        assert_eq!(config.memory_total_mb, 1024);
        assert_eq!(config.tick_interval_ms, 1);
    }

    #[test]
    fn test_shell_overrides() {
        let mut registry = create_default_registry();
        registry.set_override(PROFILE, keys::SHELL_USER, SettingValue::String("ada".into()));
        registry.set_override(PROFILE, keys::SHELL_HISTORY_LIMIT, SettingValue::Integer(5));

        let config = ShellConfig::from_registry(&registry, PROFILE);
        assert_eq!(config.user, "ada");
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.stage_memory_mb, 8);
    }
}
