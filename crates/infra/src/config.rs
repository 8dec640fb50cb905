//! Engine configuration.
//!
//! Defaults are usable as-is; `from_env` overrides them from `COOPBOOKS_*` variables.
//! Invalid values are logged and ignored.

use tracing::warn;

pub const ENV_PROVISION_MAX_ATTEMPTS: &str = "COOPBOOKS_PROVISION_MAX_ATTEMPTS";
pub const ENV_AUDIT_ENABLED: &str = "COOPBOOKS_AUDIT_ENABLED";

/// Priorities of the built-in hooks. Lower runs first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookPriorities {
    /// Must run before `validation` on `before_create`.
    pub day_book_gate: i32,
    pub account_lock: i32,
    pub validation: i32,
    pub audit: i32,
    pub cancel_stub: i32,
}

impl Default for HookPriorities {
    fn default() -> Self {
        Self {
            day_book_gate: 10,
            account_lock: 10,
            validation: 100,
            audit: 1000,
            cancel_stub: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerConfig {
    /// Attempts per owner when a commit is rejected by a unique constraint.
    pub max_attempts: u32,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl ProvisionerConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    pub enabled: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub provisioner: ProvisionerConfig,
    pub audit: AuditConfig,
    pub priorities: HookPriorities,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (tests inject a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_PROVISION_MAX_ATTEMPTS) {
            match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => config.provisioner.max_attempts = n,
                _ => warn!(
                    variable = ENV_PROVISION_MAX_ATTEMPTS,
                    value = %raw,
                    "invalid value; using default"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_AUDIT_ENABLED) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.audit.enabled = true,
                "0" | "false" | "no" | "off" => config.audit.enabled = false,
                _ => warn!(
                    variable = ENV_AUDIT_ENABLED,
                    value = %raw,
                    "invalid value; using default"
                ),
            }
        }

        config
    }

    pub fn with_provisioner(mut self, provisioner: ProvisionerConfig) -> Self {
        self.provisioner = provisioner;
        self
    }

    pub fn with_audit_enabled(mut self, enabled: bool) -> Self {
        self.audit.enabled = enabled;
        self
    }

    pub fn with_priorities(mut self, priorities: HookPriorities) -> Self {
        self.priorities = priorities;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.provisioner.max_attempts, 3);
        assert!(config.audit.enabled);
        assert!(config.priorities.day_book_gate < config.priorities.validation);
    }

    #[test]
    fn variables_override_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_PROVISION_MAX_ATTEMPTS, "5"),
            (ENV_AUDIT_ENABLED, "off"),
        ]));
        assert_eq!(config.provisioner.max_attempts, 5);
        assert!(!config.audit.enabled);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_PROVISION_MAX_ATTEMPTS, "0"),
            (ENV_AUDIT_ENABLED, "maybe"),
        ]));
        assert_eq!(config, EngineConfig::default());
    }
}
