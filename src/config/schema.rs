//! Configuration schema definitions.
//!
//! Settings for the router itself, deserialized from TOML. The mount table
//! lives in its own JSON file (see [`crate::config::fstab`]) so it can be
//! reloaded without touching these settings.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Mount table location and reload behaviour.
    pub mounts: MountsConfig,

    /// Scheme classification.
    pub schemes: SchemesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// When a scheduled tick actually reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Reload on every tick.
    #[default]
    Always,
    /// Reload only when the file's modification time changed since the last load.
    OnChange,
}

/// Mount table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MountsConfig {
    /// Path to the JSON mount table.
    pub fstab_path: String,

    /// Seconds between scheduled reloads; 0 disables them.
    pub reload_period_secs: u64,

    /// Tick gating policy.
    pub reload_policy: ReloadPolicy,

    /// Also reload when the file changes on disk.
    pub watch: bool,
}

impl Default for MountsConfig {
    fn default() -> Self {
        Self {
            fstab_path: "./fstab/fstab.json".to_string(),
            reload_period_secs: 10,
            reload_policy: ReloadPolicy::Always,
            watch: false,
        }
    }
}

/// Scheme classification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemesConfig {
    /// Schemes whose origins are reverse-proxied.
    pub proxy: Vec<String>,
}

impl Default for SchemesConfig {
    fn default() -> Self {
        Self {
            proxy: vec!["http".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: RouterConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.mounts.reload_period_secs, 10);
        assert_eq!(config.mounts.reload_policy, ReloadPolicy::Always);
        assert_eq!(config.schemes.proxy, vec!["http"]);
    }

    #[test]
    fn test_partial_sections() {
        let config: RouterConfig = toml::from_str(
            r#"
            [mounts]
            fstab_path = "/etc/router/fstab.json"
            reload_policy = "on_change"
            watch = true

            [schemes]
            proxy = ["http", "https"]
            "#,
        )
        .unwrap();

        assert_eq!(config.mounts.fstab_path, "/etc/router/fstab.json");
        assert_eq!(config.mounts.reload_period_secs, 10);
        assert_eq!(config.mounts.reload_policy, ReloadPolicy::OnChange);
        assert!(config.mounts.watch);
        assert_eq!(config.schemes.proxy.len(), 2);
    }
}
