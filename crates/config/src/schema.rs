//! Config schema: HTTP server, overlay routes, channel timings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::route_keys::normalize_route_keys;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatlayConfig {
    pub server: ServerConfig,
    pub overlay: OverlayConfig,
    pub timing: TimingConfig,
}

impl ChatlayConfig {
    /// Route keys to run: configured keys plus the implicit default.
    pub fn route_keys(&self) -> Vec<String> {
        normalize_route_keys(&self.overlay.route_keys)
    }
}

/// Where the HTTP server listens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 7473,
        }
    }
}

/// What the overlays serve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Extra route keys. Entries may themselves hold several keys separated
    /// by whitespace, commas or slashes.
    pub route_keys: Vec<String>,

    /// Directory with HTML/CSS/JS files overriding the built-in ones.
    pub static_path: Option<PathBuf>,

    /// Passed to the renderer with every poll response.
    pub enable_gigantified_emotes: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            route_keys: Vec::new(),
            static_path: None,
            enable_gigantified_emotes: true,
        }
    }
}

/// Poll, retention and correlation timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_interval_ms: u64,
    pub event_ttl_secs: u64,
    pub event_sweep_interval_secs: u64,
    pub gigantify_ttl_ms: u64,
    pub gigantify_sweep_interval_ms: u64,
    pub gigantify_match_window_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 200,
            event_ttl_secs: 30 * 60,
            event_sweep_interval_secs: 120,
            gigantify_ttl_ms: 5_000,
            gigantify_sweep_interval_ms: 5_000,
            gigantify_match_window_ms: 2_000,
        }
    }
}

impl TimingConfig {
    /// Every period must be non-zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        let periods = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("event_sweep_interval_secs", self.event_sweep_interval_secs),
            ("gigantify_sweep_interval_ms", self.gigantify_sweep_interval_ms),
        ];
        for (name, value) in periods {
            if value == 0 {
                anyhow::bail!("timing.{name} must be greater than zero");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ChatlayConfig = toml::from_str(
            r#"
            [overlay]
            route_keys = ["stream, backup"]

            [timing]
            poll_interval_ms = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.server, ServerConfig::default());
        assert!(config.overlay.enable_gigantified_emotes);
        assert_eq!(config.timing.poll_interval_ms, 50);
        assert_eq!(config.timing.event_ttl_secs, 1_800);
        assert_eq!(config.route_keys(), vec!["stream", "backup", "default"]);
    }

    #[test]
    fn empty_config_runs_default_route() {
        assert_eq!(ChatlayConfig::default().route_keys(), vec!["default"]);
    }

    #[test]
    fn zero_periods_are_rejected() {
        assert!(TimingConfig::default().validate().is_ok());
        for field in [
            "poll_interval_ms",
            "event_sweep_interval_secs",
            "gigantify_sweep_interval_ms",
        ] {
            let config: ChatlayConfig =
                toml::from_str(&format!("[timing]\n{field} = 0\n")).unwrap();
            let err = config.timing.validate().unwrap_err();
            assert!(err.to_string().contains(field), "{field}: {err}");
        }
    }
}
