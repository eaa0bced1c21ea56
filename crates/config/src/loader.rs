use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::ChatlayConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "chatlay.toml",
    "chatlay.yaml",
    "chatlay.yml",
    "chatlay.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<ChatlayConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    let config = parse_config(&raw, path)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    config
        .timing
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Resolve the effective config.
///
/// An explicit path must load; its errors are returned. Otherwise the
/// standard locations are searched:
/// 1. `./chatlay.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/chatlay/chatlay.{toml,yaml,yml,json}` (user-global)
///
/// A discovered file that fails to load is reported and defaults are used.
pub fn discover_and_load(explicit: Option<&Path>) -> anyhow::Result<ChatlayConfig> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading config");
        return load_config(path);
    }

    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return Ok(ChatlayConfig::default());
    };

    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{e:#}"), "failed to load config, using defaults");
            Ok(ChatlayConfig::default())
        },
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Returns `~/.config/chatlay/` on all platforms.
pub fn config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".config").join("chatlay"))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ChatlayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
