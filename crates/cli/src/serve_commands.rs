use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Result,
    chatlay_config::{ChatlayConfig, discover_and_load},
    chatlay_gateway::GatewayState,
    clap::Args,
    tracing::{info, warn},
};

/// Config file selection plus the overlay settings the command line may
/// override.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Config file (TOML, YAML or JSON). Defaults to `./chatlay.*`, then
    /// `~/.config/chatlay/chatlay.*`.
    #[arg(long, env = "CHATLAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Route keys, separated by whitespace, commas or slashes. `default` is
    /// always added.
    #[arg(long, env = "CHATLAY_ROUTE_KEYS")]
    pub route_keys: Option<String>,

    /// Directory whose HTML/CSS/JS files replace the built-in overlay.
    #[arg(long, env = "CHATLAY_STATIC_PATH")]
    pub static_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub disable_gigantified_emotes: bool,
}

impl ConfigArgs {
    /// Load the effective config: file (or defaults) with flags on top.
    pub fn load(&self) -> Result<ChatlayConfig> {
        let mut config = discover_and_load(self.config.as_deref())?;
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut ChatlayConfig) {
        if let Some(keys) = &self.route_keys {
            config.overlay.route_keys = vec![keys.clone()];
        }
        if let Some(path) = &self.static_path {
            config.overlay.static_path = Some(path.clone());
        }
        if self.disable_gigantified_emotes {
            config.overlay.enable_gigantified_emotes = false;
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overlay: ConfigArgs,

    /// Address to listen on.
    #[arg(long, env = "CHATLAY_BIND")]
    pub bind: Option<String>,

    #[arg(long, env = "CHATLAY_PORT")]
    pub port: Option<u16>,
}

pub async fn handle_serve(args: ServeArgs) -> Result<()> {
    let config = args.overlay.load()?;
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let port = args.port.unwrap_or(config.server.port);

    let state = GatewayState::from_config(&config);
    state.start_routes(&config).await;

    #[cfg(unix)]
    let reloader = spawn_reload_on_hangup(Arc::clone(&state), args.overlay.clone())?;

    let shutdown_state = Arc::clone(&state);
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("shutting down");
        // Pending polls only return once their route is stopped.
        shutdown_state.registry.stop_all().await;
    };

    let result = chatlay_gateway::serve(Arc::clone(&state), &bind, port, shutdown).await;

    #[cfg(unix)]
    reloader.abort();
    state.registry.stop_all().await;
    result
}

/// Re-read the config on SIGHUP and restart the routes it names.
#[cfg(unix)]
fn spawn_reload_on_hangup(
    state: Arc<GatewayState>,
    overlay: ConfigArgs,
) -> Result<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("SIGHUP received, reloading config");
            match overlay.load() {
                Ok(config) => state.apply_config(&config).await,
                Err(e) => warn!(error = %format!("{e:#}"), "config reload failed, keeping current routes"),
            }
        }
    }))
}

/// Print the route keys the effective config would run.
pub fn handle_routes(args: &ConfigArgs) -> Result<()> {
    for key in args.load()?.route_keys() {
        println!("{key}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatlay.toml");
        std::fs::write(
            &path,
            "[overlay]\nroute_keys = [\"from-file\"]\nstatic_path = \"/srv/a\"\n",
        )
        .unwrap();

        let args = ConfigArgs {
            config: Some(path),
            route_keys: Some("main, alt".into()),
            static_path: None,
            disable_gigantified_emotes: true,
        };
        let config = args.load().unwrap();
        assert_eq!(config.route_keys(), vec!["main", "alt", "default"]);
        assert_eq!(config.overlay.static_path, Some(PathBuf::from("/srv/a")));
        assert!(!config.overlay.enable_gigantified_emotes);
    }

    #[test]
    fn file_values_kept_without_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatlay.json");
        std::fs::write(&path, r#"{"overlay": {"route_keys": ["stream"]}}"#).unwrap();

        let args = ConfigArgs {
            config: Some(path),
            ..ConfigArgs::default()
        };
        let config = args.load().unwrap();
        assert_eq!(config.route_keys(), vec!["stream", "default"]);
        assert!(config.overlay.enable_gigantified_emotes);
    }

    #[test]
    fn missing_explicit_config_fails() {
        let args = ConfigArgs {
            config: Some(PathBuf::from("/definitely/not/chatlay.toml")),
            ..ConfigArgs::default()
        };
        assert!(args.load().is_err());
    }
}
