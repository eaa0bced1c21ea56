use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    chatlay_channel::{Channel, ChannelOptions, RouteRegistry},
    chatlay_config::{ChatlayConfig, TimingConfig},
    tracing::info,
};

use crate::{assets::StaticResolver, error::ApiError};

// ── Gateway state ────────────────────────────────────────────────────────────

/// Shared gateway runtime state, wrapped in Arc for use across handlers.
pub struct GatewayState {
    /// Running overlay Channels, keyed by route.
    pub registry: RouteRegistry,
    /// Overlay HTML/CSS/JS lookup.
    pub assets: StaticResolver,
    enable_gigantified_emotes: AtomicBool,
    /// Server version string.
    pub version: String,
}

impl GatewayState {
    pub fn new(
        registry: RouteRegistry,
        assets: StaticResolver,
        enable_gigantified_emotes: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            assets,
            enable_gigantified_emotes: AtomicBool::new(enable_gigantified_emotes),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Build state from a loaded config. Routes are not started yet.
    pub fn from_config(config: &ChatlayConfig) -> Arc<Self> {
        Self::new(
            RouteRegistry::new(channel_options(&config.timing)),
            StaticResolver::new(config.overlay.static_path.clone()),
            config.overlay.enable_gigantified_emotes,
        )
    }

    /// The running Channel for `route_key`.
    pub async fn channel(&self, route_key: &str) -> Result<Arc<Channel>, ApiError> {
        self.registry
            .get(route_key)
            .await
            .ok_or_else(|| ApiError::RouteNotFound(route_key.to_string()))
    }

    pub fn gigantified_emotes_enabled(&self) -> bool {
        self.enable_gigantified_emotes.load(Ordering::Relaxed)
    }

    pub fn set_gigantified_emotes_enabled(&self, enabled: bool) {
        self.enable_gigantified_emotes
            .store(enabled, Ordering::Relaxed);
    }

    /// Start the routes named by `config` alongside any already running.
    pub async fn start_routes(&self, config: &ChatlayConfig) {
        self.registry.start(config.route_keys()).await;
    }

    /// Apply a reloaded config: restart every route and swap the overlay
    /// settings. Timings only take effect on the next process start.
    pub async fn apply_config(&self, config: &ChatlayConfig) {
        let keys = config.route_keys();
        self.assets
            .set_override_dir(config.overlay.static_path.clone())
            .await;
        self.set_gigantified_emotes_enabled(config.overlay.enable_gigantified_emotes);
        self.registry.reload(&keys).await;
        info!(routes = ?keys, "overlay config applied");
    }
}

/// Channel timings from the config's `[timing]` section.
pub fn channel_options(timing: &TimingConfig) -> ChannelOptions {
    ChannelOptions {
        poll_interval: Duration::from_millis(timing.poll_interval_ms),
        event_ttl: Duration::from_secs(timing.event_ttl_secs),
        event_sweep_interval: Duration::from_secs(timing.event_sweep_interval_secs),
        gigantify_ttl: Duration::from_millis(timing.gigantify_ttl_ms),
        gigantify_sweep_interval: Duration::from_millis(timing.gigantify_sweep_interval_ms),
        gigantify_match_window: Duration::from_millis(timing.gigantify_match_window_ms),
    }
}
