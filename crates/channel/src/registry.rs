use std::{collections::HashMap, sync::Arc};

use {
    tokio::{sync::RwLock, task::JoinHandle},
    tracing::{debug, info, warn},
};

use crate::{
    channel::{Channel, ChannelOptions},
    clock::{Clock, SystemClock},
};

struct Route {
    channel: Arc<Channel>,
    sweeper: JoinHandle<()>,
}

/// Owns the running Channels, one per route key.
///
/// `start`/`stop`/`reload` are meant to be driven from one control path
/// (startup and config reload); lookups may come from anywhere.
pub struct RouteRegistry {
    options: ChannelOptions,
    clock: Arc<dyn Clock>,
    routes: RwLock<HashMap<String, Route>>,
}

impl RouteRegistry {
    pub fn new(options: ChannelOptions) -> Self {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    pub fn with_clock(options: ChannelOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            options,
            clock,
            routes: RwLock::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> ChannelOptions {
        self.options
    }

    /// Launch a Channel and its sweep task for every new, non-empty key.
    fn launch_into<I, S>(&self, routes: &mut HashMap<String, Route>, route_keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in route_keys {
            let key = key.as_ref();
            if key.is_empty() {
                warn!("ignoring empty route key");
                continue;
            }
            if routes.contains_key(key) {
                debug!(route = key, "route already running");
                continue;
            }
            let channel = Arc::new(Channel::new(key, self.options, Arc::clone(&self.clock)));
            let sweeper = tokio::spawn(Arc::clone(&channel).run_sweeps());
            routes.insert(key.to_string(), Route { channel, sweeper });
            info!(route = key, "route started");
        }
    }

    /// Ensure a running Channel exists for each key. Keys already running
    /// are left alone.
    pub async fn start<I, S>(&self, route_keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut routes = self.routes.write().await;
        self.launch_into(&mut routes, route_keys);
    }

    /// Stop one route: cancel its pending polls and sweeps, then discard it.
    /// Returns `false` if it was not running.
    pub async fn stop(&self, route_key: &str) -> bool {
        let route = self.routes.write().await.remove(route_key);
        match route {
            Some(route) => {
                shutdown(route_key, route).await;
                true
            },
            None => {
                debug!(route = route_key, "route not running");
                false
            },
        }
    }

    pub async fn stop_all(&self) {
        let drained: Vec<(String, Route)> = self.routes.write().await.drain().collect();
        for (key, route) in drained {
            shutdown(&key, route).await;
        }
    }

    /// Replace the whole fleet: every running route is stopped and the
    /// given keys start fresh.
    ///
    /// The swap happens under one write guard, so lookups see either the old
    /// Channel or the new one for a key present in both sets, never neither.
    pub async fn reload<I, S>(&self, route_keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let retired: Vec<(String, Route)> = {
            let mut routes = self.routes.write().await;
            let retired: Vec<(String, Route)> = routes.drain().collect();
            self.launch_into(&mut routes, route_keys);
            retired
        };
        for (key, route) in retired {
            shutdown(&key, route).await;
        }
    }

    pub async fn get(&self, route_key: &str) -> Option<Arc<Channel>> {
        self.routes
            .read()
            .await
            .get(route_key)
            .map(|route| Arc::clone(&route.channel))
    }

    /// Running route keys, sorted.
    pub async fn route_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.routes.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.routes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.routes.read().await.is_empty()
    }

    /// Poll requests waiting across every route.
    pub async fn pending_polls(&self) -> usize {
        self.routes
            .read()
            .await
            .values()
            .map(|route| route.channel.pending_polls())
            .sum()
    }
}

async fn shutdown(route_key: &str, route: Route) {
    route.channel.stop();
    if let Err(e) = route.sweeper.await {
        warn!(route = route_key, error = %e, "sweep task ended abnormally");
    }
    info!(route = route_key, "route stopped");
}

#[cfg(test)]
mod tests {
    use std::{
        future::Future,
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::{clock::ManualClock, event::ChatMessage};

    const U1: &str = "6c9d6b7e-2f41-4d3a-9b8c-0e1f2a3b4c5d";

    fn registry() -> RouteRegistry {
        RouteRegistry::new(ChannelOptions {
            poll_interval: Duration::from_millis(10),
            ..ChannelOptions::default()
        })
    }

    #[tokio::test]
    async fn start_is_idempotent_per_key() {
        let registry = registry();
        registry.start(["default", "alt"]).await;
        let first = registry.get("default").await.unwrap();
        first
            .post(ChatMessage::new(U1, "alice", "hi"), None)
            .await
            .unwrap();

        registry.start(["default"]).await;
        let again = registry.get("default").await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(again.len().await, 1);
        assert_eq!(registry.route_keys().await, vec!["alt", "default"]);
    }

    #[tokio::test]
    async fn stop_discards_channel_and_is_idempotent() {
        let registry = registry();
        registry.start(["default"]).await;
        let channel = registry.get("default").await.unwrap();

        assert!(registry.stop("default").await);
        assert!(!channel.is_running());
        assert!(registry.get("default").await.is_none());
        assert!(!registry.stop("default").await);
    }

    #[tokio::test]
    async fn stop_cancels_pending_polls() {
        let registry = registry();
        registry.start(["default"]).await;
        let channel = registry.get("default").await.unwrap();
        let waiter = tokio::spawn(async move { channel.poll("").await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(registry.pending_polls().await, 1);
        registry.stop("default").await;
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn reload_replaces_the_fleet() {
        let registry = registry();
        registry.start(["default", "old"]).await;
        let before = registry.get("default").await.unwrap();

        registry.reload(["default", "new"]).await;
        assert_eq!(registry.route_keys().await, vec!["default", "new"]);
        assert!(!before.is_running());
        let after = registry.get("default").await.unwrap();
        assert!(after.is_running());
        assert!(after.is_empty().await);
    }

    #[tokio::test]
    async fn empty_keys_are_skipped() {
        let registry = registry();
        registry.start(["", "default"]).await;
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn stop_all_empties_registry() {
        let registry = registry();
        registry.start(["a", "b"]).await;
        registry.stop_all().await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reload_never_hides_kept_routes() {
        let registry = Arc::new(registry());
        registry.start(["default"]).await;
        let done = Arc::new(AtomicBool::new(false));

        let watcher = {
            let registry = Arc::clone(&registry);
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                let mut misses = 0usize;
                loop {
                    if registry.get("default").await.is_none() {
                        misses += 1;
                    }
                    if done.load(Ordering::Relaxed) {
                        break misses;
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..100 {
            registry.reload(["default"]).await;
        }
        done.store(true, Ordering::Relaxed);
        assert_eq!(watcher.await.unwrap(), 0);
    }

    async fn eventually<F, Fut>(mut check: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for _ in 0..200 {
            if check().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    async fn assert_background_sweeps(options: ChannelOptions) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let registry = RouteRegistry::with_clock(options, clock.clone());
        registry.start(["default"]).await;
        let channel = registry.get("default").await.unwrap();

        channel
            .post(ChatMessage::new(U1, "alice", "hi"), None)
            .await
            .unwrap();
        channel.on_gigantify_trigger("bob", "poggers").await.unwrap();
        assert_eq!(channel.len().await, 1);
        assert_eq!(channel.pending_gigantify_count().await, 1);

        clock.advance(Duration::from_secs(31 * 60));
        let swept = eventually(|| {
            let channel = Arc::clone(&channel);
            async move {
                channel.is_empty().await && channel.pending_gigantify_count().await == 0
            }
        })
        .await;
        assert!(swept, "log and pending triggers should expire on their own");
        registry.stop_all().await;
    }

    #[tokio::test]
    async fn sweeps_expire_entries_in_the_background() {
        assert_background_sweeps(ChannelOptions {
            poll_interval: Duration::from_millis(10),
            event_sweep_interval: Duration::from_millis(10),
            gigantify_sweep_interval: Duration::from_millis(10),
            ..ChannelOptions::default()
        })
        .await;
    }

    #[tokio::test]
    async fn zero_sweep_intervals_keep_sweeping() {
        assert_background_sweeps(ChannelOptions {
            poll_interval: Duration::ZERO,
            event_sweep_interval: Duration::ZERO,
            gigantify_sweep_interval: Duration::ZERO,
            ..ChannelOptions::default()
        })
        .await;
    }
}
