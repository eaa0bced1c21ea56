use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    tokio::{sync::RwLock, time::MissedTickBehavior},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

use crate::{
    clock::Clock,
    error::{ChannelError, Result},
    event::{ChatMessage, Event, validate_message_id},
    gigantify::{GigantifyCache, TriggerOutcome},
    log::{EventLog, NO_EVENTS_TOKEN},
    poll::{PollBatch, evaluate},
};

// ── Options ──────────────────────────────────────────────────────────────────

/// Timing knobs shared by every Channel of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Delay between re-checks of a pending poll.
    pub poll_interval: Duration,
    /// Age after which log entries are purged.
    pub event_ttl: Duration,
    pub event_sweep_interval: Duration,
    /// How long an unmatched gigantify trigger waits for its message.
    pub gigantify_ttl: Duration,
    pub gigantify_sweep_interval: Duration,
    /// How old a logged message may be and still match a new trigger.
    pub gigantify_match_window: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            event_ttl: Duration::from_secs(30 * 60),
            event_sweep_interval: Duration::from_secs(120),
            gigantify_ttl: Duration::from_secs(5),
            gigantify_sweep_interval: Duration::from_secs(5),
            gigantify_match_window: Duration::from_secs(2),
        }
    }
}

impl ChannelOptions {
    /// The same options with zero periods raised to one millisecond.
    pub fn with_nonzero_periods(self) -> Self {
        let floor = |period: Duration| period.max(Duration::from_millis(1));
        Self {
            poll_interval: floor(self.poll_interval),
            event_sweep_interval: floor(self.event_sweep_interval),
            gigantify_sweep_interval: floor(self.gigantify_sweep_interval),
            ..self
        }
    }
}

// ── Channel ──────────────────────────────────────────────────────────────────

struct ChannelState {
    log: EventLog,
    pending: GigantifyCache,
}

/// The event log and poll engine of one route.
///
/// Every mutation runs under a single write guard, so readers only ever see
/// fully applied operations. The only suspension point is the wait between
/// poll re-checks.
pub struct Channel {
    key: String,
    options: ChannelOptions,
    clock: Arc<dyn Clock>,
    state: RwLock<ChannelState>,
    cancel: CancellationToken,
    pending_polls: AtomicUsize,
}

/// Keeps the pending-poll gauge honest when a poll future is dropped mid-wait.
struct PendingPoll<'a>(&'a AtomicUsize);

impl<'a> PendingPoll<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for PendingPoll<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Channel {
    pub(crate) fn new(key: &str, options: ChannelOptions, clock: Arc<dyn Clock>) -> Self {
        let options = options.with_nonzero_periods();
        Self {
            key: key.to_string(),
            options,
            clock,
            state: RwLock::new(ChannelState {
                log: EventLog::new(rand::random()),
                pending: GigantifyCache::new(
                    options.gigantify_ttl,
                    options.gigantify_match_window,
                ),
            }),
            cancel: CancellationToken::new(),
            pending_polls: AtomicUsize::new(0),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Number of poll requests currently waiting for events.
    pub fn pending_polls(&self) -> usize {
        self.pending_polls.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.log.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.log.is_empty()
    }

    pub async fn pending_gigantify_count(&self) -> usize {
        self.state.read().await.pending.len()
    }

    /// Cancel pending polls and background sweeps. Idempotent.
    pub(crate) fn stop(&self) {
        self.cancel.cancel();
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Append an `add` event for `message`, stamped `timestamp` or now.
    pub async fn post(&self, message: ChatMessage, timestamp: Option<u64>) -> Result<()> {
        validate_message_id(&message.id)?;

        let now = self.clock.now_ms();
        let mut state = self.state.write().await;
        let ChannelState { log, pending } = &mut *state;

        if log.contains_message(&message.id) {
            debug!(route = %self.key, message_id = %message.id, "duplicate message ignored");
            return Ok(());
        }

        let message_id = message.id.clone();
        log.append_message(message.clone(), timestamp.unwrap_or(now));
        if pending.on_message_added(log, &message, now) {
            debug!(route = %self.key, message_id = %message_id, "pending gigantify matched new message");
        }
        debug!(route = %self.key, message_id = %message_id, total = log.len(), "message received");
        Ok(())
    }

    /// Drop the whole log, leaving a single `clear` event.
    pub async fn clear(&self) {
        let now = self.clock.now_ms();
        self.state.write().await.log.reset(now);
        info!(route = %self.key, "all messages cleared");
    }

    /// Retract a visible message. Unknown ids are logged and ignored.
    pub async fn delete_message(&self, message_id: &str) {
        if message_id.is_empty() {
            debug!(route = %self.key, "delete ignored: \"messageId\" is required");
            return;
        }
        let now = self.clock.now_ms();
        if self.state.write().await.log.retract(message_id, now) {
            debug!(route = %self.key, message_id, "message deleted");
        } else {
            debug!(route = %self.key, message_id, "message not found for deletion");
        }
    }

    /// Retract every visible message from `username`, in log order.
    pub async fn delete_messages_by_user(&self, username: &str) -> Result<()> {
        if username.is_empty() {
            return Err(ChannelError::InvalidArgument("username"));
        }
        let now = self.clock.now_ms();
        let mut state = self.state.write().await;
        let targets = state.log.visible_ids_from(username);
        if targets.is_empty() {
            debug!(route = %self.key, username, "no messages found for user");
            return Ok(());
        }
        for message_id in &targets {
            state.log.retract(message_id, now);
        }
        info!(route = %self.key, username, count = targets.len(), "deleted messages for user");
        Ok(())
    }

    /// Append a `gigantify` event for `message_id`. The message itself is
    /// left as it is.
    pub async fn mark_gigantified(&self, message_id: &str) -> Result<()> {
        if message_id.is_empty() {
            return Err(ChannelError::InvalidArgument("messageId"));
        }
        let now = self.clock.now_ms();
        self.state
            .write()
            .await
            .log
            .append_gigantify(message_id, now);
        debug!(route = %self.key, message_id, "message gigantified");
        Ok(())
    }

    /// Handle an "emote enlarged" power-up for the utterance
    /// `(username, raw_text)`.
    pub async fn on_gigantify_trigger(
        &self,
        username: &str,
        raw_text: &str,
    ) -> Result<TriggerOutcome> {
        if username.is_empty() {
            return Err(ChannelError::InvalidArgument("username"));
        }
        if raw_text.is_empty() {
            return Err(ChannelError::InvalidArgument("rawText"));
        }
        let now = self.clock.now_ms();
        let mut state = self.state.write().await;
        let ChannelState { log, pending } = &mut *state;
        let outcome = pending.on_trigger(log, username, raw_text, now);
        match &outcome {
            TriggerOutcome::Matched { message_id } => {
                debug!(route = %self.key, username, message_id = %message_id, "gigantify matched logged message");
            },
            TriggerOutcome::Pending => {
                debug!(route = %self.key, username, "gigantify waiting for its message");
            },
        }
        Ok(outcome)
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Events after `after`, or the whole log for an empty/unknown token.
    pub async fn snapshot(&self, after: &str) -> Vec<Event> {
        self.state.read().await.log.snapshot(after).to_vec()
    }

    /// One non-blocking evaluation of the poll protocol.
    pub async fn check(&self, token: &str) -> Option<PollBatch> {
        evaluate(self.state.read().await.log.snapshot(token))
    }

    /// Wait until events after `token` are visible.
    ///
    /// Re-checks every `poll_interval` with the same token. Returns `None`
    /// once the channel is stopped.
    pub async fn poll(&self, token: &str) -> Option<PollBatch> {
        let _pending = PendingPoll::enter(&self.pending_polls);

        if !token.is_empty()
            && token != NO_EVENTS_TOKEN
            && !self.state.read().await.log.resolves(token)
        {
            debug!(route = %self.key, token, "poll token not found, resyncing from the start");
        }

        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            if let Some(batch) = self.check(token).await {
                debug!(route = %self.key, token, count = batch.events.len(), "returning events");
                return Some(batch);
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                _ = tokio::time::sleep(self.options.poll_interval) => {},
            }
        }
    }

    // ── Sweeps ───────────────────────────────────────────────────────────

    /// Purge log entries older than the TTL. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let cutoff = self
            .clock
            .now_ms()
            .saturating_sub(self.options.event_ttl.as_millis() as u64);
        let mut state = self.state.write().await;
        let purged = state.log.purge_older_than(cutoff);
        if purged > 0 {
            info!(route = %self.key, purged, remaining = state.log.len(), "cleaned up old messages");
        }
        purged
    }

    /// Drop gigantify triggers that never met their message.
    pub async fn sweep_gigantify(&self) -> usize {
        let now = self.clock.now_ms();
        let dropped = self.state.write().await.pending.evict_expired(now);
        if dropped > 0 {
            debug!(route = %self.key, dropped, "expired pending gigantify triggers");
        }
        dropped
    }

    /// Run both periodic sweeps until the channel is stopped.
    pub(crate) async fn run_sweeps(self: Arc<Self>) {
        let mut events = tokio::time::interval(self.options.event_sweep_interval);
        let mut pending = tokio::time::interval(self.options.gigantify_sweep_interval);
        events.set_missed_tick_behavior(MissedTickBehavior::Delay);
        pending.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = events.tick() => {
                    self.sweep_expired().await;
                },
                _ = pending.tick() => {
                    self.sweep_gigantify().await;
                },
            }
        }
        debug!(route = %self.key, "sweeps stopped");
    }
}
