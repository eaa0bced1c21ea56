//! Correlation of "gigantify an emote" power-ups with chat messages.
//!
//! The power-up and the chat message describing the same utterance are
//! separate host events with no ordering guarantee. A trigger that finds its
//! message already in the log marks it at once; otherwise it parks here keyed
//! by `(username, rawText)` until the message is posted or the entry expires.

use std::{collections::HashMap, time::Duration};

use tracing::debug;

use crate::{event::ChatMessage, log::EventLog};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Utterance {
    username: String,
    raw_text: String,
}

impl Utterance {
    fn new(username: &str, raw_text: &str) -> Self {
        Self {
            username: username.to_string(),
            raw_text: raw_text.to_string(),
        }
    }
}

/// What a trigger did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A recent message matched; a `gigantify` event now references it.
    Matched { message_id: String },
    /// No match yet; the trigger waits for its message.
    Pending,
}

/// Pending triggers with the time they arrived.
#[derive(Debug)]
pub struct GigantifyCache {
    entries: HashMap<Utterance, u64>,
    ttl: Duration,
    match_window: Duration,
}

impl GigantifyCache {
    /// `ttl` bounds how long a trigger waits for its message; `match_window`
    /// bounds how old an already-logged message may be to match a trigger.
    pub fn new(ttl: Duration, match_window: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            match_window,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, username: &str, raw_text: &str) -> bool {
        self.entries
            .contains_key(&Utterance::new(username, raw_text))
    }

    /// Match the trigger against the log or park it. Arguments are validated
    /// by the caller.
    pub fn on_trigger(
        &mut self,
        log: &mut EventLog,
        username: &str,
        raw_text: &str,
        now_ms: u64,
    ) -> TriggerOutcome {
        let since = now_ms.saturating_sub(self.match_window.as_millis() as u64);
        let found = log
            .find_recent(username, raw_text, since)
            .and_then(|e| e.message_id.clone());

        match found {
            Some(message_id) => {
                if log.is_gigantified(&message_id) {
                    debug!(message_id = %message_id, "message already gigantified");
                } else {
                    log.append_gigantify(&message_id, now_ms);
                }
                TriggerOutcome::Matched { message_id }
            },
            None => {
                self.entries
                    .insert(Utterance::new(username, raw_text), now_ms);
                TriggerOutcome::Pending
            },
        }
    }

    /// Called right after `message` was appended. Consumes a live pending
    /// trigger for the same utterance and marks the message.
    pub fn on_message_added(
        &mut self,
        log: &mut EventLog,
        message: &ChatMessage,
        now_ms: u64,
    ) -> bool {
        let key = Utterance::new(&message.username, &message.raw_text);
        let Some(arrived) = self.entries.remove(&key) else {
            return false;
        };
        if self.is_expired(arrived, now_ms) {
            debug!(username = %message.username, "pending gigantify expired before its message arrived");
            return false;
        }
        log.append_gigantify(&message.id, now_ms);
        true
    }

    fn is_expired(&self, arrived_ms: u64, now_ms: u64) -> bool {
        now_ms.saturating_sub(arrived_ms) > self.ttl.as_millis() as u64
    }

    /// Drop triggers older than the TTL. Returns how many were dropped.
    pub fn evict_expired(&mut self, now_ms: u64) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl.as_millis() as u64;
        self.entries
            .retain(|_, arrived| now_ms.saturating_sub(*arrived) <= ttl);
        before - self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventAction;

    const U1: &str = "6c9d6b7e-2f41-4d3a-9b8c-0e1f2a3b4c5d";

    fn cache() -> GigantifyCache {
        GigantifyCache::new(Duration::from_secs(5), Duration::from_secs(2))
    }

    fn gigantified(log: &EventLog) -> Vec<String> {
        log.iter()
            .filter(|e| e.action == EventAction::Gigantify)
            .filter_map(|e| e.message_id.clone())
            .collect()
    }

    #[test]
    fn trigger_after_message_matches_immediately() {
        let mut log = EventLog::new(1);
        let mut cache = cache();
        log.append_message(ChatMessage::new(U1, "alice", "gg"), 10_000);

        let outcome = cache.on_trigger(&mut log, "alice", "gg", 11_500);
        assert_eq!(outcome, TriggerOutcome::Matched {
            message_id: U1.to_string()
        });
        assert_eq!(gigantified(&log), vec![U1.to_string()]);
        assert!(cache.is_empty());
    }

    #[test]
    fn repeated_trigger_marks_message_once() {
        let mut log = EventLog::new(1);
        let mut cache = cache();
        log.append_message(ChatMessage::new(U1, "alice", "gg"), 10_000);

        for now in [10_500, 11_000] {
            assert_eq!(
                cache.on_trigger(&mut log, "alice", "gg", now),
                TriggerOutcome::Matched {
                    message_id: U1.to_string()
                }
            );
        }
        assert_eq!(gigantified(&log), vec![U1.to_string()]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn stale_message_does_not_match() {
        let mut log = EventLog::new(1);
        let mut cache = cache();
        log.append_message(ChatMessage::new(U1, "alice", "gg"), 10_000);

        let outcome = cache.on_trigger(&mut log, "alice", "gg", 12_001);
        assert_eq!(outcome, TriggerOutcome::Pending);
        assert!(gigantified(&log).is_empty());
        assert!(cache.contains("alice", "gg"));
    }

    #[test]
    fn message_after_trigger_consumes_entry() {
        let mut log = EventLog::new(1);
        let mut cache = cache();
        assert_eq!(
            cache.on_trigger(&mut log, "bob", "poggers", 1_000),
            TriggerOutcome::Pending
        );

        let message = ChatMessage::new(U1, "bob", "poggers");
        log.append_message(message.clone(), 3_000);
        assert!(cache.on_message_added(&mut log, &message, 3_000));
        assert_eq!(gigantified(&log), vec![U1.to_string()]);
        assert!(cache.is_empty());

        // Only the first matching message is marked.
        assert!(!cache.on_message_added(&mut log, &message, 3_100));
    }

    #[test]
    fn different_text_does_not_consume() {
        let mut log = EventLog::new(1);
        let mut cache = cache();
        cache.on_trigger(&mut log, "bob", "poggers", 1_000);
        let message = ChatMessage::new(U1, "bob", "other");
        assert!(!cache.on_message_added(&mut log, &message, 1_500));
        assert!(cache.contains("bob", "poggers"));
    }

    #[test]
    fn expired_entries_are_evicted() {
        let mut log = EventLog::new(1);
        let mut cache = cache();
        cache.on_trigger(&mut log, "bob", "poggers", 1_000);
        assert_eq!(cache.evict_expired(6_000), 0);
        assert_eq!(cache.evict_expired(6_001), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn expired_entry_never_marks_late_message() {
        let mut log = EventLog::new(1);
        let mut cache = cache();
        cache.on_trigger(&mut log, "bob", "poggers", 1_000);
        let message = ChatMessage::new(U1, "bob", "poggers");
        log.append_message(message.clone(), 7_000);
        assert!(!cache.on_message_added(&mut log, &message, 7_000));
        assert!(gigantified(&log).is_empty());
    }
}
