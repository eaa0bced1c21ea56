//! Append-only event log of a single route.
//!
//! Entries are kept in insertion order, which is also ascending sequence
//! order, so cursor lookups are a binary search. Entries are never moved:
//! deleting a message overlays `removed` on its slot and appends a `delete`
//! record, leaving the slot usable as a cursor anchor until it expires.

use crate::event::{ChatMessage, Event, EventAction, EventId};

/// Token meaning "no events exist yet". Treated like an empty token.
pub const NO_EVENTS_TOKEN: &str = "-";

#[derive(Debug)]
pub struct EventLog {
    generation: u32,
    next_seq: u64,
    events: Vec<Event>,
}

impl EventLog {
    pub fn new(generation: u32) -> Self {
        Self {
            generation,
            next_seq: 1,
            events: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    fn next_id(&mut self) -> EventId {
        let id = EventId::new(self.generation, self.next_seq);
        self.next_seq += 1;
        id
    }

    fn push(
        &mut self,
        action: EventAction,
        message_id: Option<String>,
        message: Option<ChatMessage>,
        timestamp: u64,
    ) -> EventId {
        let id = self.next_id();
        self.events.push(Event {
            id,
            action,
            message_id,
            message,
            timestamp,
        });
        id
    }

    /// Append an `add` event for an already validated message.
    pub fn append_message(&mut self, message: ChatMessage, timestamp: u64) -> EventId {
        let message_id = message.id.clone();
        self.push(EventAction::Add, Some(message_id), Some(message), timestamp)
    }

    pub fn append_gigantify(&mut self, message_id: &str, timestamp: u64) -> EventId {
        self.push(
            EventAction::Gigantify,
            Some(message_id.to_string()),
            None,
            timestamp,
        )
    }

    /// Drop every entry and leave a single `clear` event behind.
    pub fn reset(&mut self, timestamp: u64) -> EventId {
        self.events.clear();
        self.push(EventAction::Clear, None, None, timestamp)
    }

    /// Whether any entry, visible or not, was created for this message.
    pub fn contains_message(&self, message_id: &str) -> bool {
        self.events.iter().any(|e| {
            matches!(e.action, EventAction::Add | EventAction::Removed)
                && e.message_id.as_deref() == Some(message_id)
        })
    }

    /// Append a `delete` for a visible message and flip its `add` to `removed`.
    ///
    /// Returns `false` when no visible message has that id.
    pub fn retract(&mut self, message_id: &str, timestamp: u64) -> bool {
        let Some(slot) = self
            .events
            .iter()
            .rposition(|e| e.is_visible_message(message_id))
        else {
            return false;
        };
        self.events[slot].action = EventAction::Removed;
        self.push(
            EventAction::Delete,
            Some(message_id.to_string()),
            None,
            timestamp,
        );
        true
    }

    /// Whether the newest entry referencing `message_id` is a `gigantify`.
    pub fn is_gigantified(&self, message_id: &str) -> bool {
        self.events
            .iter()
            .rev()
            .find(|e| e.message_id.as_deref() == Some(message_id))
            .is_some_and(|e| e.action == EventAction::Gigantify)
    }

    /// Ids of the visible messages sent by `username`, in log order.
    pub fn visible_ids_from(&self, username: &str) -> Vec<String> {
        self.events
            .iter()
            .filter(|e| e.action == EventAction::Add && e.is_from(username))
            .filter_map(|e| e.message_id.clone())
            .collect()
    }

    /// Most recent visible message for this utterance stamped at or after `since_ms`.
    pub fn find_recent(&self, username: &str, raw_text: &str, since_ms: u64) -> Option<&Event> {
        self.events.iter().rev().find(|e| {
            e.action == EventAction::Add
                && e.timestamp >= since_ms
                && e.matches_utterance(username, raw_text)
        })
    }

    fn position(&self, token: &str) -> Option<usize> {
        let id = EventId::parse(token)?;
        if id.generation() != self.generation {
            return None;
        }
        self.events
            .binary_search_by_key(&id.seq(), |e| e.id.seq())
            .ok()
    }

    /// Whether `token` names an entry that is still in the log.
    pub fn resolves(&self, token: &str) -> bool {
        self.position(token).is_some()
    }

    /// Entries strictly after `after`, or the whole log when `after` is empty,
    /// the no-events sentinel, or not (or no longer) in the log.
    pub fn snapshot(&self, after: &str) -> &[Event] {
        if after.is_empty() || after == NO_EVENTS_TOKEN {
            return &self.events;
        }
        match self.position(after) {
            Some(index) => &self.events[index + 1..],
            None => &self.events,
        }
    }

    /// Remove entries stamped before `cutoff_ms`. Returns how many went.
    pub fn purge_older_than(&mut self, cutoff_ms: u64) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.timestamp >= cutoff_ms);
        before - self.events.len()
    }
}
