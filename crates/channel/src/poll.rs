//! Long-poll cursor protocol.
//!
//! A poll carries the last token the client saw. The reply holds every event
//! after it except `removed` slots, and the token of the last *unfiltered*
//! entry, so a trailing `removed` entry still moves the cursor forward.
//! Nothing visible means no reply yet; the caller re-checks later with the
//! same token.

use serde::Serialize;

use crate::{
    event::{Event, EventAction},
    log::NO_EVENTS_TOKEN,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollBatch {
    pub events: Vec<Event>,
    pub next_token: String,
}

/// Evaluate one poll step against the entries after the client's cursor.
pub fn evaluate(snapshot: &[Event]) -> Option<PollBatch> {
    let events: Vec<Event> = snapshot
        .iter()
        .filter(|e| e.action != EventAction::Removed)
        .cloned()
        .collect();
    if events.is_empty() {
        return None;
    }
    let next_token = snapshot
        .last()
        .map(|e| e.id.to_string())
        .unwrap_or_else(|| NO_EVENTS_TOKEN.to_string());
    Some(PollBatch { events, next_token })
}
