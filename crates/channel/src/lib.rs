//! Per-route chat event log served to browser overlays over HTTP long-polling.
//!
//! Layout:
//! - `event`     – event, chat message and cursor types
//! - `log`       – the append-only log with in-place `removed` overlays
//! - `poll`      – cursor protocol evaluation
//! - `gigantify` – correlation of emote power-ups with chat messages
//! - `channel`   – one route: log + correlation cache + poll wait + sweeps
//! - `registry`  – the set of running routes

pub mod channel;
pub mod clock;
pub mod error;
pub mod event;
pub mod gigantify;
pub mod log;
pub mod poll;
pub mod registry;

pub use {
    channel::{Channel, ChannelOptions},
    clock::{Clock, SystemClock},
    error::{ChannelError, Result},
    event::{ChatMessage, Event, EventAction, EventId},
    gigantify::TriggerOutcome,
    log::NO_EVENTS_TOKEN,
    poll::PollBatch,
    registry::RouteRegistry,
};

#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
