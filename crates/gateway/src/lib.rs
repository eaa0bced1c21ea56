//! Gateway: HTTP server in front of the overlay routes.
//!
//! Per route key it serves:
//! 1. `poll.json`, the long-poll cursor endpoint
//! 2. the overlay page and its CSS/JS (override directory or built-ins)
//! 3. `api/*`, where the host pushes chat messages, deletions and power-ups
//!
//! Event logs and their timing live in `chatlay-channel`.

pub mod api;
pub mod assets;
pub mod error;
pub mod poll;
pub mod server;
pub mod state;

pub use {
    error::ApiError,
    server::{build_app, serve},
    state::{GatewayState, channel_options},
};
