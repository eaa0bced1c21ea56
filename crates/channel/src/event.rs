use std::fmt;

use {
    serde::{Deserialize, Serialize, Serializer},
    serde_json::{Map, Value},
    uuid::{Uuid, Variant, Version},
};

use crate::error::{ChannelError, Result};

// ── Event id ────────────────────────────────────────────────────────────────

/// Position token of a log entry, doubling as the client's poll cursor.
///
/// Rendered as `<generation>-<sequence>` in lowercase hex. The generation is
/// random per Channel instance, so a cursor handed out by a previous instance
/// never resolves against a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    generation: u32,
    seq: u64,
}

impl EventId {
    pub(crate) fn new(generation: u32, seq: u64) -> Self {
        Self { generation, seq }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Parse a client-supplied token. Anything malformed yields `None`.
    pub fn parse(token: &str) -> Option<Self> {
        let (generation, seq) = token.split_once('-')?;
        if [generation, seq]
            .iter()
            .any(|part| part.is_empty() || part.starts_with('+'))
        {
            return None;
        }
        Some(Self {
            generation: u32::from_str_radix(generation, 16).ok()?,
            seq: u64::from_str_radix(seq, 16).ok()?,
        })
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}-{:x}", self.generation, self.seq)
    }
}

impl Serialize for EventId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── Actions ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Add,
    Delete,
    Clear,
    /// An `add` whose message was later deleted. Kept as a cursor anchor.
    Removed,
    Gigantify,
}

// ── Chat message payload ────────────────────────────────────────────────────

/// A chat message as handed over by the host.
///
/// Only the fields the log reasons about are typed; everything else the host
/// sends (display name, roles, parts, badges…) travels in `extra` and is
/// returned to the renderer untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub raw_text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            raw_text: raw_text.into(),
            extra: Map::new(),
        }
    }
}

/// Accept only canonical hyphenated UUIDv4 strings (any letter case).
pub fn validate_message_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(ChannelError::InvalidMessagePayload);
    }
    let valid = id.len() == 36
        && Uuid::try_parse(id).is_ok_and(|uuid| {
            uuid.get_version() == Some(Version::Random) && uuid.get_variant() == Variant::RFC4122
        });
    if valid {
        Ok(())
    } else {
        Err(ChannelError::InvalidUuid(id.to_string()))
    }
}

// ── Event ───────────────────────────────────────────────────────────────────

/// One entry of a route's log, serialized as-is in poll responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub action: EventAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<ChatMessage>,
    pub timestamp: u64,
}

impl Event {
    /// A still-displayed message with the given id.
    pub fn is_visible_message(&self, message_id: &str) -> bool {
        self.action == EventAction::Add && self.message_id.as_deref() == Some(message_id)
    }

    pub fn is_from(&self, username: &str) -> bool {
        self.message
            .as_ref()
            .is_some_and(|m| m.username == username)
    }

    pub fn matches_utterance(&self, username: &str, raw_text: &str) -> bool {
        self.message
            .as_ref()
            .is_some_and(|m| m.username == username && m.raw_text == raw_text)
    }
}
