use thiserror::Error;

/// Structural validation failures raised by Channel mutations.
///
/// A failed mutation never appends anything to the log. Soft conditions such
/// as deleting an unknown message are not errors; they are logged and ignored.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("invalid request: \"{0}\" is required")]
    InvalidArgument(&'static str),
    #[error("invalid message: \"id\" must be set when posting a message")]
    InvalidMessagePayload,
    #[error("invalid message: \"id\" {0:?} is not a valid UUIDv4")]
    InvalidUuid(String),
}

pub type Result<T, E = ChannelError> = std::result::Result<T, E>;
