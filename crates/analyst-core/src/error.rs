use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalystError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("A query is already streaming")]
    TurnInProgress,

    #[error("Cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Timeout after {0}s")]
    Timeout(u64),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("File error: {0}")]
    File(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file error: {0}")]
    File(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Why a streamed payload could not be turned into a [`crate::event::StreamEvent`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventParseError {
    #[error("invalid event JSON: {0}")]
    Json(String),

    #[error("unknown event type: {0}")]
    UnknownType(String),

    #[error("event '{kind}' is missing its {field} payload")]
    MissingPayload { kind: String, field: &'static str },
}
