//! Error types for the protocol layer.

/// Errors that can occur while parsing or producing wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an outbound message failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The connection's first message was not a valid hello.
    #[error("invalid hello: {0}")]
    BadHello(#[source] serde_json::Error),

    /// An in-game text frame did not match the frame grammar
    /// (`ready`, `not_ready`, or `<row>,<col>`).
    #[error("invalid frame: {0}")]
    BadFrame(String),
}
