//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding frames.
///
/// These are distinct from the wire-visible [`ErrorKind`](crate::ErrorKind)
/// taxonomy: a `ProtocolError` means the frame itself was unusable, while
/// `ErrorKind` describes a well-formed request the engine rejected.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, or a
    /// message type the protocol doesn't know.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but violates a protocol rule (e.g. a request
    /// arriving before any session context exists for it).
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
