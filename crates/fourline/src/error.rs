//! Unified error type for the Fourline server.

use fourline_engine::EngineError;
use fourline_protocol::ProtocolError;
use fourline_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The server and handler deal in this single type; `#[from]` on each
/// variant lets `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum FourlineError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An engine-level error (session rules, registry).
    #[error(transparent)]
    Engine(#[from] EngineError),
}
