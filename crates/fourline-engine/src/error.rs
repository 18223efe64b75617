//! Engine error type and its mapping onto the wire taxonomy.

use fourline_protocol::{ErrorKind, IdentityId, Seat, SessionId};

/// Everything the engine can reject a request for.
///
/// All variants are recoverable: the offending request is refused, prior
/// session state is untouched, and the session keeps running. Validation
/// happens before any mutation, so an error never leaves a half-applied
/// move behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("no active session {0}")]
    SessionNotFound(SessionId),

    #[error("session {0} was created by a different identity")]
    DuplicateSession(SessionId),

    #[error("session {0} already has both seats occupied")]
    SessionFull(SessionId),

    #[error("identity {0} holds no seat in this session")]
    SeatNotFound(IdentityId),

    #[error("it is {0}'s turn")]
    NotYourTurn(Seat),

    #[error("the game is over; request a rematch to continue")]
    GameOver,

    #[error("column {0} is out of range")]
    InvalidColumn(usize),

    #[error("column {0} is full")]
    ColumnFull(usize),

    #[error("no opponent has joined yet")]
    NoOpponent,

    #[error("rematch negotiation requires a finished game")]
    NotTerminal,

    #[error("transport is not connected")]
    TransportUnavailable,

    #[error("no rematch request is pending")]
    NoPendingRematch,

    /// The session's actor task is gone (channel closed). Indistinguishable
    /// from a missing session as far as clients are concerned.
    #[error("session {0} is no longer available")]
    Unavailable(SessionId),
}

impl EngineError {
    /// The wire-visible kind reported to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionNotFound(_) | Self::Unavailable(_) => ErrorKind::SessionNotFound,
            Self::DuplicateSession(_) => ErrorKind::DuplicateSession,
            Self::SessionFull(_) => ErrorKind::SessionFull,
            Self::SeatNotFound(_) => ErrorKind::SeatNotFound,
            Self::NotYourTurn(_) => ErrorKind::NotYourTurn,
            Self::GameOver => ErrorKind::GameOver,
            Self::InvalidColumn(_) => ErrorKind::InvalidColumn,
            Self::ColumnFull(_) => ErrorKind::ColumnFull,
            Self::NoOpponent => ErrorKind::NoOpponent,
            Self::NotTerminal => ErrorKind::NotTerminal,
            Self::TransportUnavailable => ErrorKind::TransportUnavailable,
            Self::NoPendingRematch => ErrorKind::Malformed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping_covers_wire_taxonomy() {
        let session = SessionId::from("ABC123");
        assert_eq!(
            EngineError::SessionNotFound(session.clone()).kind(),
            ErrorKind::SessionNotFound
        );
        assert_eq!(
            EngineError::Unavailable(session).kind(),
            ErrorKind::SessionNotFound
        );
        assert_eq!(EngineError::ColumnFull(3).kind(), ErrorKind::ColumnFull);
        assert_eq!(
            EngineError::NoPendingRematch.kind(),
            ErrorKind::Malformed
        );
    }

    #[test]
    fn test_display_names_the_turn_owner() {
        let err = EngineError::NotYourTurn(Seat::Two);
        assert_eq!(err.to_string(), "it is seat 2's turn");
    }
}
