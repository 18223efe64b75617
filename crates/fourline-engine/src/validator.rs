//! Move admission checks.
//!
//! A move request passes through a fixed sequence of gates, and the first
//! failing gate is the one reported — exactly one error per rejected
//! request:
//!
//! 1. transport reachable (checked by the connection handler via
//!    [`require_transport`], before the request enters the state machine)
//! 2. session accepting moves (not terminal, opponent present)
//! 3. requester holds a seat
//! 4. requester's seat owns the turn
//! 5. column in range
//! 6. column has room
//!
//! Validation never mutates: a rejected request leaves the session
//! exactly as it was.

use fourline_protocol::{Board, IdentityId, Seat, SessionStatus};

use crate::{EngineError, Session, board};

/// Gate 1: refuse early when the requester's link is already known dead.
pub fn require_transport(connected: bool) -> Result<(), EngineError> {
    if connected {
        Ok(())
    } else {
        Err(EngineError::TransportUnavailable)
    }
}

/// Gates 2 through 6. Returns the seat that may move so the caller
/// doesn't re-derive it.
pub fn validate_move(
    session: &Session,
    identity_id: &IdentityId,
    column: usize,
) -> Result<Seat, EngineError> {
    match session.status() {
        SessionStatus::AwaitingOpponent => return Err(EngineError::NoOpponent),
        SessionStatus::Won { .. } | SessionStatus::Drawn => {
            return Err(EngineError::GameOver);
        }
        SessionStatus::InProgress => {}
    }

    let seat = session
        .seat_of(identity_id)
        .ok_or_else(|| EngineError::SeatNotFound(identity_id.clone()))?;
    if seat != session.turn() {
        return Err(EngineError::NotYourTurn(session.turn()));
    }

    if column >= Board::COLS {
        return Err(EngineError::InvalidColumn(column));
    }
    if board::landing_row(session.board(), column).is_none() {
        return Err(EngineError::ColumnFull(column));
    }
    Ok(seat)
}
