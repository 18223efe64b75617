//! The pure session state machine.
//!
//! [`Session`] holds the authoritative state of one game and mutates it
//! through a small set of operations, each of which validates fully
//! before touching anything. No I/O, no clocks, no channels — the actor
//! in [`crate::actor`] owns the concurrency and the turn timer, this type
//! owns the rules.

use fourline_protocol::{
    Board, CellAddr, Identity, IdentityId, Seat, SessionId, SessionSnapshot,
    SessionStatus, WinLine,
};
use tracing::info;

use crate::{EngineError, board, validator};

// ---------------------------------------------------------------------------
// Operation outcomes
// ---------------------------------------------------------------------------

/// How a join request resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Seat 2 was vacant and is now occupied; the game started.
    Joined,
    /// The identity already held this seat (reconnection path).
    ReAttached(Seat),
}

/// An accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRecord {
    /// The seat that moved.
    pub seat: Seat,
    /// Where the piece landed.
    pub cell: CellAddr,
    /// The session status after the move.
    pub status: SessionStatus,
}

/// How a rematch request resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RematchOutcome {
    /// Request recorded; waiting on the other seat.
    Requested,
    /// The other seat already had a request pending, so this request
    /// counted as an acceptance and a fresh game began. `switched` tells
    /// whether the seats swapped.
    Accepted { switched: bool },
}

/// A rematch request waiting for the other seat's answer.
///
/// Cleared on accept, decline, and reset. `switch_sides` belongs to the
/// request, not the acceptance: whoever asked first decides whether the
/// seats swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRematch {
    pub requested_by: Seat,
    pub switch_sides: bool,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Authoritative state of one game session.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    board: Board,
    turn: Seat,
    status: SessionStatus,
    seat_one: Identity,
    seat_two: Option<Identity>,
    winning_line: Option<WinLine>,
    last_move: Option<CellAddr>,
    pending_rematch: Option<PendingRematch>,
    /// Bumped on every snapshot-visible mutation.
    revision: u64,
}

impl Session {
    /// Opens a session with the creator in seat 1, awaiting an opponent.
    pub fn new(id: SessionId, creator: Identity) -> Self {
        info!(session_id = %id, creator = %creator.id, "session created");
        Self {
            id,
            board: Board::empty(),
            turn: Seat::One,
            status: SessionStatus::AwaitingOpponent,
            seat_one: creator,
            seat_two: None,
            winning_line: None,
            last_move: None,
            pending_rematch: None,
            revision: 1,
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn turn(&self) -> Seat {
        self.turn
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn pending_rematch(&self) -> Option<PendingRematch> {
        self.pending_rematch
    }

    /// The seat held by `identity_id`, if any.
    pub fn seat_of(&self, identity_id: &IdentityId) -> Option<Seat> {
        if self.seat_one.id == *identity_id {
            Some(Seat::One)
        } else if self.seat_two.as_ref().is_some_and(|p| p.id == *identity_id) {
            Some(Seat::Two)
        } else {
            None
        }
    }

    /// The identity occupying `seat`, if any.
    pub fn identity(&self, seat: Seat) -> Option<&Identity> {
        match seat {
            Seat::One => Some(&self.seat_one),
            Seat::Two => self.seat_two.as_ref(),
        }
    }

    /// The full wire-visible state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            revision: self.revision,
            board: self.board,
            turn: self.turn,
            status: self.status,
            seat_one: self.seat_one.clone(),
            seat_two: self.seat_two.clone(),
            winning_line: self.winning_line,
            last_move: self.last_move,
        }
    }

    // -- joining ------------------------------------------------------------

    /// Seats `identity` as seat 2, or re-attaches it to the seat it
    /// already holds.
    ///
    /// # Errors
    /// [`EngineError::SessionFull`] when both seats belong to other
    /// identities.
    pub fn join(&mut self, identity: Identity) -> Result<JoinOutcome, EngineError> {
        if let Some(seat) = self.seat_of(&identity.id) {
            return Ok(JoinOutcome::ReAttached(seat));
        }
        if self.seat_two.is_some() {
            return Err(EngineError::SessionFull(self.id.clone()));
        }

        info!(session_id = %self.id, joiner = %identity.id, "opponent joined");
        self.seat_two = Some(identity);
        self.status = SessionStatus::InProgress;
        self.revision += 1;
        Ok(JoinOutcome::Joined)
    }

    /// Re-attach path for the creator: same identity id reclaims seat 1,
    /// a different identity is refused.
    pub fn reclaim_seat_one(&self, identity_id: &IdentityId) -> Result<(), EngineError> {
        if self.seat_one.id == *identity_id {
            Ok(())
        } else {
            Err(EngineError::DuplicateSession(self.id.clone()))
        }
    }

    // -- moves --------------------------------------------------------------

    /// Validates and applies one move.
    ///
    /// On a winning move the turn does NOT advance — the snapshot keeps
    /// showing the winner as the turn holder, and the `Won` status is what
    /// marks the game finished. On any other move the turn flips.
    pub fn apply_move(
        &mut self,
        identity_id: &IdentityId,
        column: usize,
    ) -> Result<MoveRecord, EngineError> {
        let seat = validator::validate_move(self, identity_id, column)?;

        let cell = board::drop_piece(&mut self.board, column, seat)?;
        self.last_move = Some(cell);

        if let Some((winner, line)) = board::detect_win(&self.board) {
            self.status = SessionStatus::Won { seat: winner };
            self.winning_line = Some(line);
            info!(session_id = %self.id, %winner, "game won");
        } else if board::is_full(&self.board) {
            self.status = SessionStatus::Drawn;
            info!(session_id = %self.id, "game drawn");
        } else {
            self.turn = seat.other();
        }

        self.revision += 1;
        Ok(MoveRecord {
            seat,
            cell,
            status: self.status,
        })
    }

    /// Passes the turn without placing a piece. Used when a turn timer
    /// runs out. Returns the seat that lost its turn, or `None` if the
    /// session is not in progress (a forfeit can race a finishing move).
    pub fn forfeit_turn(&mut self) -> Option<Seat> {
        if self.status != SessionStatus::InProgress {
            return None;
        }
        let forfeited = self.turn;
        self.turn = forfeited.other();
        self.revision += 1;
        info!(session_id = %self.id, seat = %forfeited, "turn forfeited");
        Some(forfeited)
    }

    // -- reset --------------------------------------------------------------

    /// Clears the board and starts over with seat 1 to move. Seats keep
    /// their occupants. Permitted in any state; callers that want to
    /// restrict mid-game resets gate this themselves.
    pub fn reset(&mut self) {
        self.board = Board::empty();
        self.turn = Seat::One;
        self.status = if self.seat_two.is_some() {
            SessionStatus::InProgress
        } else {
            SessionStatus::AwaitingOpponent
        };
        self.winning_line = None;
        self.last_move = None;
        self.pending_rematch = None;
        self.revision += 1;
        info!(session_id = %self.id, "session reset");
    }

    // -- rematch ------------------------------------------------------------

    /// Records a rematch request, or completes the handshake if the other
    /// seat already asked.
    ///
    /// The handshake is commutative: a request arriving while the
    /// opponent's request is pending counts as acceptance, and the EARLIER
    /// request's `switch_sides` governs. A repeat request from the same
    /// seat just updates its `switch_sides`.
    pub fn request_rematch(
        &mut self,
        identity_id: &IdentityId,
        switch_sides: bool,
    ) -> Result<RematchOutcome, EngineError> {
        let seat = self
            .seat_of(identity_id)
            .ok_or_else(|| EngineError::SeatNotFound(identity_id.clone()))?;
        if self.seat_two.is_none() {
            return Err(EngineError::NoOpponent);
        }
        if !self.status.is_terminal() {
            return Err(EngineError::NotTerminal);
        }

        match self.pending_rematch {
            Some(pending) if pending.requested_by != seat => {
                let switched = pending.switch_sides;
                self.start_rematch(switched);
                Ok(RematchOutcome::Accepted { switched })
            }
            _ => {
                self.pending_rematch = Some(PendingRematch {
                    requested_by: seat,
                    switch_sides,
                });
                info!(session_id = %self.id, %seat, switch_sides, "rematch requested");
                Ok(RematchOutcome::Requested)
            }
        }
    }

    /// Accepts the opponent's pending request and starts the new game.
    /// Returns whether the seats swapped.
    pub fn accept_rematch(&mut self, identity_id: &IdentityId) -> Result<bool, EngineError> {
        let seat = self
            .seat_of(identity_id)
            .ok_or_else(|| EngineError::SeatNotFound(identity_id.clone()))?;
        let pending = self
            .pending_rematch
            .filter(|p| p.requested_by != seat)
            .ok_or(EngineError::NoPendingRematch)?;

        let switched = pending.switch_sides;
        self.start_rematch(switched);
        Ok(switched)
    }

    /// Declines (or, from the requester, withdraws) the pending request.
    /// The session stays terminal.
    pub fn decline_rematch(&mut self, identity_id: &IdentityId) -> Result<(), EngineError> {
        self.seat_of(identity_id)
            .ok_or_else(|| EngineError::SeatNotFound(identity_id.clone()))?;
        if self.pending_rematch.take().is_none() {
            return Err(EngineError::NoPendingRematch);
        }
        info!(session_id = %self.id, "rematch declined");
        Ok(())
    }

    fn start_rematch(&mut self, switch_sides: bool) {
        if switch_sides {
            // seat_two is occupied here: rematch requires an opponent.
            if let Some(two) = self.seat_two.take() {
                let one = std::mem::replace(&mut self.seat_one, two);
                self.seat_two = Some(one);
            }
        }
        self.board = Board::empty();
        self.turn = Seat::One;
        self.status = SessionStatus::InProgress;
        self.winning_line = None;
        self.last_move = None;
        self.pending_rematch = None;
        self.revision += 1;
        info!(session_id = %self.id, switch_sides, "rematch started");
    }
}
