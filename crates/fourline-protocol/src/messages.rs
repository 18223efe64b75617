//! The request/broadcast vocabulary between clients and the session engine.
//!
//! Every frame on the wire is an [`Envelope`] holding either a
//! [`ClientMessage`] (client → server) or a [`ServerMessage`]
//! (server → client). Errors are always addressed to the single requester
//! that caused them; snapshots broadcast to both seats.

use serde::{Deserialize, Serialize};

use crate::types::{
    Identity, IdentityId, Seat, SessionId, SessionSnapshot,
};

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Wire-visible error kinds.
///
/// All of these are recoverable-by-retry conditions: the offending request
/// is rejected, prior session state stays untouched, and the session keeps
/// running. `#[serde(rename_all = "PascalCase")]` is a no-op today but
/// pins the casing against future variant renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    /// No active session with the given id.
    SessionNotFound,
    /// A different identity already created a session with this id.
    DuplicateSession,
    /// Both seats are occupied by other identities.
    SessionFull,
    /// The identity holds no seat in this session.
    SeatNotFound,
    /// The identity's seat is not the current turn owner.
    NotYourTurn,
    /// The session is terminal; no moves without a rematch.
    GameOver,
    /// Column index outside `[0, 7)`.
    InvalidColumn,
    /// The column has no empty cell left.
    ColumnFull,
    /// Rematch requested while seat 2 is vacant.
    NoOpponent,
    /// Rematch negotiation requires a terminal session.
    NotTerminal,
    /// The transport reported disconnected before the request reached
    /// the state machine.
    TransportUnavailable,
    /// The frame could not be decoded or referenced an unknown request.
    Malformed,
}

impl ErrorKind {
    /// Stable string form, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "SessionNotFound",
            Self::DuplicateSession => "DuplicateSession",
            Self::SessionFull => "SessionFull",
            Self::SeatNotFound => "SeatNotFound",
            Self::NotYourTurn => "NotYourTurn",
            Self::GameOver => "GameOver",
            Self::InvalidColumn => "InvalidColumn",
            Self::ColumnFull => "ColumnFull",
            Self::NoOpponent => "NoOpponent",
            Self::NotTerminal => "NotTerminal",
            Self::TransportUnavailable => "TransportUnavailable",
            Self::Malformed => "Malformed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Requests a client can make.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, e.g.
/// `{ "type": "ApplyMove", "session_id": "ABC123", ... }` — the format
/// client SDKs switch on.
///
/// Reconnection note: `CreateSession` and `JoinSession` double as the
/// re-attach path. A dropped client re-issues its original intent with
/// the same session id and identity; the engine treats that as an
/// idempotent re-attach and answers with the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Open a new room (or re-attach as seat 1).
    CreateSession {
        session_id: SessionId,
        identity: Identity,
    },

    /// Take seat 2 in an existing room (or re-attach as seat 2).
    JoinSession {
        session_id: SessionId,
        identity: Identity,
    },

    /// Drop a piece in the given column.
    ApplyMove {
        session_id: SessionId,
        identity_id: IdentityId,
        column: usize,
    },

    /// Unilateral board reset (legacy "local new game" path). The engine
    /// permits this at any time; policy gating belongs to the caller.
    ResetSession { session_id: SessionId },

    /// Ask the opponent for a rematch on a finished session.
    RequestRematch {
        session_id: SessionId,
        identity_id: IdentityId,
        switch_sides: bool,
    },

    /// Accept the opponent's pending rematch request.
    AcceptRematch {
        session_id: SessionId,
        identity_id: IdentityId,
    },

    /// Decline the opponent's pending rematch request.
    DeclineRematch {
        session_id: SessionId,
        identity_id: IdentityId,
    },

    /// Round-trip latency probe. Echoed back as [`ServerMessage::ProbeReply`]
    /// without touching any session.
    Probe { sent_at: u64 },

    /// Client is going away. Informational only — seat bindings survive.
    Goodbye { reason: String },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything the engine pushes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Reply to `CreateSession` (fresh room or seat-1 re-attach).
    SessionCreated { snapshot: SessionSnapshot },

    /// Reply to `JoinSession` (fresh join or seat-2 re-attach).
    SessionJoined { snapshot: SessionSnapshot },

    /// Broadcast to seat 1 when seat 2 arrives.
    OpponentJoined { snapshot: SessionSnapshot },

    /// Broadcast to both seats after every accepted move.
    MoveApplied { snapshot: SessionSnapshot },

    /// Broadcast after a unilateral reset.
    SessionReset { snapshot: SessionSnapshot },

    /// The given seat ran out of turn time; the turn passed without a
    /// piece being placed. Recoverable, not fatal.
    TurnForfeited {
        seat: Seat,
        snapshot: SessionSnapshot,
    },

    /// Delivered to the other seat when a rematch is requested.
    RematchRequested {
        by_name: String,
        switch_sides: bool,
    },

    /// Broadcast when a rematch handshake completes.
    RematchAccepted {
        snapshot: SessionSnapshot,
        switched: bool,
    },

    /// Broadcast when a rematch request is declined. The session stays
    /// in its terminal state.
    RematchDeclined,

    /// Echo of a [`ClientMessage::Probe`]; latency is computed client-side.
    ProbeReply { sent_at: u64 },

    /// Addressed only to the requester that caused it, never broadcast.
    Error { kind: ErrorKind, message: String },
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Top-level frame wrapper. Each side keeps its own monotonically
/// increasing `seq`; within one session, broadcast frames are delivered
/// to every attached client in accepted-move order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<M> {
    pub seq: u64,
    pub message: M,
}

impl<M> Envelope<M> {
    pub fn new(seq: u64, message: M) -> Self {
        Self { seq, message }
    }
}

// =========================================================================
// Tests
// =========================================================================
