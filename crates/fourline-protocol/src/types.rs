//! Core protocol types shared by the engine and its clients.
//!
//! Everything here is wire-visible: these structures are serialized into
//! messages, pushed to clients, and mirrored locally. The exact JSON shapes
//! are part of the contract with client SDKs, so the serde attributes in
//! this file are load-bearing — the tests at the bottom pin them down.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A game room's unique identifier, stable for the session's lifetime.
///
/// Session ids are opaque tokens. The generated form is a short uppercase
/// room code (e.g. `"ABC123"`) that one player can read out loud to the
/// other, but the engine accepts any non-empty string.
///
/// `#[serde(transparent)]` keeps the JSON representation a plain string,
/// not `{ "0": "ABC123" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A player's stable identifier.
///
/// The identity id — not the transport connection — is the reconnection
/// key: a client that drops and rejoins with the same id reclaims its seat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub String);

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IdentityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A player reference: stable id plus chosen display name.
///
/// Identities persist across reconnects. Two connections presenting the
/// same id are the same player as far as the engine is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub name: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: IdentityId(id.into()),
            name: name.into(),
        }
    }
}

/// Generates a 6-character uppercase room code, e.g. `"K7Q2ZD"`.
pub fn new_session_code() -> SessionId {
    let mut rng = rand::rng();
    let code: String = (0..6)
        .map(|_| {
            let c = rng.sample(rand::distr::Alphanumeric) as char;
            c.to_ascii_uppercase()
        })
        .collect();
    SessionId(code)
}

/// Generates a 12-character lowercase identity id.
pub fn new_identity_id() -> IdentityId {
    let mut rng = rand::rng();
    let id: String = (0..12)
        .map(|_| {
            let c = rng.sample(rand::distr::Alphanumeric) as char;
            c.to_ascii_lowercase()
        })
        .collect();
    IdentityId(id)
}

// ---------------------------------------------------------------------------
// Seat
// ---------------------------------------------------------------------------

/// One of the two fixed turn-order slots in a session.
///
/// A seat is distinct from a network identity: the identity occupying a
/// seat can drop and reconnect (or even swap seats on rematch) while the
/// seat itself is just "player 1" or "player 2".
///
/// Serializes as the bare numbers `1` / `2` so board cells come out as
/// `null | 1 | 2` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    /// The opposing seat.
    pub fn other(self) -> Seat {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }

    /// The seat's wire number (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            Seat::One => 1,
            Seat::Two => 2,
        }
    }
}

impl From<Seat> for u8 {
    fn from(seat: Seat) -> u8 {
        seat.number()
    }
}

impl TryFrom<u8> for Seat {
    type Error = String;

    fn try_from(n: u8) -> Result<Seat, String> {
        match n {
            1 => Ok(Seat::One),
            2 => Ok(Seat::Two),
            other => Err(format!("seat must be 1 or 2, got {other}")),
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seat {}", self.number())
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// A single cell coordinate, row-major from the top-left.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct CellAddr {
    pub row: usize,
    pub col: usize,
}

impl CellAddr {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// The four cell coordinates forming a winning run.
pub type WinLine = [CellAddr; 4];

/// The fixed 6-row × 7-column grid.
///
/// Row 0 is the top of the board; pieces stack bottom-up, so a column has
/// no empty cell below a filled one. This type is the dumb grid only —
/// the drop and win-detection algorithms live in the engine crate, which
/// is the sole writer of board state.
///
/// Serializes as a 6-element array of 7-element rows of `null | 1 | 2`,
/// matching what the presentation layer renders directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[Option<Seat>; Board::COLS]; Board::ROWS],
}

impl Board {
    /// Number of rows (6).
    pub const ROWS: usize = 6;
    /// Number of columns (7).
    pub const COLS: usize = 7;

    /// An empty board.
    pub fn empty() -> Self {
        Self {
            cells: [[None; Self::COLS]; Self::ROWS],
        }
    }

    /// The occupant of a cell, or `None` if empty.
    ///
    /// # Panics
    /// Panics on out-of-range coordinates; callers index within
    /// `ROWS`/`COLS` by construction.
    pub fn cell(&self, row: usize, col: usize) -> Option<Seat> {
        self.cells[row][col]
    }

    /// Places a piece. The engine is the only caller; it guarantees the
    /// bottom-up fill invariant before writing.
    pub fn place(&mut self, row: usize, col: usize, seat: Seat) {
        self.cells[row][col] = Some(seat);
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Session status and snapshot
// ---------------------------------------------------------------------------

/// The lifecycle state of a session, as seen by clients.
///
/// ```text
/// AwaitingOpponent → InProgress → Won(seat) | Drawn
///                         ↑              │
///                         └── rematch ───┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum SessionStatus {
    /// Seat 1 is waiting for seat 2 to join.
    AwaitingOpponent,
    /// Both seats occupied, moves being accepted.
    InProgress,
    /// Four in a row for the given seat. Terminal.
    Won { seat: Seat },
    /// Board filled with no winner. Terminal.
    Drawn,
}

impl SessionStatus {
    /// `true` for `Won` and `Drawn` — no further moves without a rematch.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Won { .. } | Self::Drawn)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingOpponent => write!(f, "AwaitingOpponent"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Won { seat } => write!(f, "Won({})", seat.number()),
            Self::Drawn => write!(f, "Drawn"),
        }
    }
}

/// The full authoritative state of one session, pushed to clients.
///
/// A snapshot always REPLACES a client's local state wholesale — there is
/// no partial merge. `revision` increments on every accepted mutation, so
/// a mirror can drop a snapshot that is older than what it already holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    /// Monotonic mutation counter; higher = newer.
    pub revision: u64,
    pub board: Board,
    /// Which seat may move next. Meaningful only while `InProgress`.
    pub turn: Seat,
    pub status: SessionStatus,
    pub seat_one: Identity,
    /// Vacant until an opponent joins.
    pub seat_two: Option<Identity>,
    /// Populated only when `status` is `Won`.
    pub winning_line: Option<WinLine>,
    /// Last applied move, for transient highlight. Not authoritative.
    pub last_move: Option<CellAddr>,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The wire shapes below are relied on by clients; a serde attribute
    //! change that alters them is a protocol break, not a refactor.

    use super::*;

    #[test]
    fn test_session_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&SessionId::from("ABC123")).unwrap();
        assert_eq!(json, "\"ABC123\"");
    }

    #[test]
    fn test_seat_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Seat::One).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Seat::Two).unwrap(), "2");
    }

    #[test]
    fn test_seat_deserializes_from_number() {
        let seat: Seat = serde_json::from_str("2").unwrap();
        assert_eq!(seat, Seat::Two);
    }

    #[test]
    fn test_seat_rejects_invalid_number() {
        let result: Result<Seat, _> = serde_json::from_str("3");
        assert!(result.is_err());
    }

    #[test]
    fn test_seat_other_flips() {
        assert_eq!(Seat::One.other(), Seat::Two);
        assert_eq!(Seat::Two.other(), Seat::One);
    }

    #[test]
    fn test_board_serializes_as_nested_arrays() {
        let mut board = Board::empty();
        board.place(5, 0, Seat::One);
        board.place(5, 6, Seat::Two);
        let json: serde_json::Value = serde_json::to_value(board).unwrap();

        // 6 rows of 7 cells, `null | 1 | 2`.
        assert_eq!(json.as_array().unwrap().len(), 6);
        assert_eq!(json[0].as_array().unwrap().len(), 7);
        assert_eq!(json[5][0], 1);
        assert_eq!(json[5][6], 2);
        assert!(json[0][0].is_null());
    }

    #[test]
    fn test_board_round_trip() {
        let mut board = Board::empty();
        board.place(3, 2, Seat::Two);
        let bytes = serde_json::to_vec(&board).unwrap();
        let decoded: Board = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(board, decoded);
    }

    #[test]
    fn test_status_won_json_format() {
        let status = SessionStatus::Won { seat: Seat::One };
        let json: serde_json::Value = serde_json::to_value(status).unwrap();
        assert_eq!(json["state"], "Won");
        assert_eq!(json["seat"], 1);
    }

    #[test]
    fn test_status_terminal_classification() {
        assert!(!SessionStatus::AwaitingOpponent.is_terminal());
        assert!(!SessionStatus::InProgress.is_terminal());
        assert!(SessionStatus::Won { seat: Seat::Two }.is_terminal());
        assert!(SessionStatus::Drawn.is_terminal());
    }

    #[test]
    fn test_new_session_code_is_six_uppercase_chars() {
        let code = new_session_code();
        assert_eq!(code.0.len(), 6);
        assert!(code.0.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_new_identity_id_is_twelve_chars() {
        let id = new_identity_id();
        assert_eq!(id.0.len(), 12);
        assert!(id.0.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(new_session_code(), new_session_code());
        assert_ne!(new_identity_id(), new_identity_id());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let snapshot = SessionSnapshot {
            session_id: SessionId::from("ABC123"),
            revision: 4,
            board: Board::empty(),
            turn: Seat::Two,
            status: SessionStatus::InProgress,
            seat_one: Identity::new("p1", "Ada"),
            seat_two: Some(Identity::new("p2", "Grace")),
            winning_line: None,
            last_move: Some(CellAddr::new(5, 3)),
        };
        let bytes = serde_json::to_vec(&snapshot).unwrap();
        let decoded: SessionSnapshot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(snapshot, decoded);
    }
}
