//! Client-side session mirror.
//!
//! A client never mutates game state locally; it adopts whole snapshots
//! pushed by the server. The mirror's one job is ordering: with
//! reconnects in play, a stale snapshot can arrive after a newer one,
//! and adopting it would roll the board back. The `revision` counter in
//! every snapshot makes "newer" checkable.

use fourline_protocol::{ServerMessage, SessionSnapshot};
use tracing::trace;

/// Holds the latest adopted snapshot for one session.
#[derive(Debug, Default)]
pub struct SessionMirror {
    current: Option<SessionSnapshot>,
}

impl SessionMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest adopted snapshot, if any.
    pub fn current(&self) -> Option<&SessionSnapshot> {
        self.current.as_ref()
    }

    /// Adopts `snapshot` if it is newer than what the mirror holds.
    /// Returns whether it was adopted. Replacement is wholesale — no
    /// field-level merging.
    pub fn adopt(&mut self, snapshot: SessionSnapshot) -> bool {
        if let Some(held) = &self.current {
            if snapshot.revision <= held.revision {
                trace!(
                    held = held.revision,
                    offered = snapshot.revision,
                    "stale snapshot dropped"
                );
                return false;
            }
        }
        self.current = Some(snapshot);
        true
    }

    /// Feeds one server message through the mirror, adopting any
    /// snapshot it carries. Returns whether the mirror changed.
    pub fn observe(&mut self, message: &ServerMessage) -> bool {
        match message {
            ServerMessage::SessionCreated { snapshot }
            | ServerMessage::SessionJoined { snapshot }
            | ServerMessage::OpponentJoined { snapshot }
            | ServerMessage::MoveApplied { snapshot }
            | ServerMessage::SessionReset { snapshot }
            | ServerMessage::TurnForfeited { snapshot, .. }
            | ServerMessage::RematchAccepted { snapshot, .. } => {
                self.adopt(snapshot.clone())
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use fourline_protocol::{
        Board, Identity, Seat, SessionId, SessionStatus,
    };

    use super::*;

    fn snapshot(revision: u64) -> SessionSnapshot {
        SessionSnapshot {
            session_id: SessionId::from("ABC123"),
            revision,
            board: Board::empty(),
            turn: Seat::One,
            status: SessionStatus::InProgress,
            seat_one: Identity::new("p1", "Ada"),
            seat_two: Some(Identity::new("p2", "Grace")),
            winning_line: None,
            last_move: None,
        }
    }

    #[test]
    fn test_first_snapshot_is_adopted() {
        let mut mirror = SessionMirror::new();
        assert!(mirror.adopt(snapshot(1)));
        assert_eq!(mirror.current().unwrap().revision, 1);
    }

    #[test]
    fn test_newer_snapshot_replaces_older() {
        let mut mirror = SessionMirror::new();
        mirror.adopt(snapshot(3));
        assert!(mirror.adopt(snapshot(4)));
        assert_eq!(mirror.current().unwrap().revision, 4);
    }

    #[test]
    fn test_stale_snapshot_is_dropped() {
        let mut mirror = SessionMirror::new();
        mirror.adopt(snapshot(5));
        assert!(!mirror.adopt(snapshot(4)));
        assert!(!mirror.adopt(snapshot(5)));
        assert_eq!(mirror.current().unwrap().revision, 5);
    }

    #[test]
    fn test_observe_extracts_snapshots_from_broadcasts() {
        let mut mirror = SessionMirror::new();
        assert!(mirror.observe(&ServerMessage::MoveApplied {
            snapshot: snapshot(2),
        }));
        // RematchDeclined carries no snapshot.
        assert!(!mirror.observe(&ServerMessage::RematchDeclined));
        assert!(!mirror.observe(&ServerMessage::ProbeReply { sent_at: 1 }));
        assert_eq!(mirror.current().unwrap().revision, 2);
    }
}
