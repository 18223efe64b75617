//! Integration tests for the session actor.
//!
//! These drive a real actor task through its handle, with unbounded
//! channels standing in for connection handlers.

use std::time::Duration;

use fourline_engine::{
    AttachIntent, EngineError, SessionConfig, SessionHandle,
};
use fourline_protocol::{
    Identity, IdentityId, Seat, ServerMessage, SessionId, SessionSnapshot,
    SessionStatus,
};
use tokio::sync::mpsc;

type Outbox = mpsc::UnboundedReceiver<ServerMessage>;

fn ada() -> Identity {
    Identity::new("p1", "Ada")
}

fn grace() -> Identity {
    Identity::new("p2", "Grace")
}

fn spawn_session() -> SessionHandle {
    SessionHandle::spawn(SessionId::from("ABC123"), SessionConfig::default())
}

async fn attach(
    handle: &SessionHandle,
    intent: AttachIntent,
    identity: Identity,
) -> (SessionSnapshot, Outbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    let snapshot = handle
        .attach(intent, identity, tx)
        .await
        .expect("attach should succeed");
    (snapshot, rx)
}

/// Creates the session, joins the opponent, and drains the join chatter
/// so tests start from a quiet in-progress game.
async fn started_game(handle: &SessionHandle) -> (Outbox, Outbox) {
    let (_, mut ada_rx) = attach(handle, AttachIntent::Create, ada()).await;
    let (_, grace_rx) = attach(handle, AttachIntent::Join, grace()).await;
    let msg = next(&mut ada_rx).await;
    assert!(matches!(msg, ServerMessage::OpponentJoined { .. }));
    (ada_rx, grace_rx)
}

/// Receives the next broadcast. The window is generous so that under
/// paused time the auto-advance reaches a pending turn countdown before
/// this timeout does.
async fn next(rx: &mut Outbox) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("expected a broadcast")
        .expect("channel closed")
}

/// Asserts no broadcast is sitting in the channel.
async fn assert_silent(rx: &mut Outbox) {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    assert!(
        rx.try_recv().is_err(),
        "expected no broadcast on this channel"
    );
}

fn id(s: &str) -> IdentityId {
    IdentityId::from(s)
}

#[tokio::test]
async fn test_create_reports_awaiting_opponent() {
    let handle = spawn_session();
    let (snapshot, _rx) = attach(&handle, AttachIntent::Create, ada()).await;
    assert_eq!(snapshot.status, SessionStatus::AwaitingOpponent);
    assert_eq!(snapshot.seat_one.name, "Ada");
    assert!(snapshot.seat_two.is_none());
}

#[tokio::test]
async fn test_join_unknown_session_fails() {
    let handle = spawn_session();
    let (tx, _rx) = mpsc::unbounded_channel();
    let err = handle
        .attach(AttachIntent::Join, grace(), tx)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SessionNotFound(_)));
}

#[tokio::test]
async fn test_create_taken_id_by_other_identity_fails() {
    let handle = spawn_session();
    let (_, _ada_rx) = attach(&handle, AttachIntent::Create, ada()).await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let err = handle
        .attach(AttachIntent::Create, Identity::new("p9", "Eve"), tx)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateSession(_)));
}

#[tokio::test]
async fn test_third_identity_cannot_join() {
    let handle = spawn_session();
    let _rxs = started_game(&handle).await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let err = handle
        .attach(AttachIntent::Join, Identity::new("p9", "Eve"), tx)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SessionFull(_)));
}

#[tokio::test]
async fn test_vertical_win_in_room_abc123() {
    // Ada stacks column 0 while Grace answers in column 1. Ada's fourth
    // piece completes a vertical run, the win is broadcast to both, and
    // the turn stays with the winner.
    let handle = spawn_session();
    let (mut ada_rx, mut grace_rx) = started_game(&handle).await;

    let moves = [
        (id("p1"), 0),
        (id("p2"), 1),
        (id("p1"), 0),
        (id("p2"), 1),
        (id("p1"), 0),
        (id("p2"), 1),
        (id("p1"), 0),
    ];
    let move_count = moves.len();
    for (who, column) in moves {
        handle.apply_move(who, column).await.unwrap();
    }

    let mut last = None;
    for _ in 0..move_count {
        let ada_msg = next(&mut ada_rx).await;
        let grace_msg = next(&mut grace_rx).await;
        assert_eq!(ada_msg, grace_msg, "both seats see the same broadcast");
        last = Some(ada_msg);
    }

    let Some(ServerMessage::MoveApplied { snapshot }) = last else {
        panic!("expected a MoveApplied broadcast");
    };
    assert_eq!(snapshot.status, SessionStatus::Won { seat: Seat::One });
    assert_eq!(snapshot.turn, Seat::One, "turn must not flip on a win");
    let line = snapshot.winning_line.expect("winning line populated");
    assert!(line.iter().all(|cell| cell.col == 0));
}

#[tokio::test]
async fn test_out_of_turn_move_errors_requester_only() {
    let handle = spawn_session();
    let (mut ada_rx, mut grace_rx) = started_game(&handle).await;

    let err = handle.apply_move(id("p2"), 3).await.unwrap_err();
    assert_eq!(err, EngineError::NotYourTurn(Seat::One));

    // A rejected move mutates nothing and broadcasts nothing.
    assert_silent(&mut ada_rx).await;
    assert_silent(&mut grace_rx).await;
}

#[tokio::test]
async fn test_reattach_is_idempotent_and_reroutes_broadcasts() {
    let handle = spawn_session();
    let (mut ada_rx, stale_rx) = started_game(&handle).await;
    let before = handle.snapshot().await.unwrap().unwrap();

    // Grace's connection drops and she rejoins with the same identity.
    let (after, mut fresh_rx) = attach(&handle, AttachIntent::Join, grace()).await;
    assert_eq!(after, before, "re-attach must not mutate the session");

    // Broadcasts now land on the new channel, not the old one.
    handle.apply_move(id("p1"), 3).await.unwrap();
    assert!(matches!(
        next(&mut fresh_rx).await,
        ServerMessage::MoveApplied { .. }
    ));
    assert!(matches!(
        next(&mut ada_rx).await,
        ServerMessage::MoveApplied { .. }
    ));
    drop(stale_rx);
}

#[tokio::test]
async fn test_creator_reattach_receives_current_snapshot() {
    let handle = spawn_session();
    let (mut _ada_rx, mut grace_rx) = started_game(&handle).await;
    handle.apply_move(id("p1"), 4).await.unwrap();
    let _ = next(&mut grace_rx).await;

    let (snapshot, _fresh_rx) = attach(&handle, AttachIntent::Create, ada()).await;
    assert_eq!(snapshot.status, SessionStatus::InProgress);
    assert_eq!(snapshot.turn, Seat::Two);
    assert!(snapshot.last_move.is_some());
}

#[tokio::test]
async fn test_reset_broadcasts_fresh_board() {
    let handle = spawn_session();
    let (mut ada_rx, mut grace_rx) = started_game(&handle).await;
    handle.apply_move(id("p1"), 2).await.unwrap();
    let _ = next(&mut ada_rx).await;
    let _ = next(&mut grace_rx).await;

    handle.reset().await.unwrap();
    let msg = next(&mut grace_rx).await;
    let ServerMessage::SessionReset { snapshot } = msg else {
        panic!("expected SessionReset");
    };
    assert_eq!(snapshot.turn, Seat::One);
    assert!(snapshot.last_move.is_none());
    assert_eq!(snapshot.status, SessionStatus::InProgress);
}

async fn finish_game(handle: &SessionHandle, ada_rx: &mut Outbox, grace_rx: &mut Outbox) {
    let moves = [
        (id("p1"), 0),
        (id("p2"), 1),
        (id("p1"), 0),
        (id("p2"), 1),
        (id("p1"), 0),
        (id("p2"), 1),
        (id("p1"), 0),
    ];
    for (who, column) in moves {
        handle.apply_move(who, column).await.unwrap();
        let _ = next(ada_rx).await;
        let _ = next(grace_rx).await;
    }
}

#[tokio::test]
async fn test_rematch_round_trip_with_side_swap() {
    let handle = spawn_session();
    let (mut ada_rx, mut grace_rx) = started_game(&handle).await;
    finish_game(&handle, &mut ada_rx, &mut grace_rx).await;

    handle.request_rematch(id("p1"), true).await.unwrap();
    let msg = next(&mut grace_rx).await;
    assert_eq!(
        msg,
        ServerMessage::RematchRequested {
            by_name: "Ada".into(),
            switch_sides: true,
        }
    );
    // The request goes to the opponent only.
    assert_silent(&mut ada_rx).await;

    handle.accept_rematch(id("p2")).await.unwrap();
    let msg = next(&mut ada_rx).await;
    let ServerMessage::RematchAccepted { snapshot, switched } = msg else {
        panic!("expected RematchAccepted");
    };
    assert!(switched);
    assert_eq!(snapshot.seat_one.name, "Grace");
    assert_eq!(snapshot.status, SessionStatus::InProgress);
    assert_eq!(snapshot.turn, Seat::One);
    assert!(snapshot.winning_line.is_none());
}

#[tokio::test]
async fn test_crossing_rematch_requests_start_the_game() {
    let handle = spawn_session();
    let (mut ada_rx, mut grace_rx) = started_game(&handle).await;
    finish_game(&handle, &mut ada_rx, &mut grace_rx).await;

    handle.request_rematch(id("p1"), false).await.unwrap();
    let _ = next(&mut grace_rx).await; // RematchRequested
    handle.request_rematch(id("p2"), true).await.unwrap();

    // The crossing request completes the handshake; the earlier
    // request's preference (no swap) governs.
    let ServerMessage::RematchAccepted { snapshot, switched } = next(&mut ada_rx).await
    else {
        panic!("expected RematchAccepted");
    };
    assert!(!switched);
    assert_eq!(snapshot.seat_one.name, "Ada");
}

#[tokio::test]
async fn test_rematch_decline_keeps_session_terminal() {
    let handle = spawn_session();
    let (mut ada_rx, mut grace_rx) = started_game(&handle).await;
    finish_game(&handle, &mut ada_rx, &mut grace_rx).await;

    handle.request_rematch(id("p1"), false).await.unwrap();
    let _ = next(&mut grace_rx).await;
    handle.decline_rematch(id("p2")).await.unwrap();

    assert_eq!(next(&mut ada_rx).await, ServerMessage::RematchDeclined);
    let snapshot = handle.snapshot().await.unwrap().unwrap();
    assert!(snapshot.status.is_terminal());
}

#[tokio::test]
async fn test_rematch_mid_game_is_refused() {
    let handle = spawn_session();
    let _rxs = started_game(&handle).await;
    let err = handle.request_rematch(id("p1"), false).await.unwrap_err();
    assert_eq!(err, EngineError::NotTerminal);
}

#[tokio::test(start_paused = true)]
async fn test_turn_expiry_forfeits_and_rearms() {
    let handle = SessionHandle::spawn(
        SessionId::from("ABC123"),
        SessionConfig {
            turn_budget: Duration::from_secs(5),
            ..SessionConfig::default()
        },
    );
    let (mut ada_rx, mut grace_rx) = started_game(&handle).await;

    // Ada sits on her turn past the budget.
    let ServerMessage::TurnForfeited { seat, snapshot } = next(&mut ada_rx).await else {
        panic!("expected TurnForfeited");
    };
    assert_eq!(seat, Seat::One);
    assert_eq!(snapshot.turn, Seat::Two);
    assert_eq!(snapshot.board, fourline_protocol::Board::empty());

    // Grace sees the same forfeit, then idles past her own budget: the
    // countdown re-armed for her turn.
    let ServerMessage::TurnForfeited { seat, .. } = next(&mut grace_rx).await else {
        panic!("expected first TurnForfeited");
    };
    assert_eq!(seat, Seat::One);
    let ServerMessage::TurnForfeited { seat, snapshot } = next(&mut grace_rx).await
    else {
        panic!("expected second TurnForfeited");
    };
    assert_eq!(seat, Seat::Two);
    assert_eq!(snapshot.turn, Seat::One);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_session_goes_quiet_and_stops() {
    let handle = SessionHandle::spawn(
        SessionId::from("ABC123"),
        SessionConfig {
            turn_budget: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            ..SessionConfig::default()
        },
    );
    let (mut ada_rx, mut grace_rx) = started_game(&handle).await;

    handle.detach(id("p1")).await.unwrap();
    handle.detach(id("p2")).await.unwrap();

    // With nobody attached the countdown is disarmed: an hour of game
    // time produces zero forfeit broadcasts, and the actor stops once
    // the idle deadline passes instead of ticking forever.
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert!(matches!(
        ada_rx.try_recv(),
        Err(mpsc::error::TryRecvError::Disconnected)
    ));
    assert!(matches!(
        grace_rx.try_recv(),
        Err(mpsc::error::TryRecvError::Disconnected)
    ));
    assert!(handle.is_closed(), "idle actor should have stopped");
    let err = handle.snapshot().await.unwrap_err();
    assert!(matches!(err, EngineError::Unavailable(_)));
}

#[tokio::test(start_paused = true)]
async fn test_reattach_before_idle_deadline_keeps_session_alive() {
    let handle = SessionHandle::spawn(
        SessionId::from("ABC123"),
        SessionConfig {
            turn_budget: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            ..SessionConfig::default()
        },
    );
    let (_ada_rx, _grace_rx) = started_game(&handle).await;

    handle.detach(id("p1")).await.unwrap();
    handle.detach(id("p2")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    // Ada comes back inside the grace period: the deadline is cancelled
    // and her turn countdown re-arms, so she can forfeit again but the
    // session survives well past the original deadline.
    let (snapshot, mut fresh_rx) = attach(&handle, AttachIntent::Create, ada()).await;
    assert_eq!(snapshot.status, SessionStatus::InProgress);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(!handle.is_closed());
    let ServerMessage::TurnForfeited { seat, .. } = next(&mut fresh_rx).await else {
        panic!("expected TurnForfeited");
    };
    assert_eq!(seat, Seat::One);
}

#[tokio::test(start_paused = true)]
async fn test_move_within_budget_restarts_countdown() {
    let handle = SessionHandle::spawn(
        SessionId::from("ABC123"),
        SessionConfig {
            turn_budget: Duration::from_secs(5),
            ..SessionConfig::default()
        },
    );
    let (mut ada_rx, mut grace_rx) = started_game(&handle).await;

    // Ada moves after 3s; no forfeit happens for her.
    tokio::time::sleep(Duration::from_secs(3)).await;
    handle.apply_move(id("p1"), 0).await.unwrap();
    assert!(matches!(
        next(&mut ada_rx).await,
        ServerMessage::MoveApplied { .. }
    ));
    let _ = next(&mut grace_rx).await;

    // Grace then idles past her own fresh 5s budget.
    let ServerMessage::TurnForfeited { seat, .. } = next(&mut grace_rx).await else {
        panic!("expected TurnForfeited");
    };
    assert_eq!(seat, Seat::Two);
}
