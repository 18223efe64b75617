//! Session actor: an isolated Tokio task that owns one game.
//!
//! Each session runs in its own task, communicating with connection
//! handlers through an mpsc channel. All mutations of one session flow
//! through this single task, so two near-simultaneous requests are
//! applied in channel order and there is no interleaving to reason
//! about. The turn timer lives inside the task for the same reason: an
//! expiry is just another event in the loop, serialized with moves.

use std::collections::HashMap;
use std::time::Duration;

use fourline_protocol::{
    Identity, IdentityId, Seat, ServerMessage, SessionId, SessionSnapshot,
    SessionStatus,
};
use fourline_timer::TurnTimer;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::{
    EngineError, JoinOutcome, RematchOutcome, Session, SessionConfig,
};

/// Channel sender for delivering broadcasts to one attached client.
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

/// Whether an attach request opens a session or joins an existing one.
///
/// Both double as the reconnection path: an identity re-issuing its
/// original intent is re-attached to the seat it already holds and
/// answered with the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachIntent {
    Create,
    Join,
}

/// Commands sent to a session actor through its channel.
pub(crate) enum SessionCommand {
    Attach {
        intent: AttachIntent,
        identity: Identity,
        sender: ClientSender,
        reply: oneshot::Sender<Result<SessionSnapshot, EngineError>>,
    },
    Detach {
        identity_id: IdentityId,
    },
    Move {
        identity_id: IdentityId,
        column: usize,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Reset {
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    RequestRematch {
        identity_id: IdentityId,
        switch_sides: bool,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    AcceptRematch {
        identity_id: IdentityId,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    DeclineRematch {
        identity_id: IdentityId,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Option<SessionSnapshot>>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running session actor. Cheap to clone — just an
/// `mpsc::Sender` wrapper. The registry holds one per session.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Spawns a fresh actor with no game state yet; the first `Create`
    /// attach seats the creator.
    pub fn spawn(session_id: SessionId, config: SessionConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.command_buffer);
        let actor = SessionActor {
            session_id: session_id.clone(),
            session: None,
            clients: HashMap::new(),
            timer: TurnTimer::new(config.timer()),
            idle_timeout: config.idle_timeout,
            // A freshly spawned actor has nobody attached yet; if the
            // creator never shows up it reclaims itself.
            idle_deadline: Some(Instant::now() + config.idle_timeout),
            receiver: rx,
        };
        tokio::spawn(actor.run());
        Self {
            session_id,
            sender: tx,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// `true` once the actor task has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn unavailable(&self) -> EngineError {
        EngineError::Unavailable(self.session_id.clone())
    }

    /// Attaches (or re-attaches) a client and returns the snapshot it
    /// should adopt.
    pub async fn attach(
        &self,
        intent: AttachIntent,
        identity: Identity,
        sender: ClientSender,
    ) -> Result<SessionSnapshot, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Attach {
                intent,
                identity,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Drops a client's outbound channel. The seat binding survives,
    /// so the identity can re-attach later.
    pub async fn detach(&self, identity_id: IdentityId) -> Result<(), EngineError> {
        self.sender
            .send(SessionCommand::Detach { identity_id })
            .await
            .map_err(|_| self.unavailable())
    }

    pub async fn apply_move(
        &self,
        identity_id: IdentityId,
        column: usize,
    ) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Move {
                identity_id,
                column,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn reset(&self) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Reset { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn request_rematch(
        &self,
        identity_id: IdentityId,
        switch_sides: bool,
    ) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::RequestRematch {
                identity_id,
                switch_sides,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn accept_rematch(&self, identity_id: IdentityId) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::AcceptRematch {
                identity_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn decline_rematch(&self, identity_id: IdentityId) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::DeclineRematch {
                identity_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// The current snapshot, or `None` before the creator attaches.
    pub async fn snapshot(&self) -> Result<Option<SessionSnapshot>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the actor to stop. Pending broadcasts are dropped.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.sender
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct SessionActor {
    session_id: SessionId,
    session: Option<Session>,
    /// Outbound channel per attached identity. Keyed by identity, not
    /// seat, so rematch side swaps don't re-route broadcasts.
    clients: HashMap<IdentityId, ClientSender>,
    timer: TurnTimer,
    idle_timeout: Duration,
    /// Set while no clients are attached; the actor stops when it
    /// passes, making the handle reapable.
    idle_deadline: Option<Instant>,
    receiver: mpsc::Receiver<SessionCommand>,
}

impl SessionActor {
    async fn run(mut self) {
        info!(session_id = %self.session_id, "session actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                expiry = self.timer.expired() => {
                    self.handle_expiry(expiry.generation);
                }
                _ = Self::idle_elapsed(self.idle_deadline) => {
                    info!(session_id = %self.session_id, "no clients attached, stopping");
                    break;
                }
            }
        }

        info!(session_id = %self.session_id, "session actor stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::Attach {
                intent,
                identity,
                sender,
                reply,
            } => {
                let result = self.handle_attach(intent, identity, sender);
                let _ = reply.send(result);
                self.sync_idle();
            }
            SessionCommand::Detach { identity_id } => {
                if self.clients.remove(&identity_id).is_some() {
                    debug!(session_id = %self.session_id, %identity_id, "client detached");
                }
                self.sync_idle();
            }
            SessionCommand::Move {
                identity_id,
                column,
                reply,
            } => {
                let result = self.handle_move(&identity_id, column);
                let _ = reply.send(result);
            }
            SessionCommand::Reset { reply } => {
                let result = self.handle_reset();
                let _ = reply.send(result);
            }
            SessionCommand::RequestRematch {
                identity_id,
                switch_sides,
                reply,
            } => {
                let result = self.handle_rematch_request(&identity_id, switch_sides);
                let _ = reply.send(result);
            }
            SessionCommand::AcceptRematch { identity_id, reply } => {
                let result = self.handle_rematch_accept(&identity_id);
                let _ = reply.send(result);
            }
            SessionCommand::DeclineRematch { identity_id, reply } => {
                let result = self.handle_rematch_decline(&identity_id);
                let _ = reply.send(result);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.as_ref().map(Session::snapshot));
            }
            SessionCommand::Shutdown => {
                info!(session_id = %self.session_id, "session shutting down");
                return false;
            }
        }
        true
    }

    fn handle_attach(
        &mut self,
        intent: AttachIntent,
        identity: Identity,
        sender: ClientSender,
    ) -> Result<SessionSnapshot, EngineError> {
        // Seat 1 is told about a fresh join after the borrows below end.
        let mut opponent_notice: Option<IdentityId> = None;

        let snapshot = match (&mut self.session, intent) {
            (None, AttachIntent::Create) => {
                let session = Session::new(self.session_id.clone(), identity.clone());
                let snapshot = session.snapshot();
                self.session = Some(session);
                snapshot
            }
            (None, AttachIntent::Join) => {
                return Err(EngineError::SessionNotFound(self.session_id.clone()));
            }
            (Some(session), AttachIntent::Create) => {
                // Reconnecting creator; anyone else is trying to claim
                // an id that's taken.
                session.reclaim_seat_one(&identity.id)?;
                debug!(session_id = %self.session_id, identity = %identity.id, "creator re-attached");
                session.snapshot()
            }
            (Some(session), AttachIntent::Join) => {
                let outcome = session.join(identity.clone())?;
                if outcome == JoinOutcome::Joined {
                    opponent_notice =
                        session.identity(Seat::One).map(|p| p.id.clone());
                }
                session.snapshot()
            }
        };

        // A fresh attach always replaces any previous channel for this
        // identity; the old connection is considered dead.
        self.clients.insert(identity.id, sender);

        if let Some(creator_id) = opponent_notice {
            // The joiner gets the snapshot in the attach reply; seat 1
            // hears about the arrival here.
            self.send_to(&creator_id, ServerMessage::OpponentJoined {
                snapshot: snapshot.clone(),
            });
            self.sync_timer();
        }
        Ok(snapshot)
    }

    fn handle_move(
        &mut self,
        identity_id: &IdentityId,
        column: usize,
    ) -> Result<(), EngineError> {
        let session = self.session_mut()?;
        let record = session.apply_move(identity_id, column)?;
        let snapshot = session.snapshot();
        debug!(
            session_id = %self.session_id,
            seat = %record.seat,
            row = record.cell.row,
            col = record.cell.col,
            status = %record.status,
            "move applied"
        );
        self.broadcast(ServerMessage::MoveApplied { snapshot });
        self.sync_timer();
        Ok(())
    }

    fn handle_reset(&mut self) -> Result<(), EngineError> {
        let session = self.session_mut()?;
        session.reset();
        let snapshot = session.snapshot();
        self.broadcast(ServerMessage::SessionReset { snapshot });
        self.sync_timer();
        Ok(())
    }

    fn handle_rematch_request(
        &mut self,
        identity_id: &IdentityId,
        switch_sides: bool,
    ) -> Result<(), EngineError> {
        let session = self.session_mut()?;
        match session.request_rematch(identity_id, switch_sides)? {
            RematchOutcome::Requested => {
                let requester_name = session
                    .seat_of(identity_id)
                    .and_then(|seat| session.identity(seat))
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                let other = session
                    .seat_of(identity_id)
                    .and_then(|seat| session.identity(seat.other()))
                    .map(|p| p.id.clone());
                if let Some(other_id) = other {
                    self.send_to(&other_id, ServerMessage::RematchRequested {
                        by_name: requester_name,
                        switch_sides,
                    });
                }
            }
            RematchOutcome::Accepted { switched } => {
                let snapshot = session.snapshot();
                self.broadcast(ServerMessage::RematchAccepted { snapshot, switched });
                self.sync_timer();
            }
        }
        Ok(())
    }

    fn handle_rematch_accept(&mut self, identity_id: &IdentityId) -> Result<(), EngineError> {
        let session = self.session_mut()?;
        let switched = session.accept_rematch(identity_id)?;
        let snapshot = session.snapshot();
        self.broadcast(ServerMessage::RematchAccepted { snapshot, switched });
        self.sync_timer();
        Ok(())
    }

    fn handle_rematch_decline(&mut self, identity_id: &IdentityId) -> Result<(), EngineError> {
        let session = self.session_mut()?;
        session.decline_rematch(identity_id)?;
        self.broadcast(ServerMessage::RematchDeclined);
        Ok(())
    }

    fn handle_expiry(&mut self, generation: u64) {
        // A countdown armed for an earlier turn must not forfeit the
        // current one. Within this task the timer is re-armed before any
        // stale expiry can surface, but the check costs nothing.
        if generation != self.timer.generation() {
            warn!(
                session_id = %self.session_id,
                generation,
                current = self.timer.generation(),
                "stale timer expiry ignored"
            );
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(seat) = session.forfeit_turn() else {
            return;
        };
        let snapshot = session.snapshot();
        self.broadcast(ServerMessage::TurnForfeited { seat, snapshot });
        self.sync_timer();
    }

    /// Reconciles attachment state after an `Attach` or `Detach`. An
    /// abandoned session must not keep forfeiting turns to an empty
    /// room, so the countdown is disarmed and an idle deadline starts;
    /// the first client back cancels the deadline and restarts the
    /// countdown if a turn is pending.
    fn sync_idle(&mut self) {
        if self.clients.is_empty() {
            if self.idle_deadline.is_none() {
                debug!(session_id = %self.session_id, "last client gone, idling");
                self.idle_deadline = Some(Instant::now() + self.idle_timeout);
            }
            self.timer.disarm();
        } else {
            self.idle_deadline = None;
            // Don't reset a running countdown on a mere reconnect.
            if !self.timer.is_armed() {
                self.sync_timer();
            }
        }
    }

    /// Waits out the idle deadline; pends forever while clients are
    /// attached.
    async fn idle_elapsed(deadline: Option<Instant>) {
        match deadline {
            Some(due) => time::sleep_until(due).await,
            None => std::future::pending().await,
        }
    }

    /// Arms the timer whenever a turn is someone's responsibility and
    /// disarms it otherwise. Called after every accepted mutation.
    fn sync_timer(&mut self) {
        let in_progress = self
            .session
            .as_ref()
            .is_some_and(|s| s.status() == SessionStatus::InProgress);
        if in_progress {
            self.timer.arm();
        } else {
            self.timer.disarm();
        }
    }

    fn session_mut(&mut self) -> Result<&mut Session, EngineError> {
        self.session
            .as_mut()
            .ok_or_else(|| EngineError::SessionNotFound(self.session_id.clone()))
    }

    fn send_to(&self, identity_id: &IdentityId, msg: ServerMessage) {
        if let Some(sender) = self.clients.get(identity_id) {
            // A closed channel means the client dropped mid-send; it
            // will resync on re-attach.
            let _ = sender.send(msg);
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        for sender in self.clients.values() {
            let _ = sender.send(msg.clone());
        }
    }
}
