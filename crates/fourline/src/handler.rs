//! Per-connection handler: decode, dispatch, forward broadcasts.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The loop multiplexes two directions:
//!
//! - inbound frames are decoded and dispatched to the session actor
//! - broadcasts from the actor arrive on an mpsc channel and are written
//!   out with this connection's own envelope sequence
//!
//! Errors never broadcast: a rejected request is answered on the
//! offending connection only, while accepted mutations reach both seats
//! through the actor's broadcast path.

use std::sync::Arc;

use fourline_engine::{AttachIntent, ClientSender, EngineError, SessionHandle};
use fourline_protocol::{
    ClientMessage, Codec, Envelope, ErrorKind, IdentityId, ServerMessage,
    SessionId,
};
use fourline_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::FourlineError;
use crate::server::ServerState;

/// What the handler remembers once its client attaches to a session.
struct Attachment {
    handle: SessionHandle,
    identity_id: IdentityId,
}

enum Flow {
    Continue,
    Close,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), FourlineError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // Broadcasts from the session actor land here; the select below
    // forwards them to the socket.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let mut seq: u64 = 1;
    let mut attachment: Option<Attachment> = None;

    loop {
        tokio::select! {
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };
                let flow = dispatch(
                    &conn,
                    &state,
                    &out_tx,
                    &mut attachment,
                    &mut seq,
                    &data,
                )
                .await;
                // A write failure must still fall through to the detach
                // below, or the actor keeps a dead channel until the
                // identity re-attaches.
                match flow {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Close) => break,
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "send failed");
                        break;
                    }
                }
            }
            Some(msg) = out_rx.recv() => {
                if let Err(e) = send(&conn, &state.codec, &mut seq, msg).await {
                    tracing::debug!(%conn_id, error = %e, "broadcast send failed");
                    break;
                }
            }
        }
    }

    // The seat binding survives; only the outbound channel goes away.
    if let Some(att) = attachment {
        let _ = att.handle.detach(att.identity_id).await;
    }
    Ok(())
}

async fn dispatch<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
    out_tx: &ClientSender,
    attachment: &mut Option<Attachment>,
    seq: &mut u64,
    data: &[u8],
) -> Result<Flow, FourlineError> {
    let envelope: Envelope<ClientMessage> = match state.codec.decode(data) {
        Ok(env) => env,
        Err(e) => {
            tracing::debug!(error = %e, "failed to decode frame");
            send(conn, &state.codec, seq, ServerMessage::Error {
                kind: ErrorKind::Malformed,
                message: "could not decode request".into(),
            })
            .await?;
            return Ok(Flow::Continue);
        }
    };

    match envelope.message {
        ClientMessage::CreateSession {
            session_id,
            identity,
        } => {
            let handle = state.registry.lock().await.get_or_spawn(&session_id);
            let identity_id = identity.id.clone();
            match handle
                .attach(AttachIntent::Create, identity, out_tx.clone())
                .await
            {
                Ok(snapshot) => {
                    *attachment = Some(Attachment {
                        handle,
                        identity_id,
                    });
                    send(conn, &state.codec, seq, ServerMessage::SessionCreated {
                        snapshot,
                    })
                    .await?;
                }
                Err(e) => send_engine_error(conn, &state.codec, seq, &e).await?,
            }
        }

        ClientMessage::JoinSession {
            session_id,
            identity,
        } => {
            let Some(handle) = lookup(state, &session_id).await else {
                let e = EngineError::SessionNotFound(session_id);
                send_engine_error(conn, &state.codec, seq, &e).await?;
                return Ok(Flow::Continue);
            };
            let identity_id = identity.id.clone();
            match handle
                .attach(AttachIntent::Join, identity, out_tx.clone())
                .await
            {
                Ok(snapshot) => {
                    *attachment = Some(Attachment {
                        handle,
                        identity_id,
                    });
                    send(conn, &state.codec, seq, ServerMessage::SessionJoined {
                        snapshot,
                    })
                    .await?;
                }
                Err(e) => send_engine_error(conn, &state.codec, seq, &e).await?,
            }
        }

        ClientMessage::ApplyMove {
            session_id,
            identity_id,
            column,
        } => {
            let result = match lookup(state, &session_id).await {
                Some(handle) => handle.apply_move(identity_id, column).await,
                None => Err(EngineError::SessionNotFound(session_id)),
            };
            if let Err(e) = result {
                send_engine_error(conn, &state.codec, seq, &e).await?;
            }
        }

        ClientMessage::ResetSession { session_id } => {
            let result = match lookup(state, &session_id).await {
                Some(handle) => handle.reset().await,
                None => Err(EngineError::SessionNotFound(session_id)),
            };
            if let Err(e) = result {
                send_engine_error(conn, &state.codec, seq, &e).await?;
            }
        }

        ClientMessage::RequestRematch {
            session_id,
            identity_id,
            switch_sides,
        } => {
            let result = match lookup(state, &session_id).await {
                Some(handle) => {
                    handle.request_rematch(identity_id, switch_sides).await
                }
                None => Err(EngineError::SessionNotFound(session_id)),
            };
            if let Err(e) = result {
                send_engine_error(conn, &state.codec, seq, &e).await?;
            }
        }

        ClientMessage::AcceptRematch {
            session_id,
            identity_id,
        } => {
            let result = match lookup(state, &session_id).await {
                Some(handle) => handle.accept_rematch(identity_id).await,
                None => Err(EngineError::SessionNotFound(session_id)),
            };
            if let Err(e) = result {
                send_engine_error(conn, &state.codec, seq, &e).await?;
            }
        }

        ClientMessage::DeclineRematch {
            session_id,
            identity_id,
        } => {
            let result = match lookup(state, &session_id).await {
                Some(handle) => handle.decline_rematch(identity_id).await,
                None => Err(EngineError::SessionNotFound(session_id)),
            };
            if let Err(e) = result {
                send_engine_error(conn, &state.codec, seq, &e).await?;
            }
        }

        ClientMessage::Probe { sent_at } => {
            // Answered inline; probes never touch a session.
            send(conn, &state.codec, seq, ServerMessage::ProbeReply {
                sent_at,
            })
            .await?;
        }

        ClientMessage::Goodbye { reason } => {
            tracing::info!(%reason, "client said goodbye");
            return Ok(Flow::Close);
        }
    }

    Ok(Flow::Continue)
}

async fn lookup<C: Codec>(
    state: &Arc<ServerState<C>>,
    session_id: &SessionId,
) -> Option<SessionHandle> {
    state.registry.lock().await.get(session_id)
}

async fn send_engine_error<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    seq: &mut u64,
    error: &EngineError,
) -> Result<(), FourlineError> {
    send(conn, codec, seq, ServerMessage::Error {
        kind: error.kind(),
        message: error.to_string(),
    })
    .await
}

async fn send<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    seq: &mut u64,
    message: ServerMessage,
) -> Result<(), FourlineError> {
    let envelope = Envelope::new(next_seq(seq), message);
    let bytes = codec.encode(&envelope)?;
    conn.send(&bytes).await.map_err(FourlineError::Transport)
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
