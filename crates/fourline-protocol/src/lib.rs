//! Wire protocol for Fourline.
//!
//! This crate defines the language that clients and the session engine
//! speak:
//!
//! - **Types** ([`SessionId`], [`Identity`], [`Seat`], [`Board`],
//!   [`SessionSnapshot`], ...) — the data that travels on the wire.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`], [`Envelope`]) —
//!   the request/broadcast vocabulary of the session engine.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`], [`ErrorKind`]) — what can go wrong at
//!   the protocol level, and the wire-visible error taxonomy.
//!
//! The protocol layer sits between transport (raw bytes) and the engine
//! (authoritative state). It knows nothing about sockets or sessions —
//! only about shapes.

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{ClientMessage, Envelope, ErrorKind, ServerMessage};
pub use types::{
    Board, CellAddr, Identity, IdentityId, Seat, SessionId, SessionSnapshot,
    SessionStatus, WinLine, new_identity_id, new_session_code,
};
