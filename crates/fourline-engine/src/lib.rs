//! Authoritative game engine for Fourline.
//!
//! The server owns all game state; clients render snapshots and send
//! intents. This crate holds everything between the wire and the rules:
//!
//! - [`board`] — drop, win detection, draw detection
//! - [`Session`] — the pure state machine for one game
//! - [`validator`] — ordered admission checks for moves
//! - [`SessionHandle`] / the actor behind it — per-session task that
//!   serializes all mutations and runs the turn timer
//! - [`SessionRegistry`] — id → handle map

pub mod board;
pub mod validator;

mod actor;
mod config;
mod error;
mod registry;
mod session;

pub use actor::{AttachIntent, ClientSender, SessionHandle};
pub use config::SessionConfig;
pub use error::EngineError;
pub use registry::SessionRegistry;
pub use session::{
    JoinOutcome, MoveRecord, PendingRematch, RematchOutcome, Session,
};
