//! # Fourline
//!
//! Server-authoritative Connect Four over WebSocket.
//!
//! The server owns every board; clients send intents (create, join,
//! drop a piece, rematch) and render the snapshots pushed back. One
//! actor task per session serializes all mutations, runs the turn
//! timer, and broadcasts state to both seats.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use fourline::FourlineServer;
//!
//! # async fn run() -> Result<(), fourline::FourlineError> {
//! let server = FourlineServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod client;
mod error;
mod handler;
mod mirror;
mod server;

pub use client::LinkMonitor;
pub use error::FourlineError;
pub use mirror::SessionMirror;
pub use server::{FourlineServer, FourlineServerBuilder};

pub use fourline_engine as engine;
pub use fourline_protocol as protocol;
pub use fourline_quality as quality;
pub use fourline_timer as timer;
pub use fourline_transport as transport;
