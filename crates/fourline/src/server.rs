//! `FourlineServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → engine. Each accepted
//! connection gets its own handler task; each session runs its own actor.

use std::sync::Arc;
use std::time::Duration;

use fourline_engine::{SessionConfig, SessionRegistry};
use fourline_protocol::{Codec, JsonCodec};
use fourline_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::FourlineError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it is cheaply cloned across tasks. The registry
/// lock is held only for handle lookup; all game work happens inside the
/// per-session actors.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Mutex<SessionRegistry>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Fourline server.
pub struct FourlineServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    reap_interval: Duration,
}

impl FourlineServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
            reap_interval: Duration::from_secs(60),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the per-session configuration (turn budget etc).
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets how often stopped session actors are pruned from the
    /// registry.
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Binds the transport and builds the server.
    ///
    /// Uses `JsonCodec` over `WebSocketTransport`, which is what the web
    /// client speaks.
    pub async fn build(self) -> Result<FourlineServer<JsonCodec>, FourlineError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Mutex::new(SessionRegistry::new(self.session_config)),
            codec: JsonCodec,
        });

        Ok(FourlineServer {
            transport,
            state,
            reap_interval: self.reap_interval,
        })
    }
}

impl Default for FourlineServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Fourline server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct FourlineServer<C: Codec + Clone> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    reap_interval: Duration,
}

impl FourlineServer<JsonCodec> {
    pub fn builder() -> FourlineServerBuilder {
        FourlineServerBuilder::new()
    }
}

impl<C: Codec + Clone> FourlineServer<C> {
    /// The local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, FourlineError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(mut self) -> Result<(), FourlineError> {
        tracing::info!("Fourline server running");

        // Idle session actors stop themselves; this sweep drops their
        // handles so the registry doesn't accumulate dead entries.
        let reaper_state = Arc::clone(&self.state);
        let reap_interval = self.reap_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(reap_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let reaped = reaper_state.registry.lock().await.reap_closed();
                if reaped > 0 {
                    tracing::info!(reaped, "pruned stopped sessions");
                }
            }
        });

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
