//! Fourline server binary.

use fourline::{FourlineError, FourlineServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), FourlineError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fourline=info")),
        )
        .init();

    let addr = std::env::var("FOURLINE_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let server = FourlineServer::builder().bind(&addr).build().await?;
    tracing::info!(%addr, "fourline listening");
    server.run().await
}
