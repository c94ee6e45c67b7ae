#![cfg_attr(not(test), warn(unused_crate_dependencies))]
use dotenvy as _;
use tracing_subscriber as _;

use std::{net::SocketAddr, sync::Arc};

use tokio_util::sync::CancellationToken;
use world_id_proof_verify::{ActionResolver, SequencerClient};

pub use crate::{
    config::{ConfigError, VerifierConfig},
    error::ErrorResponse,
    metadata::GraphqlActionResolver,
};
use crate::routes::build_app;

mod config;
mod error;
mod metadata;
mod routes;
mod server_layers;

/// Shared, read-only request state.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) sequencer: Arc<SequencerClient>,
    pub(crate) resolver: Arc<dyn ActionResolver>,
    /// Fired on shutdown so in-flight sequencer calls end with `cancelled`.
    pub(crate) shutdown: CancellationToken,
}

#[derive(Debug)]
pub struct VerifierHandle {
    shutdown: CancellationToken,
    join: tokio::task::JoinHandle<anyhow::Result<()>>,
    pub listen_addr: SocketAddr,
}

impl VerifierHandle {
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        match self.join.await {
            Ok(res) => res,
            Err(e) => Err(anyhow::anyhow!("join error: {e}")),
        }
    }
}

/// Binds the listener and serves the verifier in a background task.
///
/// The metadata store is taken as a trait object so tests can supply their own.
pub async fn spawn_verifier(
    cfg: &VerifierConfig,
    resolver: Arc<dyn ActionResolver>,
) -> anyhow::Result<VerifierHandle> {
    let sequencer = SequencerClient::new(cfg.sequencer_routes(), cfg.sequencer_timeout())?;
    let shutdown = CancellationToken::new();
    let state = AppState {
        sequencer: Arc::new(sequencer),
        resolver,
        shutdown: shutdown.clone(),
    };
    let app = build_app(state, cfg.request_timeout());

    let listener = tokio::net::TcpListener::bind(cfg.listen_addr).await?;
    let addr = listener.local_addr()?;

    let token = shutdown.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        token.cancelled().await;
    });
    let join = tokio::spawn(async move { server.await.map_err(|e| anyhow::anyhow!(e)) });
    Ok(VerifierHandle {
        shutdown,
        join,
        listen_addr: addr,
    })
}

/// Runs the verifier from environment configuration until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    let cfg = VerifierConfig::from_env()?;
    let resolver = GraphqlActionResolver::new(
        cfg.metadata_graphql_url.clone(),
        cfg.metadata_graphql_token.clone(),
        cfg.metadata_timeout(),
    )?;

    tracing::info!(
        routes = cfg.sequencer_routes().len(),
        "Config is ready. Starting verifier..."
    );
    let handle = spawn_verifier(&cfg, Arc::new(resolver)).await?;
    tracing::info!("HTTP server listening on {}", handle.listen_addr);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, cancelling in-flight verifications");
    handle.shutdown().await
}
