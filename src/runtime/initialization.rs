//! # Initialization
//!
//! Process start-up: rustls, tracing, metrics, the probe server, the
//! Kubernetes client and the shared reconciliation context.

use crate::config::ControllerConfig;
use crate::controller::reconciler::Context as ReconcileContext;
use crate::dependent::ConvergenceEngine;
use crate::observability;
use crate::server::{start_server, ServerState};
use crate::settings::ConfigService;
use crate::store::KubeStore;
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};

/// Everything the controllers need once start-up has finished
pub struct InitializationResult {
    pub client: Client,
    pub context: Arc<ReconcileContext>,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before any TLS connection is made
    rustls::crypto::ring::default_provider()
        .install_default()
        .unwrap_or_else(|_| panic!("Failed to install rustls crypto provider"));

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app_operator=info".into()),
        )
        .init();

    info!("Starting app-operator v{}", env!("CARGO_PKG_VERSION"));

    observability::metrics::register_metrics()?;

    let config = ControllerConfig::from_env();
    info!(
        "Operator namespace: {}, resync interval: {}s",
        config.operator_namespace, config.resync_interval_secs
    );

    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let state_for_server = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, state_for_server).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let store = Arc::new(KubeStore::new(client.clone(), config.field_manager.clone()));
    let settings = Arc::new(ConfigService::new(
        Arc::clone(&store),
        config.operator_namespace.clone(),
    ));
    // Fail fast on missing RBAC instead of on the first reconciliation
    settings
        .ensure_initialized()
        .await
        .context("Failed to initialize operator configuration")?;

    let engine = ConvergenceEngine::new(store, settings);
    let context = Arc::new(ReconcileContext::new(engine, config));

    server_state.set_ready(true);
    info!("Operator initialized, starting controllers...");

    Ok(InitializationResult {
        client,
        context,
        server_state,
    })
}
