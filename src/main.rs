//! # App Operator
//!
//! Kubernetes operator for Gitea, Matomo and MinIO bucket primaries.
//!
//! ## Process
//!
//! 1. Initialize tracing, metrics, the probe server and the Kubernetes client
//! 2. Make sure the operator configuration ConfigMap exists
//! 3. Run one controller per primary kind until SIGINT/SIGTERM

use anyhow::Result;
use app_operator::runtime::{initialization::initialize, watch_loop::run_controllers};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    // Stop advertising readiness as soon as shutdown starts
    let server_state = Arc::clone(&init.server_state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, waiting for in-flight reconciliations...");
            server_state.set_ready(false);
        }
    });

    run_controllers(init.client, init.context).await;

    info!("All controllers stopped, exiting");
    Ok(())
}
