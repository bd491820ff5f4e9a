//! TCP serving with graceful shutdown.

use axum::Router;
use capkit_core::error::CapError;
use capkit_server::{ServerRuntime, TransportKind};
use std::sync::Arc;
use tracing::{error, info};

/// Bind the runtime's configured address and serve the router until an
/// interrupt arrives, then drain every session within the grace period.
///
/// A bind failure is fatal: the error propagates so the process can exit
/// non-zero. A clean interrupt shuts down gracefully and returns `Ok`.
pub async fn serve(runtime: Arc<ServerRuntime>, router: Router) -> Result<(), CapError> {
    if runtime.config().transport == TransportKind::Stdio {
        return Err(CapError::Startup {
            message: "stdio transport has no HTTP binding".to_string(),
            source: None,
        });
    }

    let addr = runtime.config().addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|err| CapError::startup(format!("failed to bind {addr}"), err))?;

    runtime.start_maintenance();
    info!(
        addr = %addr,
        transport = %runtime.config().transport,
        "listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| CapError::Transport {
            message: "server task failed".to_string(),
            source: Some(Box::new(err)),
        })?;

    runtime.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for interrupt");
    } else {
        info!("interrupt received");
    }
}
