//! Server startup and graceful shutdown

use std::future::{Future, IntoFuture};
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};

/// Bind `address` and serve until Ctrl-C or SIGTERM
pub async fn serve(address: &str, app: Router) -> ServerResult<()> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ServerError::Listener {
            address: address.to_string(),
            source,
        })?;
    let local = listener
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| address.to_string());
    info!(address = %local, "Server listening");

    serve_until(listener, app, shutdown_signal(), SHUTDOWN_GRACE)
        .await
        .map_err(|source| ServerError::Listener {
            address: local,
            source,
        })
}

/// How long in-flight requests may run once shutdown starts
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Serve on `listener` until `signal` resolves, then give in-flight requests
/// at most `grace` to finish. Requests still running after that are dropped
/// with the runtime, which kills their encoder processes.
pub async fn serve_until<S>(
    listener: TcpListener,
    app: Router,
    signal: S,
    grace: Duration,
) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let (signalled_tx, signalled_rx) = watch::channel(false);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            let _ = signalled_tx.send(true);
        })
        .into_future();

    tokio::select! {
        result = server => {
            result?;
            info!("Server stopped");
        }
        _ = drain_deadline(signalled_rx, grace) => {
            warn!(grace_secs = grace.as_secs_f64(), "Requests still running after shutdown grace period, abandoning them");
        }
    }
    Ok(())
}

async fn drain_deadline(mut signalled: watch::Receiver<bool>, grace: Duration) {
    if signalled.wait_for(|shutting_down| *shutting_down).await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }

    info!("Shutting down gracefully...");
}
