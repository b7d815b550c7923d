//! Serving and bounded graceful shutdown.
//!
//! On SIGINT/SIGTERM the listener stops accepting, in-flight requests get a
//! grace period to finish, and then background tasks are drained before the
//! process reports itself stopped. A grace period overrun is an explicit
//! failure, not a hang.

use std::future::{Future, IntoFuture};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::tasks::TaskTracker;

/// How long in-flight requests get to finish after a termination signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Io(#[from] io::Error),
    /// In-flight requests did not finish within the grace period.
    #[error("graceful shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
}

/// Serve `app` until SIGINT or SIGTERM, then shut down gracefully.
pub async fn serve(listener: TcpListener, app: Router, tasks: TaskTracker) -> Result<(), ServeError> {
    serve_with_shutdown(listener, app, tasks, SHUTDOWN_GRACE, termination_signal()).await
}

/// Like [`serve`], with the shutdown trigger and grace period injectable.
pub async fn serve_with_shutdown(
    listener: TcpListener,
    app: Router,
    tasks: TaskTracker,
    grace: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServeError> {
    let (trigger_tx, trigger_rx) = tokio::sync::oneshot::channel::<()>();

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = trigger_rx.await;
    })
    .into_future();

    let mut server = std::pin::pin!(server);

    tokio::select! {
        result = server.as_mut() => {
            // The listener failed before any shutdown was requested.
            return result.map_err(ServeError::from);
        }
        () = shutdown => {
            tracing::info!(grace = ?grace, "shutting down server");
            let _ = trigger_tx.send(());
        }
    }

    match tokio::time::timeout(grace, server).await {
        Ok(result) => result?,
        Err(_) => return Err(ServeError::ShutdownTimeout(grace)),
    }

    tracing::info!(in_flight = tasks.in_flight(), "completing background tasks");
    tasks.drain().await;
    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
pub async fn termination_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}
