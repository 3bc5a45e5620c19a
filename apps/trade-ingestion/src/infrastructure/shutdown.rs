//! Signal handling for both binaries.

use std::time::Duration;

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Upper bound on how long a binary waits for in-flight work after a signal.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Wait for SIGINT or SIGTERM, then cancel `shutdown_token`.
///
/// Returns early without cancelling anything if the token is cancelled
/// elsewhere first.
#[allow(clippy::expect_used)]
pub async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, cancelling");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, cancelling");
        }
        () = shutdown_token.cancelled() => return,
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}

/// Run [`await_shutdown`] on a background task.
pub fn spawn_signal_handler(shutdown_token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(await_shutdown(shutdown_token))
}
