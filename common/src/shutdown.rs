use tokio_util::sync::CancellationToken;
use tracing::info;

/// Spawns a task that waits for SIGTERM (or Ctrl+C outside a container) and
/// cancels the returned token once. Every long-running task in the process —
/// the StreamClass controller, each dynamically-spawned Stream controller,
/// the metrics reporter, the health server — is expected to race its work
/// against this token and exit cleanly when it fires.
pub fn listen() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received, cancelling outstanding work");
        child.cancel();
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
