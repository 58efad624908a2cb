//! Interrupt handling for a running session
//!
//! An interrupt cancels the session future, which drops everything it owns
//! (access profile file, raw terminal mode, exec socket) before the process
//! exits.

use std::future::Future;

use crate::error::{TunnelError, TunnelResult};

/// Wait for SIGINT, SIGTERM or SIGHUP and name the one that arrived
#[cfg(unix)]
pub async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut term, mut hup) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(term), Ok(hup)) => (term, hup),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Failed to listen for termination signals: {}", e);
            return ctrl_c().await;
        }
    };

    tokio::select! {
        name = ctrl_c() => name,
        _ = term.recv() => "SIGTERM",
        _ = hup.recv() => "SIGHUP",
    }
}

/// Wait for ctrl-c
#[cfg(not(unix))]
pub async fn shutdown_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    "SIGINT"
}

/// Drive `work` to completion unless `shutdown` resolves first.
///
/// On shutdown `work` is dropped before this returns.
pub async fn until_shutdown<T, W, S>(work: W, shutdown: S) -> TunnelResult<T>
where
    W: Future<Output = TunnelResult<T>>,
    S: Future<Output = &'static str>,
{
    tokio::select! {
        result = work => result,
        signal = shutdown => {
            tracing::info!("Session interrupted by {}", signal);
            Err(TunnelError::Interrupted(signal))
        }
    }
}
