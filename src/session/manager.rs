//! One interactive exec session, end to end
//!
//! broker → access profile → exec stream → pump → exit code. Nothing is
//! shared across sessions; every resource acquired here is released when
//! `run` returns, whatever the outcome.

use tracing::Instrument;
use uuid::Uuid;

use super::credentials::CredentialBroker;
use super::models::SessionResult;
use super::shutdown::{shutdown_signal, until_shutdown};
use crate::config::AppConfig;
use crate::kubernetes::{ExecMode, ExecStream, FrameTransport, KubeClient, TunnelProfile};
use crate::terminal::{stdin_is_tty, Frame, IoPump, RawModeGuard, TerminalSize};

/// Per-invocation overrides from the command line
#[derive(Debug, Clone, Default)]
pub struct ExecRequest {
    pub task_name: String,
    /// Command to run instead of the configured one
    pub command: Option<Vec<String>>,
    /// Container to target instead of the configured one
    pub container: Option<String>,
}

impl ExecRequest {
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            ..Default::default()
        }
    }
}

/// Runs exec sessions against the configured broker and cluster
pub struct ExecSession {
    config: AppConfig,
}

impl ExecSession {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Attach the local terminal to a shell in the task's container.
    ///
    /// SIGINT, SIGTERM and SIGHUP end the session with `Interrupted` once
    /// the credential file and terminal mode have been released.
    pub async fn run(&self, request: &ExecRequest) -> SessionResult {
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("exec", %session_id, task = %request.task_name);
        until_shutdown(self.run_inner(request), shutdown_signal())
            .instrument(span)
            .await
    }

    async fn run_inner(&self, request: &ExecRequest) -> SessionResult {
        let token = self.config.identity_token()?;
        let broker = CredentialBroker::new(self.config.broker.clone())?;
        let (credential, locator) = broker.fetch(&token, &request.task_name).await?;

        let container = request
            .container
            .clone()
            .or_else(|| self.config.exec.container.clone());
        let locator = locator.with_container(container);
        let command = request
            .command
            .clone()
            .unwrap_or_else(|| self.config.exec.command.clone());

        // Removed on drop, on every path out of this function
        let profile = TunnelProfile::build(&credential, &self.config.cluster);
        let profile_file = profile.write_ephemeral()?;

        let client = KubeClient::from_profile(&profile_file).await?;
        let mode = ExecMode { tty: stdin_is_tty() };
        let mut stream = ExecStream::open(&client, &locator, &command, mode).await?;

        let _raw_mode = if mode.tty {
            if let Some(size) = TerminalSize::current() {
                stream.send_frame(Frame::resize(size.cols, size.rows)).await?;
            }
            Some(RawModeGuard::enable()?)
        } else {
            None
        };

        let mut pump = IoPump::new(
            stream,
            tokio::io::stdin(),
            tokio::io::stdout(),
            tokio::io::stderr(),
        );
        pump.run().await
    }
}
