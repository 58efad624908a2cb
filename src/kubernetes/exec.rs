//! Kubernetes pod exec functionality
//!
//! Opens the raw exec websocket through the kube client and exposes it as a
//! channel-framed duplex transport. Demultiplexing is left to the caller.

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::{api::AttachParams, core::Request, Resource};
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};

use super::client::KubeClient;
use crate::error::{TunnelError, TunnelResult};
use crate::session::PodLocator;
use crate::terminal::frame::Frame;

/// Something read off the exec transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A binary message: one channel-prefixed frame
    Binary(Vec<u8>),
    /// The peer closed the connection
    Close,
    /// Any other message kind, described for diagnostics
    Other(String),
}

/// Duplex channel-framed byte stream
#[async_trait]
pub trait FrameTransport: Send {
    /// Send one frame to the remote side
    async fn send_frame(&mut self, frame: Frame) -> TunnelResult<()>;

    /// Wait for the next event. None means the stream ended.
    ///
    /// Must be cancel safe: the pump races it against local input.
    async fn next_event(&mut self) -> Option<TunnelResult<TransportEvent>>;

    /// Close the transport once the session has its result
    async fn close(&mut self) {}
}

/// Process descriptors wired into the exec session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecMode {
    pub tty: bool,
}

impl ExecMode {
    /// Attach parameters for this mode.
    ///
    /// kube refuses tty together with a separate stderr stream, so a TTY
    /// session gets stdin+stdout (stderr merges into the pty) and a plain
    /// session gets stdin+stdout+stderr.
    pub fn attach_params(&self, container: Option<&str>) -> AttachParams {
        let mut params = if self.tty {
            AttachParams::interactive_tty()
        } else {
            AttachParams::default().stdin(true).stdout(true).stderr(true)
        };
        if let Some(c) = container {
            params = params.container(c);
        }
        params
    }
}

/// Pod exec websocket
pub struct ExecStream<S> {
    ws: S,
}

impl ExecStream<()> {
    /// Start an exec session into a pod
    pub async fn open(
        client: &KubeClient,
        locator: &PodLocator,
        command: &[String],
        mode: ExecMode,
    ) -> TunnelResult<
        ExecStream<
            impl Stream<Item = Result<WsMessage, tungstenite::Error>>
                + Sink<WsMessage, Error = tungstenite::Error>
                + Unpin
                + Send,
        >,
    > {
        // Verify pod exists and can run the command
        client.ensure_running(locator).await?;

        let params = mode.attach_params(locator.container.as_deref());
        let url = Pod::url_path(&(), Some(locator.namespace.as_str()));
        let mut request = Request::new(url)
            .exec(&locator.pod, command.to_vec(), &params)
            .map_err(|e| TunnelError::Connect(format!("Invalid exec request: {}", e)))?;
        request.extensions_mut().insert("exec");

        tracing::info!("Opening exec stream to {} running {:?}", locator, command);
        let connection = client
            .inner()
            .connect(request)
            .await
            .map_err(|e| TunnelError::Connect(format!("Exec into {} failed: {}", locator, e)))?;
        let ws = connection.into_stream();

        Ok(ExecStream { ws })
    }
}

impl<S> ExecStream<S> {
    /// Wrap an already established websocket
    pub fn from_websocket(ws: S) -> Self {
        Self { ws }
    }
}

#[async_trait]
impl<S> FrameTransport for ExecStream<S>
where
    S: Stream<Item = Result<WsMessage, tungstenite::Error>>
        + Sink<WsMessage, Error = tungstenite::Error>
        + Unpin
        + Send,
{
    async fn send_frame(&mut self, frame: Frame) -> TunnelResult<()> {
        self.ws
            .send(WsMessage::Binary(frame.encode().into()))
            .await
            .map_err(|e| TunnelError::Connect(format!("Failed to write to exec stream: {}", e)))
    }

    async fn next_event(&mut self) -> Option<TunnelResult<TransportEvent>> {
        loop {
            let message = match self.ws.next().await? {
                Ok(message) => message,
                Err(e) => {
                    return Some(Err(TunnelError::Connect(format!(
                        "Exec stream error: {}",
                        e
                    ))))
                }
            };

            let event = match message {
                WsMessage::Binary(data) => TransportEvent::Binary(data.to_vec()),
                WsMessage::Close(_) => TransportEvent::Close,
                // Keepalives are answered by tungstenite itself
                WsMessage::Ping(_) | WsMessage::Pong(_) => {
                    tracing::trace!("Exec stream keepalive");
                    continue;
                }
                WsMessage::Text(text) => {
                    TransportEvent::Other(format!("text message {:?}", text.as_str()))
                }
                WsMessage::Frame(frame) => {
                    TransportEvent::Other(format!("raw frame {:?}", frame.header().opcode))
                }
            };
            return Some(Ok(event));
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws.close().await {
            tracing::debug!("Error closing exec stream: {}", e);
        }
    }
}
