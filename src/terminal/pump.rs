//! Interactive session event loop
//!
//! Races local input against the remote exec stream on a single task:
//! local bytes go out as stdin frames, stdout/stderr frames are written to
//! the matching local descriptor, and the status frame ends the session.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::frame::{Channel, Frame};
use super::status::decode_status;
use crate::error::TunnelError;
use crate::kubernetes::exec::{FrameTransport, TransportEvent};
use crate::session::SessionResult;

/// Largest chunk of local input forwarded in one frame
pub const INPUT_CHUNK_SIZE: usize = 32 * 1024;

/// Where the session is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Open,
    Streaming,
    Closed,
}

/// What routing a frame produced
enum Routed {
    Forwarded,
    Finished(SessionResult),
}

/// Proxies a local terminal over a channel-framed transport
pub struct IoPump<T, R, O, E> {
    transport: T,
    input: R,
    stdout: O,
    stderr: E,
    state: PumpState,
}

impl<T, R, O, E> IoPump<T, R, O, E>
where
    T: FrameTransport,
    R: AsyncRead + Unpin + Send,
    O: AsyncWrite + Unpin + Send,
    E: AsyncWrite + Unpin + Send,
{
    pub fn new(transport: T, input: R, stdout: O, stderr: E) -> Self {
        Self {
            transport,
            input,
            stdout,
            stderr,
            state: PumpState::Open,
        }
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    /// Run until the remote side reports a status or the session can no
    /// longer make progress
    pub async fn run(&mut self) -> SessionResult {
        let result = self.pump().await;
        self.state = PumpState::Closed;
        match result {
            Ok(code) => tracing::info!("Remote process exited with code {}", code),
            Err(ref e) => tracing::info!("Session ended: {}", e),
        }
        result
    }

    async fn pump(&mut self) -> SessionResult {
        let mut buf = vec![0u8; INPUT_CHUNK_SIZE];
        let mut input_open = true;
        let mut remote_open = true;

        loop {
            if !input_open && !remote_open {
                return Err(TunnelError::StreamClosed);
            }

            tokio::select! {
                read = self.input.read(&mut buf), if input_open => {
                    let n = read?;
                    if n == 0 {
                        // Keep draining remote output after local end-of-input
                        tracing::debug!("Local input reached end of stream");
                        input_open = false;
                        continue;
                    }
                    if !remote_open {
                        return Err(TunnelError::StreamClosed);
                    }
                    self.state = PumpState::Streaming;
                    self.transport.send_frame(Frame::stdin(&buf[..n])).await?;
                }
                event = self.transport.next_event(), if remote_open => {
                    match event {
                        None | Some(Ok(TransportEvent::Close)) => {
                            tracing::info!("Exec stream closed by remote");
                            remote_open = false;
                        }
                        Some(Ok(TransportEvent::Binary(data))) => {
                            self.state = PumpState::Streaming;
                            if let Routed::Finished(result) = self.route(&data).await? {
                                self.transport.close().await;
                                return result;
                            }
                        }
                        Some(Ok(TransportEvent::Other(description))) => {
                            return Err(TunnelError::ProtocolViolation(format!(
                                "Unexpected websocket message: {}",
                                description
                            )));
                        }
                        Some(Err(e)) => return Err(e),
                    }
                }
            }
        }
    }

    /// Demultiplex one inbound message
    async fn route(&mut self, data: &[u8]) -> Result<Routed, TunnelError> {
        let frame = Frame::decode(data).ok_or_else(|| {
            TunnelError::ProtocolViolation("Empty message without channel id".to_string())
        })?;
        tracing::trace!("Inbound {:?}", frame);

        match frame.channel {
            Channel::Stdout => {
                write_chunk(&mut self.stdout, &frame.payload).await?;
                Ok(Routed::Forwarded)
            }
            Channel::Stderr => {
                write_chunk(&mut self.stderr, &frame.payload).await?;
                Ok(Routed::Forwarded)
            }
            Channel::Status => Ok(Routed::Finished(decode_status(&frame.payload))),
            other => Err(TunnelError::ProtocolViolation(format!(
                "Unexpected channel: {} Data: {:?}",
                u8::from(other),
                String::from_utf8_lossy(&frame.payload)
            ))),
        }
    }
}

async fn write_chunk<W: AsyncWrite + Unpin>(out: &mut W, payload: &[u8]) -> std::io::Result<()> {
    if payload.is_empty() {
        return Ok(());
    }
    out.write_all(payload).await?;
    out.flush().await
}
