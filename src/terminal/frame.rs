//! Channel framing for the Kubernetes exec protocol
//!
//! Every binary websocket message carries one frame: the first byte is the
//! channel id and the rest is payload.

use std::fmt;

use serde::Serialize;

/// Channel ids defined by the exec protocol
pub mod channel {
    pub const STDIN: u8 = 0;
    pub const STDOUT: u8 = 1;
    pub const STDERR: u8 = 2;
    pub const STATUS: u8 = 3;
    pub const RESIZE: u8 = 4;
}

/// Logical stream a frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stdin,
    Stdout,
    Stderr,
    Status,
    Resize,
    /// Any id outside the protocol's set
    Unknown(u8),
}

impl From<u8> for Channel {
    fn from(id: u8) -> Self {
        match id {
            channel::STDIN => Channel::Stdin,
            channel::STDOUT => Channel::Stdout,
            channel::STDERR => Channel::Stderr,
            channel::STATUS => Channel::Status,
            channel::RESIZE => Channel::Resize,
            other => Channel::Unknown(other),
        }
    }
}

impl From<Channel> for u8 {
    fn from(c: Channel) -> Self {
        match c {
            Channel::Stdin => channel::STDIN,
            Channel::Stdout => channel::STDOUT,
            Channel::Stderr => channel::STDERR,
            Channel::Status => channel::STATUS,
            Channel::Resize => channel::RESIZE,
            Channel::Unknown(id) => id,
        }
    }
}

/// A single demultiplexed unit of the exec stream
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub channel: Channel,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(channel: Channel, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }

    /// Frame carrying local input to the remote process
    pub fn stdin(data: &[u8]) -> Self {
        Self::new(Channel::Stdin, data)
    }

    /// Frame announcing the local terminal size
    pub fn resize(cols: u16, rows: u16) -> Self {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Size {
            width: u16,
            height: u16,
        }
        // Serializing two integers cannot fail
        let payload = serde_json::to_vec(&Size {
            width: cols,
            height: rows,
        })
        .unwrap_or_default();
        Self::new(Channel::Resize, payload)
    }

    /// Split a raw message into channel and payload.
    ///
    /// Returns None for an empty message, which carries no channel id.
    pub fn decode(data: &[u8]) -> Option<Self> {
        let (&id, payload) = data.split_first()?;
        Some(Self::new(Channel::from(id), payload))
    }

    /// Prefix the payload with the channel id
    pub fn encode(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(1 + self.payload.len());
        message.push(u8::from(self.channel));
        message.extend_from_slice(&self.payload);
        message
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("channel", &self.channel)
            .field("len", &self.payload.len())
            .finish()
    }
}
