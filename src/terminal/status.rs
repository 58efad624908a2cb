//! Status channel decoding
//!
//! The remote side reports completion on channel 3 as a JSON status object.
//! A failed command shows up as reason `NonZeroExitCode` with the code in an
//! `ExitCode` cause.

use serde::Deserialize;

use crate::error::{TunnelError, TunnelResult};

const STATUS_SUCCESS: &str = "Success";
const REASON_NON_ZERO_EXIT: &str = "NonZeroExitCode";
const CAUSE_EXIT_CODE: &str = "ExitCode";

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub details: Option<StatusDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusDetails {
    #[serde(default)]
    pub causes: Vec<StatusCause>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusCause {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RemoteStatus {
    pub fn parse(payload: &[u8]) -> TunnelResult<Self> {
        serde_json::from_slice(payload).map_err(|e| {
            TunnelError::ProtocolViolation(format!(
                "Undecodable status payload ({}): {}",
                e,
                String::from_utf8_lossy(payload)
            ))
        })
    }

    /// Exit code carried by a `NonZeroExitCode` failure, if any.
    ///
    /// Only 0..=255 is a process exit code; anything else is not decoded.
    pub fn exit_code(&self) -> Option<i32> {
        if self.reason.as_deref() != Some(REASON_NON_ZERO_EXIT) {
            return None;
        }
        self.details
            .as_ref()?
            .causes
            .iter()
            .filter(|cause| cause.reason.as_deref() == Some(CAUSE_EXIT_CODE))
            .find_map(|cause| cause.message.as_deref()?.trim().parse::<u8>().ok())
            .map(i32::from)
    }

    /// Map the status to the session's outcome
    pub fn into_result(self) -> TunnelResult<i32> {
        if self.status == STATUS_SUCCESS {
            return Ok(0);
        }
        if let Some(code) = self.exit_code() {
            return Ok(code);
        }
        Err(TunnelError::RemoteFailure {
            status: self.status,
            message: self.message.unwrap_or_default(),
        })
    }
}

/// Decode a status-channel payload into the session's outcome
pub fn decode_status(payload: &[u8]) -> TunnelResult<i32> {
    RemoteStatus::parse(payload)?.into_result()
}
