//! Kubernetes integration module
//!
//! Provides the ephemeral access profile, the API client built from it, and
//! the pod exec stream.

pub mod config;
pub mod client;
pub mod exec;

pub use config::{ProfileError, ProfileFile, TunnelProfile};
pub use client::{KubeClient, KubePod};
pub use exec::{ExecMode, ExecStream, FrameTransport, TransportEvent};
