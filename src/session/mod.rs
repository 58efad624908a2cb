pub mod credentials;
pub mod manager;
pub mod models;
pub mod shutdown;

pub use credentials::CredentialBroker;
pub use manager::{ExecRequest, ExecSession};
pub use models::*;
pub use shutdown::{shutdown_signal, until_shutdown};
