pub mod config;
pub mod error;
pub mod kubernetes;
pub mod session;
pub mod terminal;

pub use config::AppConfig;
pub use error::{TunnelError, TunnelResult};
pub use session::{ExecRequest, ExecSession, SessionResult};
