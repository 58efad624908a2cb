pub mod frame;
pub mod pump;
pub mod raw;
pub mod status;

pub use frame::{Channel, Frame};
pub use pump::{IoPump, PumpState, INPUT_CHUNK_SIZE};
pub use raw::{stdin_is_tty, RawModeGuard, TerminalSize};
pub use status::{decode_status, RemoteStatus};
