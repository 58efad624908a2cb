//! Local terminal mode handling

use std::io::IsTerminal;

use crossterm::terminal;

/// Terminal size for the remote pty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}

impl TerminalSize {
    /// Current size of the controlling terminal, if there is one
    pub fn current() -> Option<Self> {
        match terminal::size() {
            Ok((cols, rows)) if cols > 0 && rows > 0 => Some(Self { cols, rows }),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Could not query terminal size: {}", e);
                None
            }
        }
    }
}

/// Whether local stdin is an interactive terminal
pub fn stdin_is_tty() -> bool {
    std::io::stdin().is_terminal()
}

/// Puts the local terminal in raw mode until dropped
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    /// Enable raw mode so keystrokes reach the remote shell unprocessed
    pub fn enable() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        tracing::debug!("Local terminal switched to raw mode");
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!("Failed to restore terminal mode: {}", e);
        }
    }
}
