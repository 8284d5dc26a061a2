//! espterm-host - terminal emulator core and host
//!
//! Parses shell output into terminal actions, keeps the screen model, and
//! encodes it as diff-aware update frames for a remote client.
//!
//! ```
//! use espterm_host::core::term::Terminal;
//!
//! let mut term = Terminal::new(80, 24);
//! term.feed(b"\x1b[31mHi\x1b[0m");
//! assert_eq!(term.state().row_text(0).trim_end(), "Hi");
//! ```

pub mod config;
pub mod core;
pub mod protocol;
pub mod ui;

pub use crate::config::Config;
pub use crate::core::session::{Session, SessionEvent, Transport};
pub use crate::core::term::{Terminal, TerminalAction, TerminalState, VtParser};
pub use crate::protocol::{ClientMessage, DiffTracker};
