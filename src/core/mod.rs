//! Core terminal emulation components.
//!
//! - **term**: escape sequence parser and screen buffer engine
//! - **pty**: shell process in a pseudo terminal (portable-pty)
//! - **session**: shell + terminal + connected clients
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── ShellIo / PtyEvent channel (shell process)
//! ├── Terminal
//! │   ├── VtParser (bytes -> TerminalAction)
//! │   └── TerminalState (grid, cursor, scroll region, modes)
//! └── Connection[]
//!     ├── Transport
//!     └── DiffTracker ('U' frames)
//! ```

pub mod pty;
pub mod session;
pub mod term;
