//! Wire protocol between the host and the remote client.
//!
//! ```text
//! TerminalState ──► DiffTracker::poll ──► 'U' frame ──► transport
//! client message ──► ClientMessage::parse ──► shell input / mouse report
//! ```

pub mod diff;
pub mod encode;
pub mod frame;
pub mod input;

pub use diff::DiffTracker;
pub use frame::{ScreenOptions, Topics};
pub use input::{ClientMessage, InputError, MouseEvent};
