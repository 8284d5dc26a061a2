//! Terminal emulation: escape sequence parsing and the screen engine.

pub mod action;
pub mod parser;
pub mod state;
pub mod style;
pub mod terminal;

pub use action::{Axis, ClearMode, TerminalAction};
pub use parser::VtParser;
pub use state::{Cell, CursorShape, CursorToken, TerminalState};
pub use style::{Attrs, Color, Style};
pub use terminal::Terminal;
