//! Actions produced by the parser and consumed by the screen engine.

use super::style::{Attrs, Color};

/// Axis for relative cursor movement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Extent of an erase operation, relative to the cursor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearMode {
    /// Everything strictly before the cursor
    Before,
    /// From the cursor (inclusive) to the end
    After,
    /// The whole line or screen
    All,
}

impl ClearMode {
    /// Map an ED/EL parameter. Unsupported values (e.g. 3, erase
    /// scrollback) yield `None`.
    pub fn from_param(param: u16) -> Option<Self> {
        match param {
            0 => Some(ClearMode::After),
            1 => Some(ClearMode::Before),
            2 => Some(ClearMode::All),
            _ => None,
        }
    }
}

/// A fully parameterized terminal operation.
///
/// Coordinates and counts are already converted to 0-based cells; the
/// engine clamps everything to the grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminalAction {
    /// Print a character at the cursor
    Write(char),
    /// Absolute cursor position
    SetCursor { x: u16, y: u16 },
    /// Absolute column, row unchanged
    SetCursorX(u16),
    /// Absolute row, column unchanged
    SetCursorY(u16),
    /// Relative cursor movement
    MoveCursor(Axis, i32),

    ClearScreen(ClearMode),
    ClearLine(ClearMode),
    InsertBlanks(u16),
    DeleteForward(u16),
    EraseForward(u16),
    InsertLines(u16),
    DeleteLines(u16),
    /// Explicit scroll (SU), cursor stays put
    ScrollUp(u16),
    /// Explicit scroll (SD), cursor stays put
    ScrollDown(u16),
    /// Scroll region, 0-based inclusive rows; `None` bottom means the last row
    SetScrollMargin { top: u16, bottom: Option<u16> },

    ResetStyle,
    AddAttrs(Attrs),
    RemoveAttrs(Attrs),
    SetFg(Color),
    SetBg(Color),
    ResetFg,
    ResetBg,

    SaveCursor,
    RestoreCursor,
    /// DECSCUSR parameter (0 = configured default)
    SetCursorStyle(u8),
    ShowCursor,
    HideCursor,

    EnableAltBuffer,
    DisableAltBuffer,
    SetMouseTracking(bool),
    SetBracketedPaste(bool),
    /// LNM: line feed also returns the carriage
    SetLinefeedMode(bool),

    WindowTitle(String),
    Bell,
    /// LF / VT / FF
    NewLine,
    /// IND: down one row, scrolling at the bottom margin
    Index,
    /// RI: up one row, scrolling at the top margin
    ReverseIndex,
    CarriageReturn,
    Backspace,
    Tab,
    /// RIS
    Reset,
}
