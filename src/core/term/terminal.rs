//! Parser and screen engine glued together.

use super::parser::VtParser;
use super::state::{CursorShape, TerminalState};

/// A terminal fed with raw shell bytes.
pub struct Terminal {
    parser: VtParser,
    state: TerminalState,
}

impl Terminal {
    pub fn new(width: u16, height: u16) -> Self {
        Self::with_state(TerminalState::new(width, height))
    }

    /// Terminal with the given power-on cursor shape and LNM mode.
    pub fn configured(width: u16, height: u16, shape: CursorShape, crlf: bool) -> Self {
        Self::with_state(
            TerminalState::new(width, height)
                .with_cursor_shape(shape)
                .with_linefeed_newline(crlf),
        )
    }

    fn with_state(state: TerminalState) -> Self {
        Self {
            parser: VtParser::new(),
            state,
        }
    }

    /// Feed shell output. Sequences may be split across calls.
    pub fn feed(&mut self, bytes: &[u8]) {
        let state = &mut self.state;
        self.parser.feed(bytes, |action| state.apply(action));
    }

    pub fn state(&self) -> &TerminalState {
        &self.state
    }

    pub fn width(&self) -> u16 {
        self.state.width
    }

    pub fn height(&self) -> u16 {
        self.state.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::style::{Attrs, Color, Style};

    #[test]
    fn test_red_hi_then_reset() {
        let mut term = Terminal::new(10, 3);
        term.feed(b"\x1b[31mHi\x1b[0m");

        let h = term.state().cell(0, 0).copied().unwrap_or_default();
        let i = term.state().cell(1, 0).copied().unwrap_or_default();
        assert_eq!(h.ch, 'H');
        assert_eq!(h.style.fg, Color::Indexed(1));
        assert!(h.style.attrs.is_empty());
        assert_eq!(i.ch, 'i');
        assert_eq!(i.style, h.style);

        term.feed(b"!");
        let bang = term.state().cell(2, 0).copied().unwrap_or_default();
        assert_eq!(bang.style, Style::default());
    }

    #[test]
    fn test_clear_and_home() {
        let mut term = Terminal::new(6, 3);
        term.feed(b"\x1b[1;44mabc\r\ndef\x1b[0m");
        term.feed(b"\x1b[2J\x1b[H");

        for y in 0..3 {
            for x in 0..6 {
                let cell = term.state().cell(x, y).copied().unwrap_or_default();
                assert_eq!(cell, crate::core::term::state::Cell::default());
            }
        }
        assert_eq!((term.state().cursor().x, term.state().cursor().y), (0, 0));
    }

    #[test]
    fn test_newlines_scroll_past_bottom() {
        let mut term = Terminal::new(4, 3);
        term.feed(b"aaaa\x1b[2;1Hbbbb\x1b[3;1Hcccc\x1b[H");
        let row1 = term.state().row_text(1);

        term.feed(b"\n\n\n");
        assert_eq!(term.state().row_text(0), row1);
        assert_eq!(term.state().cursor().y, 2);

        term.feed(b"\n");
        assert_eq!(term.state().row_text(0), "cccc");
        assert_eq!(term.state().cursor().y, 2);
    }

    #[test]
    fn test_split_sequences() {
        let mut term = Terminal::new(10, 2);
        for chunk in [&b"\x1b"[..], b"[3", b"2m", b"\xc3", b"\xa9"] {
            term.feed(chunk);
        }
        let cell = term.state().cell(0, 0).copied().unwrap_or_default();
        assert_eq!(cell.ch, 'é');
        assert_eq!(cell.style.fg, Color::Indexed(2));
    }

    #[test]
    fn test_alt_screen_program() {
        let mut term = Terminal::new(8, 2);
        term.feed(b"prompt$ ");
        term.feed(b"\x1b[?1049h\x1b[7mTUI\x1b[?1049l");
        assert_eq!(term.state().row_text(0), "prompt$ ");
        assert_eq!(term.state().cursor().x, 8);
        // Restoring the cursor also restores the saved style
        assert!(!term.state().style.attrs.contains(Attrs::INVERSE));
    }

    #[test]
    fn test_configured_terminal() {
        let mut term = Terminal::configured(10, 3, CursorShape::SteadyBar, true);
        term.feed(b"ab\n");
        assert_eq!(term.state().cursor().x, 0);
        assert_eq!(term.state().cursor().shape, CursorShape::SteadyBar);
        assert_eq!((term.width(), term.height()), (10, 3));
    }
}
