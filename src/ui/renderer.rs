//! Screen preview using crossterm
//!
//! Draws the emulated screen onto a local terminal, one styled run of
//! cells at a time. Used by the `--dump` mode of the binary.

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{
    Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use unicode_width::UnicodeWidthChar;

use crate::core::term::state::TerminalState;
use crate::core::term::style::{Attrs, Style};

/// Renders a [`TerminalState`] as styled text.
pub struct Renderer;

impl Renderer {
    /// Write every row of the active screen, each followed by CRLF.
    pub fn render<W: Write>(out: &mut W, state: &TerminalState) -> io::Result<()> {
        let mut run = String::with_capacity(state.width as usize);

        for row in &state.active_screen().rows {
            let mut current: Option<Style> = None;
            let mut skip_blank = false;

            for cell in &row.cells {
                // The column after a wide character is covered by it
                if skip_blank && cell.ch == ' ' {
                    skip_blank = false;
                    continue;
                }

                let style = cell.style.effective();
                if current != Some(style) {
                    if let Some(previous) = current {
                        Self::flush(out, &previous, &mut run)?;
                    }
                    current = Some(style);
                }

                let (ch, width) = display_char(cell.ch);
                skip_blank = width > 1;
                run.push(ch);
            }

            if let Some(style) = current {
                Self::flush(out, &style, &mut run)?;
            }
            queue!(out, ResetColor, SetAttribute(Attribute::Reset), Print("\r\n"))?;
        }

        out.flush()
    }

    fn flush<W: Write>(out: &mut W, style: &Style, run: &mut String) -> io::Result<()> {
        if run.is_empty() {
            return Ok(());
        }
        Self::apply_style(out, style)?;
        queue!(out, Print(run.as_str()))?;
        run.clear();
        Ok(())
    }

    /// Apply cell attributes
    fn apply_style<W: Write>(out: &mut W, style: &Style) -> io::Result<()> {
        queue!(out, SetAttribute(Attribute::Reset))?;

        let attributes = [
            (Attrs::BOLD, Attribute::Bold),
            (Attrs::FAINT, Attribute::Dim),
            (Attrs::ITALIC, Attribute::Italic),
            (Attrs::UNDERLINE, Attribute::Underlined),
            (Attrs::BLINK, Attribute::SlowBlink),
            (Attrs::STRIKE, Attribute::CrossedOut),
            (Attrs::FRAKTUR, Attribute::Fraktur),
        ];
        for (flag, attribute) in attributes {
            if style.attrs.contains(flag) {
                queue!(out, SetAttribute(attribute))?;
            }
        }

        queue!(
            out,
            SetForegroundColor(style.fg.to_crossterm()),
            SetBackgroundColor(style.bg.to_crossterm())
        )
    }
}

/// Plain-text renderer for debugging
pub struct DebugRenderer;

impl DebugRenderer {
    /// Render state to string, with a header and a cursor marker.
    pub fn render(state: &TerminalState) -> String {
        let cursor = state.cursor_token();
        let mut output = String::new();

        output.push_str(&format!("=== Terminal {}x{} ===\n", state.width, state.height));
        output.push_str(&format!(
            "Cursor: ({}, {}) visible={} hanging={}\n",
            cursor.x, cursor.y, cursor.visible, cursor.hanging
        ));
        output.push_str(&format!("Title: {}\n", state.title()));
        output.push_str(&format!("Alternate: {}\n", state.is_alternate()));
        output.push_str(&"─".repeat(state.width as usize));
        output.push('\n');

        for (y, row) in state.active_screen().rows.iter().enumerate() {
            output.push(if y == cursor.y as usize { '>' } else { ' ' });
            output.extend(row.cells.iter().map(|cell| display_char(cell.ch).0));
            output.push('\n');
        }

        output.push_str(&"─".repeat(state.width as usize));
        output.push('\n');
        output
    }
}

/// Character to draw for a cell and its column width. Zero-width and
/// control characters are drawn as a space.
fn display_char(ch: char) -> (char, usize) {
    match ch.width() {
        Some(width) if width > 0 => (ch, width),
        _ => (' ', 1),
    }
}
