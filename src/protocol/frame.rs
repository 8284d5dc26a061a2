//! Frame builders.
//!
//! Frames are strings whose first character is a tag. Integers inside them
//! use the code-point encoding from [`super::encode`].

use bitflags::bitflags;

use super::encode::{push_24color, push_code_point};
use crate::config::Config;
use crate::core::term::state::{CursorToken, TerminalState};
use crate::core::term::style::{Color, Style};

/// Idle keepalive frame
pub const HEARTBEAT: &str = ".";

/// Separator after titles and button labels
const SOH: char = '\x01';

const MARK_BOTH_COLORS: char = '\x03';
const MARK_ATTRS: char = '\x04';
const MARK_FG: char = '\x05';
const MARK_BG: char = '\x06';

bitflags! {
    /// Topics present in a `'U'` frame.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Topics: u32 {
        const SCREEN_OPTS  = 1 << 0;
        const CONTENT_ALL  = 1 << 1;
        const CONTENT_PART = 1 << 2;
        const TITLE        = 1 << 3;
        const BUTTONS      = 1 << 4;
        const CURSOR       = 1 << 5;
        const INTERNAL     = 1 << 6;
        const BELL         = 1 << 7;
        const STATIC_OPTS  = 1 << 8;
    }
}

/// Host-side options that travel with the screen: theme, default colors,
/// font and button labels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScreenOptions {
    pub theme: u32,
    /// Default foreground as a color wire value
    pub default_fg: u32,
    /// Default background as a color wire value
    pub default_bg: u32,
    pub font_stack: String,
    pub font_size: u32,
    /// Title shown until the shell sets one
    pub title: String,
    pub button_labels: Vec<String>,
    /// Emit the `'D'` diagnostic topic
    pub debug: bool,
    /// Bumped whenever any option changes
    pub revision: u64,
}

impl ScreenOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            theme: config.screen.theme,
            default_fg: config.screen.default_fg_wire(),
            default_bg: config.screen.default_bg_wire(),
            font_stack: config.static_opts.font_stack.clone(),
            font_size: config.static_opts.font_size,
            title: config.title.text.clone(),
            button_labels: config.buttons.visible_labels(),
            debug: config.session.debug,
            revision: 0,
        }
    }

    /// Title to display: the shell's if it set one, else the configured one.
    pub fn display_title<'a>(&'a self, state: &'a TerminalState) -> &'a str {
        if state.title().is_empty() {
            &self.title
        } else {
            state.title()
        }
    }
}

/// A cell rectangle: top row, left column, height and width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub top: u16,
    pub left: u16,
    pub height: u16,
    pub width: u16,
}

impl Rect {
    pub fn full(state: &TerminalState) -> Self {
        Self {
            top: 0,
            left: 0,
            height: state.height,
            width: state.width,
        }
    }
}

/// `'O'` screen options sub-frame.
pub fn push_screen_options(out: &mut String, state: &TerminalState, options: &ScreenOptions) {
    out.push('O');
    push_code_point(out, state.height as u32);
    push_code_point(out, state.width as u32);
    push_code_point(out, options.theme);
    push_24color(out, options.default_fg);
    push_24color(out, options.default_bg);
    push_code_point(out, state.attributes());
}

/// `'P'` static options sub-frame.
pub fn push_static_options(out: &mut String, options: &ScreenOptions) {
    out.push('P');
    out.push_str(&options.font_stack);
    out.push(SOH);
    push_code_point(out, options.font_size);
}

pub fn push_title(out: &mut String, title: &str) {
    out.push('T');
    out.push_str(title);
    out.push(SOH);
}

pub fn push_buttons(out: &mut String, labels: &[String]) {
    out.push('B');
    push_code_point(out, labels.len() as u32);
    for label in labels {
        out.push_str(label);
        out.push(SOH);
    }
}

pub fn push_cursor(out: &mut String, cursor: &CursorToken) {
    out.push('C');
    push_code_point(out, cursor.y as u32);
    push_code_point(out, cursor.x as u32);
    push_code_point(out, cursor.hanging as u32);
}

/// `'D'` diagnostic sub-frame: scroll margins, alternate buffer, mouse
/// tracking and bracketed paste.
pub fn push_diagnostic(out: &mut String, state: &TerminalState) {
    let (top, bottom) = state.scroll_region();
    out.push('D');
    push_code_point(out, top as u32);
    push_code_point(out, bottom as u32);
    push_code_point(out, state.is_alternate() as u32);
    push_code_point(out, state.modes.mouse_tracking as u32);
    push_code_point(out, state.modes.bracketed_paste as u32);
}

/// `'S'` content sub-frame for one rectangle of the active screen.
pub fn push_content(out: &mut String, state: &TerminalState, rect: Rect) {
    out.push('S');
    push_code_point(out, rect.top as u32);
    push_code_point(out, rect.left as u32);
    push_code_point(out, rect.height as u32);
    push_code_point(out, rect.width as u32);
    push_cells(out, state, rect);
}

/// Render cells row by row, emitting a style marker only when the
/// effective style differs from the previous cell's.
pub fn push_cells(out: &mut String, state: &TerminalState, rect: Rect) {
    let mut last = Style {
        fg: Color::Indexed(0),
        bg: Color::Indexed(0),
        attrs: Default::default(),
    };

    let screen = state.active_screen();
    let rows = screen
        .rows
        .iter()
        .skip(rect.top as usize)
        .take(rect.height as usize);

    for row in rows {
        let cells = row
            .cells
            .iter()
            .skip(rect.left as usize)
            .take(rect.width as usize);

        for cell in cells {
            let style = cell.style.effective();
            if style != last {
                push_style_change(out, &last, &style);
                last = style;
            }
            out.push(cell.ch);
        }
    }
}

fn push_style_change(out: &mut String, last: &Style, style: &Style) {
    let set_fg = style.fg != last.fg;
    let set_bg = style.bg != last.bg;

    if set_fg && set_bg && style.has_short_colors() {
        out.push(MARK_BOTH_COLORS);
        push_code_point(out, (style.bg.wire() << 8) + style.fg.wire());
    } else {
        if set_fg {
            out.push(MARK_FG);
            push_24color(out, style.fg.wire());
        }
        if set_bg {
            out.push(MARK_BG);
            push_24color(out, style.bg.wire());
        }
    }

    if style.attrs != last.attrs {
        out.push(MARK_ATTRS);
        push_code_point(out, style.attrs.bits() as u32);
    }
}

/// Standalone full-state frame: dimensions, cursor, attributes and every
/// cell of the active screen.
pub fn full_state_frame(state: &TerminalState) -> String {
    let cursor = state.cursor_token();
    let mut out = String::from("S");
    push_code_point(&mut out, state.height as u32);
    push_code_point(&mut out, state.width as u32);
    push_code_point(&mut out, cursor.y as u32);
    push_code_point(&mut out, cursor.x as u32);
    push_code_point(&mut out, state.attributes());
    push_cells(&mut out, state, Rect::full(state));
    out
}

/// Legacy title frame: the title followed by each button label.
pub fn title_frame(title: &str, labels: &[String]) -> String {
    let mut out = String::from("T");
    out.push_str(title);
    for label in labels {
        out.push(SOH);
        out.push_str(label);
    }
    out
}

/// Button press notification.
pub fn button_frame(index: u32) -> String {
    let mut out = String::from("B");
    push_code_point(&mut out, index);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::Terminal;
    use crate::protocol::encode::encode_code_point;

    fn cp(n: u32) -> char {
        encode_code_point(n)
    }

    fn options() -> ScreenOptions {
        ScreenOptions::from_config(&Config::default())
    }

    #[test]
    fn test_plain_cells_start_with_default_colors() {
        let mut term = Terminal::new(3, 1);
        term.feed(b"ab");
        let mut out = String::new();
        push_cells(&mut out, term.state(), Rect::full(term.state()));

        // fg 7 differs from the initial 0, bg does not
        let expected: String = [MARK_FG, cp(7), 'a', 'b', ' '].iter().collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_style_markers() {
        let mut term = Terminal::new(4, 1);
        term.feed(b"\x1b[31;44ma\x1b[1mb\x1b[38;2;1;2;3mc");
        let mut out = String::new();
        push_cells(&mut out, term.state(), Rect::full(term.state()));

        let mut expected = String::new();
        expected.push(MARK_BOTH_COLORS);
        expected.push(cp((4 << 8) + 1));
        expected.push('a');
        expected.push(MARK_ATTRS);
        expected.push(cp(1));
        expected.push('b');
        expected.push(MARK_FG);
        push_24color(&mut expected, Color::Rgb(1, 2, 3).wire());
        expected.push('c');
        // Blank cell reverts to the default fg, bg 0 and no attrs
        expected.push(MARK_BOTH_COLORS);
        expected.push(cp(7));
        expected.push(MARK_ATTRS);
        expected.push(cp(0));
        expected.push(' ');
        assert_eq!(out, expected);
    }

    #[test]
    fn test_inverse_is_swapped_on_the_wire() {
        let mut term = Terminal::new(1, 1);
        term.feed(b"\x1b[7mx");
        let mut out = String::new();
        push_cells(&mut out, term.state(), Rect::full(term.state()));

        // fg 0 bg 7, inverse bit not sent
        let expected: String = [MARK_BG, cp(7), 'x'].iter().collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_content_rect() {
        let mut term = Terminal::new(4, 3);
        term.feed(b"\x1b[2;2Hxy");
        let mut out = String::new();
        push_content(
            &mut out,
            term.state(),
            Rect {
                top: 1,
                left: 1,
                height: 1,
                width: 2,
            },
        );
        let expected: String = ['S', cp(1), cp(1), cp(1), cp(2), MARK_FG, cp(7), 'x', 'y']
            .iter()
            .collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_full_state_frame_header() {
        let mut term = Terminal::new(5, 2);
        term.feed(b"hi");
        let frame = full_state_frame(term.state());
        let header: Vec<char> = frame.chars().take(6).collect();
        assert_eq!(
            header,
            vec!['S', cp(2), cp(5), cp(0), cp(2), cp(term.state().attributes())]
        );
        // 10 cells plus one style marker
        assert_eq!(frame.chars().count(), 6 + 2 + 10);
    }

    #[test]
    fn test_screen_options_payload() {
        let term = Terminal::new(80, 24);
        let mut out = String::new();
        push_screen_options(&mut out, term.state(), &options());
        let expected: String = [
            'O',
            cp(24),
            cp(80),
            cp(0),
            cp(7),
            cp(0),
            cp(term.state().attributes()),
        ]
        .iter()
        .collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_static_title_buttons_cursor() {
        let mut out = String::new();
        push_static_options(&mut out, &options());
        assert_eq!(out, format!("PInconsolata\x01{}", cp(12)));

        let mut out = String::new();
        push_title(&mut out, "vim");
        assert_eq!(out, "Tvim\x01");

        let mut out = String::new();
        push_buttons(&mut out, &["1".to_string(), "2".to_string()]);
        assert_eq!(out, format!("B{}1\x012\x01", cp(2)));

        let mut term = Terminal::new(3, 2);
        term.feed(b"abc");
        let mut out = String::new();
        push_cursor(&mut out, &term.state().cursor_token());
        let expected: String = ['C', cp(0), cp(2), cp(1)].iter().collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_legacy_frames() {
        let labels: Vec<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(title_frame("ESPTerm", &labels), "TESPTerm\x01a\x01b");
        assert_eq!(button_frame(3), format!("B{}", cp(3)));
        assert_eq!(HEARTBEAT, ".");
    }

    #[test]
    fn test_display_title_fallback() {
        let mut term = Terminal::new(3, 1);
        let options = options();
        assert_eq!(options.display_title(term.state()), "ESPTerm");
        term.feed(b"\x1b]0;shell\x07");
        assert_eq!(options.display_title(term.state()), "shell");
    }
}
