//! VT sequence parser
//!
//! Decodes a UTF-8 byte stream and classifies it into [`TerminalAction`]s.
//! Escape sequences and multi-byte characters may be split across any
//! number of `feed` calls.

use super::action::{Axis, ClearMode, TerminalAction};
use super::style::{Attrs, Color};

const ESC: char = '\x1b';
const BEL: char = '\x07';
/// C1 string terminator
const ST: char = '\u{9c}';
/// C1 operating system command
const OSC: char = '\u{9d}';

/// OSC payloads longer than this are truncated.
const MAX_OSC_LEN: usize = 4096;

type Sink<'a> = &'a mut dyn FnMut(TerminalAction);

/// Parser state machine
pub struct VtParser {
    state: ParserState,
    params: Vec<u16>,
    /// Parallel to `params`: true where the param followed a `:`
    subparams: Vec<bool>,
    intermediates: Vec<u8>,
    current_param: Option<u16>,
    after_colon: bool,
    osc_string: String,
    utf8_buffer: Vec<u8>,
    utf8_remaining: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum ParserState {
    #[default]
    Ground,
    Escape,
    Csi,
    Osc,
    /// One designator character after `ESC (` or `ESC )`
    Charset,
}

impl Default for VtParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VtParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Ground,
            params: Vec::with_capacity(16),
            subparams: Vec::with_capacity(16),
            intermediates: Vec::with_capacity(4),
            current_param: None,
            after_colon: false,
            osc_string: String::new(),
            utf8_buffer: Vec::with_capacity(4),
            utf8_remaining: 0,
        }
    }

    /// Feed raw bytes, emitting every completed action into `sink`.
    pub fn feed(&mut self, bytes: &[u8], mut sink: impl FnMut(TerminalAction)) {
        for &byte in bytes {
            self.feed_byte(byte, &mut sink);
        }
    }

    /// Feed raw bytes and collect the resulting actions.
    pub fn parse(&mut self, bytes: &[u8]) -> Vec<TerminalAction> {
        let mut actions = Vec::new();
        self.feed(bytes, |action| actions.push(action));
        actions
    }

    fn feed_byte(&mut self, byte: u8, sink: Sink<'_>) {
        if self.utf8_remaining > 0 {
            if byte & 0xC0 == 0x80 {
                self.utf8_buffer.push(byte);
                self.utf8_remaining -= 1;
                if self.utf8_remaining == 0 {
                    let ch = std::str::from_utf8(&self.utf8_buffer)
                        .ok()
                        .and_then(|s| s.chars().next())
                        .unwrap_or(char::REPLACEMENT_CHARACTER);
                    self.utf8_buffer.clear();
                    self.advance(ch, sink);
                }
                return;
            }
            // Truncated character: replace it, then handle this byte normally
            self.utf8_buffer.clear();
            self.utf8_remaining = 0;
            self.advance(char::REPLACEMENT_CHARACTER, sink);
        }

        match byte {
            0x00..=0x7F => self.advance(byte as char, sink),
            0xC2..=0xDF => self.start_utf8(byte, 1),
            0xE0..=0xEF => self.start_utf8(byte, 2),
            0xF0..=0xF4 => self.start_utf8(byte, 3),
            _ => self.advance(char::REPLACEMENT_CHARACTER, sink),
        }
    }

    fn start_utf8(&mut self, byte: u8, remaining: u8) {
        self.utf8_buffer.clear();
        self.utf8_buffer.push(byte);
        self.utf8_remaining = remaining;
    }

    fn advance(&mut self, ch: char, sink: Sink<'_>) {
        match self.state {
            ParserState::Ground => self.ground(ch, sink),
            ParserState::Escape => self.escape(ch, sink),
            ParserState::Csi => self.csi(ch, sink),
            ParserState::Osc => self.osc(ch, sink),
            ParserState::Charset => self.charset(ch, sink),
        }
    }

    fn clear_sequence(&mut self) {
        self.params.clear();
        self.subparams.clear();
        self.intermediates.clear();
        self.current_param = None;
        self.after_colon = false;
    }

    fn enter_escape(&mut self) {
        self.state = ParserState::Escape;
        self.clear_sequence();
    }

    fn enter_osc(&mut self) {
        self.state = ParserState::Osc;
        self.osc_string.clear();
    }

    fn ground(&mut self, ch: char, sink: Sink<'_>) {
        match ch {
            ESC => self.enter_escape(),
            OSC => self.enter_osc(),
            c if is_control(c) => execute_control(c, sink),
            c => sink(TerminalAction::Write(c)),
        }
    }

    fn escape(&mut self, ch: char, sink: Sink<'_>) {
        if ch != ESC && is_control(ch) {
            // C0 controls are executed without leaving the escape
            execute_control(ch, sink);
            return;
        }

        self.state = ParserState::Ground;
        match ch {
            '[' => {
                self.state = ParserState::Csi;
                self.clear_sequence();
            }
            ']' => self.enter_osc(),
            '(' | ')' => self.state = ParserState::Charset,
            // ST after an OSC, or a stray one
            '\\' => {}
            ESC => self.enter_escape(),
            // DECSC / DECRC
            '7' => sink(TerminalAction::SaveCursor),
            '8' => sink(TerminalAction::RestoreCursor),
            'D' => sink(TerminalAction::Index),
            'M' => sink(TerminalAction::ReverseIndex),
            'E' => {
                sink(TerminalAction::CarriageReturn);
                sink(TerminalAction::Index);
            }
            'c' => sink(TerminalAction::Reset),
            // Keypad application / numeric mode
            '=' | '>' => {}
            c => sink(TerminalAction::Write(c)),
        }
    }

    fn csi(&mut self, ch: char, sink: Sink<'_>) {
        match ch {
            ESC | BEL | ST => self.terminate_sequence(ch, sink),
            '0'..='9' => {
                let digit = ch as u16 - '0' as u16;
                self.current_param = Some(
                    self.current_param
                        .unwrap_or(0)
                        .saturating_mul(10)
                        .saturating_add(digit),
                );
            }
            ';' | ':' => {
                let value = self.current_param.take().unwrap_or(0);
                self.push_param(value);
                self.after_colon = ch == ':';
            }
            // Private markers
            '<'..='?' => self.intermediates.push(ch as u8),
            ' '..='/' => {
                if let Some(p) = self.current_param.take() {
                    self.push_param(p);
                }
                self.intermediates.push(ch as u8);
            }
            '@'..='~' => {
                if let Some(p) = self.current_param.take() {
                    self.push_param(p);
                }
                self.state = ParserState::Ground;
                self.execute_csi(ch as u8, sink);
            }
            c if is_control(c) => execute_control(c, sink),
            c => {
                tracing::debug!("Malformed CSI: unexpected {:?}", c);
                self.state = ParserState::Ground;
            }
        }
    }

    fn push_param(&mut self, value: u16) {
        self.params.push(value);
        self.subparams.push(self.after_colon);
    }

    fn osc(&mut self, ch: char, sink: Sink<'_>) {
        match ch {
            ESC | BEL | ST => self.terminate_sequence(ch, sink),
            c if is_control(c) => {}
            c => {
                if self.osc_string.len() < MAX_OSC_LEN {
                    self.osc_string.push(c);
                }
            }
        }
    }

    fn charset(&mut self, ch: char, sink: Sink<'_>) {
        match ch {
            ESC | BEL | ST => self.terminate_sequence(ch, sink),
            // The designator itself is not forwarded
            _ => self.state = ParserState::Ground,
        }
    }

    /// ESC, BEL or ST inside a sequence: flush what was collected, then
    /// continue in `Escape` (for ESC) or `Ground`.
    fn terminate_sequence(&mut self, ch: char, sink: Sink<'_>) {
        match self.state {
            ParserState::Osc => self.execute_osc(sink),
            ParserState::Csi => {
                tracing::debug!(
                    "Unterminated CSI: intermediates={:?}, params={:?}",
                    self.intermediates,
                    self.params
                );
            }
            _ => {}
        }

        if ch == ESC {
            self.enter_escape();
        } else {
            self.state = ParserState::Ground;
        }
    }

    fn execute_csi(&mut self, final_byte: u8, sink: Sink<'_>) {
        let is_private = self.intermediates.contains(&b'?');
        let params = &self.params;

        // Only DECSCUSR (`CSI Ps SP q`) carries a plain intermediate here
        let foreign = self
            .intermediates
            .iter()
            .any(|&b| b != b'?' && !(b == b' ' && final_byte == b'q'));
        if foreign {
            tracing::debug!(
                "Unknown CSI: intermediates={:?}, params={:?}, final={:?}",
                self.intermediates,
                params,
                final_byte as char
            );
            return;
        }

        match (is_private, final_byte) {
            // Cursor movement
            (false, b'A') => sink(TerminalAction::MoveCursor(Axis::Y, -(count(params) as i32))),
            (false, b'B') => sink(TerminalAction::MoveCursor(Axis::Y, count(params) as i32)),
            (false, b'C') => sink(TerminalAction::MoveCursor(Axis::X, count(params) as i32)),
            (false, b'D') => sink(TerminalAction::MoveCursor(Axis::X, -(count(params) as i32))),
            (false, b'E') => {
                // CNL - Cursor Next Line
                sink(TerminalAction::MoveCursor(Axis::Y, count(params) as i32));
                sink(TerminalAction::CarriageReturn);
            }
            (false, b'F') => {
                // CPL - Cursor Previous Line
                sink(TerminalAction::MoveCursor(Axis::Y, -(count(params) as i32)));
                sink(TerminalAction::CarriageReturn);
            }
            (false, b'G') | (false, b'`') => {
                sink(TerminalAction::SetCursorX(param(params, 0, 1) - 1));
            }
            (false, b'H') | (false, b'f') => {
                let row = param(params, 0, 1);
                let col = param(params, 1, 1);
                sink(TerminalAction::SetCursor { x: col - 1, y: row - 1 });
            }
            (false, b'd') => {
                // VPA - Line Position Absolute
                sink(TerminalAction::SetCursorY(param(params, 0, 1) - 1));
            }

            // Erase
            (false, b'J') => match ClearMode::from_param(params.first().copied().unwrap_or(0)) {
                Some(mode) => sink(TerminalAction::ClearScreen(mode)),
                None => tracing::debug!("Ignored ED {:?}", params),
            },
            (false, b'K') => match ClearMode::from_param(params.first().copied().unwrap_or(0)) {
                Some(mode) => sink(TerminalAction::ClearLine(mode)),
                None => tracing::debug!("Ignored EL {:?}", params),
            },

            // Line and character operations
            (false, b'L') => sink(TerminalAction::InsertLines(count(params))),
            (false, b'M') => sink(TerminalAction::DeleteLines(count(params))),
            (false, b'@') => sink(TerminalAction::InsertBlanks(count(params))),
            (false, b'P') => sink(TerminalAction::DeleteForward(count(params))),
            (false, b'X') => sink(TerminalAction::EraseForward(count(params))),

            // Scroll
            (false, b'S') => sink(TerminalAction::ScrollUp(count(params))),
            (false, b'T') => sink(TerminalAction::ScrollDown(count(params))),
            (false, b'r') => {
                let top = param(params, 0, 1) - 1;
                let bottom = match params.get(1).copied() {
                    None | Some(0) => None,
                    Some(b) => Some(b - 1),
                };
                sink(TerminalAction::SetScrollMargin { top, bottom });
            }

            // SGR - Select Graphic Rendition
            (false, b'm') => execute_sgr(params, &self.subparams, sink),

            (false, b's') => sink(TerminalAction::SaveCursor),
            (false, b'u') => sink(TerminalAction::RestoreCursor),
            (false, b'q') => {
                let shape = params.first().copied().unwrap_or(0).min(u8::MAX as u16) as u8;
                sink(TerminalAction::SetCursorStyle(shape));
            }

            // Private modes (DEC)
            (true, b'h') | (true, b'l') => {
                let enable = final_byte == b'h';
                for &mode in params {
                    set_private_mode(mode, enable, sink);
                }
            }

            // Standard modes
            (false, b'h') | (false, b'l') => {
                let enable = final_byte == b'h';
                for &mode in params {
                    match mode {
                        20 => sink(TerminalAction::SetLinefeedMode(enable)),
                        _ => tracing::debug!("Ignored mode {} = {}", mode, enable),
                    }
                }
            }

            _ => {
                tracing::debug!(
                    "Unknown CSI: private={}, params={:?}, final={:?}",
                    is_private,
                    params,
                    final_byte as char
                );
            }
        }
    }

    fn execute_osc(&mut self, sink: Sink<'_>) {
        let payload = std::mem::take(&mut self.osc_string);
        let mut parts = payload.splitn(2, ';');
        let code = parts.next().unwrap_or("");
        let text = parts.next().unwrap_or("");

        match code {
            "0" => sink(TerminalAction::WindowTitle(text.to_string())),
            _ => tracing::debug!("Ignored OSC {:?}", code),
        }
    }
}

fn is_control(ch: char) -> bool {
    (ch as u32) < 0x20 || ('\u{7f}'..='\u{9f}').contains(&ch)
}

fn execute_control(ch: char, sink: Sink<'_>) {
    match ch {
        '\x07' => sink(TerminalAction::Bell),
        '\x08' => sink(TerminalAction::Backspace),
        '\x09' => sink(TerminalAction::Tab),
        '\x0a' | '\x0b' | '\x0c' => sink(TerminalAction::NewLine),
        '\x0d' => sink(TerminalAction::CarriageReturn),
        _ => {}
    }
}

/// Repeat count: missing or zero means 1.
fn count(params: &[u16]) -> u16 {
    params.first().copied().unwrap_or(0).max(1)
}

/// Parameter at `idx`, with missing or zero replaced by `default`.
fn param(params: &[u16], idx: usize, default: u16) -> u16 {
    match params.get(idx).copied() {
        None | Some(0) => default,
        Some(value) => value,
    }
}

fn set_private_mode(mode: u16, enable: bool, sink: Sink<'_>) {
    match (mode, enable) {
        (25, true) => sink(TerminalAction::ShowCursor),
        (25, false) => sink(TerminalAction::HideCursor),
        (1000 | 1002 | 1003, _) => sink(TerminalAction::SetMouseTracking(enable)),
        (2004, _) => sink(TerminalAction::SetBracketedPaste(enable)),
        (1047, true) => sink(TerminalAction::EnableAltBuffer),
        (1047, false) => sink(TerminalAction::DisableAltBuffer),
        (1048, true) => sink(TerminalAction::SaveCursor),
        (1048, false) => sink(TerminalAction::RestoreCursor),
        (1049, true) => {
            sink(TerminalAction::SaveCursor);
            sink(TerminalAction::EnableAltBuffer);
        }
        (1049, false) => {
            sink(TerminalAction::DisableAltBuffer);
            sink(TerminalAction::RestoreCursor);
        }
        _ => tracing::debug!("Ignored private mode {} = {}", mode, enable),
    }
}

fn execute_sgr(params: &[u16], subparams: &[bool], sink: Sink<'_>) {
    if params.is_empty() {
        sink(TerminalAction::ResetStyle);
        return;
    }

    let is_sub = |i: usize| subparams.get(i).copied().unwrap_or(false);
    let mut i = 0;

    while i < params.len() {
        let code = params[i];
        i += 1;
        if code != 38 && code != 48 {
            // Sub-params of other codes (`4:3` curly underline) are not supported
            while is_sub(i) {
                i += 1;
            }
        }

        let action = match code {
            0 => TerminalAction::ResetStyle,
            1 => TerminalAction::AddAttrs(Attrs::BOLD),
            2 => TerminalAction::AddAttrs(Attrs::FAINT),
            3 => TerminalAction::AddAttrs(Attrs::ITALIC),
            4 => TerminalAction::AddAttrs(Attrs::UNDERLINE),
            5 | 6 => TerminalAction::AddAttrs(Attrs::BLINK),
            7 => TerminalAction::AddAttrs(Attrs::INVERSE),
            9 => TerminalAction::AddAttrs(Attrs::STRIKE),
            20 => TerminalAction::AddAttrs(Attrs::FRAKTUR),

            21 => TerminalAction::RemoveAttrs(Attrs::BOLD),
            22 => TerminalAction::RemoveAttrs(Attrs::BOLD | Attrs::FAINT),
            23 => TerminalAction::RemoveAttrs(Attrs::ITALIC | Attrs::FRAKTUR),
            24 => TerminalAction::RemoveAttrs(Attrs::UNDERLINE),
            25 => TerminalAction::RemoveAttrs(Attrs::BLINK),
            27 => TerminalAction::RemoveAttrs(Attrs::INVERSE),
            29 => TerminalAction::RemoveAttrs(Attrs::STRIKE),

            30..=37 => TerminalAction::SetFg(Color::Indexed((code - 30) as u8)),
            39 => TerminalAction::ResetFg,
            40..=47 => TerminalAction::SetBg(Color::Indexed((code - 40) as u8)),
            49 => TerminalAction::ResetBg,

            38 | 48 => {
                let color = if is_sub(i) {
                    // `38:2:<space>:r:g:b` and friends: the whole group is one unit
                    let start = i;
                    while is_sub(i) {
                        i += 1;
                    }
                    colon_color(&params[start..i])
                } else {
                    let (color, used) = extended_color(&params[i..]);
                    i += used;
                    color
                };
                match (code, color) {
                    (38, Some(color)) => TerminalAction::SetFg(color),
                    (_, Some(color)) => TerminalAction::SetBg(color),
                    (_, None) => continue,
                }
            }

            // Bright colors
            90..=97 => TerminalAction::SetFg(Color::Indexed((code - 90 + 8) as u8)),
            100..=107 => TerminalAction::SetBg(Color::Indexed((code - 100 + 8) as u8)),

            _ => continue,
        };
        sink(action);
    }
}

/// `5;<idx>` or `2;<r>;<g>;<b>` following SGR 38/48. Returns the color and
/// how many params it used.
fn extended_color(rest: &[u16]) -> (Option<Color>, usize) {
    match rest.first() {
        Some(5) => (
            rest.get(1).map(|&n| Color::Indexed(clamp_u8(n))),
            rest.len().min(2),
        ),
        Some(2) => {
            let channel = |k: usize| clamp_u8(rest.get(k).copied().unwrap_or(0));
            (
                Some(Color::Rgb(channel(1), channel(2), channel(3))),
                rest.len().min(4),
            )
        }
        Some(_) => (None, 1),
        None => (None, 0),
    }
}

/// Colon form: `5:<idx>`, `2:<space>:<r>:<g>:<b>` or `2:<r>:<g>:<b>`.
fn colon_color(group: &[u16]) -> Option<Color> {
    match *group {
        [5, index, ..] => Some(Color::Indexed(clamp_u8(index))),
        [2, _, r, g, b, ..] | [2, r, g, b] => {
            Some(Color::Rgb(clamp_u8(r), clamp_u8(g), clamp_u8(b)))
        }
        _ => None,
    }
}

fn clamp_u8(value: u16) -> u8 {
    value.min(u8::MAX as u16) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use TerminalAction::*;

    fn parse(bytes: &[u8]) -> Vec<TerminalAction> {
        VtParser::new().parse(bytes)
    }

    #[test]
    fn test_cursor_movement() {
        assert_eq!(parse(b"\x1b[5;10H"), vec![SetCursor { x: 9, y: 4 }]);
        assert_eq!(parse(b"\x1b[H"), vec![SetCursor { x: 0, y: 0 }]);
        assert_eq!(parse(b"\x1b[3A"), vec![MoveCursor(Axis::Y, -3)]);
        assert_eq!(parse(b"\x1b[C"), vec![MoveCursor(Axis::X, 1)]);
        assert_eq!(parse(b"\x1b[0D"), vec![MoveCursor(Axis::X, -1)]);
        assert_eq!(parse(b"\x1b[7G"), vec![SetCursorX(6)]);
        assert_eq!(parse(b"\x1b[4d"), vec![SetCursorY(3)]);
        assert_eq!(
            parse(b"\x1b[2E"),
            vec![MoveCursor(Axis::Y, 2), CarriageReturn]
        );
        assert_eq!(
            parse(b"\x1b[F"),
            vec![MoveCursor(Axis::Y, -1), CarriageReturn]
        );
    }

    #[test]
    fn test_sgr_colors() {
        assert_eq!(parse(b"\x1b[31m"), vec![SetFg(Color::Indexed(1))]);
        assert_eq!(parse(b"\x1b[m"), vec![ResetStyle]);
        assert_eq!(
            parse(b"\x1b[1;4;97;101m"),
            vec![
                AddAttrs(Attrs::BOLD),
                AddAttrs(Attrs::UNDERLINE),
                SetFg(Color::Indexed(15)),
                SetBg(Color::Indexed(9)),
            ]
        );
        assert_eq!(
            parse(b"\x1b[22;23;39;49m"),
            vec![
                RemoveAttrs(Attrs::BOLD | Attrs::FAINT),
                RemoveAttrs(Attrs::ITALIC | Attrs::FRAKTUR),
                ResetFg,
                ResetBg,
            ]
        );
    }

    #[test]
    fn test_sgr_extended_colors() {
        assert_eq!(
            parse(b"\x1b[38;2;1;2;3;48;5;200m"),
            vec![SetFg(Color::Rgb(1, 2, 3)), SetBg(Color::Indexed(200))]
        );
        // Unknown color space is skipped without eating the next code
        assert_eq!(parse(b"\x1b[38;7;1m"), vec![AddAttrs(Attrs::BOLD)]);
    }

    #[test]
    fn test_sgr_colon_colors() {
        assert_eq!(
            parse(b"\x1b[38:2::10:20:30m"),
            vec![SetFg(Color::Rgb(10, 20, 30))]
        );
        assert_eq!(
            parse(b"\x1b[38:2:1:2:3m"),
            vec![SetFg(Color::Rgb(1, 2, 3))]
        );
        assert_eq!(
            parse(b"\x1b[48:5:196;1m"),
            vec![SetBg(Color::Indexed(196)), AddAttrs(Attrs::BOLD)]
        );
        assert_eq!(parse(b"\x1b[4:3m"), vec![AddAttrs(Attrs::UNDERLINE)]);
    }

    #[test]
    fn test_split_sequence_across_chunks() {
        let mut parser = VtParser::new();
        assert!(parser.parse(b"\x1b").is_empty());
        assert!(parser.parse(b"[3").is_empty());
        assert!(parser.parse(b"1").is_empty());
        assert_eq!(parser.parse(b"mX"), vec![SetFg(Color::Indexed(1)), Write('X')]);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let mut parser = VtParser::new();
        // '世' is E4 B8 96
        assert!(parser.parse(&[0xE4]).is_empty());
        assert!(parser.parse(&[0xB8]).is_empty());
        assert_eq!(parser.parse(&[0x96]), vec![Write('世')]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        assert_eq!(
            parse(&[0xE4, b'A', 0xFF]),
            vec![
                Write(char::REPLACEMENT_CHARACTER),
                Write('A'),
                Write(char::REPLACEMENT_CHARACTER),
            ]
        );
    }

    #[test]
    fn test_osc_title() {
        assert_eq!(
            parse(b"\x1b]0;hello; world\x07"),
            vec![WindowTitle("hello; world".to_string())]
        );
        assert_eq!(
            parse(b"\x1b]0;st\x1b\\x"),
            vec![WindowTitle("st".to_string()), Write('x')]
        );
        // C1 OSC and ST, UTF-8 encoded
        let mut bytes = vec![0xC2, 0x9D];
        bytes.extend_from_slice(b"0;c1");
        bytes.extend_from_slice(&[0xC2, 0x9C]);
        assert_eq!(parse(&bytes), vec![WindowTitle("c1".to_string())]);
    }

    #[test]
    fn test_osc_other_types_ignored() {
        assert!(parse(b"\x1b]2;ignored\x07").is_empty());
        assert!(parse(b"\x1b]8;;http://x\x07").is_empty());
    }

    #[test]
    fn test_charset_designation_discarded() {
        assert_eq!(parse(b"\x1b(BA\x1b)0"), vec![Write('A')]);
    }

    #[test]
    fn test_abrupt_terminators() {
        // ESC inside CSI abandons it and starts a new escape
        assert_eq!(parse(b"\x1b[12\x1b[2J"), vec![ClearScreen(ClearMode::All)]);
        // BEL inside CSI is consumed as a terminator
        assert_eq!(parse(b"\x1b[3\x07x"), vec![Write('x')]);
        // ESC inside OSC flushes the title collected so far
        assert_eq!(
            parse(b"\x1b]0;half\x1b[1m"),
            vec![WindowTitle("half".to_string()), AddAttrs(Attrs::BOLD)]
        );
    }

    #[test]
    fn test_escape_finals() {
        assert_eq!(parse(b"\x1b7\x1b8"), vec![SaveCursor, RestoreCursor]);
        assert_eq!(parse(b"\x1bD\x1bM"), vec![Index, ReverseIndex]);
        assert_eq!(parse(b"\x1bE"), vec![CarriageReturn, Index]);
        assert_eq!(parse(b"\x1bc"), vec![Reset]);
        assert!(parse(b"\x1b=").is_empty());
        // Anything else degenerates to a write
        assert_eq!(parse(b"\x1bZ"), vec![Write('Z')]);
    }

    #[test]
    fn test_private_modes() {
        assert_eq!(parse(b"\x1b[?1049h"), vec![SaveCursor, EnableAltBuffer]);
        assert_eq!(parse(b"\x1b[?1049l"), vec![DisableAltBuffer, RestoreCursor]);
        assert_eq!(
            parse(b"\x1b[?25;2004l"),
            vec![HideCursor, SetBracketedPaste(false)]
        );
        assert_eq!(parse(b"\x1b[?1000h"), vec![SetMouseTracking(true)]);
        assert_eq!(parse(b"\x1b[?1047h"), vec![EnableAltBuffer]);
        assert_eq!(parse(b"\x1b[20h"), vec![SetLinefeedMode(true)]);
        assert!(parse(b"\x1b[?5h").is_empty());
    }

    #[test]
    fn test_unknown_sequences_ignored() {
        assert!(parse(b"\x1b[5y").is_empty());
        assert!(parse(b"\x1b[>0c").is_empty());
        assert!(parse(b"\x1b[!p").is_empty());
        assert!(parse(b"\x1b[3J").is_empty());
    }

    #[test]
    fn test_c0_controls() {
        assert_eq!(
            parse(b"a\x07\x08\t\r\n\x0b\x0c\x00\x15\x17"),
            vec![Write('a'), Bell, Backspace, Tab, CarriageReturn, NewLine, NewLine, NewLine]
        );
        // Controls inside a CSI are executed in place
        assert_eq!(
            parse(b"\x1b[2\rC"),
            vec![CarriageReturn, MoveCursor(Axis::X, 2)]
        );
    }

    #[test]
    fn test_erase_and_edit() {
        assert_eq!(
            parse(b"\x1b[J\x1b[1K\x1b[2K"),
            vec![
                ClearScreen(ClearMode::After),
                ClearLine(ClearMode::Before),
                ClearLine(ClearMode::All),
            ]
        );
        assert_eq!(
            parse(b"\x1b[3L\x1b[M\x1b[2@\x1b[P\x1b[4X\x1b[2S\x1b[T"),
            vec![
                InsertLines(3),
                DeleteLines(1),
                InsertBlanks(2),
                DeleteForward(1),
                EraseForward(4),
                ScrollUp(2),
                ScrollDown(1),
            ]
        );
    }

    #[test]
    fn test_cursor_style_and_margins() {
        assert_eq!(parse(b"\x1b[4 q"), vec![SetCursorStyle(4)]);
        assert_eq!(parse(b"\x1b[q"), vec![SetCursorStyle(0)]);
        assert_eq!(
            parse(b"\x1b[2;10r"),
            vec![SetScrollMargin { top: 1, bottom: Some(9) }]
        );
        assert_eq!(
            parse(b"\x1b[r"),
            vec![SetScrollMargin { top: 0, bottom: None }]
        );
    }

    #[test]
    fn test_huge_parameters_saturate() {
        assert_eq!(
            parse(b"\x1b[99999999;99999999H"),
            vec![SetCursor { x: u16::MAX - 1, y: u16::MAX - 1 }]
        );
    }
}
