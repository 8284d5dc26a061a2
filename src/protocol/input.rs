//! Client to host messages.
//!
//! Every message starts with a type character:
//!
//! - `s<text>`: text typed or pasted by the user, forwarded to the shell
//! - `b<char>`: action button press, the index is the char's code point
//! - `m`/`p`/`r`: mouse move, press and release, followed by four
//!   two-character integers (row, column, button, modifiers)
//!
//! Over a byte stream each message is one line ending in `\n`. Inside the
//! line, `\` escapes a newline (`\n`) or a backslash (`\\`); a CR is
//! passed through as is.

use std::io::{self, BufRead};

use bitflags::bitflags;
use thiserror::Error;

use super::encode::decode_2b;

/// Largest 1-based coordinate an X10 mouse report can carry
const X10_MAX_COORD: u32 = 223;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("empty message")]
    Empty,

    #[error("unknown message type {0:?}")]
    UnknownType(char),

    #[error("truncated {0:?} message")]
    Truncated(char),
}

bitflags! {
    /// Modifier keys as sent by the client
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u32 {
        const CTRL  = 0b0001;
        const SHIFT = 0b0010;
        const OPT   = 0b0100;
        const META  = 0b1000;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseKind {
    Move,
    Press,
    Release,
}

/// A pointer event in 0-based cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseKind,
    pub row: u32,
    pub col: u32,
    /// Client button: 0 none, 1 left, 2 middle, 3 right, 4/5 wheel
    pub button: u32,
    pub modifiers: Modifiers,
}

impl MouseEvent {
    /// xterm X10 mouse report, or `None` if the event has no report
    /// (pointer motion, unknown button, coordinates past 223).
    pub fn to_report(&self) -> Option<Vec<u8>> {
        let mut code: u32 = match (self.kind, self.button) {
            (MouseKind::Move, _) => return None,
            (MouseKind::Release, _) => 3,
            (MouseKind::Press, 0) => 3,
            (MouseKind::Press, 1) => 0,
            (MouseKind::Press, 2) => 1,
            (MouseKind::Press, 3) => 2,
            (MouseKind::Press, 4) => 64,
            (MouseKind::Press, 5) => 65,
            (MouseKind::Press, _) => return None,
        };

        if self.modifiers.contains(Modifiers::SHIFT) {
            code |= 4;
        }
        if self.modifiers.intersects(Modifiers::OPT | Modifiers::META) {
            code |= 8;
        }
        if self.modifiers.contains(Modifiers::CTRL) {
            code |= 16;
        }

        // 1-based coordinates for terminal protocol
        let x = self.col + 1;
        let y = self.row + 1;
        if x > X10_MAX_COORD || y > X10_MAX_COORD {
            return None;
        }

        Some(vec![
            0x1b,
            b'[',
            b'M',
            (code + 32) as u8,
            (x + 32) as u8,
            (y + 32) as u8,
        ])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    Input(String),
    Button(u32),
    Mouse(MouseEvent),
}

impl ClientMessage {
    pub fn parse(message: &str) -> Result<Self, InputError> {
        let mut chars = message.chars();
        let kind = chars.next().ok_or(InputError::Empty)?;

        match kind {
            's' => Ok(ClientMessage::Input(chars.as_str().to_string())),
            'b' => chars
                .next()
                .map(|ch| ClientMessage::Button(ch as u32))
                .ok_or(InputError::Truncated(kind)),
            'm' | 'p' | 'r' => {
                let data: Vec<char> = chars.take(8).collect();
                if data.len() < 8 {
                    return Err(InputError::Truncated(kind));
                }
                let field = |i: usize| decode_2b(data[i * 2], data[i * 2 + 1]);

                Ok(ClientMessage::Mouse(MouseEvent {
                    kind: match kind {
                        'm' => MouseKind::Move,
                        'p' => MouseKind::Press,
                        _ => MouseKind::Release,
                    },
                    row: field(0),
                    col: field(1),
                    button: field(2),
                    modifiers: Modifiers::from_bits_truncate(field(3)),
                }))
            }
            other => Err(InputError::UnknownType(other)),
        }
    }
}

/// Read one newline-framed message, or `None` at end of input.
pub fn read_message<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Ok(None);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    Ok(Some(unescape_line(&String::from_utf8_lossy(&line))))
}

fn unescape_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Two-character encoding of a small integer
    fn enc(n: u32) -> String {
        [
            char::from_u32(n % 127 + 1).unwrap(),
            char::from_u32(n / 127 + 1).unwrap(),
        ]
        .iter()
        .collect()
    }

    fn mouse_message(kind: char, row: u32, col: u32, button: u32, mods: u32) -> String {
        format!("{kind}{}{}{}{}", enc(row), enc(col), enc(button), enc(mods))
    }

    #[test]
    fn test_read_message_keeps_carriage_return() {
        let mut input = Cursor::new(b"s\r\nsabc\r\n".to_vec());
        assert_eq!(read_message(&mut input).unwrap(), Some("s\r".to_string()));
        assert_eq!(read_message(&mut input).unwrap(), Some("sabc\r".to_string()));
        assert_eq!(read_message(&mut input).unwrap(), None);
    }

    #[test]
    fn test_read_message_escapes() {
        let mut input = Cursor::new(br"secho a\nb\\c\q".to_vec());
        assert_eq!(
            read_message(&mut input).unwrap(),
            Some("secho a\nb\\c\\q".to_string())
        );
        assert_eq!(read_message(&mut input).unwrap(), None);

        // Last line without a delimiter
        let mut input = Cursor::new(b"sx".to_vec());
        assert_eq!(read_message(&mut input).unwrap(), Some("sx".to_string()));
    }

    #[test]
    fn test_parse_input_and_button() {
        assert_eq!(
            ClientMessage::parse("sls -la\r"),
            Ok(ClientMessage::Input("ls -la\r".to_string()))
        );
        assert_eq!(ClientMessage::parse("b\u{2}"), Ok(ClientMessage::Button(2)));
        assert_eq!(ClientMessage::parse(""), Err(InputError::Empty));
        assert_eq!(ClientMessage::parse("b"), Err(InputError::Truncated('b')));
        assert_eq!(ClientMessage::parse("x1"), Err(InputError::UnknownType('x')));
    }

    #[test]
    fn test_parse_mouse() {
        let msg = mouse_message('p', 4, 200, 1, 2);
        let parsed = ClientMessage::parse(&msg);
        assert_eq!(
            parsed,
            Ok(ClientMessage::Mouse(MouseEvent {
                kind: MouseKind::Press,
                row: 4,
                col: 200,
                button: 1,
                modifiers: Modifiers::SHIFT,
            }))
        );
        assert_eq!(ClientMessage::parse("p\u{1}\u{1}"), Err(InputError::Truncated('p')));
    }

    #[test]
    fn test_mouse_report_x10() {
        let event = MouseEvent {
            kind: MouseKind::Press,
            row: 0,
            col: 0,
            button: 1,
            modifiers: Modifiers::empty(),
        };
        assert_eq!(event.to_report(), Some(vec![0x1b, b'[', b'M', 32, 33, 33]));

        let event = MouseEvent {
            kind: MouseKind::Press,
            row: 5,
            col: 10,
            button: 3,
            modifiers: Modifiers::CTRL | Modifiers::SHIFT | Modifiers::META,
        };
        assert_eq!(
            event.to_report(),
            Some(vec![0x1b, b'[', b'M', 32 + (2 | 4 | 8 | 16), 43, 38])
        );
    }

    #[test]
    fn test_mouse_report_buttons() {
        let code = |kind, button| {
            MouseEvent {
                kind,
                row: 0,
                col: 0,
                button,
                modifiers: Modifiers::empty(),
            }
            .to_report()
            .map(|report| report[3] - 32)
        };
        assert_eq!(code(MouseKind::Press, 0), Some(3));
        assert_eq!(code(MouseKind::Press, 2), Some(1));
        assert_eq!(code(MouseKind::Press, 4), Some(64));
        assert_eq!(code(MouseKind::Press, 5), Some(65));
        assert_eq!(code(MouseKind::Release, 1), Some(3));
        assert_eq!(code(MouseKind::Press, 9), None);
        assert_eq!(code(MouseKind::Move, 1), None);
    }

    #[test]
    fn test_mouse_report_out_of_range() {
        let event = MouseEvent {
            kind: MouseKind::Press,
            row: 0,
            col: 223,
            button: 1,
            modifiers: Modifiers::empty(),
        };
        assert_eq!(event.to_report(), None);

        let event = MouseEvent { col: 222, ..event };
        assert!(event.to_report().is_some());
    }
}
