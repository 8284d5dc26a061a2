//! Integer encoding used on the wire.
//!
//! Every integer is carried as one Unicode scalar whose code point is the
//! value plus one, so a zero never turns into a NUL. Values that would land
//! in the UTF-16 surrogate block are shifted past it.

use crate::core::term::style::TRUECOLOR_OFFSET;

const SURROGATE_START: u32 = 0xD800;
/// Distance the shifted range is moved by, on top of the +1 offset
const SURROGATE_SHIFT: u32 = 0x800;

/// Marker bit on the first code point of a two-part truecolor value
const TRUECOLOR_MARKER: u32 = 0x10000;

/// Encode `n` as a single code point.
pub fn encode_code_point(n: u32) -> char {
    let value = if n.saturating_add(1) >= SURROGATE_START {
        n.saturating_add(SURROGATE_SHIFT + 1)
    } else {
        n + 1
    };
    char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
}

pub fn push_code_point(out: &mut String, n: u32) {
    out.push(encode_code_point(n));
}

/// Inverse of [`encode_code_point`].
pub fn decode_code_point(ch: char) -> u32 {
    let value = ch as u32;
    if value >= SURROGATE_START + SURROGATE_SHIFT {
        value - SURROGATE_SHIFT - 1
    } else {
        value.saturating_sub(1)
    }
}

/// Encode a color wire value. Palette entries take one code point,
/// truecolor values two, 12 bits each.
pub fn push_24color(out: &mut String, color: u32) {
    if color < TRUECOLOR_OFFSET {
        push_code_point(out, color);
    } else {
        let rgb = color - TRUECOLOR_OFFSET;
        push_code_point(out, (rgb & 0xFFF) | TRUECOLOR_MARKER);
        push_code_point(out, (rgb >> 12) & 0xFFF);
    }
}

pub fn encode_24color(color: u32) -> String {
    let mut out = String::new();
    push_24color(&mut out, color);
    out
}

/// Decode a two-character base-127 integer sent by the client.
pub fn decode_2b(b0: char, b1: char) -> u32 {
    (b0 as u32).saturating_sub(1) + (b1 as u32).saturating_sub(1) * 127
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values() {
        assert_eq!(encode_code_point(0), '\u{1}');
        assert_eq!(encode_code_point(23), '\u{18}');
        assert_eq!(encode_code_point(0xD7FE), '\u{D7FF}');
    }

    #[test]
    fn test_surrogate_range_skipped() {
        let ch = encode_code_point(0xD800);
        assert_eq!(ch as u32, 0xE001);
        assert_eq!(decode_code_point(ch), 0xD800);
        assert_eq!(encode_code_point(0xD7FF) as u32, 0xE000);
        assert_eq!(decode_code_point(encode_code_point(0xD7FF)), 0xD7FF);
        assert_eq!(decode_code_point(encode_code_point(0x12345)), 0x12345);
    }

    #[test]
    fn test_out_of_range_is_replacement() {
        assert_eq!(encode_code_point(u32::MAX), char::REPLACEMENT_CHARACTER);
    }

    #[test]
    fn test_24color() {
        assert_eq!(encode_24color(7), "\u{8}");

        let color = 0x123456 + TRUECOLOR_OFFSET;
        let encoded: Vec<u32> = encode_24color(color).chars().map(decode_code_point).collect();
        assert_eq!(encoded, vec![0x456 | 0x10000, 0x123]);
    }

    #[test]
    fn test_decode_2b() {
        assert_eq!(decode_2b('\u{1}', '\u{1}'), 0);
        assert_eq!(decode_2b('\u{b}', '\u{1}'), 10);
        assert_eq!(decode_2b('\u{2}', '\u{3}'), 1 + 2 * 127);
    }
}
