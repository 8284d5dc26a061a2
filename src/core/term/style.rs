//! Cell style: colors and text attributes.
//!
//! A [`Style`] is a small value type compared with `==` everywhere in the
//! engine. Integer forms only exist at the serialization boundary (see
//! [`Color::wire`]).

use bitflags::bitflags;

/// Palette index used for the default foreground.
pub const DEFAULT_FG: u8 = 7;
/// Palette index used for the default background.
pub const DEFAULT_BG: u8 = 0;

/// Offset added to 24-bit colors so they never collide with palette indices.
pub const TRUECOLOR_OFFSET: u32 = 256;

/// Color definition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    /// 256-color palette entry
    Indexed(u8),
    /// 24-bit color
    Rgb(u8, u8, u8),
}

impl Color {
    /// Wire value: palette indices as-is, truecolor as `rgb + 256`.
    pub fn wire(self) -> u32 {
        match self {
            Color::Indexed(n) => n as u32,
            Color::Rgb(r, g, b) => {
                (((r as u32) << 16) | ((g as u32) << 8) | b as u32) + TRUECOLOR_OFFSET
            }
        }
    }

    /// True if the color fits the one-byte short form.
    pub fn is_short(self) -> bool {
        matches!(self, Color::Indexed(_))
    }

    /// Convert to crossterm color
    pub fn to_crossterm(self) -> crossterm::style::Color {
        match self {
            Color::Indexed(n) => crossterm::style::Color::AnsiValue(n),
            Color::Rgb(r, g, b) => crossterm::style::Color::Rgb { r, g, b },
        }
    }
}

bitflags! {
    /// Text attributes. Bit positions are part of the wire format.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Attrs: u8 {
        const BOLD      = 1 << 0;
        const FAINT     = 1 << 1;
        const ITALIC    = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK     = 1 << 4;
        const STRIKE    = 1 << 5;
        const FRAKTUR   = 1 << 6;
        const INVERSE   = 1 << 7;
    }
}

/// Foreground, background and attributes of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attrs,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fg: Color::Indexed(DEFAULT_FG),
            bg: Color::Indexed(DEFAULT_BG),
            attrs: Attrs::empty(),
        }
    }
}

impl Style {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn reset_fg(&mut self) {
        self.fg = Color::Indexed(DEFAULT_FG);
    }

    pub fn reset_bg(&mut self) {
        self.bg = Color::Indexed(DEFAULT_BG);
    }

    /// Style used for cells blanked by erase, scroll and insert operations:
    /// the current colors with no attributes.
    pub fn blank(&self) -> Self {
        Self {
            fg: self.fg,
            bg: self.bg,
            attrs: Attrs::empty(),
        }
    }

    /// The style as it should be drawn: inverse swaps fg and bg and is then
    /// dropped from the attribute set.
    pub fn effective(&self) -> Self {
        if self.attrs.contains(Attrs::INVERSE) {
            Self {
                fg: self.bg,
                bg: self.fg,
                attrs: self.attrs - Attrs::INVERSE,
            }
        } else {
            *self
        }
    }

    /// Both colors fit the short form.
    pub fn has_short_colors(&self) -> bool {
        self.fg.is_short() && self.bg.is_short()
    }
}
