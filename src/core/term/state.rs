//! Terminal state management
//!
//! The screen buffer engine. It owns the primary and alternate grids, the
//! cursor, the scroll region and the current style, and applies each
//! [`TerminalAction`] to them. Every row always holds exactly `width` cells
//! and every screen exactly `height` rows; all cursor math is clamped.

use bitflags::bitflags;

use super::action::{Axis, ClearMode, TerminalAction};
use super::style::Style;

/// Terminal state
pub struct TerminalState {
    pub width: u16,
    pub height: u16,
    primary: ScreenBuffer,
    alternate: ScreenBuffer,
    using_alternate: bool,
    cursor: CursorState,
    saved_cursor: Option<SavedCursor>,
    /// Style applied to newly written characters
    pub style: Style,
    /// Scroll region, inclusive rows
    scroll_region: (u16, u16),
    pub modes: TerminalModes,
    initial_modes: TerminalModes,
    default_shape: CursorShape,
    title: String,
    bell_count: u64,
    revision: u64,
}

impl TerminalState {
    pub fn new(width: u16, height: u16) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            primary: ScreenBuffer::new(width, height, Style::default()),
            alternate: ScreenBuffer::new(width, height, Style::default()),
            using_alternate: false,
            cursor: CursorState::default(),
            saved_cursor: None,
            style: Style::default(),
            scroll_region: (0, height - 1),
            modes: TerminalModes::default(),
            initial_modes: TerminalModes::default(),
            default_shape: CursorShape::default(),
            title: String::new(),
            bell_count: 0,
            revision: 0,
        }
    }

    /// Cursor shape used at power-on and for `DECSCUSR 0`.
    pub fn with_cursor_shape(mut self, shape: CursorShape) -> Self {
        self.default_shape = shape;
        self.cursor.shape = shape;
        self
    }

    /// Power-on value of the LNM (line feed / new line) mode.
    pub fn with_linefeed_newline(mut self, enabled: bool) -> Self {
        self.initial_modes.linefeed_newline = enabled;
        self.modes.linefeed_newline = enabled;
        self
    }

    pub fn active_screen(&self) -> &ScreenBuffer {
        if self.using_alternate {
            &self.alternate
        } else {
            &self.primary
        }
    }

    fn active_screen_mut(&mut self) -> &mut ScreenBuffer {
        if self.using_alternate {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    pub fn cursor(&self) -> &CursorState {
        &self.cursor
    }

    pub fn cell(&self, x: u16, y: u16) -> Option<&Cell> {
        self.active_screen()
            .rows
            .get(y as usize)
            .and_then(|row| row.cells.get(x as usize))
    }

    pub fn is_alternate(&self) -> bool {
        self.using_alternate
    }

    pub fn scroll_region(&self) -> (u16, u16) {
        self.scroll_region
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of bell events since creation. Never decreases.
    pub fn bell_count(&self) -> u64 {
        self.bell_count
    }

    /// Bumped on every applied action.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True when the cursor sits past the last column, waiting to wrap.
    pub fn is_cursor_hanging(&self) -> bool {
        self.cursor.x >= self.width
    }

    /// Change identity of the cursor.
    pub fn cursor_token(&self) -> CursorToken {
        let hanging = self.is_cursor_hanging();
        CursorToken {
            y: self.cursor.y,
            x: self.column(),
            hanging,
            visible: self.cursor.visible,
            shape: self.cursor.shape,
        }
    }

    /// Global attribute bitmask sent with the screen options.
    pub fn attributes(&self) -> u32 {
        let mut attributes = ScreenAttributes::SHOW_BUTTONS | ScreenAttributes::SHOW_LINKS;
        if self.cursor.visible {
            attributes |= ScreenAttributes::CURSOR_VISIBLE;
        }
        if self.modes.mouse_tracking {
            attributes |= ScreenAttributes::TRACK_MOUSE;
        }
        if self.modes.bracketed_paste {
            attributes |= ScreenAttributes::BRACKETED_PASTE;
        }
        attributes.bits() | ((self.cursor.shape.to_decscusr() as u32) << CURSOR_SHAPE_SHIFT)
    }

    /// Characters of one row, untrimmed.
    pub fn row_text(&self, y: u16) -> String {
        self.active_screen()
            .rows
            .get(y as usize)
            .map(|row| row.cells.iter().map(|cell| cell.ch).collect())
            .unwrap_or_default()
    }

    /// The whole screen as text, trailing blanks trimmed per line.
    pub fn screen_text(&self) -> String {
        (0..self.height)
            .map(|y| self.row_text(y).trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Apply one action.
    pub fn apply(&mut self, action: TerminalAction) {
        match action {
            TerminalAction::Write(ch) => self.put_char(ch),
            TerminalAction::SetCursor { x, y } => {
                self.cursor.x = x.min(self.width - 1);
                self.cursor.y = y.min(self.height - 1);
            }
            TerminalAction::SetCursorX(x) => self.cursor.x = x.min(self.width - 1),
            TerminalAction::SetCursorY(y) => {
                self.cursor.x = self.column();
                self.cursor.y = y.min(self.height - 1);
            }
            TerminalAction::MoveCursor(Axis::X, delta) => {
                let x = self.column() as i32 + delta;
                self.cursor.x = x.clamp(0, self.width as i32 - 1) as u16;
            }
            TerminalAction::MoveCursor(Axis::Y, delta) => {
                let y = self.cursor.y as i32 + delta;
                self.cursor.x = self.column();
                self.cursor.y = y.clamp(0, self.height as i32 - 1) as u16;
            }

            TerminalAction::ClearScreen(mode) => self.erase_in_display(mode),
            TerminalAction::ClearLine(mode) => self.erase_in_line(mode),
            TerminalAction::InsertBlanks(n) => self.insert_blanks(n),
            TerminalAction::DeleteForward(n) => self.delete_forward(n),
            TerminalAction::EraseForward(n) => self.erase_forward(n),
            TerminalAction::InsertLines(n) => self.insert_lines(n),
            TerminalAction::DeleteLines(n) => self.delete_lines(n),
            TerminalAction::ScrollUp(n) => self.scroll_up(n),
            TerminalAction::ScrollDown(n) => self.scroll_down(n),
            TerminalAction::SetScrollMargin { top, bottom } => self.set_scroll_region(top, bottom),

            TerminalAction::ResetStyle => self.style.reset(),
            TerminalAction::AddAttrs(attrs) => self.style.attrs |= attrs,
            TerminalAction::RemoveAttrs(attrs) => self.style.attrs -= attrs,
            TerminalAction::SetFg(color) => self.style.fg = color,
            TerminalAction::SetBg(color) => self.style.bg = color,
            TerminalAction::ResetFg => self.style.reset_fg(),
            TerminalAction::ResetBg => self.style.reset_bg(),

            TerminalAction::SaveCursor => self.save_cursor(),
            TerminalAction::RestoreCursor => self.restore_cursor(),
            TerminalAction::SetCursorStyle(n) => {
                self.cursor.shape = if n == 0 {
                    self.default_shape
                } else {
                    CursorShape::from_decscusr(n)
                };
            }
            TerminalAction::ShowCursor => self.cursor.visible = true,
            TerminalAction::HideCursor => self.cursor.visible = false,

            TerminalAction::EnableAltBuffer => self.set_alternate(true),
            TerminalAction::DisableAltBuffer => self.set_alternate(false),
            TerminalAction::SetMouseTracking(enabled) => self.modes.mouse_tracking = enabled,
            TerminalAction::SetBracketedPaste(enabled) => self.modes.bracketed_paste = enabled,
            TerminalAction::SetLinefeedMode(enabled) => self.modes.linefeed_newline = enabled,

            TerminalAction::WindowTitle(title) => self.title = title,
            TerminalAction::Bell => self.bell_count += 1,
            TerminalAction::NewLine => {
                if self.modes.linefeed_newline {
                    self.cursor.x = 0;
                }
                self.linefeed();
            }
            TerminalAction::Index => self.linefeed(),
            TerminalAction::ReverseIndex => self.reverse_index(),
            TerminalAction::CarriageReturn => self.cursor.x = 0,
            TerminalAction::Backspace => self.cursor.x = self.column().saturating_sub(1),
            TerminalAction::Tab => {
                // Next multiple of 8
                let next = (u32::from(self.column()) / 8 + 1) * 8;
                self.cursor.x = next.min(u32::from(self.width - 1)) as u16;
            }
            TerminalAction::Reset => self.reset(),
        }

        self.revision = self.revision.wrapping_add(1);
    }

    /// Cursor column with a hanging cursor resolved onto the last column.
    fn column(&self) -> u16 {
        self.cursor.x.min(self.width - 1)
    }

    /// Put a character at the cursor position
    fn put_char(&mut self, ch: char) {
        if self.cursor.x >= self.width {
            self.cursor.x = 0;
            self.linefeed();
        }

        let (x, y) = (self.cursor.x as usize, self.cursor.y as usize);
        let style = self.style;
        self.active_screen_mut().rows[y].cells[x] = Cell { ch, style };
        self.cursor.x += 1;
    }

    /// Line feed - move cursor down, scroll if at the bottom margin
    fn linefeed(&mut self) {
        let scroll_bottom = self.scroll_region.1;

        if self.cursor.y == scroll_bottom {
            self.scroll_up(1);
        } else if self.cursor.y < self.height - 1 {
            self.cursor.y += 1;
        }
    }

    /// Reverse index - cursor up, scroll if at the top margin
    fn reverse_index(&mut self) {
        let scroll_top = self.scroll_region.0;

        if self.cursor.y == scroll_top {
            self.scroll_down(1);
        } else if self.cursor.y > 0 {
            self.cursor.y -= 1;
        }
    }

    /// Scroll the region up by n lines. The cursor does not move.
    fn scroll_up(&mut self, n: u16) {
        let (top, bottom) = self.scroll_region;
        let n = n.min(bottom - top + 1);
        let blank = Row::new(self.width, self.style.blank());
        let screen = self.active_screen_mut();

        for _ in 0..n {
            screen.rows.remove(top as usize);
            screen.rows.insert(bottom as usize, blank.clone());
        }
    }

    /// Scroll the region down by n lines. The cursor does not move.
    fn scroll_down(&mut self, n: u16) {
        let (top, bottom) = self.scroll_region;
        let n = n.min(bottom - top + 1);
        let blank = Row::new(self.width, self.style.blank());
        let screen = self.active_screen_mut();

        for _ in 0..n {
            screen.rows.remove(bottom as usize);
            screen.rows.insert(top as usize, blank.clone());
        }
    }

    fn set_scroll_region(&mut self, top: u16, bottom: Option<u16>) {
        let last = self.height - 1;
        let bottom = bottom.map_or(last, |b| b.min(last));
        if top >= bottom {
            return;
        }
        self.scroll_region = (top, bottom);
        self.cursor.x = 0;
        self.cursor.y = 0;
    }

    fn erase_in_display(&mut self, mode: ClearMode) {
        let y = self.cursor.y as usize;
        let blank = self.style.blank();
        let screen = self.active_screen_mut();
        let rows = match mode {
            ClearMode::After => y + 1..screen.rows.len(),
            ClearMode::Before => 0..y,
            ClearMode::All => 0..screen.rows.len(),
        };
        for row in &mut screen.rows[rows] {
            row.clear(blank);
        }

        if mode != ClearMode::All {
            self.erase_in_line(mode);
        }
    }

    fn erase_in_line(&mut self, mode: ClearMode) {
        let x = self.column() as usize;
        let y = self.cursor.y as usize;
        let width = self.width as usize;
        let blank = self.style.blank();
        let row = &mut self.active_screen_mut().rows[y];

        match mode {
            ClearMode::After => row.fill(x..width, blank),
            ClearMode::Before => row.fill(0..x, blank),
            ClearMode::All => row.clear(blank),
        }
    }

    /// ICH - shift the rest of the line right, dropping cells off the edge
    fn insert_blanks(&mut self, n: u16) {
        let x = self.column() as usize;
        let y = self.cursor.y as usize;
        let n = (n as usize).min(self.width as usize - x);
        let blank = Cell::blank(self.style.blank());
        let cells = &mut self.active_screen_mut().rows[y].cells;

        cells.truncate(cells.len() - n);
        cells.splice(x..x, std::iter::repeat(blank).take(n));
    }

    /// DCH - pull the rest of the line left, backfilling blanks
    fn delete_forward(&mut self, n: u16) {
        let x = self.column() as usize;
        let y = self.cursor.y as usize;
        let n = (n as usize).min(self.width as usize - x);
        let blank = Cell::blank(self.style.blank());
        let cells = &mut self.active_screen_mut().rows[y].cells;

        cells.drain(x..x + n);
        cells.extend(std::iter::repeat(blank).take(n));
    }

    /// ECH - blank n cells from the cursor
    fn erase_forward(&mut self, n: u16) {
        let x = self.column() as usize;
        let y = self.cursor.y as usize;
        let end = (x + n as usize).min(self.width as usize);
        let blank = self.style.blank();
        self.active_screen_mut().rows[y].fill(x..end, blank);
    }

    /// Insert lines at the cursor row, inside the scroll region only
    fn insert_lines(&mut self, n: u16) {
        let (top, bottom) = self.scroll_region;
        let y = self.cursor.y;
        if y < top || y > bottom {
            return;
        }
        let n = n.min(bottom - y + 1);
        let blank = Row::new(self.width, self.style.blank());
        let screen = self.active_screen_mut();

        for _ in 0..n {
            screen.rows.remove(bottom as usize);
            screen.rows.insert(y as usize, blank.clone());
        }
    }

    /// Delete lines at the cursor row, inside the scroll region only
    fn delete_lines(&mut self, n: u16) {
        let (top, bottom) = self.scroll_region;
        let y = self.cursor.y;
        if y < top || y > bottom {
            return;
        }
        let n = n.min(bottom - y + 1);
        let blank = Row::new(self.width, self.style.blank());
        let screen = self.active_screen_mut();

        for _ in 0..n {
            screen.rows.remove(y as usize);
            screen.rows.insert(bottom as usize, blank.clone());
        }
    }

    fn save_cursor(&mut self) {
        self.saved_cursor = Some(SavedCursor {
            x: self.cursor.x,
            y: self.cursor.y,
            style: self.style,
        });
    }

    fn restore_cursor(&mut self) {
        let saved = self.saved_cursor.clone().unwrap_or_default();
        self.cursor.x = saved.x.min(self.width);
        self.cursor.y = saved.y.min(self.height - 1);
        self.style = saved.style;
    }

    /// Entering always starts from a blank alternate screen; leaving blanks
    /// it again and shows the untouched primary screen.
    fn set_alternate(&mut self, enable: bool) {
        if enable || self.using_alternate {
            self.alternate.clear(Style::default());
        }
        self.using_alternate = enable;
    }

    /// RIS - back to power-on state. Title and bell count survive.
    fn reset(&mut self) {
        self.primary.clear(Style::default());
        self.alternate.clear(Style::default());
        self.using_alternate = false;
        self.cursor = CursorState {
            shape: self.default_shape,
            ..CursorState::default()
        };
        self.saved_cursor = None;
        self.style.reset();
        self.scroll_region = (0, self.height - 1);
        self.modes = self.initial_modes.clone();
    }
}

/// One screen grid
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScreenBuffer {
    pub rows: Vec<Row>,
}

impl ScreenBuffer {
    pub fn new(width: u16, height: u16, style: Style) -> Self {
        Self {
            rows: (0..height).map(|_| Row::new(width, style)).collect(),
        }
    }

    pub fn clear(&mut self, style: Style) {
        for row in &mut self.rows {
            row.clear(style);
        }
    }

    /// Row-major copy of every cell.
    pub fn flatten(&self) -> Vec<Cell> {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter().copied())
            .collect()
    }
}

/// A single row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(width: u16, style: Style) -> Self {
        Self {
            cells: vec![Cell::blank(style); width as usize],
        }
    }

    pub fn clear(&mut self, style: Style) {
        self.fill(0..self.cells.len(), style);
    }

    fn fill(&mut self, range: std::ops::Range<usize>, style: Style) {
        for cell in &mut self.cells[range] {
            *cell = Cell::blank(style);
        }
    }
}

/// A single cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank(Style::default())
    }
}

impl Cell {
    pub fn blank(style: Style) -> Self {
        Self { ch: ' ', style }
    }
}

bitflags! {
    /// Global attribute bits. The cursor shape occupies bits 9..13.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ScreenAttributes: u32 {
        const CURSOR_VISIBLE  = 1 << 0;
        const TRACK_MOUSE     = 0b11 << 5;
        const SHOW_BUTTONS    = 1 << 7;
        const SHOW_LINKS      = 1 << 8;
        const BRACKETED_PASTE = 1 << 13;
    }
}

const CURSOR_SHAPE_SHIFT: u32 = 9;

/// Cursor shape
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CursorShape {
    /// Default (terminal dependent)
    Default,
    BlinkingBlock,
    SteadyBlock,
    BlinkingUnderline,
    SteadyUnderline,
    /// Blinking bar (|)
    BlinkingBar,
    /// Steady bar (|)
    SteadyBar,
}

impl Default for CursorShape {
    fn default() -> Self {
        Self::BlinkingBlock
    }
}

impl CursorShape {
    /// Convert to DECSCUSR parameter (for \x1b[N q sequence)
    pub fn to_decscusr(&self) -> u8 {
        match self {
            CursorShape::Default => 0,
            CursorShape::BlinkingBlock => 1,
            CursorShape::SteadyBlock => 2,
            CursorShape::BlinkingUnderline => 3,
            CursorShape::SteadyUnderline => 4,
            CursorShape::BlinkingBar => 5,
            CursorShape::SteadyBar => 6,
        }
    }

    /// Create from DECSCUSR parameter
    pub fn from_decscusr(n: u8) -> Self {
        match n {
            1 => CursorShape::BlinkingBlock,
            2 => CursorShape::SteadyBlock,
            3 => CursorShape::BlinkingUnderline,
            4 => CursorShape::SteadyUnderline,
            5 => CursorShape::BlinkingBar,
            6 => CursorShape::SteadyBar,
            _ => CursorShape::Default,
        }
    }
}

/// Cursor state. `x == width` is the hanging position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CursorState {
    pub x: u16,
    pub y: u16,
    pub visible: bool,
    pub shape: CursorShape,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            visible: true,
            shape: CursorShape::default(),
        }
    }
}

/// Saved cursor state
#[derive(Clone, Debug, Default)]
struct SavedCursor {
    x: u16,
    y: u16,
    style: Style,
}

/// Change identity of the cursor: position, visibility and shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorToken {
    pub y: u16,
    /// Column, with a hanging cursor reported on the last column
    pub x: u16,
    pub hanging: bool,
    pub visible: bool,
    pub shape: CursorShape,
}

/// Terminal modes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TerminalModes {
    pub linefeed_newline: bool,
    pub mouse_tracking: bool,
    pub bracketed_paste: bool,
}
