//! Per-connection change tracking.
//!
//! A [`DiffTracker`] remembers what one connection has already been sent and
//! turns the current terminal state into a `'U'` frame carrying only the
//! topics that changed since its previous poll.

use super::encode::push_code_point;
use super::frame::{self, Rect, ScreenOptions, Topics};
use crate::core::term::state::{Cell, CursorToken, TerminalState};

/// Identity of the `'O'` topic
#[derive(Clone, Debug, PartialEq, Eq)]
struct OptionsToken {
    width: u16,
    height: u16,
    theme: u32,
    default_fg: u32,
    default_bg: u32,
    attributes: u32,
    revision: u64,
}

/// Identity of the `'P'` topic
#[derive(Clone, Debug, PartialEq, Eq)]
struct StaticToken {
    font_stack: String,
    font_size: u32,
    revision: u64,
}

/// Last-sent tokens of one connection.
#[derive(Debug, Default)]
pub struct DiffTracker {
    options: Option<OptionsToken>,
    static_options: Option<StaticToken>,
    title: Option<String>,
    buttons_sent: bool,
    bell_count: Option<u64>,
    cursor: Option<CursorToken>,
    revision: Option<u64>,
    screen: Vec<Cell>,
    diagnostic: Option<String>,
}

impl DiffTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything sent so far; the next poll is a full resync.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True until the first frame after creation or [`reset`](Self::reset).
    pub fn needs_resync(&self) -> bool {
        self.revision.is_none()
    }

    /// Build a `'U'` frame for everything that changed, or `None` if
    /// nothing did.
    pub fn poll(&mut self, state: &TerminalState, options: &ScreenOptions) -> Option<String> {
        let resync = self.needs_resync();
        let mut topics = Topics::empty();
        let mut payload = String::new();

        let options_token = OptionsToken {
            width: state.width,
            height: state.height,
            theme: options.theme,
            default_fg: options.default_fg,
            default_bg: options.default_bg,
            attributes: state.attributes(),
            revision: options.revision,
        };
        if self.options.as_ref() != Some(&options_token) {
            topics |= Topics::SCREEN_OPTS;
            frame::push_screen_options(&mut payload, state, options);
            self.options = Some(options_token);
        }

        let static_token = StaticToken {
            font_stack: options.font_stack.clone(),
            font_size: options.font_size,
            revision: options.revision,
        };
        if self.static_options.as_ref() != Some(&static_token) {
            topics |= Topics::STATIC_OPTS;
            frame::push_static_options(&mut payload, options);
            self.static_options = Some(static_token);
        }

        let title = options.display_title(state);
        if self.title.as_deref() != Some(title) {
            topics |= Topics::TITLE;
            frame::push_title(&mut payload, title);
            self.title = Some(title.to_string());
        }

        if !self.buttons_sent {
            topics |= Topics::BUTTONS;
            frame::push_buttons(&mut payload, &options.button_labels);
            self.buttons_sent = true;
        }

        // A fresh connection does not replay old bells
        let bell_count = state.bell_count();
        if self.bell_count.is_some_and(|sent| sent != bell_count) {
            topics |= Topics::BELL;
            payload.push('!');
        }
        self.bell_count = Some(bell_count);

        let cursor = state.cursor_token();
        if self.cursor != Some(cursor) {
            topics |= Topics::CURSOR;
            frame::push_cursor(&mut payload, &cursor);
            self.cursor = Some(cursor);
        }

        if self.revision != Some(state.revision()) {
            let screen = state.active_screen().flatten();
            if let Some(rect) = dirty_rect(&screen, &self.screen, state.width) {
                topics |= if resync {
                    Topics::CONTENT_ALL
                } else {
                    Topics::CONTENT_PART
                };
                frame::push_content(&mut payload, state, rect);
            }
            self.screen = screen;
            self.revision = Some(state.revision());
        }

        if options.debug {
            let mut diagnostic = String::new();
            frame::push_diagnostic(&mut diagnostic, state);
            if self.diagnostic.as_ref() != Some(&diagnostic) {
                topics |= Topics::INTERNAL;
                payload.push_str(&diagnostic);
                self.diagnostic = Some(diagnostic);
            }
        }

        if topics.is_empty() {
            return None;
        }

        let mut out = String::with_capacity(payload.len() + 2);
        out.push('U');
        push_code_point(&mut out, topics.bits());
        out.push_str(&payload);
        Some(out)
    }
}

/// Bounding box of the cells that differ from `last`. An empty or
/// mismatched `last` counts every cell as changed.
fn dirty_rect(screen: &[Cell], last: &[Cell], width: u16) -> Option<Rect> {
    let width = width as usize;
    if width == 0 {
        return None;
    }

    let mut top = usize::MAX;
    let mut left = usize::MAX;
    let mut bottom = 0;
    let mut right = 0;

    for (index, cell) in screen.iter().enumerate() {
        if last.len() == screen.len() && last[index] == *cell {
            continue;
        }
        let (x, y) = (index % width, index / width);
        top = top.min(y);
        left = left.min(x);
        bottom = bottom.max(y + 1);
        right = right.max(x + 1);
    }

    if right <= left || bottom <= top {
        return None;
    }

    Some(Rect {
        top: top as u16,
        left: left as u16,
        height: (bottom - top) as u16,
        width: (right - left) as u16,
    })
}
