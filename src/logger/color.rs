use std::sync::atomic::{AtomicUsize, Ordering};

use crate::logger::Level;

/// ANSI foreground colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    Black = 30,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Wraps `text` in this color's escape sequence.
    pub fn paint(self, text: &str) -> String {
        format!("\x1b[{}m{}\x1b[0m", self.code(), text)
    }
}

const UNKNOWN_LEVEL_COLOR: Color = Color::Red;

pub fn level_color(level: Level) -> Color {
    match level {
        Level::Debug => Color::White,
        Level::Info => Color::Green,
        Level::Error => Color::Red,
        _ => UNKNOWN_LEVEL_COLOR,
    }
}

pub fn colored_level(level: Level) -> String {
    level_color(level).paint(level.as_str())
}

pub const DEFAULT_CALLER_WIDTH: usize = 24;

/// Right-pads caller paths to a shared column width.
///
/// The width starts at [`DEFAULT_CALLER_WIDTH`] and only grows. A caller longer
/// than the current width is cut to that width once, and the width is widened
/// so that the following records line up.
#[derive(Debug)]
pub struct CallerAligner {
    width: AtomicUsize,
}

impl CallerAligner {
    pub const fn new() -> Self {
        Self::with_width(DEFAULT_CALLER_WIDTH)
    }

    pub const fn with_width(width: usize) -> Self {
        Self {
            width: AtomicUsize::new(width),
        }
    }

    pub fn width(&self) -> usize {
        self.width.load(Ordering::Relaxed)
    }

    pub fn pad(&self, caller: &str) -> String {
        let len = caller.chars().count();
        let previous = match self
            .width
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |width| {
                (len > width).then(|| grown_width(len))
            }) {
            Ok(previous) | Err(previous) => previous,
        };

        let mut padded: String = caller.chars().take(previous).collect();
        let fill = previous - padded.chars().count();
        padded.extend(std::iter::repeat_n(' ', fill));
        padded
    }
}

impl Default for CallerAligner {
    fn default() -> Self {
        Self::new()
    }
}

fn grown_width(len: usize) -> usize {
    if len % 4 == 0 { len } else { len + len % 4 }
}
