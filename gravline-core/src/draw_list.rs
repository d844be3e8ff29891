//! Per-frame screen-space line list
//!
//! A `DrawList` is created empty at frame start, appended to during scene
//! assembly and handed to the display backend once. Storage is a fixed
//! capacity `heapless::Vec`; lines past [`MAX_LINES`] are dropped and
//! counted, never reallocated.

use heapless::Vec;

use crate::math::ScreenPoint;

/// Maximum lines per frame
pub const MAX_LINES: usize = 1024;

/// A colored screen-space line segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Line2D {
    pub x0: i16,
    pub y0: i16,
    pub x1: i16,
    pub y1: i16,
    /// RGB565 color
    pub color: u16,
}

impl Line2D {
    /// Create a line from raw coordinates
    pub const fn new(x0: i16, y0: i16, x1: i16, y1: i16, color: u16) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            color,
        }
    }

    /// Create a line between two projected points
    pub const fn between(a: ScreenPoint, b: ScreenPoint, color: u16) -> Self {
        Self::new(a.x, a.y, b.x, b.y, color)
    }

    /// Topmost and bottommost row touched (min y, max y)
    pub fn row_span(&self) -> (i16, i16) {
        (self.y0.min(self.y1), self.y0.max(self.y1))
    }
}

/// Ordered line segments for exactly one frame
#[derive(Debug, Clone)]
pub struct DrawList {
    lines: Vec<Line2D, MAX_LINES>,
    dropped: u32,
}

impl Default for DrawList {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawList {
    /// Create an empty list
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            dropped: 0,
        }
    }

    /// Reset for a new frame
    pub fn clear(&mut self) {
        self.lines.clear();
        self.dropped = 0;
    }

    /// Append a line
    ///
    /// Returns `false` if the list is full and the line was dropped.
    pub fn push(&mut self, line: Line2D) -> bool {
        if self.lines.push(line).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            return false;
        }
        true
    }

    /// Append a line between two projected points
    pub fn add_line(&mut self, a: ScreenPoint, b: ScreenPoint, color: u16) -> bool {
        self.push(Line2D::between(a, b, color))
    }

    /// Lines in submission order
    pub fn lines(&self) -> &[Line2D] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines rejected this frame because the list was full
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// RGB565 color helpers
pub mod color {
    /// Pack 8-bit channels into RGB565, truncating the low bits
    pub const fn rgb565(r: u8, g: u8, b: u8) -> u16 {
        ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
    }

    pub const BLACK: u16 = 0x0000;
    pub const WHITE: u16 = 0xFFFF;
    pub const RED: u16 = rgb565(255, 0, 0);
    pub const GREEN: u16 = rgb565(0, 255, 0);
    pub const BLUE: u16 = rgb565(0, 0, 255);
    pub const CYAN: u16 = rgb565(0, 255, 255);
    pub const MAGENTA: u16 = rgb565(255, 0, 255);
    pub const YELLOW: u16 = rgb565(255, 255, 0);
}
