//! Screen rectangle and outcode line clipping

use gravline_core::Line2D;

/// Inclusive pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// The whole `width` × `height` screen
    pub const fn screen(width: u16, height: u16) -> Self {
        Self::new(0, 0, width as i32 - 1, height as i32 - 1)
    }

    pub const fn is_empty(&self) -> bool {
        self.x1 < self.x0 || self.y1 < self.y0
    }

    pub const fn width(&self) -> u32 {
        if self.is_empty() {
            return 0;
        }
        (self.x1 - self.x0 + 1) as u32
    }

    pub const fn height(&self) -> u32 {
        if self.is_empty() {
            return 0;
        }
        (self.y1 - self.y0 + 1) as u32
    }

    pub const fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// Overlap of two rectangles
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        (!r.is_empty()).then_some(r)
    }
}

const INSIDE: u8 = 0;
const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const ABOVE: u8 = 4;
const BELOW: u8 = 8;

/// Upper bound on clip steps; each endpoint needs at most two
const MAX_CLIP_STEPS: usize = 8;

fn outcode(r: &Rect, x: i32, y: i32) -> u8 {
    let mut code = INSIDE;
    if x < r.x0 {
        code |= LEFT;
    } else if x > r.x1 {
        code |= RIGHT;
    }
    if y < r.y0 {
        code |= ABOVE;
    } else if y > r.y1 {
        code |= BELOW;
    }
    code
}

/// Clip a line to `rect` (Cohen–Sutherland)
///
/// Returns `None` when no part of the line lies inside. The color is
/// carried through unchanged.
pub fn clip_line(line: &Line2D, rect: &Rect) -> Option<Line2D> {
    let (mut x0, mut y0) = (line.x0 as i32, line.y0 as i32);
    let (mut x1, mut y1) = (line.x1 as i32, line.y1 as i32);
    let mut c0 = outcode(rect, x0, y0);
    let mut c1 = outcode(rect, x1, y1);

    for _ in 0..MAX_CLIP_STEPS {
        if c0 | c1 == INSIDE {
            return Some(Line2D::new(
                x0 as i16, y0 as i16, x1 as i16, y1 as i16, line.color,
            ));
        }
        if c0 & c1 != INSIDE {
            return None;
        }

        let out = if c0 != INSIDE { c0 } else { c1 };
        let (dx, dy) = ((x1 - x0) as i64, (y1 - y0) as i64);
        // The line crosses the chosen edge, so the divisor is non-zero
        let (x, y) = if out & ABOVE != 0 {
            let y = rect.y0;
            (x0 + (dx * (y - y0) as i64 / dy) as i32, y)
        } else if out & BELOW != 0 {
            let y = rect.y1;
            (x0 + (dx * (y - y0) as i64 / dy) as i32, y)
        } else if out & LEFT != 0 {
            let x = rect.x0;
            (x, y0 + (dy * (x - x0) as i64 / dx) as i32)
        } else {
            let x = rect.x1;
            (x, y0 + (dy * (x - x0) as i64 / dx) as i32)
        };

        if out == c0 {
            (x0, y0) = (x, y);
            c0 = outcode(rect, x0, y0);
        } else {
            (x1, y1) = (x, y);
            c1 = outcode(rect, x1, y1);
        }
    }
    None
}
