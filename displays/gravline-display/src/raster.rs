//! Slab pixel buffers and line rasterization
//!
//! Pixels are stored in wire order: each RGB565 word is kept big-endian
//! (`to_be`) so the buffer can go to the bus as bytes without a separate
//! swap pass.

use gravline_core::config::MAX_SLAB_PIXELS;
use gravline_core::Line2D;

use crate::clip::Rect;

/// One band of pixels, row-major within its rectangle
pub struct SlabBuffer {
    pixels: [u16; MAX_SLAB_PIXELS],
    rect: Rect,
    len: usize,
}

impl Default for SlabBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SlabBuffer {
    pub const fn new() -> Self {
        Self {
            pixels: [0; MAX_SLAB_PIXELS],
            rect: Rect::new(0, 0, -1, -1),
            len: 0,
        }
    }

    /// Retarget the buffer at `rect` and clear it to black
    ///
    /// Rows that do not fit the buffer are cut from the bottom.
    pub fn reset(&mut self, rect: Rect) {
        let width = rect.width() as usize;
        let mut rect = rect;
        if width > 0 && rect.pixel_count() > MAX_SLAB_PIXELS {
            rect.y1 = rect.y0 + (MAX_SLAB_PIXELS / width) as i32 - 1;
        }
        self.rect = rect;
        self.len = rect.pixel_count().min(MAX_SLAB_PIXELS);
        self.pixels[..self.len].fill(0);
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Wire-order pixel words
    pub fn words(&self) -> &[u16] {
        &self.pixels[..self.len]
    }

    /// Wire bytes (big-endian RGB565)
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.words())
    }

    /// Native RGB565 value at screen coordinates
    pub fn pixel(&self, x: i32, y: i32) -> Option<u16> {
        self.offset(x, y).map(|i| u16::from_be(self.pixels[i]))
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if !self.rect.contains(x, y) {
            return None;
        }
        let row = (y - self.rect.y0) as usize;
        let col = (x - self.rect.x0) as usize;
        Some(row * self.rect.width() as usize + col)
    }

    #[inline]
    fn plot(&mut self, x: i32, y: i32, wire: u16) {
        if let Some(i) = self.offset(x, y) {
            self.pixels[i] = wire;
        }
    }

    /// Rasterize the part of `line` that falls inside this buffer
    ///
    /// Lines are always walked top to bottom so a line split across
    /// several buffers lights the same pixels as when drawn whole. Rows
    /// above the buffer are skipped without being walked.
    pub fn draw_line(&mut self, line: &Line2D) {
        let wire = line.color.to_be();
        let (mut x, mut y, x_end, y_end) = if line.y0 <= line.y1 {
            (line.x0 as i32, line.y0 as i32, line.x1 as i32, line.y1 as i32)
        } else {
            (line.x1 as i32, line.y1 as i32, line.x0 as i32, line.y0 as i32)
        };
        if y > self.rect.y1 || y_end < self.rect.y0 {
            return;
        }

        let dx = (x_end - x).abs();
        let sx = if x < x_end { 1 } else { -1 };
        let dy = -(y_end - y);
        let mut err = dx + dy;

        // Jump to the first pixel on the buffer's top row
        if y < self.rect.y0 {
            let rows = self.rect.y0 - y;
            let run = skip_run(dx, -dy, rows);
            x += sx * run;
            y = self.rect.y0;
            err = (err as i64 + dx as i64 * rows as i64 + dy as i64 * run as i64) as i32;
        }

        loop {
            if y > self.rect.y1 {
                break;
            }
            self.plot(x, y, wire);
            if x == x_end && y == y_end {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += 1;
            }
        }
    }

    /// Rasterize several lines
    pub fn draw_lines<'l>(&mut self, lines: impl IntoIterator<Item = &'l Line2D>) {
        for line in lines {
            self.draw_line(line);
        }
    }
}

/// Minor-axis steps a walk of `dx` by `dy` takes before its first pixel
/// on row `rows`
///
/// The walk's error term after `kx` horizontal and `ky` vertical steps is
/// `dx - dy + dx * ky - dy * kx`, so only the column needs solving for.
fn skip_run(dx: i32, dy: i32, rows: i32) -> i32 {
    let (dx, dy, rows) = (dx as i64, dy as i64, rows as i64);
    // Last column on the row above
    let n = 2 * dx * rows - dx - 2 * dy;
    let last = if n <= 0 { 0 } else { (n + 2 * dy - 1) / (2 * dy) };
    let err = dx - dy + dx * (rows - 1) - dy * last;
    let run = if 2 * err >= -dy { last + 1 } else { last };
    run as i32
}
