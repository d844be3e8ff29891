//! Slab binning
//!
//! The screen is cut into horizontal slabs of `slab_height` rows (the last
//! one may be shorter). Each frame's clipped lines are indexed per slab in
//! two linear passes: count references per slab, then prefix-sum the
//! counts into offsets and scatter line indices through per-slab cursors.
//!
//! Both the line array and the reference array are fixed size. References
//! past [`MAX_BIN_REFS`] are dropped and counted; lower slabs keep theirs.

use core::ops::RangeInclusive;

use gravline_core::config::{
    ConfigError, DisplayConfig, MAX_BIN_REFS, MAX_SLABS, MAX_SLAB_PIXELS, MAX_WIDTH,
};
use gravline_core::Line2D;

use crate::clip::Rect;

/// Partition of the screen into slabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlabLayout {
    width: u16,
    height: u16,
    slab_height: u16,
    slab_count: u16,
}

impl SlabLayout {
    /// Lay out slabs for a screen
    ///
    /// Fails when a slab would not fit one scratch buffer or when the
    /// screen needs more than [`MAX_SLABS`] slabs, so every row of the
    /// screen always has a slab of its own.
    pub const fn new(width: u16, height: u16, slab_height: u16) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if width > MAX_WIDTH || height > i16::MAX as u16 {
            return Err(ConfigError::DimensionTooLarge);
        }
        if slab_height == 0 {
            return Err(ConfigError::ZeroSlabHeight);
        }
        if width as usize * slab_height as usize > MAX_SLAB_PIXELS {
            return Err(ConfigError::SlabTooLarge);
        }
        let count = (height as usize).div_ceil(slab_height as usize);
        if count > MAX_SLABS {
            return Err(ConfigError::TooManySlabs);
        }
        Ok(Self {
            width,
            height,
            slab_height,
            slab_count: count as u16,
        })
    }

    pub const fn from_config(config: &DisplayConfig) -> Result<Self, ConfigError> {
        Self::new(config.width, config.height, config.slab_height)
    }

    pub const fn width(&self) -> u16 {
        self.width
    }

    pub const fn height(&self) -> u16 {
        self.height
    }

    pub const fn slab_height(&self) -> u16 {
        self.slab_height
    }

    pub const fn slab_count(&self) -> usize {
        self.slab_count as usize
    }

    pub const fn screen(&self) -> Rect {
        Rect::screen(self.width, self.height)
    }

    /// Slab containing row `y`
    ///
    /// Rows outside the screen map to the first or last slab.
    pub fn slab_of(&self, y: i32) -> usize {
        let last = self.slab_count().saturating_sub(1);
        if y <= 0 {
            return 0;
        }
        ((y as usize) / self.slab_height as usize).min(last)
    }

    /// Pixel rectangle covered by slab `index`
    pub fn slab_rect(&self, index: usize) -> Rect {
        let y0 = index as i32 * self.slab_height as i32;
        let y1 = (y0 + self.slab_height as i32 - 1).min(self.height as i32 - 1);
        Rect::new(0, y0, self.width as i32 - 1, y1)
    }

    /// Slabs touched by a (clipped) line
    pub fn slab_span(&self, line: &Line2D) -> RangeInclusive<usize> {
        let (top, bottom) = line.row_span();
        self.slab_of(top as i32)..=self.slab_of(bottom as i32)
    }
}

/// Per-slab index into a frame's line array
#[derive(Debug, Clone)]
pub struct SlabIndex {
    /// `offsets[s]..offsets[s + 1]` is slab `s`'s range in `refs`
    offsets: [u16; MAX_SLABS + 1],
    refs: [u16; MAX_BIN_REFS],
    slab_count: usize,
    dropped: u32,
}

impl Default for SlabIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SlabIndex {
    pub const fn new() -> Self {
        Self {
            offsets: [0; MAX_SLABS + 1],
            refs: [0; MAX_BIN_REFS],
            slab_count: 0,
            dropped: 0,
        }
    }

    /// Rebuild the index for `lines`
    ///
    /// Lines must already be clipped to the layout's screen.
    pub fn build(&mut self, lines: &[Line2D], layout: &SlabLayout) {
        let slabs = layout.slab_count();

        // Pass 1: references per slab
        let mut counts = [0u32; MAX_SLABS];
        for line in lines {
            for s in layout.slab_span(line) {
                counts[s] += 1;
            }
        }

        // Prefix sums, capped at the reference capacity
        self.offsets[0] = 0;
        for s in 0..slabs {
            let end = (self.offsets[s] as u32 + counts[s]).min(MAX_BIN_REFS as u32);
            self.offsets[s + 1] = end as u16;
        }

        // Pass 2: scatter through per-slab cursors
        let mut cursor = [0u16; MAX_SLABS];
        cursor[..slabs].copy_from_slice(&self.offsets[..slabs]);
        let mut dropped = 0;
        for (i, line) in lines.iter().enumerate() {
            for s in layout.slab_span(line) {
                if cursor[s] < self.offsets[s + 1] {
                    self.refs[cursor[s] as usize] = i as u16;
                    cursor[s] += 1;
                } else {
                    dropped += 1;
                }
            }
        }

        self.slab_count = slabs;
        self.dropped = dropped;
    }

    /// Line indices referenced by slab `s`, in submission order
    pub fn slab(&self, s: usize) -> &[u16] {
        if s >= self.slab_count {
            return &[];
        }
        &self.refs[self.offsets[s] as usize..self.offsets[s + 1] as usize]
    }

    pub fn slab_count(&self) -> usize {
        self.slab_count
    }

    /// Total stored references
    pub fn total_refs(&self) -> usize {
        self.offsets[self.slab_count] as usize
    }

    /// References dropped at capacity during the last build
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::clip_line;
    use proptest::prelude::*;

    #[test]
    fn test_layout() {
        let layout = SlabLayout::new(320, 320, 16).unwrap();
        assert_eq!(layout.slab_count(), 20);
        assert_eq!(layout.slab_of(0), 0);
        assert_eq!(layout.slab_of(15), 0);
        assert_eq!(layout.slab_of(16), 1);
        assert_eq!(layout.slab_of(319), 19);
        assert_eq!(layout.slab_rect(19), Rect::new(0, 304, 319, 319));

        let partial = SlabLayout::new(320, 100, 16).unwrap();
        assert_eq!(partial.slab_count(), 7);
        assert_eq!(partial.slab_rect(6), Rect::new(0, 96, 319, 99));
    }

    #[test]
    fn test_horizontal_line_bins_into_one_slab() {
        let layout = SlabLayout::new(320, 320, 8).unwrap();
        let mut index = SlabIndex::new();
        index.build(&[Line2D::new(0, 0, 10, 0, 0xFFFF)], &layout);

        assert_eq!(index.slab(0), &[0]);
        for s in 1..layout.slab_count() {
            assert!(index.slab(s).is_empty());
        }
        assert_eq!(index.total_refs(), 1);
    }

    #[test]
    fn test_spanning_line_counted_once_per_slab() {
        let layout = SlabLayout::new(320, 320, 16).unwrap();
        let lines = [
            Line2D::new(0, 10, 50, 40, 1),  // slabs 0..=2
            Line2D::new(5, 20, 5, 20, 2),   // slab 1
            Line2D::new(300, 47, 0, 32, 3), // slab 2
        ];
        let mut index = SlabIndex::new();
        index.build(&lines, &layout);

        assert_eq!(index.slab(0), &[0]);
        assert_eq!(index.slab(1), &[0, 1]);
        assert_eq!(index.slab(2), &[0, 2]);
        assert!(index.slab(3).is_empty());
        assert_eq!(index.dropped(), 0);
    }

    #[test]
    fn test_reference_capacity_is_soft() {
        let layout = SlabLayout::new(320, 320, 16).unwrap();
        // Full-height lines touch all 20 slabs
        let lines: std::vec::Vec<Line2D> =
            (0..300).map(|x| Line2D::new(x, 0, x, 319, 1)).collect();
        let mut index = SlabIndex::new();
        index.build(&lines, &layout);

        assert_eq!(index.total_refs(), MAX_BIN_REFS);
        assert_eq!(index.dropped() as usize, 300 * 20 - MAX_BIN_REFS);
        // Lower slabs fill first
        assert_eq!(index.slab(0).len(), 300);
        assert!(index.slab(19).is_empty());
    }

    #[test]
    fn test_rebuild_resets_index() {
        let layout = SlabLayout::new(320, 320, 16).unwrap();
        let mut index = SlabIndex::new();
        index.build(&[Line2D::new(0, 0, 0, 319, 1)], &layout);
        index.build(&[], &layout);
        assert_eq!(index.total_refs(), 0);
        assert!(index.slab(5).is_empty());
    }

    fn arb_line() -> impl Strategy<Value = Line2D> {
        (-100i16..420, -100i16..420, -100i16..420, -100i16..420)
            .prop_map(|(x0, y0, x1, y1)| Line2D::new(x0, y0, x1, y1, 0xFFFF))
    }

    #[test]
    fn test_unbinnable_layouts_rejected() {
        // 160 slabs of two rows
        assert_eq!(SlabLayout::new(320, 320, 2), Err(ConfigError::TooManySlabs));
        assert_eq!(SlabLayout::new(320, 320, 4), Err(ConfigError::TooManySlabs));
        assert_eq!(SlabLayout::new(480, 320, 16), Err(ConfigError::SlabTooLarge));
        assert_eq!(SlabLayout::new(320, 320, 0), Err(ConfigError::ZeroSlabHeight));
        assert_eq!(SlabLayout::new(0, 320, 8), Err(ConfigError::ZeroDimension));
        assert_eq!(SlabLayout::new(481, 8, 1), Err(ConfigError::DimensionTooLarge));

        let tightest = SlabLayout::new(320, 320, 5).unwrap();
        assert_eq!(tightest.slab_count(), MAX_SLABS);
        assert_eq!(tightest.slab_of(319), MAX_SLABS - 1);
    }

    #[test]
    fn test_layout_matches_config_validation() {
        let config = DisplayConfig::DEFAULT;
        assert_eq!(SlabLayout::from_config(&config).unwrap().slab_count(), config.slab_count());

        let mut too_fine = DisplayConfig::DEFAULT;
        too_fine.slab_height = 2;
        assert_eq!(too_fine.validate(), Err(ConfigError::TooManySlabs));
        assert_eq!(SlabLayout::from_config(&too_fine), Err(ConfigError::TooManySlabs));
    }

    proptest! {
        #[test]
        fn prop_binning_is_complete(
            raw in prop::collection::vec(arb_line(), 0..60),
            slab_height in 1u16..=16,
        ) {
            let layout = match SlabLayout::new(320, 320, slab_height) {
                Ok(layout) => layout,
                Err(e) => {
                    prop_assert_eq!(e, ConfigError::TooManySlabs);
                    prop_assert!(320usize.div_ceil(slab_height as usize) > MAX_SLABS);
                    return Ok(());
                }
            };
            let screen = layout.screen();
            let lines: std::vec::Vec<Line2D> =
                raw.iter().filter_map(|l| clip_line(l, &screen)).collect();

            let mut index = SlabIndex::new();
            index.build(&lines, &layout);
            prop_assert_eq!(index.dropped(), 0);

            // Every row lies in the slab whose rectangle contains it
            let last = layout.slab_rect(layout.slab_count() - 1);
            prop_assert_eq!(last.y1, 319);
            for y in [0, 63, 64, 200, 319] {
                prop_assert!(layout.slab_rect(layout.slab_of(y)).contains(0, y));
            }

            for s in 0..layout.slab_count() {
                let band = layout.slab_rect(s);
                let expected: std::vec::Vec<u16> = lines
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| {
                        let (top, bottom) = l.row_span();
                        (top as i32) <= band.y1 && (bottom as i32) >= band.y0
                    })
                    .map(|(i, _)| i as u16)
                    .collect();
                // Submission order, so equality also rules out duplicates
                prop_assert_eq!(index.slab(s), expected.as_slice());
            }
        }
    }
}
