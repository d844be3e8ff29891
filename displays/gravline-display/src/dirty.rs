//! Single-core dirty-rectangle backend
//!
//! Only the union of this frame's line bounds and the previous frame's is
//! redrawn. The previous bounds cover whatever is still lit on the glass,
//! so redrawing them blank erases the old frame.

use heapless::Vec;

use gravline_core::traits::{Display, DisplayError, FrameCall, FramePhase};
use gravline_core::{DrawList, Line2D, MAX_LINES};

use crate::bin::SlabLayout;
use crate::clip::{clip_line, Rect};
use crate::panel::{stream_window, PanelError, PanelInterface};
use crate::raster::SlabBuffer;
use crate::stats::PipelineStats;

/// Inclusive bounding rectangle that may be empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DirtyRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Default for DirtyRect {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl DirtyRect {
    pub const EMPTY: Self = Self {
        x0: i32::MAX,
        y0: i32::MAX,
        x1: i32::MIN,
        y1: i32::MIN,
    };

    pub const fn from_rect(rect: Rect) -> Self {
        Self {
            x0: rect.x0,
            y0: rect.y0,
            x1: rect.x1,
            y1: rect.y1,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.x0 > self.x1 || self.y0 > self.y1
    }

    pub fn add_point(&mut self, x: i32, y: i32) {
        self.x0 = self.x0.min(x);
        self.y0 = self.y0.min(y);
        self.x1 = self.x1.max(x);
        self.y1 = self.y1.max(y);
    }

    pub fn add_line(&mut self, line: &Line2D) {
        self.add_point(line.x0 as i32, line.y0 as i32);
        self.add_point(line.x1 as i32, line.y1 as i32);
    }

    pub fn unite(self, other: Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Visible part of the rectangle, if any
    pub fn clamp_to(&self, screen: &Rect) -> Option<Rect> {
        if self.is_empty() {
            return None;
        }
        Rect::new(self.x0, self.y0, self.x1, self.y1).intersect(screen)
    }
}

/// Dirty-rectangle [`Display`] driving a panel directly
///
/// All work happens inside `end_frame`, on the caller's core.
pub struct DirtyRectDisplay<'s, P> {
    panel: P,
    scratch: &'s mut [SlabBuffer; 2],
    layout: SlabLayout,
    phase: FramePhase,
    initialized: bool,
    /// Bounds of what is currently lit on the panel
    prev: DirtyRect,
    /// Bounds of the frame being drawn
    now: DirtyRect,
    lines: Vec<Line2D, MAX_LINES>,
    stats: PipelineStats,
}

impl<'s, P: PanelInterface> DirtyRectDisplay<'s, P> {
    pub fn new(panel: P, scratch: &'s mut [SlabBuffer; 2], layout: SlabLayout) -> Self {
        Self {
            panel,
            scratch,
            layout,
            phase: FramePhase::Idle,
            initialized: false,
            prev: DirtyRect::EMPTY,
            now: DirtyRect::EMPTY,
            lines: Vec::new(),
            stats: PipelineStats::default(),
        }
    }

    /// Bring the panel up and clear the whole screen
    pub async fn start(&mut self) -> Result<(), PanelError> {
        self.panel.init().await?;
        stream_window(
            &mut self.panel,
            self.scratch,
            self.layout.screen(),
            self.layout.slab_height(),
            |_, _| {},
        )
        .await?;
        self.prev = DirtyRect::EMPTY;
        self.initialized = true;
        Ok(())
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Window the current frame will redraw
    pub fn pending_window(&self) -> Option<Rect> {
        self.now.unite(self.prev).clamp_to(&self.layout.screen())
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }
}

impl<'s, P: PanelInterface> Display for DirtyRectDisplay<'s, P> {
    fn width(&self) -> u16 {
        self.layout.width()
    }

    fn height(&self) -> u16 {
        self.layout.height()
    }

    async fn begin_frame(&mut self) -> Result<(), DisplayError> {
        if !self.initialized {
            return Err(DisplayError::NotInitialized);
        }
        self.phase = self.phase.transition(FrameCall::Begin)?;
        self.lines.clear();
        self.now = DirtyRect::EMPTY;
        Ok(())
    }

    async fn draw_lines(&mut self, list: &DrawList) -> Result<(), DisplayError> {
        let phase = self.phase.transition(FrameCall::Draw)?;

        let screen = self.layout.screen();
        for line in list.lines() {
            match clip_line(line, &screen) {
                Some(clipped) => {
                    self.now.add_line(&clipped);
                    let _ = self.lines.push(clipped);
                }
                None => self.stats.lines_clipped_out += 1,
            }
        }
        self.stats.lines_drawn = self.stats.lines_drawn.wrapping_add(self.lines.len() as u32);
        self.stats.lines_dropped = self.stats.lines_dropped.wrapping_add(list.dropped());
        self.phase = phase;
        Ok(())
    }

    async fn end_frame(&mut self) -> Result<(), DisplayError> {
        self.phase = self.phase.transition(FrameCall::End)?;
        self.stats.frames_submitted = self.stats.frames_submitted.wrapping_add(1);

        let Some(window) = self.pending_window() else {
            self.prev = self.now;
            self.stats.frames_completed = self.stats.frames_completed.wrapping_add(1);
            return Ok(());
        };

        let Self {
            panel,
            scratch,
            layout,
            lines,
            ..
        } = &mut *self;
        let sent = stream_window(
            panel,
            &mut **scratch,
            window,
            layout.slab_height(),
            |_, buf| buf.draw_lines(lines.iter()),
        )
        .await;
        self.stats.frames_completed = self.stats.frames_completed.wrapping_add(1);

        match sent {
            Ok(_) => {
                self.prev = self.now;
                Ok(())
            }
            Err(e) => {
                // Unknown panel contents; repaint everything next frame
                self.prev = DirtyRect::from_rect(self.layout.screen());
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPanel;
    use embassy_futures::block_on;
    use gravline_core::ScreenPoint;

    fn frame(lines: &[(i16, i16, i16, i16)]) -> DrawList {
        let mut list = DrawList::new();
        for &(x0, y0, x1, y1) in lines {
            list.add_line(ScreenPoint::new(x0, y0), ScreenPoint::new(x1, y1), 0xFFFF);
        }
        list
    }

    async fn submit<P: PanelInterface>(
        display: &mut DirtyRectDisplay<'_, P>,
        list: &DrawList,
    ) -> Result<(), DisplayError> {
        display.begin_frame().await?;
        display.draw_lines(list).await?;
        display.end_frame().await
    }

    #[test]
    fn test_rect_union_and_clamp() {
        let mut a = DirtyRect::EMPTY;
        assert!(a.is_empty());
        assert_eq!(a.clamp_to(&Rect::screen(64, 64)), None);

        a.add_line(&Line2D::new(10, 20, 4, 30, 1));
        assert_eq!(a, DirtyRect { x0: 4, y0: 20, x1: 10, y1: 30 });

        let mut b = DirtyRect::EMPTY;
        b.add_point(-5, 70);
        let u = a.unite(b);
        assert_eq!(u, DirtyRect { x0: -5, y0: 20, x1: 10, y1: 70 });
        assert_eq!(u.clamp_to(&Rect::screen(64, 64)), Some(Rect::new(0, 20, 10, 63)));
        assert_eq!(a.unite(DirtyRect::EMPTY), a);
    }

    #[test]
    fn test_redraws_union_and_erases_previous() {
        let mut scratch = [SlabBuffer::new(), SlabBuffer::new()];
        let layout = SlabLayout::new(64, 64, 8).unwrap();
        let mut display =
            DirtyRectDisplay::new(RecordingPanel::new(64, 64), &mut scratch, layout);

        block_on(async {
            display.start().await.unwrap();

            submit(&mut display, &frame(&[(2, 2, 10, 2)])).await.unwrap();
            assert_eq!(display.panel().pixel(2, 2), 0xFFFF);
            assert_eq!(display.panel().windows.last(), Some(&Rect::new(2, 2, 10, 2)));

            submit(&mut display, &frame(&[(20, 30, 20, 40)])).await.unwrap();
            assert_eq!(display.panel().windows.last(), Some(&Rect::new(2, 2, 20, 40)));
            assert_eq!(display.panel().pixel(2, 2), 0);
            assert_eq!(display.panel().pixel(20, 35), 0xFFFF);

            // Nothing drawn: the old line's bounds are still repainted
            submit(&mut display, &frame(&[])).await.unwrap();
            assert_eq!(display.panel().windows.last(), Some(&Rect::new(20, 30, 20, 40)));
            assert!(display.panel().lit().is_empty());

            // Nothing lit and nothing drawn: no transfer at all
            let windows = display.panel().windows.len();
            submit(&mut display, &frame(&[])).await.unwrap();
            assert_eq!(display.panel().windows.len(), windows);
        });

        assert_eq!(display.stats().frames_submitted, 4);
        assert_eq!(display.stats().lines_drawn, 2);
    }

    #[test]
    fn test_offscreen_lines_are_counted_not_drawn() {
        let mut scratch = [SlabBuffer::new(), SlabBuffer::new()];
        let layout = SlabLayout::new(32, 32, 8).unwrap();
        let mut display =
            DirtyRectDisplay::new(RecordingPanel::new(32, 32), &mut scratch, layout);

        block_on(async {
            display.start().await.unwrap();
            submit(&mut display, &frame(&[(-10, -10, -1, -5), (-8, 4, 40, 4)]))
                .await
                .unwrap();
        });

        assert_eq!(display.stats().lines_clipped_out, 1);
        assert_eq!(display.panel().windows.last(), Some(&Rect::new(0, 4, 31, 4)));
        assert_eq!(display.panel().lit().len(), 32);
    }

    #[test]
    fn test_requires_start() {
        let mut scratch = [SlabBuffer::new(), SlabBuffer::new()];
        let layout = SlabLayout::new(32, 32, 8).unwrap();
        let mut display =
            DirtyRectDisplay::new(RecordingPanel::new(32, 32), &mut scratch, layout);

        block_on(async {
            assert_eq!(display.begin_frame().await, Err(DisplayError::NotInitialized));
            assert_eq!(display.draw_lines(&DrawList::new()).await, Err(DisplayError::Lifecycle));
            display.start().await.unwrap();
            assert_eq!(display.end_frame().await, Err(DisplayError::Lifecycle));
            assert!(submit(&mut display, &DrawList::new()).await.is_ok());
        });
        assert_eq!(display.phase(), FramePhase::Idle);
    }

    #[test]
    fn test_bus_error_forces_full_repaint() {
        let mut scratch = [SlabBuffer::new(), SlabBuffer::new()];
        let mut panel = RecordingPanel::new(32, 32);
        // Start-up clear is 4 bands; the first frame fails
        panel.fail_writes_after = Some(4);
        let layout = SlabLayout::new(32, 32, 8).unwrap();
        let mut display = DirtyRectDisplay::new(panel, &mut scratch, layout);

        block_on(async {
            display.start().await.unwrap();
            let list = frame(&[(1, 1, 5, 1)]);
            assert_eq!(submit(&mut display, &list).await, Err(DisplayError::Bus));
            assert_eq!(display.phase(), FramePhase::Idle);

            display.begin_frame().await.unwrap();
            display.draw_lines(&list).await.unwrap();
            assert_eq!(display.pending_window(), Some(Rect::screen(32, 32)));
        });
    }
}
