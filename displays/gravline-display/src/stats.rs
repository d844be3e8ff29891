//! Diagnostic counters
//!
//! Counters only; nothing here influences scheduling.

use crate::slot::SlotStats;

/// Producer-side totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipelineStats {
    /// Frames handed to the consumer
    pub frames_submitted: u32,
    /// Slots returned by the consumer
    pub frames_completed: u32,
    /// Lines kept after clipping
    pub lines_drawn: u32,
    /// Lines entirely off screen
    pub lines_clipped_out: u32,
    /// Lines dropped by a full draw list
    pub lines_dropped: u32,
    /// Slab references dropped at capacity
    pub refs_dropped: u32,
    /// Times `end_frame` had to wait for a slot
    pub producer_stalls: u32,
}

impl PipelineStats {
    /// Fold in the counters of one filled slot
    pub fn record_slot(&mut self, slot: &SlotStats) {
        self.lines_drawn = self.lines_drawn.wrapping_add(slot.kept);
        self.lines_clipped_out = self.lines_clipped_out.wrapping_add(slot.clipped_out);
        self.lines_dropped = self.lines_dropped.wrapping_add(slot.list_dropped);
        self.refs_dropped = self.refs_dropped.wrapping_add(slot.dropped_refs);
    }

    /// Frames submitted but not yet returned
    pub fn in_flight(&self) -> u32 {
        self.frames_submitted.wrapping_sub(self.frames_completed)
    }
}

/// Consumer-side totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsumerStats {
    pub frames_transmitted: u32,
    pub slabs_transmitted: u32,
    /// Frames whose transfer failed (slot still released)
    pub bus_errors: u32,
    /// Id of the most recently completed frame
    pub last_frame_id: Option<u32>,
}

/// One second's worth of diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FpsReport {
    /// Frames per second, scaled to the exact window length
    pub fps: u32,
    pub frames: u32,
    pub lines: u32,
    pub dropped: u32,
    pub elapsed_us: u64,
}

/// Reporting window
const WINDOW_US: u64 = 1_000_000;

/// Frame counter that reports once per elapsed second
#[derive(Debug, Clone, Copy, Default)]
pub struct FpsCounter {
    window_start_us: Option<u64>,
    frames: u32,
    lines: u32,
    dropped: u32,
}

impl FpsCounter {
    pub const fn new() -> Self {
        Self {
            window_start_us: None,
            frames: 0,
            lines: 0,
            dropped: 0,
        }
    }

    /// Count a frame at `now_us`
    ///
    /// Returns a report and starts a new window once a full second has
    /// passed since the window opened.
    pub fn record_frame(&mut self, now_us: u64, lines: u32, dropped: u32) -> Option<FpsReport> {
        let start = *self.window_start_us.get_or_insert(now_us);
        self.frames += 1;
        self.lines = self.lines.saturating_add(lines);
        self.dropped = self.dropped.saturating_add(dropped);

        let elapsed_us = now_us.saturating_sub(start);
        if elapsed_us < WINDOW_US {
            return None;
        }

        let report = FpsReport {
            fps: (self.frames as u64 * WINDOW_US / elapsed_us) as u32,
            frames: self.frames,
            lines: self.lines,
            dropped: self.dropped,
            elapsed_us,
        };
        *self = Self {
            window_start_us: Some(now_us),
            ..Self::new()
        };
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_once_per_second() {
        let mut fps = FpsCounter::new();
        assert_eq!(fps.record_frame(5_000_000, 10, 0), None);
        for i in 1..40 {
            assert_eq!(fps.record_frame(5_000_000 + i * 25_000, 10, 1), None);
        }
        let report = fps.record_frame(6_000_000, 10, 0).unwrap();
        assert_eq!(report.frames, 41);
        assert_eq!(report.fps, 41);
        assert_eq!(report.lines, 410);
        assert_eq!(report.dropped, 39);

        // New window opens at the report
        assert_eq!(fps.record_frame(6_500_000, 0, 0), None);
        let report = fps.record_frame(8_000_000, 0, 0).unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.fps, 1);
    }

    #[test]
    fn test_pipeline_stats_fold() {
        let mut stats = PipelineStats::default();
        stats.record_slot(&SlotStats {
            submitted: 12,
            list_dropped: 2,
            clipped_out: 3,
            kept: 9,
            dropped_refs: 4,
        });
        assert_eq!(stats.lines_drawn, 9);
        assert_eq!(stats.lines_clipped_out, 3);
        assert_eq!(stats.lines_dropped, 2);
        assert_eq!(stats.refs_dropped, 4);

        stats.frames_submitted = 5;
        stats.frames_completed = 3;
        assert_eq!(stats.in_flight(), 2);
    }
}
