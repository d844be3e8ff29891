//! Frame slots
//!
//! A slot holds one frame's clipped lines and its slab index. Two slots
//! cycle between the producer and the consumer:
//!
//! ```text
//! Free --fill/mark_ready--> Ready --begin_flight--> InFlight --release--> Free
//! ```
//!
//! The producer only writes a Free slot; the consumer only reads a slot
//! it has moved to InFlight. Any other transition is rejected.

use heapless::Vec;

use gravline_core::{DisplayError, DrawList, Line2D, MAX_LINES};

use crate::bin::{SlabIndex, SlabLayout};
use crate::clip::clip_line;

/// Slot lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotState {
    /// Owned by the producer, may be filled
    #[default]
    Free,
    /// Binned and queued for the consumer
    Ready,
    /// Being rasterized and transmitted
    InFlight,
}

/// Slot lifecycle violations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotError {
    /// Transition not allowed from the current state
    InvalidTransition { from: SlotState, to: SlotState },
    /// Fill attempted on a slot that is not Free
    Busy(SlotState),
}

impl From<SlotError> for DisplayError {
    fn from(_: SlotError) -> Self {
        DisplayError::Lifecycle
    }
}

impl SlotState {
    /// Validate a transition to `to`
    pub fn transition(self, to: SlotState) -> Result<SlotState, SlotError> {
        use SlotState::*;

        match (self, to) {
            (Free, Ready) | (Ready, InFlight) | (InFlight, Free) => Ok(to),
            _ => Err(SlotError::InvalidTransition { from: self, to }),
        }
    }
}

/// Per-frame counters recorded while filling a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotStats {
    /// Lines in the submitted draw list
    pub submitted: u32,
    /// Lines the draw list itself dropped at capacity
    pub list_dropped: u32,
    /// Lines entirely off screen
    pub clipped_out: u32,
    /// Lines kept after clipping
    pub kept: u32,
    /// Slab references dropped at capacity
    pub dropped_refs: u32,
}

/// One frame's binned line data
pub struct FrameSlot {
    state: SlotState,
    frame_id: u32,
    lines: Vec<Line2D, MAX_LINES>,
    index: SlabIndex,
    stats: SlotStats,
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSlot {
    pub const fn new() -> Self {
        Self {
            state: SlotState::Free,
            frame_id: 0,
            lines: Vec::new(),
            index: SlabIndex::new(),
            stats: SlotStats {
                submitted: 0,
                list_dropped: 0,
                clipped_out: 0,
                kept: 0,
                dropped_refs: 0,
            },
        }
    }

    /// Clip `list` to the screen and bin it into slabs
    ///
    /// Only allowed while Free. The slot stays Free until
    /// [`mark_ready`](Self::mark_ready).
    pub fn fill(
        &mut self,
        frame_id: u32,
        list: &DrawList,
        layout: &SlabLayout,
    ) -> Result<(), SlotError> {
        if self.state != SlotState::Free {
            return Err(SlotError::Busy(self.state));
        }

        self.frame_id = frame_id;
        self.lines.clear();
        let mut stats = SlotStats {
            submitted: list.len() as u32,
            list_dropped: list.dropped(),
            ..SlotStats::default()
        };

        let screen = layout.screen();
        for line in list.lines() {
            match clip_line(line, &screen) {
                Some(clipped) => {
                    // Same capacity as the draw list, cannot overflow
                    let _ = self.lines.push(clipped);
                }
                None => stats.clipped_out += 1,
            }
        }
        stats.kept = self.lines.len() as u32;

        self.index.build(&self.lines, layout);
        stats.dropped_refs = self.index.dropped();
        self.stats = stats;
        Ok(())
    }

    /// Producer: hand the filled slot to the consumer
    pub fn mark_ready(&mut self) -> Result<(), SlotError> {
        self.state = self.state.transition(SlotState::Ready)?;
        Ok(())
    }

    /// Consumer: take ownership for rasterization
    pub fn begin_flight(&mut self) -> Result<(), SlotError> {
        self.state = self.state.transition(SlotState::InFlight)?;
        Ok(())
    }

    /// Consumer: frame fully transmitted
    pub fn release(&mut self) -> Result<(), SlotError> {
        self.state = self.state.transition(SlotState::Free)?;
        Ok(())
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    /// Clipped lines in submission order
    pub fn lines(&self) -> &[Line2D] {
        &self.lines
    }

    pub fn index(&self) -> &SlabIndex {
        &self.index
    }

    pub fn stats(&self) -> SlotStats {
        self.stats
    }

    /// Slab references lost to index capacity in the last fill
    pub fn dropped_refs(&self) -> u32 {
        self.stats.dropped_refs
    }

    /// Lines referenced by slab `s`
    pub fn slab_lines(&self, s: usize) -> impl Iterator<Item = &Line2D> + '_ {
        self.index
            .slab(s)
            .iter()
            .map(move |&i| &self.lines[i as usize])
    }
}
