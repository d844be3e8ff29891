//! Display capability
//!
//! Every backend (slab pipeline, dirty rectangle) exposes the same
//! per-tick lifecycle:
//!
//! ```text
//! begin_frame() -> draw_lines(&DrawList) -> end_frame()
//! ```
//!
//! once each and in that order. Out-of-order calls fail with
//! [`DisplayError::Lifecycle`] and leave the backend untouched.

use crate::draw_list::DrawList;

/// Errors surfaced by a display backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Lifecycle call out of order
    Lifecycle,
    /// Panel bus or pin failure
    Bus,
    /// Frame submitted before the panel was brought up
    NotInitialized,
}

/// Lifecycle call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameCall {
    Begin,
    Draw,
    End,
}

/// Where a backend is within the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FramePhase {
    /// Between frames
    #[default]
    Idle,
    /// `begin_frame` accepted
    Begun,
    /// `draw_lines` accepted, waiting for `end_frame`
    Drawn,
}

impl FramePhase {
    /// Next phase after `call`, or `Lifecycle` if the call is out of order
    pub fn transition(self, call: FrameCall) -> Result<Self, DisplayError> {
        use FrameCall::*;
        use FramePhase::*;

        match (self, call) {
            (Idle, Begin) => Ok(Begun),
            (Begun, Draw) => Ok(Drawn),
            (Drawn, End) => Ok(Idle),
            _ => Err(DisplayError::Lifecycle),
        }
    }
}

/// Polymorphic display capability
///
/// Width and height are constant for the lifetime of the backend.
/// `end_frame` returns only once the submitted frame is owned by the
/// backend and the next frame can be accepted without overwriting
/// anything still being transmitted.
#[allow(async_fn_in_trait)]
pub trait Display {
    /// Panel width in pixels
    fn width(&self) -> u16;

    /// Panel height in pixels
    fn height(&self) -> u16;

    /// Start a frame
    async fn begin_frame(&mut self) -> Result<(), DisplayError>;

    /// Hand over the frame's lines (exactly once per frame)
    async fn draw_lines(&mut self, list: &DrawList) -> Result<(), DisplayError>;

    /// Submit the frame
    async fn end_frame(&mut self) -> Result<(), DisplayError>;
}
