//! Hardware abstraction traits
//!
//! These traits define the interface between scene assembly and the
//! display backends.

pub mod display;

pub use display::{Display, DisplayError, FrameCall, FramePhase};
