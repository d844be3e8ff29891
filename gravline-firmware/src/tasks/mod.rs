//! Embassy async tasks
//!
//! The frame task runs on core 0; the render task runs on core 1 when the
//! pipelined backend is selected.

pub mod frame;
pub mod render;

pub use frame::{frame_task, FirmwareBackend};
pub use render::{render_task, Consumer};
