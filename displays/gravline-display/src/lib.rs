//! Display backends for Gravline
//!
//! This crate turns a frame's [`DrawList`](gravline_core::DrawList) into
//! pixels on an SPI panel:
//!
//! - `clip`: outcode line clipping against the screen
//! - `bin`: slab layout and the per-slab line index
//! - `raster`: slab-sized pixel buffers and the Bresenham rasterizer
//! - `slot`: double-buffered frame slots and their Free/Ready/InFlight states
//! - `pipeline`: producer (scene side) and consumer (panel side) tasks
//! - `panel`: the panel bus seam and the ILI9488 driver
//! - `dirty`: single-core dirty-rectangle backend
//! - `stats`: counters and FPS accounting
//! - `backend`: the backend chosen at start-up
//!
//! # Architecture
//!
//! ```text
//!  core 0                               core 1
//!  scene -> DrawList
//!  FrameProducer: clip + bin into slot
//!       ── ready(slot) ──────────────▶  FrameConsumer
//!                                       for each slab:
//!                                         rasterize slab i+1 ║ transmit slab i
//!       ◀────────────── freed(slot) ──
//! ```
//!
//! Slots travel through the channels as `&mut FrameSlot`, so exactly one
//! side can touch a slot at any time. No storage is allocated after start-up.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod backend;
pub mod bin;
pub mod clip;
pub mod dirty;
pub mod panel;
pub mod pipeline;
pub mod raster;
pub mod slot;
pub mod stats;

#[cfg(test)]
mod testing;

pub use backend::Backend;
pub use bin::{SlabIndex, SlabLayout};
pub use clip::{clip_line, Rect};
pub use dirty::{DirtyRect, DirtyRectDisplay};
pub use panel::{Ili9488, PanelError, PanelInterface};
pub use pipeline::{FrameConsumer, FrameProducer, PipelineChannels, ServeError, SlotMsg};
pub use raster::SlabBuffer;
pub use slot::{FrameSlot, SlotError, SlotState};
pub use stats::{ConsumerStats, FpsCounter, FpsReport, PipelineStats};
