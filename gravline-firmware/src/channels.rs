//! Inter-core communication channels
//!
//! The pipeline's ready/freed queues are the only state shared between
//! the producer on core 0 and the consumer on core 1.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use gravline_display::PipelineChannels;

/// Frame slots travelling between the frame task and the render task
pub static PIPELINE: PipelineChannels<'static, CriticalSectionRawMutex> = PipelineChannels::new();
