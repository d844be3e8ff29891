//! Render task (core 1)
//!
//! Rasterizes and transmits every frame the frame task submits.

use defmt::*;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use gravline_display::FrameConsumer;

use crate::board::Panel;

/// Panel side of the pipeline as wired on this board
pub type Consumer = FrameConsumer<'static, 'static, CriticalSectionRawMutex, Panel>;

#[embassy_executor::task]
pub async fn render_task(mut consumer: Consumer) {
    info!("Render task started on core 1");

    match consumer.start().await {
        Ok(()) => info!("Panel initialized and cleared"),
        // Keep serving so the frame task never blocks on a dead panel
        Err(e) => error!("Panel bring-up failed: {}", e),
    }

    loop {
        match consumer.serve_one().await {
            Ok(frame_id) => trace!("Frame {} transmitted", frame_id),
            Err(e) => warn!("Frame transfer failed: {}", e),
        }
    }
}
