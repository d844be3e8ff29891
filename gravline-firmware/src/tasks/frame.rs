//! Frame task (core 0)
//!
//! Advances the demo scene, builds each frame's draw list and submits it
//! to the selected backend. Logs a diagnostic line once per second.

use defmt::*;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Instant;

use gravline_core::config::SceneConfig;
use gravline_core::level::{ColumnSource, SliceLevel};
use gravline_core::scene::{LevelView, CELL};
use gravline_core::{Display, DisplayError, DrawList, Fixed, SceneBuilder, Vec3};
use gravline_display::{Backend, FpsCounter, PipelineStats};

use crate::board::Panel;
use crate::config::CONFIG;
use crate::level::DEMO_LEVEL;

/// Display backend as wired on this board
pub type FirmwareBackend = Backend<'static, 'static, CriticalSectionRawMutex, Panel>;

/// Ship bob period
const BOB_PERIOD_MS: u64 = 2000;

#[embassy_executor::task]
pub async fn frame_task(mut display: FirmwareBackend, list: &'static mut DrawList) {
    info!(
        "Frame task started: {}x{} {}",
        display.width(),
        display.height(),
        display.kind()
    );

    let level = match SliceLevel::new(&DEMO_LEVEL) {
        Ok(level) => level,
        Err(e) => {
            error!("Demo level rejected: {}", e);
            return;
        }
    };
    info!("Demo level: {} columns", level.width());

    let mut camera = CONFIG.camera();
    let base_position = camera.position();
    let base_target = camera.target();
    let span = level.width() as i64 * CELL as i64;

    let start = Instant::now();
    let mut fps = FpsCounter::new();
    let mut last = PipelineStats::default();

    loop {
        let (view, camera_y) = advance(&CONFIG.scene, start.elapsed().as_millis(), span);

        let lift = Vec3::new(Fixed::ZERO, camera_y - base_position.y, Fixed::ZERO);
        camera.set_view(base_position + lift, base_target + lift);

        list.clear();
        let scene = {
            let mut builder = SceneBuilder::new(&camera, list);
            builder.build_level(&level, &view);
            builder.stats()
        };
        if scene.edges_dropped > 0 {
            trace!("{} edges dropped at draw list capacity", scene.edges_dropped);
        }

        if let Err(e) = submit(&mut display, list).await {
            warn!("Frame not displayed: {}", e);
        }

        let stats = display.stats();
        let lines = stats.lines_drawn.wrapping_sub(last.lines_drawn);
        let dropped = stats.lines_dropped.wrapping_sub(last.lines_dropped);
        if let Some(report) = fps.record_frame(Instant::now().as_micros(), lines, dropped) {
            info!(
                "fps={} lines={} dropped={} refs_dropped={} stalls={}",
                report.fps,
                report.lines,
                report.dropped,
                stats.refs_dropped.wrapping_sub(last.refs_dropped),
                stats.producer_stalls,
            );
        }
        last = stats;
    }
}

async fn submit<D: Display>(display: &mut D, list: &DrawList) -> Result<(), DisplayError> {
    display.begin_frame().await?;
    display.draw_lines(list).await?;
    display.end_frame().await
}

/// Scene state at `t_ms`: the level view and the camera height
///
/// The view scrolls at a constant rate and wraps at the level's end. The
/// ship bobs on a triangle wave and the camera follows a fraction of its
/// height.
fn advance(scene: &SceneConfig, t_ms: u64, span: i64) -> (LevelView, Fixed) {
    let travelled = t_ms as i64 * scene.scroll_speed as i64 / 1000;
    let scroll = travelled.rem_euclid(span.max(1)) as i32;

    let half = (BOB_PERIOD_MS / 2) as i32;
    let phase = (t_ms % BOB_PERIOD_MS) as i32;
    let tri = if phase < half { phase } else { 2 * half - phase };
    let bob = scene.ship_bob * (2 * tri - half) / half;
    let ship_y = scene.ship_y + bob;

    let view = LevelView {
        scroll_x: Fixed::from_int(scroll),
        ship_x: Fixed::from_int(scene.ship_x),
        ship_y: Fixed::from_int(ship_y),
        columns: scene.visible_columns,
    };
    let camera_y = scene.camera_base_y + ship_y * scene.camera_follow_pct / 100;
    (view, Fixed::from_int(camera_y))
}
