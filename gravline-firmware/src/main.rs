//! Gravline - Wireframe Display Firmware
//!
//! Main firmware binary for RP2040 boards driving an ILI9488 SPI panel.
//! Core 0 assembles each frame's line list; with the pipelined backend,
//! core 1 rasterizes and streams it to the panel slab by slab.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{Executor, Spawner};
use embassy_rp::multicore::{spawn_core1, Stack};
use static_cell::{ConstStaticCell, StaticCell};
use {defmt_rtt as _, panic_probe as _};

use gravline_core::config::BackendKind;
use gravline_core::DrawList;
use gravline_display::{
    Backend, DirtyRectDisplay, FrameConsumer, FrameProducer, FrameSlot, SlabBuffer, SlabLayout,
};

use crate::board::PanelPins;
use crate::config::CONFIG;

mod board;
mod channels;
mod config;
mod level;
mod tasks;

// Large buffers are const-initialized in place, never built on a stack
static CORE1_STACK: ConstStaticCell<Stack<8192>> = ConstStaticCell::new(Stack::new());
static EXECUTOR1: StaticCell<Executor> = StaticCell::new();
static SLOTS: ConstStaticCell<[FrameSlot; 2]> =
    ConstStaticCell::new([FrameSlot::new(), FrameSlot::new()]);
static SCRATCH: ConstStaticCell<[SlabBuffer; 2]> =
    ConstStaticCell::new([SlabBuffer::new(), SlabBuffer::new()]);
static DRAW_LIST: ConstStaticCell<DrawList> = ConstStaticCell::new(DrawList::new());

/// Main entry point (core 0)
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Gravline firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let display = &CONFIG.display;
    info!(
        "Display {}x{}, {} slabs of {} rows, SPI {} Hz, backend {}",
        display.width,
        display.height,
        display.slab_count(),
        display.slab_height,
        display.spi_baud_hz,
        display.backend
    );

    let layout = match SlabLayout::from_config(display) {
        Ok(layout) => layout,
        Err(e) => {
            error!("Display layout rejected: {}", e);
            return;
        }
    };
    let panel = board::panel(
        PanelPins {
            spi: p.SPI1,
            sck: p.PIN_10,
            mosi: p.PIN_11,
            cs: p.PIN_13,
            dc: p.PIN_14,
            rst: p.PIN_15,
            dma: p.DMA_CH0,
        },
        display,
    );
    let scratch = SCRATCH.take();

    let backend = match display.backend {
        BackendKind::Pipelined => {
            let [first, second] = SLOTS.take();
            let consumer = FrameConsumer::new(&channels::PIPELINE, panel, scratch, layout);

            spawn_core1(p.CORE1, CORE1_STACK.take(), move || {
                let executor = EXECUTOR1.init(Executor::new());
                executor.run(|spawner| spawner.spawn(tasks::render_task(consumer)).unwrap());
            });
            info!("Core 1 started");

            Backend::Pipelined(FrameProducer::new(
                &channels::PIPELINE,
                [first, second],
                layout,
            ))
        }
        BackendKind::DirtyRect => {
            let mut dirty = DirtyRectDisplay::new(panel, scratch, layout);
            match dirty.start().await {
                Ok(()) => info!("Panel initialized and cleared"),
                Err(e) => error!("Panel bring-up failed: {}", e),
            }
            Backend::DirtyRect(dirty)
        }
    };

    spawner
        .spawn(tasks::frame_task(backend, DRAW_LIST.take()))
        .unwrap();

    info!("All tasks spawned, firmware running");
}
