//! Board wiring
//!
//! Raspberry Pi Pico with a 3.5" ILI9488 SPI module:
//!
//! | Signal | GPIO | Notes            |
//! |--------|------|------------------|
//! | SCK    | 10   | SPI1             |
//! | MOSI   | 11   | SPI1, TX DMA ch0 |
//! | CS     | 13   | driven manually  |
//! | D/C    | 14   |                  |
//! | RST    | 15   |                  |

use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{DMA_CH0, PIN_10, PIN_11, PIN_13, PIN_14, PIN_15, SPI1};
use embassy_rp::spi::{self, Spi};
use embassy_rp::Peri;
use embassy_time::Delay;

use gravline_core::config::DisplayConfig;
use gravline_display::Ili9488;

/// Write-only SPI bus to the panel
pub type PanelSpi = Spi<'static, SPI1, spi::Async>;

/// The panel driver as wired on this board
pub type Panel = Ili9488<PanelSpi, Output<'static>, Output<'static>, Output<'static>, Delay>;

/// Panel peripherals
pub struct PanelPins {
    pub spi: Peri<'static, SPI1>,
    pub sck: Peri<'static, PIN_10>,
    pub mosi: Peri<'static, PIN_11>,
    pub cs: Peri<'static, PIN_13>,
    pub dc: Peri<'static, PIN_14>,
    pub rst: Peri<'static, PIN_15>,
    pub dma: Peri<'static, DMA_CH0>,
}

/// Build the panel driver; the panel itself is not touched yet
pub fn panel(pins: PanelPins, display: &DisplayConfig) -> Panel {
    let mut config = spi::Config::default();
    config.frequency = display.spi_baud_hz;

    let spi = Spi::new_txonly(pins.spi, pins.sck, pins.mosi, pins.dma, config);
    let cs = Output::new(pins.cs, Level::High);
    let dc = Output::new(pins.dc, Level::High);
    let rst = Output::new(pins.rst, Level::High);

    Ili9488::new(spi, dc, cs, rst, Delay, display.madctl)
}
