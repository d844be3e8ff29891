//! Panel bus interface and ILI9488 driver
//!
//! The panel is driven over a write-only SPI bus with manual CS and D/C
//! lines. Pixel data is streamed as big-endian RGB565, row-major inside
//! the addressed window.

use core::mem;

use embassy_futures::join::join;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::SpiBus;

use gravline_core::config::MAX_SLAB_PIXELS;
use gravline_core::DisplayError;

use crate::clip::Rect;
use crate::raster::SlabBuffer;

/// Panel errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelError {
    /// SPI transfer failed
    Bus,
    /// CS, D/C or reset pin failed
    Pin,
}

impl From<PanelError> for DisplayError {
    fn from(_: PanelError) -> Self {
        DisplayError::Bus
    }
}

/// Panel seam used by the backends
///
/// `set_window` leaves the panel in memory-write mode; `write_pixels` may
/// then be called any number of times until `finish`.
#[allow(async_fn_in_trait)]
pub trait PanelInterface {
    /// Reset and configure the panel
    async fn init(&mut self) -> Result<(), PanelError>;

    /// Address `window` and start a memory write
    async fn set_window(&mut self, window: Rect) -> Result<(), PanelError>;

    /// Stream wire-order pixel words
    ///
    /// Returns once `words` is no longer being read.
    async fn write_pixels(&mut self, words: &[u16]) -> Result<(), PanelError>;

    /// Wait for the bus to drain and end the memory write
    async fn finish(&mut self) -> Result<(), PanelError>;
}

/// ILI9488 commands
mod cmd {
    pub const SWRESET: u8 = 0x01;
    pub const SLPOUT: u8 = 0x11;
    pub const INVON: u8 = 0x21;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A;
    pub const PASET: u8 = 0x2B;
    pub const RAMWR: u8 = 0x2C;
    pub const MADCTL: u8 = 0x36;
    pub const COLMOD: u8 = 0x3A;
}

/// 16 bits per pixel
const COLMOD_RGB565: u8 = 0x55;

/// Reset pulse and settle times (ms)
const RESET_LOW_MS: u32 = 20;
const RESET_SETTLE_MS: u32 = 120;
const SWRESET_MS: u32 = 150;
const SLPOUT_MS: u32 = 120;

/// ILI9488 over SPI
pub struct Ili9488<SPI, DC, CS, RST, D> {
    spi: SPI,
    dc: DC,
    cs: CS,
    rst: RST,
    delay: D,
    madctl: u8,
}

impl<SPI, DC, CS, RST, D> Ili9488<SPI, DC, CS, RST, D>
where
    SPI: SpiBus<u8>,
    DC: OutputPin,
    CS: OutputPin,
    RST: OutputPin,
    D: DelayNs,
{
    /// Create a driver; the panel is untouched until [`init`](PanelInterface::init)
    pub fn new(spi: SPI, dc: DC, cs: CS, rst: RST, delay: D, madctl: u8) -> Self {
        Self {
            spi,
            dc,
            cs,
            rst,
            delay,
            madctl,
        }
    }

    /// Hardware reset pulse
    async fn hard_reset(&mut self) -> Result<(), PanelError> {
        self.cs.set_high().map_err(|_| PanelError::Pin)?;
        self.dc.set_high().map_err(|_| PanelError::Pin)?;
        self.rst.set_low().map_err(|_| PanelError::Pin)?;
        self.delay.delay_ms(RESET_LOW_MS).await;
        self.rst.set_high().map_err(|_| PanelError::Pin)?;
        self.delay.delay_ms(RESET_SETTLE_MS).await;
        Ok(())
    }

    /// Send a command byte
    ///
    /// The bus is flushed first so D/C never changes under pending data.
    async fn command(&mut self, command: u8) -> Result<(), PanelError> {
        self.spi.flush().await.map_err(|_| PanelError::Bus)?;
        self.dc.set_low().map_err(|_| PanelError::Pin)?;
        self.cs.set_low().map_err(|_| PanelError::Pin)?;
        self.spi.write(&[command]).await.map_err(|_| PanelError::Bus)?;
        self.spi.flush().await.map_err(|_| PanelError::Bus)?;
        self.dc.set_high().map_err(|_| PanelError::Pin)?;
        Ok(())
    }

    /// Command followed by parameter bytes, CS released afterwards
    async fn command_with(&mut self, command: u8, params: &[u8]) -> Result<(), PanelError> {
        self.command(command).await?;
        if !params.is_empty() {
            self.spi.write(params).await.map_err(|_| PanelError::Bus)?;
        }
        self.release().await
    }

    async fn release(&mut self) -> Result<(), PanelError> {
        self.spi.flush().await.map_err(|_| PanelError::Bus)?;
        self.cs.set_high().map_err(|_| PanelError::Pin)
    }

    /// Release the bus and pins
    pub fn release_parts(self) -> (SPI, DC, CS, RST, D) {
        (self.spi, self.dc, self.cs, self.rst, self.delay)
    }
}

/// Big-endian start/end pair for CASET/PASET
fn window_bytes(start: i32, end: i32) -> [u8; 4] {
    let s = (start.clamp(0, u16::MAX as i32) as u16).to_be_bytes();
    let e = (end.clamp(0, u16::MAX as i32) as u16).to_be_bytes();
    [s[0], s[1], e[0], e[1]]
}

impl<SPI, DC, CS, RST, D> PanelInterface for Ili9488<SPI, DC, CS, RST, D>
where
    SPI: SpiBus<u8>,
    DC: OutputPin,
    CS: OutputPin,
    RST: OutputPin,
    D: DelayNs,
{
    async fn init(&mut self) -> Result<(), PanelError> {
        self.hard_reset().await?;

        self.command_with(cmd::SWRESET, &[]).await?;
        self.delay.delay_ms(SWRESET_MS).await;
        self.command_with(cmd::SLPOUT, &[]).await?;
        self.delay.delay_ms(SLPOUT_MS).await;

        self.command_with(cmd::INVON, &[]).await?;
        self.command_with(cmd::COLMOD, &[COLMOD_RGB565]).await?;
        let madctl = self.madctl;
        self.command_with(cmd::MADCTL, &[madctl]).await?;
        self.command_with(cmd::DISPON, &[]).await
    }

    async fn set_window(&mut self, window: Rect) -> Result<(), PanelError> {
        self.command_with(cmd::CASET, &window_bytes(window.x0, window.x1))
            .await?;
        self.command_with(cmd::PASET, &window_bytes(window.y0, window.y1))
            .await?;
        // CS stays low: pixel data follows
        self.command(cmd::RAMWR).await
    }

    async fn write_pixels(&mut self, words: &[u16]) -> Result<(), PanelError> {
        self.spi
            .write(bytemuck::cast_slice(words))
            .await
            .map_err(|_| PanelError::Bus)
    }

    async fn finish(&mut self) -> Result<(), PanelError> {
        self.release().await
    }
}

/// Stream `window` to the panel in bands of `band_rows` rows
///
/// `fill(band, buffer)` rasterizes band `band` into a buffer that has
/// already been reset to the band's rectangle. Band `n + 1` is rasterized
/// while band `n` is on the bus; a buffer is refilled only after its
/// transfer has returned.
pub async fn stream_window<P, F>(
    panel: &mut P,
    scratch: &mut [SlabBuffer; 2],
    window: Rect,
    band_rows: u16,
    mut fill: F,
) -> Result<u32, PanelError>
where
    P: PanelInterface,
    F: FnMut(usize, &mut SlabBuffer),
{
    if window.is_empty() {
        return Ok(0);
    }
    // A band must fit one scratch buffer
    let fit = (MAX_SLAB_PIXELS / window.width() as usize).max(1);
    let rows = (band_rows.max(1) as usize).min(fit) as i32;
    let band_rect = |band: usize| {
        let y0 = window.y0 + band as i32 * rows;
        Rect::new(window.x0, y0, window.x1, (y0 + rows - 1).min(window.y1))
    };
    let bands = (window.height() as usize).div_ceil(rows as usize);

    let [a, b] = scratch;
    let (mut front, mut back): (&mut SlabBuffer, &mut SlabBuffer) = (a, b);
    front.reset(band_rect(0));
    fill(0, &mut *front);

    panel.set_window(window).await?;
    for band in 0..bands {
        let next = band + 1;
        let (sent, ()) = join(panel.write_pixels(front.words()), async {
            if next < bands {
                back.reset(band_rect(next));
                fill(next, &mut *back);
            }
        })
        .await;
        // The panel may be left mid-write; the caller's next window
        // command restarts it.
        sent?;
        mem::swap(&mut front, &mut back);
    }
    panel.finish().await?;
    Ok(bands as u32)
}
