//! Host-side panel double
//!
//! Rebuilds a framebuffer from the window/pixel stream so tests can check
//! what actually reached the glass.

use std::vec::Vec;

use embassy_futures::yield_now;

use crate::clip::Rect;
use crate::panel::{PanelError, PanelInterface};

pub(crate) struct RecordingPanel {
    pub width: u16,
    pub height: u16,
    /// Native RGB565, row-major
    pub framebuffer: Vec<u16>,
    pub windows: Vec<Rect>,
    pub inits: u32,
    pub finished: u32,
    /// Fail every pixel write after this many succeeded
    pub fail_writes_after: Option<u32>,
    writes: u32,
    window: Option<Rect>,
    cursor: usize,
}

impl RecordingPanel {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            framebuffer: vec![0; width as usize * height as usize],
            windows: Vec::new(),
            inits: 0,
            finished: 0,
            fail_writes_after: None,
            writes: 0,
            window: None,
            cursor: 0,
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> u16 {
        self.framebuffer[y as usize * self.width as usize + x as usize]
    }

    /// Coordinates of every non-black pixel, row-major
    pub fn lit(&self) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                if self.pixel(x, y) != 0 {
                    out.push((x, y));
                }
            }
        }
        out
    }

    /// Whether the last window received exactly its pixel count
    pub fn window_complete(&self) -> bool {
        self.window
            .is_some_and(|w| self.cursor == w.pixel_count())
    }
}

impl PanelInterface for RecordingPanel {
    async fn init(&mut self) -> Result<(), PanelError> {
        self.inits += 1;
        Ok(())
    }

    async fn set_window(&mut self, window: Rect) -> Result<(), PanelError> {
        self.windows.push(window);
        self.window = Some(window);
        self.cursor = 0;
        Ok(())
    }

    async fn write_pixels(&mut self, words: &[u16]) -> Result<(), PanelError> {
        // Let the rasterizer run while the "transfer" is pending
        yield_now().await;

        if self.fail_writes_after.is_some_and(|n| self.writes >= n) {
            return Err(PanelError::Bus);
        }
        self.writes += 1;

        let window = self.window.ok_or(PanelError::Bus)?;
        let width = window.width() as usize;
        for &word in words {
            let x = window.x0 + (self.cursor % width) as i32;
            let y = window.y0 + (self.cursor / width) as i32;
            if window.contains(x, y) {
                let i = y as usize * self.width as usize + x as usize;
                self.framebuffer[i] = u16::from_be(word);
            }
            self.cursor += 1;
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), PanelError> {
        self.finished += 1;
        Ok(())
    }
}
