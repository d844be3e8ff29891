//! Backend selected at start-up

use embassy_sync::blocking_mutex::raw::RawMutex;

use gravline_core::config::BackendKind;
use gravline_core::traits::{Display, DisplayError};
use gravline_core::DrawList;

use crate::dirty::DirtyRectDisplay;
use crate::panel::PanelInterface;
use crate::pipeline::FrameProducer;
use crate::stats::PipelineStats;

/// Either display implementation behind one [`Display`]
pub enum Backend<'a, 'ch, M: RawMutex, P> {
    /// Slab pipeline; the panel is driven by a consumer on the other core
    Pipelined(FrameProducer<'a, 'ch, M>),
    /// Dirty rectangle on the calling core
    DirtyRect(DirtyRectDisplay<'ch, P>),
}

impl<'a, 'ch, M: RawMutex, P: PanelInterface> Backend<'a, 'ch, M, P> {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Pipelined(_) => BackendKind::Pipelined,
            Backend::DirtyRect(_) => BackendKind::DirtyRect,
        }
    }

    pub fn stats(&self) -> PipelineStats {
        match self {
            Backend::Pipelined(p) => p.stats(),
            Backend::DirtyRect(d) => d.stats(),
        }
    }
}

impl<'a, 'ch, M: RawMutex, P: PanelInterface> Display for Backend<'a, 'ch, M, P> {
    fn width(&self) -> u16 {
        match self {
            Backend::Pipelined(p) => p.width(),
            Backend::DirtyRect(d) => d.width(),
        }
    }

    fn height(&self) -> u16 {
        match self {
            Backend::Pipelined(p) => p.height(),
            Backend::DirtyRect(d) => d.height(),
        }
    }

    async fn begin_frame(&mut self) -> Result<(), DisplayError> {
        match self {
            Backend::Pipelined(p) => p.begin_frame().await,
            Backend::DirtyRect(d) => d.begin_frame().await,
        }
    }

    async fn draw_lines(&mut self, list: &DrawList) -> Result<(), DisplayError> {
        match self {
            Backend::Pipelined(p) => p.draw_lines(list).await,
            Backend::DirtyRect(d) => d.draw_lines(list).await,
        }
    }

    async fn end_frame(&mut self) -> Result<(), DisplayError> {
        match self {
            Backend::Pipelined(p) => p.end_frame().await,
            Backend::DirtyRect(d) => d.end_frame().await,
        }
    }
}
