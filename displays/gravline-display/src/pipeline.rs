//! Two-stage frame pipeline
//!
//! The producer (scene side) clips and bins each frame into one of two
//! [`FrameSlot`]s and sends it on the `ready` channel. The consumer (panel
//! side) rasterizes the slot slab by slab while the previous slab is on
//! the bus, then releases it and sends it back on the `freed` channel.
//!
//! Slots move through the channels as `&mut FrameSlot`, so the channels are
//! the only synchronization between the two sides. Both queues hold two
//! messages, so at most two frames are ever in flight and a send never
//! blocks; the only backpressure is [`FrameProducer`] waiting in
//! `end_frame` for the next slot to come back.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;

use gravline_core::traits::{Display, DisplayError, FrameCall, FramePhase};
use gravline_core::DrawList;

use crate::bin::SlabLayout;
use crate::panel::{stream_window, PanelError, PanelInterface};
use crate::raster::SlabBuffer;
use crate::slot::{FrameSlot, SlotError};
use crate::stats::{ConsumerStats, PipelineStats};

/// Frame slots in the pipeline
pub const SLOT_COUNT: usize = 2;

/// Depth of each channel
pub const QUEUE_DEPTH: usize = 2;

/// A slot handed across the pipeline
pub struct SlotMsg<'a> {
    /// Which of the two slots this is
    pub index: u8,
    pub slot: &'a mut FrameSlot,
}

/// The two one-directional queues between producer and consumer
pub struct PipelineChannels<'a, M: RawMutex> {
    ready: Channel<M, SlotMsg<'a>, QUEUE_DEPTH>,
    freed: Channel<M, SlotMsg<'a>, QUEUE_DEPTH>,
}

impl<'a, M: RawMutex> Default for PipelineChannels<'a, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, M: RawMutex> PipelineChannels<'a, M> {
    pub const fn new() -> Self {
        Self {
            ready: Channel::new(),
            freed: Channel::new(),
        }
    }
}

/// Scene-side half of the pipeline
///
/// Implements [`Display`]: `draw_lines` fills the current slot, `end_frame`
/// submits it and returns once the next slot is Free.
pub struct FrameProducer<'a, 'ch, M: RawMutex> {
    channels: &'ch PipelineChannels<'a, M>,
    /// Slots currently owned by the producer
    slots: [Option<&'a mut FrameSlot>; SLOT_COUNT],
    next: usize,
    layout: SlabLayout,
    phase: FramePhase,
    frame_id: u32,
    stats: PipelineStats,
}

impl<'a, 'ch, M: RawMutex> FrameProducer<'a, 'ch, M> {
    /// Take ownership of both slots; they must be Free
    pub fn new(
        channels: &'ch PipelineChannels<'a, M>,
        slots: [&'a mut FrameSlot; SLOT_COUNT],
        layout: SlabLayout,
    ) -> Self {
        let [first, second] = slots;
        Self {
            channels,
            slots: [Some(first), Some(second)],
            next: 0,
            layout,
            phase: FramePhase::Idle,
            frame_id: 0,
            stats: PipelineStats::default(),
        }
    }

    pub fn layout(&self) -> &SlabLayout {
        &self.layout
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Id the next submitted frame will carry
    pub fn next_frame_id(&self) -> u32 {
        self.frame_id
    }

    fn reclaim(&mut self, msg: SlotMsg<'a>) {
        debug_assert!(msg.slot.state() == crate::slot::SlotState::Free);
        let index = msg.index as usize % SLOT_COUNT;
        self.slots[index] = Some(msg.slot);
        self.stats.frames_completed = self.stats.frames_completed.wrapping_add(1);
    }

    /// Take back any slots the consumer has already returned
    pub fn poll_completions(&mut self) {
        while let Ok(msg) = self.channels.freed.try_receive() {
            self.reclaim(msg);
        }
    }

    /// Block until the slot for the next frame is Free
    async fn wait_for_next(&mut self) {
        self.poll_completions();
        if self.slots[self.next].is_some() {
            return;
        }
        self.stats.producer_stalls = self.stats.producer_stalls.wrapping_add(1);
        while self.slots[self.next].is_none() {
            let msg = self.channels.freed.receive().await;
            self.reclaim(msg);
        }
    }

    /// Wait until every submitted frame has been transmitted
    pub async fn drain(&mut self) {
        while self.slots.iter().any(Option::is_none) {
            let msg = self.channels.freed.receive().await;
            self.reclaim(msg);
        }
    }
}

impl<'a, 'ch, M: RawMutex> Display for FrameProducer<'a, 'ch, M> {
    fn width(&self) -> u16 {
        self.layout.width()
    }

    fn height(&self) -> u16 {
        self.layout.height()
    }

    async fn begin_frame(&mut self) -> Result<(), DisplayError> {
        let phase = self.phase.transition(FrameCall::Begin)?;
        self.wait_for_next().await;
        self.phase = phase;
        Ok(())
    }

    async fn draw_lines(&mut self, list: &DrawList) -> Result<(), DisplayError> {
        let phase = self.phase.transition(FrameCall::Draw)?;
        let slot = self.slots[self.next]
            .as_deref_mut()
            .ok_or(DisplayError::Lifecycle)?;
        slot.fill(self.frame_id, list, &self.layout)?;
        self.stats.record_slot(&slot.stats());
        self.phase = phase;
        Ok(())
    }

    async fn end_frame(&mut self) -> Result<(), DisplayError> {
        let phase = self.phase.transition(FrameCall::End)?;
        let index = self.next;
        let slot = self.slots[index].take().ok_or(DisplayError::Lifecycle)?;
        if let Err(e) = slot.mark_ready() {
            self.slots[index] = Some(slot);
            return Err(e.into());
        }

        self.channels
            .ready
            .send(SlotMsg {
                index: index as u8,
                slot,
            })
            .await;
        self.phase = phase;
        self.frame_id = self.frame_id.wrapping_add(1);
        self.stats.frames_submitted = self.stats.frames_submitted.wrapping_add(1);
        self.next = (index + 1) % SLOT_COUNT;

        self.wait_for_next().await;
        Ok(())
    }
}

/// Consumer failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServeError {
    /// Panel transfer failed; the frame was still released
    Panel(PanelError),
    /// A slot arrived that was not Ready; it was returned untouched
    Slot(SlotError),
}

impl From<PanelError> for ServeError {
    fn from(e: PanelError) -> Self {
        ServeError::Panel(e)
    }
}

impl From<SlotError> for ServeError {
    fn from(e: SlotError) -> Self {
        ServeError::Slot(e)
    }
}

/// Panel-side half of the pipeline
pub struct FrameConsumer<'a, 'ch, M: RawMutex, P> {
    channels: &'ch PipelineChannels<'a, M>,
    panel: P,
    scratch: &'ch mut [SlabBuffer; 2],
    layout: SlabLayout,
    stats: ConsumerStats,
}

impl<'a, 'ch, M: RawMutex, P: PanelInterface> FrameConsumer<'a, 'ch, M, P> {
    pub fn new(
        channels: &'ch PipelineChannels<'a, M>,
        panel: P,
        scratch: &'ch mut [SlabBuffer; 2],
        layout: SlabLayout,
    ) -> Self {
        Self {
            channels,
            panel,
            scratch,
            layout,
            stats: ConsumerStats::default(),
        }
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn into_panel(self) -> P {
        self.panel
    }

    /// Bring the panel up and clear the whole screen
    ///
    /// Must complete before the first frame is served.
    pub async fn start(&mut self) -> Result<(), PanelError> {
        self.panel.init().await?;
        stream_window(
            &mut self.panel,
            self.scratch,
            self.layout.screen(),
            self.layout.slab_height(),
            |_, _| {},
        )
        .await?;
        Ok(())
    }

    /// Wait for one ready frame, transmit it and return its slot
    ///
    /// The slot always goes back to the producer, even when the panel
    /// fails part way through. Returns the frame id.
    pub async fn serve_one(&mut self) -> Result<u32, ServeError> {
        let SlotMsg { index, slot } = self.channels.ready.receive().await;
        let frame_id = slot.frame_id();

        let result = match slot.begin_flight() {
            Ok(()) => {
                let sent = stream_frame(&mut self.panel, self.scratch, &self.layout, slot).await;
                match slot.release() {
                    Ok(()) => sent.map_err(ServeError::from),
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        };

        self.channels.freed.send(SlotMsg { index, slot }).await;

        match result {
            Ok(slabs) => {
                self.stats.frames_transmitted = self.stats.frames_transmitted.wrapping_add(1);
                self.stats.slabs_transmitted = self.stats.slabs_transmitted.wrapping_add(slabs);
                self.stats.last_frame_id = Some(frame_id);
                Ok(frame_id)
            }
            Err(e) => {
                self.stats.bus_errors = self.stats.bus_errors.wrapping_add(1);
                Err(e)
            }
        }
    }
}

/// Rasterize and transmit a slot, slab by slab
pub async fn stream_frame<P: PanelInterface>(
    panel: &mut P,
    scratch: &mut [SlabBuffer; 2],
    layout: &SlabLayout,
    slot: &FrameSlot,
) -> Result<u32, PanelError> {
    stream_window(
        panel,
        scratch,
        layout.screen(),
        layout.slab_height(),
        |slab, buf| buf.draw_lines(slot.slab_lines(slab)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{clip_line, Rect};
    use crate::testing::RecordingPanel;
    use embassy_futures::block_on;
    use embassy_futures::join::join;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use gravline_core::{Line2D, ScreenPoint};
    use proptest::prelude::*;

    struct Outcome {
        panel: RecordingPanel,
        served: std::vec::Vec<u32>,
        producer: PipelineStats,
        consumer: ConsumerStats,
        slot0_slabs: std::vec::Vec<usize>,
    }

    fn run_frames(layout: SlabLayout, frames: &[DrawList], panel: RecordingPanel) -> Outcome {
        let mut slots = [FrameSlot::new(), FrameSlot::new()];
        let mut scratch = [SlabBuffer::new(), SlabBuffer::new()];
        let channels = PipelineChannels::<NoopRawMutex>::new();
        let [s0, s1] = &mut slots;
        let mut producer = FrameProducer::new(&channels, [s0, s1], layout);
        let mut consumer = FrameConsumer::new(&channels, panel, &mut scratch, layout);

        let mut served = std::vec::Vec::new();
        block_on(async {
            consumer.start().await.unwrap();
            join(
                async {
                    for list in frames {
                        producer.begin_frame().await.unwrap();
                        producer.draw_lines(list).await.unwrap();
                        producer.end_frame().await.unwrap();
                    }
                    producer.drain().await;
                },
                async {
                    for _ in 0..frames.len() {
                        if let Ok(id) = consumer.serve_one().await {
                            served.push(id);
                        }
                    }
                },
            )
            .await;
        });

        let producer_stats = producer.stats();
        let consumer_stats = consumer.stats();
        let panel = consumer.into_panel();
        drop(producer);
        drop(channels);

        let slot0_slabs = (0..layout.slab_count())
            .filter(|&s| !slots[0].index().slab(s).is_empty())
            .collect();
        Outcome {
            panel,
            served,
            producer: producer_stats,
            consumer: consumer_stats,
            slot0_slabs,
        }
    }

    fn reference(width: u16, height: u16, list: &DrawList) -> RecordingPanel {
        // Whole-screen rasterization of the clipped lines
        let screen = Rect::screen(width, height);
        let mut buf = SlabBuffer::new();
        buf.reset(screen);
        for line in list.lines() {
            if let Some(clipped) = clip_line(line, &screen) {
                buf.draw_line(&clipped);
            }
        }
        let mut panel = RecordingPanel::new(width, height);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                panel.framebuffer[y as usize * width as usize + x as usize] =
                    buf.pixel(x, y).unwrap_or(0);
            }
        }
        panel
    }

    #[test]
    fn test_single_line_end_to_end() {
        let layout = SlabLayout::new(320, 320, 8).unwrap();
        let mut list = DrawList::new();
        list.add_line(ScreenPoint::new(0, 0), ScreenPoint::new(10, 0), 0xFFFF);

        let out = run_frames(layout, &[list], RecordingPanel::new(320, 320));

        assert_eq!(out.slot0_slabs, [0]);
        let expected: std::vec::Vec<(i32, i32)> = (0..=10).map(|x| (x, 0)).collect();
        assert_eq!(out.panel.lit(), expected);
        assert_eq!(out.panel.pixel(10, 0), 0xFFFF);
        // Start-up clear plus one frame, both full screen
        assert_eq!(out.panel.windows, [Rect::screen(320, 320); 2]);
        assert_eq!(out.panel.finished, 2);
        assert!(out.panel.window_complete());
        assert_eq!(out.consumer.slabs_transmitted, 40);
    }

    #[test]
    fn test_lines_below_first_slabs_reach_panel() {
        // Sixty-four slabs of five rows; the line sits in slab 40
        let layout = SlabLayout::new(320, 320, 5).unwrap();
        let mut list = DrawList::new();
        list.add_line(ScreenPoint::new(0, 200), ScreenPoint::new(10, 200), 0xF800);

        let out = run_frames(layout, &[list], RecordingPanel::new(320, 320));

        assert_eq!(layout.slab_count(), 64);
        assert_eq!(out.slot0_slabs, [40]);
        let expected: std::vec::Vec<(i32, i32)> = (0..=10).map(|x| (x, 200)).collect();
        assert_eq!(out.panel.lit(), expected);
        assert_eq!(out.consumer.slabs_transmitted, 64);
        assert!(out.panel.window_complete());
    }

    #[test]
    fn test_frames_transmitted_in_order() {
        let layout = SlabLayout::new(64, 64, 8).unwrap();
        let frames: std::vec::Vec<DrawList> = (0..6)
            .map(|i| {
                let mut list = DrawList::new();
                list.add_line(ScreenPoint::new(0, i * 10), ScreenPoint::new(63, i * 10), 0x07E0);
                list
            })
            .collect();

        let out = run_frames(layout, &frames, RecordingPanel::new(64, 64));

        assert_eq!(out.served, [0, 1, 2, 3, 4, 5]);
        assert_eq!(out.producer.frames_submitted, 6);
        assert_eq!(out.producer.frames_completed, 6);
        assert_eq!(out.producer.in_flight(), 0);
        assert!(out.producer.producer_stalls >= 1);
        assert_eq!(out.consumer.frames_transmitted, 6);
        assert_eq!(out.consumer.last_frame_id, Some(5));
        // Only the last frame's line remains on screen
        assert_eq!(out.panel.lit().len(), 64);
        assert_eq!(out.panel.pixel(0, 50), 0x07E0);
        assert_eq!(out.panel.pixel(0, 40), 0);
    }

    #[test]
    fn test_bus_failure_still_releases_slots() {
        let layout = SlabLayout::new(64, 64, 8).unwrap();
        let frames: std::vec::Vec<DrawList> = (0..4).map(|_| DrawList::new()).collect();
        let mut panel = RecordingPanel::new(64, 64);
        // Start-up clear takes 8 writes; every frame after that fails
        panel.fail_writes_after = Some(8);

        let out = run_frames(layout, &frames, panel);

        assert!(out.served.is_empty());
        assert_eq!(out.consumer.bus_errors, 4);
        assert_eq!(out.producer.frames_completed, 4);
    }

    #[test]
    fn test_lifecycle_misuse_rejected() {
        let layout = SlabLayout::new(64, 64, 8).unwrap();
        let mut slots = [FrameSlot::new(), FrameSlot::new()];
        let channels = PipelineChannels::<NoopRawMutex>::new();
        let [s0, s1] = &mut slots;
        let mut producer = FrameProducer::new(&channels, [s0, s1], layout);
        let list = DrawList::new();

        block_on(async {
            assert_eq!(producer.draw_lines(&list).await, Err(DisplayError::Lifecycle));
            assert_eq!(producer.end_frame().await, Err(DisplayError::Lifecycle));

            producer.begin_frame().await.unwrap();
            assert_eq!(producer.begin_frame().await, Err(DisplayError::Lifecycle));
            assert_eq!(producer.end_frame().await, Err(DisplayError::Lifecycle));
            producer.draw_lines(&list).await.unwrap();
            assert_eq!(producer.draw_lines(&list).await, Err(DisplayError::Lifecycle));
            // Slot 1 is still Free, so the first submission does not block
            producer.end_frame().await.unwrap();
        });

        assert_eq!(producer.phase(), FramePhase::Idle);
        assert_eq!(producer.stats().frames_submitted, 1);
        assert_eq!(producer.width(), 64);
        assert_eq!(producer.height(), 64);
    }

    fn arb_frame() -> impl Strategy<Value = DrawList> {
        prop::collection::vec(
            (-20i16..84, -20i16..84, -20i16..84, -20i16..84, 1u16..=u16::MAX),
            0..24,
        )
        .prop_map(|lines| {
            let mut list = DrawList::new();
            for (x0, y0, x1, y1, color) in lines {
                list.push(Line2D::new(x0, y0, x1, y1, color));
            }
            list
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_pipeline_order_and_content(
            frames in prop::collection::vec(arb_frame(), 1..8),
            slab_height in 1u16..=16,
        ) {
            let layout = SlabLayout::new(64, 64, slab_height).unwrap();
            let out = run_frames(layout, &frames, RecordingPanel::new(64, 64));

            let expected_ids: std::vec::Vec<u32> = (0..frames.len() as u32).collect();
            prop_assert_eq!(&out.served, &expected_ids);
            prop_assert_eq!(out.producer.in_flight(), 0);
            prop_assert_eq!(out.panel.finished as usize, frames.len() + 1);

            let last = frames.last().unwrap();
            let want = reference(64, 64, last);
            prop_assert_eq!(&out.panel.framebuffer, &want.framebuffer);
        }
    }
}
