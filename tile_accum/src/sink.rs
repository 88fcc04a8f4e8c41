// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Where finished images go.

use crossbeam_channel::{Receiver, Sender};
use tile_accum_common::pixel::PixelData;
use tile_accum_common::sample::SampleState;

/// An image leaving the accumulator, tagged with the metadata of the sample that produced
/// it.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputImage {
    /// The image.
    pub pixels: PixelData,
    /// For a completed frame, the metadata of the sample that completed it.
    pub state: SampleState,
}

/// Receives images from a [`TileAccumulator`](crate::TileAccumulator).
///
/// Both callbacks are invoked on the thread that submitted the sample, while that
/// accumulator is locked, and must not block for long. Delivery is fire-and-forget: the
/// accumulator does not learn whether the image was consumed.
pub trait OutputSink: Send + Sync {
    /// A copy of an individual sample, sent when
    /// [`AccumulationParams::write_samples`](crate::AccumulationParams::write_samples) is set.
    fn on_single_sample(&self, image: OutputImage);

    /// A finished frame.
    fn on_complete_pass(&self, image: OutputImage);
}

/// An event delivered by a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// See [`OutputSink::on_single_sample`].
    SingleSample(OutputImage),
    /// See [`OutputSink::on_complete_pass`].
    CompletePass(OutputImage),
}

/// An [`OutputSink`] that forwards every image over an unbounded channel, so a dedicated
/// thread can write them out.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<SinkEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn new() -> (Self, Receiver<SinkEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }

    fn send(&self, event: SinkEvent) {
        if let Err(err) = self.sender.send(event) {
            let frame = match &err.0 {
                SinkEvent::SingleSample(image) | SinkEvent::CompletePass(image) => {
                    image.state.frame_number
                }
            };
            log::warn!("Dropping output for frame {frame}, the receiver has disconnected");
        }
    }
}

impl OutputSink for ChannelSink {
    fn on_single_sample(&self, image: OutputImage) {
        self.send(SinkEvent::SingleSample(image));
    }

    fn on_complete_pass(&self, image: OutputImage) {
        self.send(SinkEvent::CompletePass(image));
    }
}

static_assertions::assert_impl_all!(ChannelSink: Send, Sync);

#[cfg(test)]
mod tests {
    use tile_accum_common::geom::Size;
    use tile_accum_common::pixel::PixelFormat;
    use tile_accum_common::sample::PassIdentifier;

    use super::*;

    fn image(frame: u64) -> OutputImage {
        let size = Size::new(1, 1);
        OutputImage {
            pixels: PixelData::zeroed(size, PixelFormat::Rgba8),
            state: SampleState::new(frame, PassIdentifier::default(), size),
        }
    }

    #[test]
    fn events_arrive_in_order() {
        let (sink, events) = ChannelSink::new();
        sink.on_single_sample(image(1));
        sink.on_complete_pass(image(2));

        assert_eq!(events.try_recv(), Ok(SinkEvent::SingleSample(image(1))));
        assert_eq!(events.try_recv(), Ok(SinkEvent::CompletePass(image(2))));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn disconnected_receiver_is_ignored() {
        let (sink, events) = ChannelSink::new();
        drop(events);
        sink.on_complete_pass(image(0));
    }
}
