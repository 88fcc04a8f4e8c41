// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;
use std::time::Instant;

use tile_accum_common::pixel::PixelData;
use tile_accum_common::sample::{Sample, SampleState};

use crate::options::{AccumulationParams, AccumulatorOptions, CompletionPolicy};
use crate::overlapped::OverlappedAccumulator;
use crate::resize::resample;
use crate::sink::{OutputImage, OutputSink};
use crate::{Error, Result};

/// What happened to a submitted sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The sample was the whole frame and was passed to the sink as is.
    Forwarded,
    /// The sample was added to the frame, which is still incomplete.
    Accumulated,
    /// The sample completed the frame, which was emitted to the sink. The accumulator is
    /// ready for the next frame.
    Completed,
}

/// Accumulates the samples of one frame at a time and emits the result.
///
/// Submission is sequential (`&mut self`); see [`AccumulatorPool`](crate::AccumulatorPool)
/// for sharing accumulators between threads.
pub struct TileAccumulator {
    image: OverlappedAccumulator,
    sink: Arc<dyn OutputSink>,
    options: AccumulatorOptions,
    received: u64,
    expected: u64,
}

impl std::fmt::Debug for TileAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileAccumulator")
            .field("image", &self.image)
            .field("options", &self.options)
            .field("received", &self.received)
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}

impl TileAccumulator {
    /// Create an idle accumulator emitting to `sink`.
    pub fn new(options: AccumulatorOptions, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            image: OverlappedAccumulator::new(),
            sink,
            options,
            received: 0,
            expected: 0,
        }
    }

    /// The options this accumulator was created with.
    pub fn options(&self) -> &AccumulatorOptions {
        &self.options
    }

    /// The weighted buffer of the frame in progress.
    pub fn image(&self) -> &OverlappedAccumulator {
        &self.image
    }

    /// The number of samples accumulated into the current frame.
    pub fn samples_received(&self) -> u64 {
        self.received
    }

    /// Whether no frame is in progress.
    pub fn is_idle(&self) -> bool {
        !self.image.is_initialized()
    }

    /// Add a sample to the frame in progress.
    ///
    /// A sample that makes up a whole frame on its own is forwarded to
    /// [`OutputSink::on_complete_pass`] untouched. Otherwise the sample is resampled to its
    /// padded tile size if needed and accumulated; when the frame is complete according to
    /// the [`CompletionPolicy`] it is normalised, emitted in the format of `sample` and the
    /// accumulator is reset.
    ///
    /// A rejected sample leaves the accumulator untouched.
    pub fn submit_sample(
        &mut self,
        sample: Sample,
        params: &AccumulationParams,
    ) -> Result<SubmitOutcome> {
        check_well_formed(&sample.pixels, params)?;
        sample.state.validate()?;

        let Sample { pixels, state } = sample;

        let frame_size = state.accumulator_size();
        if self.image.is_initialized() {
            if self.image.plane_size() != frame_size {
                return Err(Error::InconsistentGeometry {
                    expected: self.image.plane_size(),
                    actual: frame_size,
                });
            }
            // Samples are decoded with the gamma the whole frame is re-encoded with.
            if self.image.gamma() != state.accumulation_gamma {
                return Err(Error::InconsistentGamma {
                    expected: self.image.gamma(),
                    actual: state.accumulation_gamma,
                });
            }
        }

        if params.write_samples {
            self.sink.on_single_sample(OutputImage {
                pixels: pixels.clone(),
                state: state.clone(),
            });
        }

        if state.is_single_sample_frame() {
            log::debug!(
                "Forwarding single sample frame {} of pass `{}`",
                state.frame_number,
                state.pass
            );
            self.sink.on_complete_pass(OutputImage { pixels, state });
            return Ok(SubmitOutcome::Forwarded);
        }

        let format = pixels.format();
        let padded_size = state.overlap_padded_size();

        let start = Instant::now();
        let mut linear = pixels.to_linear();
        log::trace!(
            "Converting {format:?} sample took {:.3}ms",
            start.elapsed().as_secs_f64() * 1e3
        );

        if !state.is_overlap_padded_size_valid(pixels.size()) {
            log::warn!(
                "Resampling {:?} sample to the padded tile size {:?}",
                pixels.size(),
                padded_size
            );
            let start = Instant::now();
            linear = resample(
                &linear,
                pixels.size(),
                padded_size,
                self.options.resize_filter,
            )
            .ok_or(Error::EmptySample {
                width: pixels.width(),
                height: pixels.height(),
                format,
            })?;
            log::trace!(
                "Resizing sample took {:.3}ms",
                start.elapsed().as_secs_f64() * 1e3
            );
        }

        if !self.image.is_initialized() {
            log::debug!(
                "Allocating {:?} accumulation buffer with {} channels for frame {} of pass `{}`",
                frame_size,
                params.num_channels(),
                state.frame_number,
                state.pass
            );
            self.image.init_memory(frame_size, params.num_channels());
            self.image.set_gamma(state.accumulation_gamma);
            self.expected = state.samples_per_frame();
            self.received = 0;
        }

        let (weight_x, weight_y) = state.weight_functions();
        let start = Instant::now();
        self.image.accumulate(
            &linear,
            padded_size,
            state.overlapped_offset(),
            state.overlapped_subpixel_shift(),
            &weight_x,
            &weight_y,
        );
        self.received += 1;
        log::trace!(
            "Accumulating tile {:?} took {:.3}ms",
            state.tile_index,
            start.elapsed().as_secs_f64() * 1e3
        );

        if !self.is_frame_complete(&state) {
            return Ok(SubmitOutcome::Accumulated);
        }

        let start = Instant::now();
        let output = self.image.fetch(format);
        log::trace!(
            "Fetching frame took {:.3}ms",
            start.elapsed().as_secs_f64() * 1e3
        );
        log::debug!(
            "Completed frame {} of pass `{}` from {} samples",
            state.frame_number,
            state.pass,
            self.received
        );
        self.sink.on_complete_pass(OutputImage {
            pixels: output,
            state,
        });
        self.reset();
        Ok(SubmitOutcome::Completed)
    }

    fn is_frame_complete(&self, state: &SampleState) -> bool {
        match self.options.completion {
            CompletionPolicy::AllSamples => self.received >= self.expected,
            CompletionPolicy::LastSample => {
                let last = state.is_last_tile()
                    && state.is_last_temporal_sample()
                    && state.is_last_spatial_sample();
                if last && self.received < self.expected {
                    log::warn!(
                        "Completing frame {} with {} of {} samples",
                        state.frame_number,
                        self.received,
                        self.expected
                    );
                }
                last
            }
        }
    }

    /// Drop the frame in progress and release the buffer.
    pub fn reset(&mut self) {
        self.image.reset();
        self.received = 0;
        self.expected = 0;
    }
}

fn check_well_formed(pixels: &PixelData, params: &AccumulationParams) -> Result<()> {
    let format = pixels.format();
    if pixels.is_well_formed() {
        if pixels.size().is_empty() {
            log::error!(
                "Pixel data is empty: {}x{} pixels, nothing to accumulate",
                pixels.width(),
                pixels.height()
            );
            return Err(Error::EmptySample {
                width: pixels.width(),
                height: pixels.height(),
                format,
            });
        }
        return Ok(());
    }
    log::error!(
        "Pixel data is malformed: {}x{} pixels, {} bits per channel, {} accumulated channels; \
         expected {} bytes, got {}",
        pixels.width(),
        pixels.height(),
        format.bit_depth(),
        params.num_channels(),
        pixels.expected_size_in_bytes(),
        pixels.raw_size_in_bytes()
    );
    Err(Error::MalformedSample {
        width: pixels.width(),
        height: pixels.height(),
        format,
        expected: pixels.expected_size_in_bytes(),
        actual: pixels.raw_size_in_bytes(),
    })
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::Receiver;
    use tile_accum_common::geom::{Size, UVec2};
    use tile_accum_common::pixel::{PixelBuffer, PixelFormat};
    use tile_accum_common::sample::PassIdentifier;

    use super::*;
    use crate::sink::{ChannelSink, SinkEvent};

    fn accumulator(completion: CompletionPolicy) -> (TileAccumulator, Receiver<SinkEvent>) {
        let (sink, events) = ChannelSink::new();
        let options = AccumulatorOptions {
            completion,
            ..AccumulatorOptions::default()
        };
        (TileAccumulator::new(options, Arc::new(sink)), events)
    }

    /// One of two temporal samples of an untiled 4x2 frame, filled with `value`.
    fn temporal_sample(index: u32, value: f32) -> Sample {
        let size = Size::new(4, 2);
        let state = SampleState {
            temporal_sample_index: index,
            temporal_sample_count: 2,
            ..SampleState::new(7, PassIdentifier::default(), size)
        };
        let pixels = PixelData::from_linear(
            size,
            PixelFormat::Rgba32F,
            &vec![[value, value, value, 1.0]; size.area()],
        );
        Sample::new(pixels, state)
    }

    #[test]
    fn malformed_sample_is_rejected_without_side_effects() {
        let (mut acc, events) = accumulator(CompletionPolicy::AllSamples);
        let mut sample = temporal_sample(0, 0.5);
        sample.pixels = PixelData::new(
            sample.pixels.size(),
            PixelBuffer::Rgba32F(vec![[0.0; 4]; 7]),
        );

        let params = AccumulationParams {
            write_samples: true,
            ..AccumulationParams::default()
        };
        let err = acc.submit_sample(sample, &params).unwrap_err();
        assert_eq!(
            err,
            Error::MalformedSample {
                width: 4,
                height: 2,
                format: PixelFormat::Rgba32F,
                expected: 128,
                actual: 112,
            }
        );
        assert!(acc.is_idle());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn invalid_metadata_is_rejected() {
        let (mut acc, _events) = accumulator(CompletionPolicy::AllSamples);
        let mut sample = temporal_sample(0, 0.5);
        sample.state.tile_count = UVec2::new(0, 1);
        let err = acc
            .submit_sample(sample, &AccumulationParams::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSampleState(_)));
    }

    #[test]
    fn overflowing_frame_is_rejected() {
        let (mut acc, events) = accumulator(CompletionPolicy::AllSamples);
        let size = Size::new(65536, 1);
        let state = SampleState {
            tile_count: UVec2::new(65536, 1),
            ..SampleState::new(0, PassIdentifier::default(), size)
        };
        let sample = Sample::new(PixelData::zeroed(size, PixelFormat::Rgba8), state);

        let err = acc
            .submit_sample(sample, &AccumulationParams::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSampleState(_)), "{err}");
        assert!(acc.is_idle());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn single_sample_frame_is_forwarded() {
        let (mut acc, events) = accumulator(CompletionPolicy::AllSamples);
        let size = Size::new(3, 3);
        let sample = Sample::new(
            PixelData::zeroed(size, PixelFormat::Rgba8),
            SampleState::new(0, PassIdentifier::default(), size),
        );
        let expected = sample.clone();

        let outcome = acc
            .submit_sample(sample, &AccumulationParams::default())
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::Forwarded);
        assert!(acc.is_idle());
        assert_eq!(
            events.try_recv(),
            Ok(SinkEvent::CompletePass(OutputImage {
                pixels: expected.pixels,
                state: expected.state,
            }))
        );
    }

    #[test]
    fn temporal_samples_are_averaged() {
        let (mut acc, events) = accumulator(CompletionPolicy::AllSamples);
        let params = AccumulationParams::default();

        assert_eq!(
            acc.submit_sample(temporal_sample(1, 0.75), &params).unwrap(),
            SubmitOutcome::Accumulated
        );
        assert!(events.try_recv().is_err());
        assert_eq!(acc.samples_received(), 1);
        assert_eq!(
            acc.submit_sample(temporal_sample(0, 0.25), &params).unwrap(),
            SubmitOutcome::Completed
        );
        assert!(acc.is_idle());

        let Ok(SinkEvent::CompletePass(image)) = events.try_recv() else {
            panic!("expected a completed frame");
        };
        assert_eq!(image.state.temporal_sample_index, 0);
        assert_eq!(image.pixels.to_linear(), vec![[0.5, 0.5, 0.5, 1.0]; 8]);
    }

    #[test]
    fn write_samples_emits_copies() {
        let (mut acc, events) = accumulator(CompletionPolicy::AllSamples);
        let params = AccumulationParams {
            write_samples: true,
            ..AccumulationParams::default()
        };
        let sample = temporal_sample(0, 0.25);
        let copy = OutputImage {
            pixels: sample.pixels.clone(),
            state: sample.state.clone(),
        };
        acc.submit_sample(sample, &params).unwrap();
        assert_eq!(events.try_recv(), Ok(SinkEvent::SingleSample(copy)));
    }

    #[test]
    fn last_sample_policy_completes_positionally() {
        let (mut acc, events) = accumulator(CompletionPolicy::LastSample);
        let params = AccumulationParams::default();

        // The last temporal sample arrives first and completes the frame on its own.
        assert_eq!(
            acc.submit_sample(temporal_sample(1, 0.75), &params).unwrap(),
            SubmitOutcome::Completed
        );
        let Ok(SinkEvent::CompletePass(image)) = events.try_recv() else {
            panic!("expected a completed frame");
        };
        assert_eq!(image.pixels.to_linear(), vec![[0.75, 0.75, 0.75, 1.0]; 8]);
    }

    #[test]
    fn mismatched_frame_size_is_rejected() {
        let (mut acc, _events) = accumulator(CompletionPolicy::AllSamples);
        let params = AccumulationParams::default();
        acc.submit_sample(temporal_sample(0, 0.5), &params).unwrap();

        let mut other = temporal_sample(1, 0.5);
        other.state.tile_size = Size::new(2, 2);
        other.pixels = PixelData::zeroed(Size::new(2, 2), PixelFormat::Rgba32F);
        assert_eq!(
            acc.submit_sample(other, &params),
            Err(Error::InconsistentGeometry {
                expected: Size::new(4, 2),
                actual: Size::new(2, 2),
            })
        );
        assert_eq!(acc.samples_received(), 1);
    }

    #[test]
    fn opaque_output_without_alpha() {
        let (mut acc, events) = accumulator(CompletionPolicy::AllSamples);
        let params = AccumulationParams {
            accumulate_alpha: false,
            ..AccumulationParams::default()
        };
        let mut first = temporal_sample(0, 0.5);
        first.pixels = PixelData::from_linear(
            Size::new(4, 2),
            PixelFormat::Rgba16F,
            &[[0.5, 0.5, 0.5, 0.0]; 8],
        );
        acc.submit_sample(first, &params).unwrap();
        acc.submit_sample(temporal_sample(1, 0.5), &params).unwrap();

        let Ok(SinkEvent::CompletePass(image)) = events.try_recv() else {
            panic!("expected a completed frame");
        };
        // The driving sample was full float.
        assert_eq!(image.pixels.format(), PixelFormat::Rgba32F);
        assert_eq!(image.pixels.to_linear(), vec![[0.5, 0.5, 0.5, 1.0]; 8]);
    }

    #[test]
    fn empty_sample_is_rejected() {
        let (mut acc, events) = accumulator(CompletionPolicy::AllSamples);
        let params = AccumulationParams::default();
        let mut empty = temporal_sample(0, 0.5);
        empty.pixels = PixelData::zeroed(Size::new(0, 0), PixelFormat::Rgba32F);

        assert_eq!(
            acc.submit_sample(empty, &params),
            Err(Error::EmptySample {
                width: 0,
                height: 0,
                format: PixelFormat::Rgba32F,
            })
        );
        assert!(acc.is_idle());

        // A single-sample frame with no pixels is not forwarded either.
        let size = Size::new(0, 3);
        let forwarded = Sample::new(
            PixelData::zeroed(size, PixelFormat::Rgba8),
            SampleState::new(0, PassIdentifier::default(), Size::new(4, 3)),
        );
        assert!(matches!(
            acc.submit_sample(forwarded, &params),
            Err(Error::EmptySample { .. })
        ));
        assert!(events.try_recv().is_err());

        // The frame is still made of the remaining samples only.
        acc.submit_sample(temporal_sample(0, 1.0), &params).unwrap();
        acc.submit_sample(temporal_sample(1, 1.0), &params).unwrap();
        let Ok(SinkEvent::CompletePass(image)) = events.try_recv() else {
            panic!("expected a completed frame");
        };
        assert_eq!(image.pixels.to_linear(), vec![[1.0; 4]; 8]);
    }

    #[test]
    fn mismatched_gamma_is_rejected() {
        let (mut acc, events) = accumulator(CompletionPolicy::AllSamples);
        let params = AccumulationParams::default();
        let with_gamma = |index, gamma| {
            let mut sample = temporal_sample(index, 0.5);
            sample.state.accumulation_gamma = gamma;
            sample
        };

        acc.submit_sample(with_gamma(0, 2.2), &params).unwrap();
        assert_eq!(
            acc.submit_sample(with_gamma(1, 1.0), &params),
            Err(Error::InconsistentGamma {
                expected: 2.2,
                actual: 1.0,
            })
        );
        assert_eq!(acc.samples_received(), 1);
        assert_eq!(acc.image().gamma(), 2.2);

        assert_eq!(
            acc.submit_sample(with_gamma(1, 2.2), &params),
            Ok(SubmitOutcome::Completed)
        );
        let Ok(SinkEvent::CompletePass(image)) = events.try_recv() else {
            panic!("expected a completed frame");
        };
        for p in image.pixels.to_linear() {
            assert!((p[0] - 0.5).abs() < 1e-5, "{p:?}");
        }
    }

    #[test]
    fn reset_is_idempotent() {
        let (mut acc, _events) = accumulator(CompletionPolicy::AllSamples);
        acc.submit_sample(temporal_sample(0, 0.5), &AccumulationParams::default())
            .unwrap();
        acc.reset();
        acc.reset();
        assert!(acc.is_idle());
        assert_eq!(acc.samples_received(), 0);
    }
}
