// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A bounded pool of accumulators shared between the threads producing samples.
//!
//! Every accumulator holds a full frame worth of buffers, so only a handful exist. Each is
//! bound to one frame of one pass at a time; producers look up the instance for their
//! sample's frame and pass, waiting for an instance to become free when all are busy.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tile_accum_common::sample::{PassIdentifier, Sample};

use crate::accumulator::{SubmitOutcome, TileAccumulator};
use crate::options::{AccumulationParams, PoolOptions};
use crate::sink::OutputSink;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    frame_number: u64,
    pass: PassIdentifier,
}

impl Binding {
    fn matches(&self, frame_number: u64, pass: &PassIdentifier) -> bool {
        self.frame_number == frame_number && self.pass == *pass
    }
}

#[derive(Debug)]
struct PoolShared {
    /// One slot per instance, `None` when the instance is free.
    bindings: Mutex<Vec<Option<Binding>>>,
    available: Condvar,
}

impl PoolShared {
    fn bindings(&self) -> MutexGuard<'_, Vec<Option<Binding>>> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Find the instance bound to the key, or bind a free one.
    fn find_or_bind(
        &self,
        bindings: &mut [Option<Binding>],
        frame_number: u64,
        pass: &PassIdentifier,
    ) -> Option<usize> {
        let bound = bindings
            .iter()
            .position(|b| b.as_ref().is_some_and(|b| b.matches(frame_number, pass)));
        if bound.is_some() {
            return bound;
        }
        let free = bindings.iter().position(Option::is_none)?;
        log::debug!("Binding accumulator {free} to frame {frame_number} of pass `{pass}`");
        bindings[free] = Some(Binding {
            frame_number,
            pass: pass.clone(),
        });
        Some(free)
    }

    fn unbind(&self, index: usize) {
        let mut bindings = self.bindings();
        if let Some(binding) = bindings[index].take() {
            log::debug!(
                "Releasing accumulator {index} from frame {} of pass `{}`",
                binding.frame_number,
                binding.pass
            );
        }
        drop(bindings);
        self.available.notify_all();
    }
}

/// A fixed set of [`TileAccumulator`]s handed out by frame number and pass.
///
/// Samples of different frames or passes go to different instances and never wait on each
/// other. Samples of the same frame and pass share one instance and are accumulated one at
/// a time.
#[derive(Debug)]
pub struct AccumulatorPool {
    shared: Arc<PoolShared>,
    instances: Vec<Arc<AccumulatorInstance>>,
}

impl AccumulatorPool {
    /// Create a pool whose instances all emit to `sink`.
    pub fn new(options: PoolOptions, sink: Arc<dyn OutputSink>) -> Self {
        let count = options.instance_count.get();
        let shared = Arc::new(PoolShared {
            bindings: Mutex::new(vec![None; count]),
            available: Condvar::new(),
        });
        let instances = (0..count)
            .map(|index| {
                Arc::new(AccumulatorInstance {
                    index,
                    accumulator: Mutex::new(TileAccumulator::new(
                        options.accumulator,
                        sink.clone(),
                    )),
                    pool: shared.clone(),
                })
            })
            .collect();
        Self { shared, instances }
    }

    /// The number of instances in the pool.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Get the instance accumulating `frame_number` of `pass`.
    ///
    /// If no instance is bound to that frame yet a free one is bound. If every instance is
    /// busy with another frame, this blocks until one is released.
    pub fn block_and_get(
        &self,
        frame_number: u64,
        pass: &PassIdentifier,
    ) -> Arc<AccumulatorInstance> {
        let mut bindings = self.shared.bindings();
        loop {
            if let Some(index) = self.shared.find_or_bind(&mut bindings, frame_number, pass) {
                return self.instances[index].clone();
            }
            log::trace!("All accumulators are busy, waiting for frame {frame_number}");
            bindings = self
                .shared
                .available
                .wait(bindings)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`block_and_get`](Self::block_and_get), but returns `None` instead of waiting.
    pub fn try_get(
        &self,
        frame_number: u64,
        pass: &PassIdentifier,
    ) -> Option<Arc<AccumulatorInstance>> {
        let mut bindings = self.shared.bindings();
        let index = self.shared.find_or_bind(&mut bindings, frame_number, pass)?;
        Some(self.instances[index].clone())
    }

    /// Submit a sample to the instance for its frame and pass, waiting for one if needed.
    ///
    /// If the instance is released between lookup and submission, the sample goes to a
    /// freshly bound instance instead.
    pub fn submit(&self, sample: Sample, params: &AccumulationParams) -> Result<SubmitOutcome> {
        let mut sample = sample;
        loop {
            let instance = self.block_and_get(sample.state.frame_number, &sample.state.pass);
            match instance.submit_if_bound(sample, params) {
                Ok(result) => return result,
                Err(unsubmitted) => sample = *unsubmitted,
            }
        }
    }
}

/// One accumulator of an [`AccumulatorPool`].
#[derive(Debug)]
pub struct AccumulatorInstance {
    index: usize,
    accumulator: Mutex<TileAccumulator>,
    pool: Arc<PoolShared>,
}

impl AccumulatorInstance {
    fn accumulator(&self) -> MutexGuard<'_, TileAccumulator> {
        self.accumulator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The frame number and pass this instance is accumulating, if any.
    pub fn binding(&self) -> Option<(u64, PassIdentifier)> {
        self.pool.bindings()[self.index]
            .as_ref()
            .map(|b| (b.frame_number, b.pass.clone()))
    }

    fn is_bound_to(&self, sample: &Sample) -> bool {
        self.pool.bindings()[self.index]
            .as_ref()
            .is_some_and(|b| b.matches(sample.state.frame_number, &sample.state.pass))
    }

    /// Submit a sample of the frame this instance is bound to.
    ///
    /// When the sample completes (or on its own makes up) the frame, the instance releases
    /// itself back to the pool. So does a rejected sample while no frame is in progress.
    /// A rejected sample of a frame in progress keeps the binding; call
    /// [`release`](Self::release) to abandon that frame.
    pub fn submit_sample(
        &self,
        sample: Sample,
        params: &AccumulationParams,
    ) -> Result<SubmitOutcome> {
        self.submit_if_bound(sample, params).unwrap_or_else(|sample| {
            Err(Error::InstanceNotBound {
                frame_number: sample.state.frame_number,
                pass: sample.state.pass,
            })
        })
    }

    /// Hands `sample` back if the instance is not bound to its frame and pass.
    fn submit_if_bound(
        &self,
        sample: Sample,
        params: &AccumulationParams,
    ) -> Result<Result<SubmitOutcome>, Box<Sample>> {
        // Only holders of the accumulator lock unbind, so the binding is stable from here on.
        let mut accumulator = self.accumulator();
        if !self.is_bound_to(&sample) {
            return Err(Box::new(sample));
        }

        let result = accumulator.submit_sample(sample, params);
        let finished = !matches!(result, Ok(SubmitOutcome::Accumulated));
        if finished && accumulator.is_idle() {
            drop(accumulator);
            self.pool.unbind(self.index);
        }
        Ok(result)
    }

    /// Abandon the frame in progress and return the instance to the pool.
    pub fn release(&self) {
        let mut accumulator = self.accumulator();
        accumulator.reset();
        drop(accumulator);
        self.pool.unbind(self.index);
    }
}

static_assertions::assert_impl_all!(AccumulatorPool: Send, Sync);
static_assertions::assert_impl_all!(AccumulatorInstance: Send, Sync);
