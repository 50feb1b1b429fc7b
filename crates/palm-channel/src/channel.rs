//! The perception channel - worker thread, pipelining, and delivery
//!
//! The worker runs the opaque [`Inference`] oracle synchronously on its own
//! thread. Submission is fire-and-forget through a single pending slot:
//! bounded latency is preferred over completeness, so a slow perception
//! cycle causes the oldest unprocessed frame to be dropped. Samples below
//! the confidence threshold are suppressed at the source.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use palm_core::{PerceptionSample, PipelineConfig, PipelineError, PipelineResult, SampleSeq};
use parking_lot::{Condvar, Mutex};

use crate::{Frame, FramePool};

/// Raw inference output in perception space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawLandmarks {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

/// The opaque perception oracle, synchronous within the worker thread.
///
/// `None` means no hand was found in the frame.
pub trait Inference: Send + 'static {
    fn infer(&mut self, frame: &Frame) -> Option<RawLandmarks>;
}

impl<F> Inference for F
where
    F: FnMut(&Frame) -> Option<RawLandmarks> + Send + 'static,
{
    fn infer(&mut self, frame: &Frame) -> Option<RawLandmarks> {
        self(frame)
    }
}

/// Delivery boundary for produced samples, invoked on the worker thread.
pub trait SampleSink: Send + Sync + 'static {
    fn deliver(&self, sample: PerceptionSample);
}

impl<F> SampleSink for F
where
    F: Fn(PerceptionSample) + Send + Sync + 'static,
{
    fn deliver(&self, sample: PerceptionSample) {
        self(sample)
    }
}

/// Adapt an mpsc sender into a sink; the engine drains the receiving end
/// at the start of each tick.
pub fn sender_sink(tx: mpsc::Sender<PerceptionSample>) -> impl SampleSink {
    let tx = Mutex::new(tx);
    move |sample: PerceptionSample| {
        let _ = tx.lock().send(sample);
    }
}

/// Channel throughput counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Frames accepted into the pending slot.
    pub submitted: u64,
    /// Frames the worker ran inference on.
    pub processed: u64,
    /// Frames dropped because the worker was still busy.
    pub dropped_frames: u64,
    /// Samples suppressed below the confidence threshold.
    pub suppressed: u64,
}

struct Slot {
    pending: Option<Frame>,
    closed: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    available: Condvar,
    worker_alive: AtomicBool,
    next_seq: AtomicU64,
    submitted: AtomicU64,
    processed: AtomicU64,
    dropped_frames: AtomicU64,
    suppressed: AtomicU64,
}

/// The channel owning the perception worker.
///
/// Dropping the channel closes it; all teardown is synchronous.
pub struct PerceptionChannel {
    shared: Arc<Shared>,
    sink: Arc<dyn SampleSink>,
    pool: Arc<FramePool>,
    confidence_threshold: f32,
    worker: Option<JoinHandle<()>>,
}

impl PerceptionChannel {
    /// Start the worker thread and return the submitting handle.
    pub fn spawn<I, S>(
        inference: I,
        sink: S,
        pool: Arc<FramePool>,
        config: &PipelineConfig,
    ) -> Self
    where
        I: Inference,
        S: SampleSink,
    {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                pending: None,
                closed: false,
            }),
            available: Condvar::new(),
            worker_alive: AtomicBool::new(true),
            next_seq: AtomicU64::new(0),
            submitted: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            dropped_frames: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
        });
        let sink: Arc<dyn SampleSink> = Arc::new(sink);

        let worker = spawn_worker(
            Arc::clone(&shared),
            Arc::clone(&sink),
            Arc::clone(&pool),
            config.confidence_threshold,
            inference,
        );

        PerceptionChannel {
            shared,
            sink,
            pool,
            confidence_threshold: config.confidence_threshold,
            worker: Some(worker),
        }
    }

    /// Submit a captured frame, transferring ownership to the channel.
    ///
    /// Fire-and-forget: when the worker has not yet consumed the previous
    /// frame it is dropped and recycled. A closed channel or a lost worker
    /// makes this a silent no-op (the buffer still returns to the pool).
    pub fn submit_frame(&self, frame: Frame) {
        let displaced = {
            let mut slot = self.shared.slot.lock();
            if slot.closed || !self.shared.worker_alive.load(Ordering::Acquire) {
                drop(slot);
                self.pool.recycle(frame.into_pixels());
                return;
            }
            let displaced = slot.pending.take();
            slot.pending = Some(frame);
            displaced
        };

        if let Some(old) = displaced {
            self.shared.dropped_frames.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("perception behind; dropped oldest unprocessed frame");
            self.pool.recycle(old.into_pixels());
        }
        self.shared.submitted.fetch_add(1, Ordering::Relaxed);
        self.shared.available.notify_one();
    }

    /// Health of the perception context.
    ///
    /// `PerceptionUnavailable` once the worker is lost; the channel rejects
    /// frames until [`restart`](Self::restart).
    pub fn status(&self) -> PipelineResult<()> {
        if self.shared.slot.lock().closed {
            return Err(PipelineError::ChannelClosed);
        }
        if !self.shared.worker_alive.load(Ordering::Acquire) {
            return Err(PipelineError::PerceptionUnavailable);
        }
        Ok(())
    }

    /// Restart the worker after it was lost. Sequence numbers continue
    /// monotonically across restarts.
    pub fn restart<I: Inference>(&mut self, inference: I) -> PipelineResult<()> {
        if self.shared.slot.lock().closed {
            return Err(PipelineError::ChannelClosed);
        }
        if self.shared.worker_alive.load(Ordering::Acquire) {
            return Ok(());
        }

        if let Some(old) = self.worker.take() {
            let _ = old.join();
        }
        self.shared.worker_alive.store(true, Ordering::Release);
        self.worker = Some(spawn_worker(
            Arc::clone(&self.shared),
            Arc::clone(&self.sink),
            Arc::clone(&self.pool),
            self.confidence_threshold,
            inference,
        ));
        Ok(())
    }

    /// Close the channel and join the worker. Idempotent; in-flight
    /// perception work finishing after the close is discarded.
    pub fn close(&mut self) {
        let pending = {
            let mut slot = self.shared.slot.lock();
            if slot.closed {
                None
            } else {
                slot.closed = true;
                slot.pending.take()
            }
        };
        if let Some(frame) = pending {
            self.pool.recycle(frame.into_pixels());
        }
        self.shared.available.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.slot.lock().closed
    }

    /// Snapshot of the throughput counters.
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            submitted: self.shared.submitted.load(Ordering::Relaxed),
            processed: self.shared.processed.load(Ordering::Relaxed),
            dropped_frames: self.shared.dropped_frames.load(Ordering::Relaxed),
            suppressed: self.shared.suppressed.load(Ordering::Relaxed),
        }
    }
}

impl Drop for PerceptionChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_worker(
    shared: Arc<Shared>,
    sink: Arc<dyn SampleSink>,
    pool: Arc<FramePool>,
    confidence_threshold: f32,
    mut inference: impl Inference,
) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            let frame = {
                let mut slot = shared.slot.lock();
                while slot.pending.is_none() && !slot.closed {
                    shared.available.wait(&mut slot);
                }
                if slot.closed {
                    break;
                }
                match slot.pending.take() {
                    Some(frame) => frame,
                    None => continue,
                }
            };

            let captured_at = frame.captured_at();
            let outcome = catch_unwind(AssertUnwindSafe(|| inference.infer(&frame)));
            pool.recycle(frame.into_pixels());

            let landmarks = match outcome {
                Ok(landmarks) => landmarks,
                Err(_) => {
                    tracing::warn!("perception inference panicked; channel degraded until restart");
                    break;
                }
            };
            shared.processed.fetch_add(1, Ordering::Relaxed);

            let Some(lm) = landmarks else { continue };
            if lm.confidence < confidence_threshold {
                shared.suppressed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    confidence = lm.confidence,
                    "sample suppressed below confidence threshold"
                );
                continue;
            }

            // A close that raced this inference wins: discard the result.
            if shared.slot.lock().closed {
                break;
            }
            let seq = SampleSeq::new(shared.next_seq.fetch_add(1, Ordering::Relaxed) + 1);
            sink.deliver(PerceptionSample::new(
                lm.x,
                lm.y,
                lm.confidence,
                captured_at,
                seq,
            ));
        }
        shared.worker_alive.store(false, Ordering::Release);
    })
}
