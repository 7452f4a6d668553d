//! Asynchronous read-ahead pipeline.
//!
//! One background worker per open disc fetches the requested hunk, runs it
//! through the frame decoder, and publishes the result into a single-slot
//! mailbox. The field-tick caller never blocks: [`Pipeline::request`] just
//! stamps a new generation and wakes the worker, and
//! [`Pipeline::try_take_result`] polls the mailbox.
//!
//! At most one request is serviced at a time. A new request supersedes a
//! stale in-flight one by generation number: the old job is allowed to finish
//! wastefully and its result is discarded on arrival, so no cancellation
//! plumbing reaches into the I/O layer. The worker owns the decoder context
//! for the life of the session and resets it whenever the requested hunk does
//! not directly follow the previous decode (jump or direction reversal).

use crate::error::PlayerError;
use laserdisc_avcodec::{AvDecoder, FrameBuffers};
use laserdisc_image::{DiscInfo, DiscSource};
use log::{error, trace, warn};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Spare buffer sets beyond the frame ring (one decoding, one in the
/// mailbox).
const SPARE_BUFFERS: usize = 2;

/// Outcome of polling the pipeline.
pub enum PipelineResult {
    /// The current request finished decoding.
    Ready {
        /// Hunk index the frame came from
        hunk: u32,
        /// Decoded buffers; return them via [`Pipeline::recycle`] after use
        buffers: FrameBuffers,
    },
    /// The current request is still in flight (or nothing was requested).
    Pending,
    /// The current request failed; the caller repeats the last good frame.
    Failed(PlayerError),
}

struct Shared {
    request: Mutex<Option<(u64, u32)>>,
    wake: Condvar,
    mailbox: Mutex<Option<(u64, u32, Result<FrameBuffers, PlayerError>)>>,
    free: Mutex<Vec<FrameBuffers>>,
    generation: AtomicU64,
    shutdown: AtomicBool,
}

/// Handle to the background fetch+decode worker.
pub struct Pipeline {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Spawn the worker for an open disc.
    pub fn new(source: Arc<dyn DiscSource>) -> Result<Self, PlayerError> {
        let (width, height, samples, channels) = frame_limits(source.info());
        let mut free = Vec::new();
        for _ in 0..SPARE_BUFFERS {
            free.push(FrameBuffers::with_limits(width, height, samples, channels)?);
        }
        let shared = Arc::new(Shared {
            request: Mutex::new(None),
            wake: Condvar::new(),
            mailbox: Mutex::new(None),
            free: Mutex::new(free),
            generation: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        });
        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("ld-readahead".into())
            .spawn(move || worker_loop(source, worker_shared))
            .map_err(|_| PlayerError::PipelineGone)?;
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Build one buffer set matching this disc's geometry.
    pub fn make_buffers(info: &DiscInfo) -> Result<FrameBuffers, PlayerError> {
        let (width, height, samples, channels) = frame_limits(info);
        Ok(FrameBuffers::with_limits(width, height, samples, channels)?)
    }

    /// Enqueue a fetch+decode for `hunk`, superseding any earlier request.
    ///
    /// Non-blocking; the result arrives via [`Pipeline::try_take_result`].
    pub fn request(&self, hunk: u32) {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *self.shared.request.lock() = Some((generation, hunk));
        self.shared.wake.notify_one();
        trace!("read-ahead request gen {generation} hunk {hunk}");
    }

    /// Poll for the current request's result.
    ///
    /// Results of superseded requests are recycled and reported as
    /// `Pending`, never delivered out of order.
    pub fn try_take_result(&self) -> PipelineResult {
        let mut mailbox = self.shared.mailbox.lock();
        match mailbox.take() {
            None => PipelineResult::Pending,
            Some((generation, hunk, outcome)) => {
                if generation != self.shared.generation.load(Ordering::Acquire) {
                    // Superseded while in flight; quietly reclaim.
                    if let Ok(buffers) = outcome {
                        self.shared.free.lock().push(buffers);
                    }
                    return PipelineResult::Pending;
                }
                match outcome {
                    Ok(buffers) => PipelineResult::Ready { hunk, buffers },
                    Err(err) => PipelineResult::Failed(err),
                }
            }
        }
    }

    /// Return a consumed buffer set to the free list.
    pub fn recycle(&self, buffers: FrameBuffers) {
        self.shared.free.lock().push(buffers);
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.wake.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Buffer limits for one frame of this disc: full geometry plus slack on the
/// per-frame sample count for rate rounding.
fn frame_limits(info: &DiscInfo) -> (usize, usize, usize, usize) {
    let fields = u64::from(info.fields_per_sec_x1m.max(1));
    let samples = (u64::from(info.sample_rate) * 2_000_000 / fields + 2) as usize;
    (
        usize::from(info.width),
        usize::from(info.height),
        samples.min(laserdisc_avcodec::MAX_SAMPLES),
        usize::from(info.channels),
    )
}

fn worker_loop(source: Arc<dyn DiscSource>, shared: Arc<Shared>) {
    let mut decoder = AvDecoder::new();
    let mut raw = vec![0u8; source.info().hunk_bytes as usize];
    let mut last_hunk: Option<u32> = None;

    loop {
        let (generation, hunk) = {
            let mut request = shared.request.lock();
            loop {
                if shared.shutdown.load(Ordering::Acquire) {
                    return;
                }
                if let Some(taken) = request.take() {
                    break taken;
                }
                shared.wake.wait(&mut request);
            }
        };

        // Non-sequential fetch: the delta context no longer matches.
        if last_hunk.map(|h| h.wrapping_add(1)) != Some(hunk) {
            trace!("read-ahead discontinuity at hunk {hunk}, resetting decoder");
            decoder.reset();
        }

        let mut buffers = match shared.free.lock().pop() {
            Some(buffers) => buffers,
            None => match Pipeline::make_buffers(source.info()) {
                Ok(buffers) => buffers,
                Err(err) => {
                    error!("read-ahead buffer allocation failed: {err}");
                    *shared.mailbox.lock() = Some((generation, hunk, Err(err)));
                    return;
                }
            },
        };

        let outcome = source
            .read_hunk(hunk, &mut raw)
            .map_err(PlayerError::from)
            .and_then(|_| {
                decoder
                    .decode(&raw, &mut buffers)
                    .map(|_| ())
                    .map_err(PlayerError::from)
            });

        let publish = match outcome {
            Ok(()) => {
                last_hunk = Some(hunk);
                Ok(buffers)
            }
            Err(err) => {
                // Context is suspect after a failed decode.
                last_hunk = None;
                shared.free.lock().push(buffers);
                warn!("read-ahead failed for hunk {hunk}: {err}");
                Err(err)
            }
        };

        let fatal = matches!(&publish, Err(err) if err.is_fatal());
        {
            let mut mailbox = shared.mailbox.lock();
            // Overwrite an unconsumed older result, reclaiming its buffers.
            if let Some((_, _, Ok(old))) = mailbox.take() {
                shared.free.lock().push(old);
            }
            *mailbox = Some((generation, hunk, publish));
        }
        if fatal {
            error!("read-ahead aborting after fatal error");
            return;
        }
    }
}
