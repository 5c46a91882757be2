//! Native frame driver built on tokio.
//!
//! Outside a browser there is no `requestAnimationFrame`.  This module
//! provides the equivalent for native hosts:
//!
//! - [`TokioFrameScheduler`] implements [`FrameScheduler`] by simply noting
//!   that a frame was requested.
//! - [`drive_frames`] runs a fixed-period `tokio::time::interval` and, on each
//!   period where a frame is pending, locks the shared engine and ticks it.
//!
//! The loop ends when the shutdown flag is set or when the engine stops
//! requesting frames (i.e. after `stop()`).
//!
//! This is library API for native hosts that embed the engine.  The
//! `arbiter-sim` binary does not use it: scenario steps are keyed to virtual
//! frame times, so `--realtime` paces [`Replay::advance`] on its own interval
//! instead of letting the engine's host clock drive ticks.
//!
//! [`Replay::advance`]: crate::infrastructure::scenario::Replay::advance
//!
//! # Sharing the engine (for beginners)
//!
//! Other tasks may also need the engine, so it is shared as
//! `Arc<tokio::sync::Mutex<_>>`.  Awaiting a tokio mutex yields to the
//! runtime instead of blocking a worker thread.  The lock is held only for
//! the duration of one synchronous `tick`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::application::arbitrate::ArbitrationEngine;
use crate::application::ports::{FrameHandle, FrameScheduler};

/// An engine shared between tasks.
pub type SharedEngine = Arc<tokio::sync::Mutex<ArbitrationEngine>>;

/// Default frame period (≈60 Hz).
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(16);

/// Frame scheduler whose requests are served by [`drive_frames`].
#[derive(Debug, Default)]
pub struct TokioFrameScheduler {
    pending: Mutex<Option<FrameHandle>>,
    next: AtomicU64,
}

impl TokioFrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the pending request, if any.
    pub fn take_pending(&self) -> Option<FrameHandle> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl FrameScheduler for TokioFrameScheduler {
    fn request_frame(&self) -> FrameHandle {
        let handle = FrameHandle(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if *pending == Some(handle) {
            *pending = None;
        }
    }
}

/// Ticks `engine` once per `period` while it keeps requesting frames.
///
/// The tick timestamp is read from the engine's own host clock so it matches
/// the timestamps pointer activity is stamped with.
///
/// Returns the number of frames ticked.
pub async fn drive_frames(
    engine: SharedEngine,
    scheduler: Arc<TokioFrameScheduler>,
    period: Duration,
    shutdown: Arc<AtomicBool>,
) -> u64 {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frames = 0u64;

    loop {
        interval.tick().await;

        if shutdown.load(Ordering::SeqCst) {
            info!(frames, "frame driver shutting down");
            break;
        }
        if scheduler.take_pending().is_none() {
            debug!(frames, "no frame requested; frame driver exiting");
            break;
        }

        let mut engine = engine.lock().await;
        let now = engine.host_now();
        engine.tick(now);
        frames += 1;
    }

    frames
}

// ── Tests ─────────────────────────────────────────────────────────────────────
