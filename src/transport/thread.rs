//! Thread transport: a real OS thread, driving its own single-threaded
//! tokio runtime, running the same worker loop the process transport runs.
//!
//! Spawn/shutdown follows the pattern in `ssoj13-playa`'s `Workers::drop`:
//! signal, then poll `is_finished()` against a deadline rather than joining
//! unconditionally, so a wedged worker can't hang the pool's shutdown path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error};

use super::WorkerLink;
use crate::error::GoroutineError;
use crate::protocol::Message;
use crate::worker_runtime;

/// Exit code the worker loop returns when it exits via an orderly
/// `Message::Shutdown`, as opposed to an internal panic.
pub const NORMAL_EXIT_CODE: i32 = 1;

/// Exit code stored when the spawned thread's own tokio runtime fails to
/// build. Distinct from `NORMAL_EXIT_CODE` so `pump`'s "channel closed
/// unexpectedly" path treats it as needing replacement rather than as an
/// orderly exit.
const RUNTIME_BUILD_FAILURE_EXIT_CODE: i32 = 2;

const CHANNEL_CAPACITY: usize = 64;

/// Spawn a worker thread, returning its link plus the receiver the caller
/// should pump to learn about responses, readiness and ticks.
pub fn spawn(worker_id: u32) -> Result<(WorkerLink, mpsc::Receiver<Message>), GoroutineError> {
    let (to_worker_tx, to_worker_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (from_worker_tx, from_worker_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let finished = Arc::new(AtomicBool::new(false));
    let finished_for_thread = Arc::clone(&finished);

    let handle = thread::Builder::new()
        .name(format!("goroutine-worker-{worker_id}"))
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(e) => {
                    error!(worker_id, error = %e, "failed to build worker thread runtime");
                    finished_for_thread.store(true, Ordering::SeqCst);
                    return RUNTIME_BUILD_FAILURE_EXIT_CODE;
                }
            };
            let code = rt.block_on(worker_runtime::run(worker_id, to_worker_rx, from_worker_tx));
            finished_for_thread.store(true, Ordering::SeqCst);
            debug!(worker_id, exit_code = code, "worker thread stopped");
            code
        })
        .map_err(|e| GoroutineError::Transport(format!("failed to spawn worker thread: {e}")))?;

    Ok((
        WorkerLink::thread(worker_id, to_worker_tx, finished, handle),
        from_worker_rx,
    ))
}
