//! Spawn / replace / scale / terminate state machine, generalized from
//! `candle::pool::core::spawn` (spawn-lock-guarded cold start and adaptive
//! scaling) and `candle::pool::maintenance` (the periodic staleness sweep
//! and lock-free collect-then-evict pattern).

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use super::types::{Pool, WorkerHandle, WorkerState};
use crate::error::GoroutineError;
use crate::options::TransportKind;
use crate::protocol::{self, Message};
use crate::transport::{process, thread};

const MAINTENANCE_INTERVAL: Duration = Duration::from_millis(250);

/// How long `spawn_worker` waits for a freshly spawned worker to report
/// `Ready` before giving up and treating the spawn as failed.
const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Spawn one worker using the pool's configured transport, register it,
/// hand its inbound channel to a background pump task that updates
/// liveness and completes pending calls, and wait for the worker to become
/// `Ready` before returning it — callers (`ensure_minimum`, on-demand
/// scale-up) rely on a returned handle being immediately dispatchable.
#[instrument(skip(pool))]
pub async fn spawn_worker(pool: &Arc<Pool>) -> Result<Arc<WorkerHandle>, GoroutineError> {
    if pool.is_shutting_down() {
        return Err(GoroutineError::Transport(
            "pool is shutting down, refusing to spawn a new worker".into(),
        ));
    }

    let worker_id = pool.next_worker_id();
    let (link, inbox) = match pool.options.worker.transport {
        TransportKind::Thread => thread::spawn(worker_id)?,
        TransportKind::Process => process::spawn(worker_id, &pool.options.worker)?,
    };

    let handle = Arc::new(WorkerHandle::new(worker_id, Arc::new(link), pool.epoch));
    pool.workers.write().await.push(Arc::clone(&handle));
    pool.metrics.record_spawn();
    info!(worker_id, "worker spawned");

    tokio::spawn(pump(Arc::clone(pool), Arc::clone(&handle), inbox));

    if !wait_until_ready(&handle, READY_TIMEOUT).await {
        pool.workers.write().await.retain(|w| w.worker_id != worker_id);
        return Err(GoroutineError::Transport(format!(
            "worker {worker_id} did not become ready within {READY_TIMEOUT:?}"
        )));
    }

    Ok(handle)
}

async fn pump(pool: Arc<Pool>, handle: Arc<WorkerHandle>, mut inbox: mpsc::Receiver<Message>) {
    while let Some(msg) = inbox.recv().await {
        match msg {
            Message::Ready => {
                handle.set_state(WorkerState::Ready);
                handle.touch(pool.epoch);
                info!(worker_id = handle.worker_id, "worker became ready");
            }
            Message::Tick => {
                handle.touch(pool.epoch);
            }
            Message::CallResponse { uid, error, result } => {
                if let Some((_, sender)) = pool.pending.remove(&uid) {
                    let outcome = match error {
                        Some(value) => Err(protocol::decode_error(value)),
                        None => Ok(result.unwrap_or(crate::codec::Value::Undefined)),
                    };
                    let _ = sender.send(outcome);
                }
                handle.pending_requests.fetch_sub(1, Ordering::AcqRel);
            }
            Message::CallRequest { .. } | Message::Shutdown => {
                // The pool never receives these from a worker; ignore.
            }
        }
    }

    // Channel closed. If the pool asked this worker to terminate, that's
    // expected and handled by `terminate_worker`. Otherwise this worker
    // died on its own and needs replacing.
    if handle.state() == WorkerState::Terminating || pool.is_shutting_down() {
        handle.set_state(WorkerState::Dead);
        return;
    }

    warn!(worker_id = handle.worker_id, "worker exited unexpectedly, replacing it");
    handle.set_state(WorkerState::Dead);
    pool.metrics.record_replacement();
    {
        let mut workers = pool.workers.write().await;
        workers.retain(|w| w.worker_id != handle.worker_id);
    }
    if let Err(e) = spawn_worker(&pool).await {
        warn!(error = %e, "failed to replace a dead worker");
    }
}

/// Ask a worker to terminate, remove it from the pool, and return whether
/// the exit was orderly.
pub async fn terminate_worker(pool: &Pool, handle: &Arc<WorkerHandle>) -> bool {
    handle.set_state(WorkerState::Terminating);
    let normal = handle.link.terminate().await;
    pool.workers.write().await.retain(|w| w.worker_id != handle.worker_id);
    normal
}

/// Terminate every worker in the pool. Used by `facade::terminate()`.
pub async fn shutdown_all(pool: &Arc<Pool>) {
    pool.shutting_down.store(true, Ordering::Release);
    let workers: Vec<Arc<WorkerHandle>> = pool.workers.read().await.clone();
    for handle in workers {
        terminate_worker(pool, &handle).await;
    }
}

/// Spawn the background maintenance task: on a fixed interval, collect
/// stale workers (without holding the workers lock during the actual
/// state change, matching `candle::pool::maintenance`'s lock-release-
/// before-mutate pattern) and mark them ineligible for dispatch.
///
/// A stale worker is never killed here. Ticks are a liveness hint for
/// scaling, not grounds for cancelling a call in flight — a worker stuck
/// on a long-running call is still going to deliver its `CallResponse`
/// eventually, and killing it would strand that pending call forever.
/// Instead the sweep grows the pool with supplemental capacity (if there's
/// room under `max_workers`) so new calls have somewhere else to go; the
/// stale worker rejoins dispatch on its own the next time it ticks
/// (`WorkerHandle::touch` flips `Stale` back to `Ready`).
pub fn start_maintenance(pool: Arc<Pool>) {
    tokio::spawn(async move {
        // Jitter the first tick so many pools in the same process (tests
        // spin up several) don't all wake on the same millisecond.
        tokio::time::sleep(Duration::from_millis(fastrand::u64(0..MAINTENANCE_INTERVAL.as_millis() as u64))).await;
        let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
        loop {
            interval.tick().await;
            if pool.is_shutting_down() {
                return;
            }

            let stale_after_ms = pool.options.stale_after.as_millis() as u64;
            let stale: Vec<Arc<WorkerHandle>> = {
                let workers = pool.workers.read().await;
                workers
                    .iter()
                    .filter(|w| w.state() == WorkerState::Ready && w.is_stale(pool.epoch, stale_after_ms))
                    .cloned()
                    .collect()
            };

            if stale.is_empty() {
                continue;
            }

            for handle in &stale {
                handle.set_state(WorkerState::Stale);
                warn!(worker_id = handle.worker_id, "worker went stale, leaving it running and growing the pool instead");
            }

            let room = pool.options.max_workers.saturating_sub(pool.workers.read().await.len() as u32);
            for _ in 0..room.min(stale.len() as u32) {
                if let Err(e) = spawn_worker(&pool).await {
                    warn!(error = %e, "failed to spawn supplemental capacity for stale workers");
                    break;
                }
            }
        }
    });
}

/// Ensure at least one worker exists, spawning up to `min_workers` if the
/// pool is empty. Called once from `start()`.
pub async fn ensure_minimum(pool: &Arc<Pool>) -> Result<(), GoroutineError> {
    let current = pool.workers.read().await.len() as u32;
    for _ in current..pool.options.min_workers {
        spawn_worker(pool).await?;
    }
    Ok(())
}

/// Wait until `handle` reports `Ready` or `timeout` elapses.
pub async fn wait_until_ready(handle: &WorkerHandle, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while handle.state() != WorkerState::Ready {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    true
}
