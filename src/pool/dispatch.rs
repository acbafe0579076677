//! Dispatch policy: round-robin once the pool has reached `max_workers`,
//! otherwise the most-recently-responsive ("least time since last tick")
//! worker — a deliberately different algorithm from candle's sampling-based
//! `select_worker_power_of_two` (see DESIGN.md Open Questions).

use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::types::{Pool, WorkerHandle, WorkerState};
use crate::options::DispatchPolicy;

/// Pick the worker that should serve the next call, skipping anything
/// stale or not `Ready`. Returns `None` if no eligible worker exists —
/// the caller decides whether that means "spawn one" or "fall back to
/// running locally".
pub async fn choose_worker(pool: &Pool) -> Option<Arc<WorkerHandle>> {
    let workers = pool.workers.read().await;
    let eligible: Vec<&Arc<WorkerHandle>> = workers
        .iter()
        .filter(|w| w.state() == WorkerState::Ready)
        .filter(|w| !w.is_stale(pool.epoch, pool.options.stale_after.as_millis() as u64))
        .collect();

    if eligible.is_empty() {
        return None;
    }

    let use_round_robin =
        pool.dispatch_policy == DispatchPolicy::RoundRobin && workers.len() as u32 >= pool.options.max_workers;

    let chosen = if use_round_robin {
        let idx = pool.rr_counter.fetch_add(1, Ordering::Relaxed) % eligible.len();
        eligible[idx]
    } else {
        // Least-time: prefer whoever ticked most recently.
        eligible
            .iter()
            .copied()
            .max_by_key(|w| w.last_tick_at_ms())
            .expect("eligible is non-empty")
    };

    Some(Arc::clone(chosen))
}

/// Whether the dispatcher should ask the supervisor to grow the pool before
/// (or instead of) dispatching: true when there's room to grow and either
/// the pool is empty or every worker is currently stale.
pub async fn should_scale_up(pool: &Pool) -> bool {
    let workers = pool.workers.read().await;
    if workers.len() as u32 >= pool.options.max_workers {
        return false;
    }
    workers.is_empty()
        || workers
            .iter()
            .all(|w| w.is_stale(pool.epoch, pool.options.stale_after.as_millis() as u64) || w.state() != WorkerState::Ready)
}
