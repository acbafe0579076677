//! Worker and pool state, generalized from `candle::pool::core::types`:
//! atomics for everything mutated from the hot path, a `DashMap`-backed
//! pending-call table, and a small hand-rolled Prometheus-text formatter in
//! place of pulling in the full `prometheus` registry crate for a handful
//! of counters.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{oneshot, RwLock};

use crate::codec::Value;
use crate::error::GoroutineError;
use crate::options::StartOptions;
use crate::transport::WorkerLink;

/// Lifecycle state of a single worker, stored as an `AtomicU32` so the
/// dispatcher can read it without a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum WorkerState {
    Spawning = 0,
    Ready = 1,
    Stale = 2,
    Terminating = 3,
    Dead = 4,
}

impl WorkerState {
    fn from_u32(v: u32) -> Self {
        match v {
            0 => WorkerState::Spawning,
            1 => WorkerState::Ready,
            2 => WorkerState::Stale,
            3 => WorkerState::Terminating,
            _ => WorkerState::Dead,
        }
    }
}

/// One worker's bookkeeping: its transport link plus everything the
/// dispatcher and supervisor need to decide whether to use, replace or
/// evict it.
pub struct WorkerHandle {
    pub worker_id: u32,
    pub link: Arc<WorkerLink>,
    state: AtomicU32,
    /// Milliseconds since the pool's epoch `Instant`, updated on every
    /// `Ready`/`Tick` the worker emits.
    last_tick_at_ms: AtomicU64,
    pub pending_requests: AtomicU32,
}

impl WorkerHandle {
    pub fn new(worker_id: u32, link: Arc<WorkerLink>, epoch: Instant) -> Self {
        Self {
            worker_id,
            link,
            state: AtomicU32::new(WorkerState::Spawning as u32),
            last_tick_at_ms: AtomicU64::new(epoch.elapsed().as_millis() as u64),
            pending_requests: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u32(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: WorkerState) {
        self.state.store(state as u32, Ordering::Release);
    }

    pub fn touch(&self, epoch: Instant) {
        self.last_tick_at_ms
            .store(epoch.elapsed().as_millis() as u64, Ordering::Release);
        if self.state() == WorkerState::Stale {
            self.set_state(WorkerState::Ready);
        }
    }

    pub fn last_tick_at_ms(&self) -> u64 {
        self.last_tick_at_ms.load(Ordering::Acquire)
    }

    pub fn is_stale(&self, epoch: Instant, stale_after_ms: u64) -> bool {
        epoch.elapsed().as_millis() as u64 - self.last_tick_at_ms() >= stale_after_ms
    }
}

/// Lock-free counters describing a pool's activity.
#[derive(Default)]
pub struct PoolMetrics {
    pub calls_dispatched: AtomicU64,
    pub calls_succeeded: AtomicU64,
    pub calls_failed: AtomicU64,
    pub workers_spawned: AtomicU64,
    pub workers_replaced: AtomicU64,
    pub local_fallbacks: AtomicU64,
}

impl PoolMetrics {
    pub fn record_dispatch(&self) {
        self.calls_dispatched.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_success(&self) {
        self.calls_succeeded.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_failure(&self) {
        self.calls_failed.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_spawn(&self) {
        self.workers_spawned.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_replacement(&self) {
        self.workers_replaced.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_local_fallback(&self) {
        self.local_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// A hand-rolled Prometheus text exposition, kept deliberately small
    /// rather than pulling in the `prometheus` registry crate for six
    /// counters (see DESIGN.md).
    pub fn prometheus_text(&self) -> String {
        format!(
            "# TYPE goroutine_calls_dispatched counter\n\
             goroutine_calls_dispatched {}\n\
             # TYPE goroutine_calls_succeeded counter\n\
             goroutine_calls_succeeded {}\n\
             # TYPE goroutine_calls_failed counter\n\
             goroutine_calls_failed {}\n\
             # TYPE goroutine_workers_spawned counter\n\
             goroutine_workers_spawned {}\n\
             # TYPE goroutine_workers_replaced counter\n\
             goroutine_workers_replaced {}\n\
             # TYPE goroutine_local_fallbacks counter\n\
             goroutine_local_fallbacks {}\n",
            self.calls_dispatched.load(Ordering::Relaxed),
            self.calls_succeeded.load(Ordering::Relaxed),
            self.calls_failed.load(Ordering::Relaxed),
            self.workers_spawned.load(Ordering::Relaxed),
            self.workers_replaced.load(Ordering::Relaxed),
            self.local_fallbacks.load(Ordering::Relaxed),
        )
    }
}

/// The pool: every live worker, the pending-call table, and the shared
/// atomics the dispatcher and supervisor coordinate through.
pub struct Pool {
    pub workers: RwLock<Vec<Arc<WorkerHandle>>>,
    pub pending: DashMap<u64, oneshot::Sender<Result<Value, GoroutineError>>>,
    pub next_uid: AtomicU64,
    pub next_worker_id: AtomicU32,
    pub rr_counter: AtomicUsize,
    pub metrics: PoolMetrics,
    pub shutting_down: AtomicBool,
    pub options: StartOptions,
    /// `options.dispatch_policy` resolved once at construction time via
    /// `StartOptions::effective_dispatch_policy`, so the dispatcher never
    /// has to re-derive it per call.
    pub dispatch_policy: crate::options::DispatchPolicy,
    pub advisory_warned: AtomicBool,
    pub epoch: Instant,
}

impl Pool {
    pub fn new(options: StartOptions) -> Self {
        let dispatch_policy = options.effective_dispatch_policy();
        Self {
            workers: RwLock::new(Vec::new()),
            pending: DashMap::new(),
            next_uid: AtomicU64::new(1),
            next_worker_id: AtomicU32::new(0),
            rr_counter: AtomicUsize::new(0),
            metrics: PoolMetrics::default(),
            shutting_down: AtomicBool::new(false),
            options,
            dispatch_policy,
            advisory_warned: AtomicBool::new(false),
            epoch: Instant::now(),
        }
    }

    pub fn next_uid(&self) -> u64 {
        self.next_uid.fetch_add(1, Ordering::Relaxed)
    }

    pub fn next_worker_id(&self) -> u32 {
        self.next_worker_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }
}
