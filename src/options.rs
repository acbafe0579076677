//! Frozen configuration structs, matching the `PoolConfig::default()` shape
//! used throughout the candle pool module rather than an open-ended config
//! file loader — the external surface is a fixed set of fields.

use std::path::PathBuf;
use std::time::Duration;

/// Which transport adapter a pool's workers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Real OS threads within this process.
    Thread,
    /// Subprocesses produced by re-executing the current binary.
    Process,
}

impl Default for TransportKind {
    fn default() -> Self {
        TransportKind::Thread
    }
}

/// Preference used by the dispatcher once more than one worker is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Rotate through workers in a fixed cycle. Only honored once the pool
    /// has reached `max_workers` — below that, dispatch always falls back to
    /// `LeastTime` so a cold pool keeps preferring whichever worker has most
    /// recently proven itself alive.
    RoundRobin,
    /// Prefer the worker with the most recent tick timestamp.
    LeastTime,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        DispatchPolicy::RoundRobin
    }
}

/// Options that shape how an individual worker is spawned.
#[derive(Debug, Clone, Default)]
pub struct WorkerOptions {
    pub transport: TransportKind,
    /// Explicit override for the binary re-executed by the process
    /// transport. Falls back to `std::env::current_exe()` when unset.
    pub filename: Option<PathBuf>,
    /// Opaque data handed to every worker at boot, retrievable from inside
    /// the worker via `worker_data()`.
    pub worker_data: Option<serde_json::Value>,
}

/// Options that shape the pool as a whole.
#[derive(Debug, Clone)]
pub struct StartOptions {
    /// Workers kept warm even with nothing to do. Default is 0 — the pool
    /// grows on demand from an empty pool the first time `call()` finds
    /// nothing to dispatch to.
    pub min_workers: u32,
    pub max_workers: u32,
    /// How often a worker emits a liveness `Tick`.
    pub tick_interval: Duration,
    /// How long since a worker's last tick before it's considered stale and
    /// skipped by the dispatcher (triggering an on-demand spawn instead).
    pub stale_after: Duration,
    /// `None` picks the default that follows from `min_workers`/
    /// `max_workers`: a fixed-size pool (`min_workers == max_workers`, the
    /// "single integer `workers: N`" shape) defaults to `RoundRobin`; a
    /// genuinely dynamic range (`min_workers < max_workers`, the "`workers:
    /// [min, max]`" shape) defaults to `LeastTime`, since round-robin has no
    /// stable modulus until the pool stops growing. An explicit value here
    /// overrides the derivation.
    pub dispatch_policy: Option<DispatchPolicy>,
    pub worker: WorkerOptions,
}

impl StartOptions {
    /// Resolve `dispatch_policy`, applying the derivation rule above when
    /// the caller left it unset.
    pub fn effective_dispatch_policy(&self) -> DispatchPolicy {
        self.dispatch_policy.unwrap_or(if self.min_workers < self.max_workers {
            DispatchPolicy::LeastTime
        } else {
            DispatchPolicy::RoundRobin
        })
    }
}

/// Default tick cadence workers use when not otherwise configured.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);
/// Default staleness threshold used by the dispatcher.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_millis(1000);

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            min_workers: 0,
            max_workers: num_cpus::get().max(1) as u32,
            tick_interval: DEFAULT_TICK_INTERVAL,
            stale_after: DEFAULT_STALE_AFTER,
            dispatch_policy: None,
            worker: WorkerOptions::default(),
        }
    }
}
