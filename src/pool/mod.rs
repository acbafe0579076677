//! The worker pool: one [`Pool`] per call to `facade::start()`, holding
//! every live [`WorkerHandle`], the pending-call table, and the background
//! tasks that keep both honest.
//!
//! ```text
//! pool/
//!   types.rs       WorkerHandle, WorkerState, PoolMetrics, Pool
//!   dispatch.rs     round-robin / least-time policy, staleness, scale-up check
//!   supervisor.rs  spawn / replace / terminate / maintenance sweep
//! ```
//!
//! Lifecycle, in the order a typical run goes through it:
//!
//! 1. Cold start — `facade::start()` builds a `Pool` and spawns
//!    `min_workers` (zero by default: the pool grows on first use).
//! 2. On demand — the first `call()` that finds no eligible worker spawns
//!    one before dispatching, logging at `info!`.
//! 3. Active — `dispatch::choose_worker` picks a target per the configured
//!    policy; `supervisor::pump` keeps each worker's liveness timestamp and
//!    completes pending calls as `CallResponse`s arrive.
//! 4. Replacement — an unexpectedly closed worker channel gets replaced by
//!    the pump task itself. A worker whose last tick is older than
//!    `stale_after` is never killed (it may just be blocked on a long
//!    call); the maintenance sweep marks it ineligible for dispatch and
//!    grows the pool with supplemental capacity instead.
//! 5. Shutdown — `facade::terminate()` flips `shutting_down` and asks every
//!    worker to exit in turn; it also stops any further worker from being
//!    spawned behind the pool's back.

pub mod dispatch;
pub mod supervisor;
pub mod types;

pub use types::{Pool, PoolMetrics, WorkerHandle, WorkerState};
