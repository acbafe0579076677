//! The public API: free functions over a process-wide pool singleton, the
//! same shape `candle::pool::mod` uses for its capability-specific
//! accessors (`text_to_text_pool()` and friends) generalized to this
//! crate's single, homogeneous pool.

use std::cell::Cell;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::sync::{oneshot, RwLock};
use tracing::{info, warn};

use crate::codec::Value;
use crate::error::GoroutineError;
use crate::options::StartOptions;
use crate::pool::Pool;
use crate::pool::{dispatch, supervisor};
use crate::protocol::CallTarget;
use crate::registry::{self, Callable};

static POOL: OnceCell<Arc<Pool>> = OnceCell::new();
static WORKER_DATA: RwLockCell = RwLockCell::new();

thread_local! {
    /// Set on the OS thread (thread transport) or process (subprocess
    /// transport, trivially for its whole lifetime) that is serving as a
    /// worker. `start`/`call_fn`/`call_inline`/`terminate` check this
    /// rather than pinning to "the one thread that first called start()",
    /// since a caller running a multi-threaded tokio runtime can legally
    /// resume a task on a different worker thread between await points —
    /// only an actual worker calling back into the facade is misuse.
    static IS_WORKER: Cell<bool> = const { Cell::new(false) };

    /// This worker's own id, set alongside `IS_WORKER`. Unused (stays `0`)
    /// on the main thread/process.
    static WORKER_ID: Cell<u32> = const { Cell::new(0) };
}

/// Mark the calling OS thread (or, for a subprocess worker, the whole
/// process) as a worker context, so `ThreadMisuse` is raised if user code
/// running inside it calls back into the facade, and so `thread_id()`
/// reports `worker_id` rather than `0`.
pub(crate) fn mark_current_thread_as_worker(worker_id: u32) {
    IS_WORKER.with(|flag| flag.set(true));
    WORKER_ID.with(|id| id.set(worker_id));
}

/// A tiny `OnceCell`-like wrapper that can still be overwritten by a worker
/// process's own `--worker-data` at boot. Modeled as a `RwLock<Option<_>>`
/// rather than a `OnceCell` since a worker process legitimately needs to set
/// it exactly once after `maybe_run_worker` parses its CLI arguments.
struct RwLockCell(RwLock<Option<serde_json::Value>>);
impl RwLockCell {
    const fn new() -> Self {
        Self(RwLock::const_new(None))
    }
}

fn pool() -> Result<&'static Arc<Pool>, GoroutineError> {
    POOL.get()
        .ok_or_else(|| GoroutineError::Config("start() has not been called".into()))
}

/// `ThreadMisuse`: `start`/`call_fn`/`call_inline`/`terminate` are main-side
/// only. Checked against `IS_WORKER` rather than "the one thread that first
/// called start()", since a caller running a multi-threaded tokio runtime
/// can legally resume a task on a different thread between await points —
/// only an actual worker calling back into the facade is misuse.
fn check_thread() -> Result<(), GoroutineError> {
    if IS_WORKER.with(|flag| flag.get()) {
        return Err(GoroutineError::ThreadMisuse);
    }
    Ok(())
}

/// Boot the pool: flush any `use_module` registrations and spawn
/// `min_workers` workers.
///
/// Rejects a `min_workers` greater than `max_workers` as a `ConfigError`.
/// A `min_workers: 0` pool that grows on demand is kept legal and is in
/// fact the default, since it's exactly what the locality-fallback path
/// exercises; see DESIGN.md.
pub async fn start(options: StartOptions) -> Result<(), GoroutineError> {
    check_thread()?;
    if options.min_workers > options.max_workers {
        return Err(GoroutineError::Config(format!(
            "min_workers ({}) cannot exceed max_workers ({})",
            options.min_workers, options.max_workers
        )));
    }
    registry::global().flush_pending().await;

    let pool = Arc::new(Pool::new(options));
    POOL.set(Arc::clone(&pool))
        .map_err(|_| GoroutineError::Config("start() was already called".into()))?;

    supervisor::ensure_minimum(&pool).await?;
    supervisor::start_maintenance(Arc::clone(&pool));
    info!("goroutine pool started");
    Ok(())
}

/// Register a callable under `name`, returning the index it was assigned.
pub fn register<F, Fut>(name: impl Into<String>, f: F) -> u32
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Value, GoroutineError>> + Send + 'static,
{
    registry::global().register(name, f)
}

/// Queue a batch of callables, flushed the next time `start()` runs.
pub fn use_module(items: Vec<(String, Callable)>) {
    registry::global().use_module(items);
}

/// Call a previously registered function by name.
pub async fn call_fn(name: &str, args: Vec<Value>) -> Result<Value, GoroutineError> {
    check_thread()?;
    let index = registry::global()
        .index_of(name)
        .ok_or_else(|| GoroutineError::InvalidArgument(format!("'{name}' was never registered")))?;
    let sig = registry::global()
        .signature_at(index)
        .expect("index_of and signature_at must agree");
    dispatch_call(CallTarget::Registered(index), sig, args).await
}

/// Call a function by shipping its source text for inline evaluation —
/// used when the caller never registered the function up front.
pub async fn call_inline(source: impl Into<String>, args: Vec<Value>) -> Result<Value, GoroutineError> {
    check_thread()?;
    dispatch_call(CallTarget::Inline(source.into()), 0, args).await
}

async fn dispatch_call(target: CallTarget, sig: u32, args: Vec<Value>) -> Result<Value, GoroutineError> {
    let pool = pool()?;
    pool.metrics.record_dispatch();

    let freshly_spawned = if dispatch::should_scale_up(pool).await {
        match supervisor::spawn_worker(pool).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "on-demand worker spawn failed");
                None
            }
        }
    } else {
        None
    };

    let worker = match freshly_spawned.or(dispatch::choose_worker(pool).await) {
        Some(worker) => worker,
        None => {
            if !pool.advisory_warned.swap(true, Ordering::AcqRel) {
                warn!(
                    "no worker is available to dispatch this call; running it locally on the \
                     calling thread instead. This warning is only logged once per pool."
                );
            }
            pool.metrics.record_local_fallback();
            return run_locally(target, sig, args).await;
        }
    };

    let uid = pool.next_uid();
    let (tx, rx) = oneshot::channel();
    pool.pending.insert(uid, tx);
    worker.pending_requests.fetch_add(1, Ordering::AcqRel);

    let request = crate::protocol::Message::CallRequest { uid, target, sig, args };
    if worker.link.to_worker.send(request).await.is_err() {
        pool.pending.remove(&uid);
        pool.metrics.record_failure();
        return Err(GoroutineError::Transport(format!(
            "worker {} is no longer accepting requests",
            worker.worker_id
        )));
    }

    match rx.await {
        Ok(Ok(value)) => {
            pool.metrics.record_success();
            Ok(value)
        }
        Ok(Err(e)) => {
            pool.metrics.record_failure();
            Err(e)
        }
        Err(_) => {
            pool.metrics.record_failure();
            Err(GoroutineError::Transport(format!(
                "worker {} dropped the call without responding",
                worker.worker_id
            )))
        }
    }
}

async fn run_locally(target: CallTarget, sig: u32, args: Vec<Value>) -> Result<Value, GoroutineError> {
    match target {
        CallTarget::Registered(index) => registry::global().call(index, sig, args).await,
        CallTarget::Inline(source) => crate::eval::eval_inline(&source, &args),
    }
}

/// Terminate every worker and forget the pool, so a later `start()` can run
/// again (mainly useful for tests).
pub async fn terminate() -> Result<(), GoroutineError> {
    check_thread()?;
    let pool = pool()?;
    supervisor::shutdown_all(pool).await;
    Ok(())
}

/// A read-only snapshot of one worker, for observability.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkerSnapshot {
    pub worker_id: u32,
    pub state: crate::pool::WorkerState,
    pub pending_requests: u32,
}

pub async fn workers() -> Result<Vec<WorkerSnapshot>, GoroutineError> {
    let pool = pool()?;
    let workers = pool.workers.read().await;
    Ok(workers
        .iter()
        .map(|w| WorkerSnapshot {
            worker_id: w.worker_id,
            state: w.state(),
            pending_requests: w.pending_requests.load(Ordering::Relaxed),
        })
        .collect())
}

pub fn is_main_thread() -> bool {
    !IS_WORKER.with(|flag| flag.get())
}

/// `0` on the main thread/process; a worker's own `worker_id` otherwise.
pub fn thread_id() -> u32 {
    WORKER_ID.with(|id| id.get())
}

/// Opaque data passed to this process at boot via `--worker-data`. `None`
/// on the main process and on any worker that wasn't given one.
pub async fn worker_data() -> Option<serde_json::Value> {
    WORKER_DATA.0.read().await.clone()
}

/// Called once by `entry`/`maybe_run_worker` machinery inside a freshly
/// spawned worker process, before its event loop starts.
pub(crate) async fn set_worker_data(data: Option<serde_json::Value>) {
    *WORKER_DATA.0.write().await = data;
}

pub fn prometheus_metrics() -> Result<String, GoroutineError> {
    Ok(pool()?.metrics.prometheus_text())
}
