//! # goroutine
//!
//! Offload a call to a parallel OS worker — a real thread or a re-exec'd
//! subprocess — from a single-threaded cooperative caller, and get the
//! result back without ever sharing memory across the boundary.
//!
//! ```text
//! src/
//!   error.rs        GoroutineError taxonomy
//!   options.rs      WorkerOptions / StartOptions, transport + dispatch config
//!   codec/          structured-clone-equivalent Value codec
//!   registry.rs     process-private append-only function registry
//!   protocol.rs     the wire Message enum, shared by both transports
//!   eval.rs         inline/unregistered call targets via an embedded engine
//!   entry.rs        worker binary resolution + process-transport CLI entry
//!   transport/      thread and process adapters behind one WorkerLink type
//!   worker_runtime.rs  the loop every worker runs, regardless of transport
//!   pool/           WorkerHandle / dispatch policy / supervisor
//!   facade.rs       the public API: start, call, register, terminate
//! ```
//!
//! A typical `main()`:
//!
//! ```ignore
//! fn main() {
//!     goroutine::maybe_run_worker(); // no-op unless this process is a worker
//!
//!     bootstrap(); // your register()/use_module() calls, run identically
//!                  // by the main process and by every worker
//!
//!     let rt = tokio::runtime::Runtime::new().unwrap();
//!     rt.block_on(async {
//!         goroutine::start(goroutine::StartOptions::default()).await.unwrap();
//!         let sum = goroutine::call_fn("add", vec![goroutine::Value::Number(1.0), goroutine::Value::Number(2.0)]).await.unwrap();
//!         goroutine::terminate().await.unwrap();
//!     });
//! }
//!
//! fn bootstrap() {
//!     goroutine::register("add", |args| async move {
//!         let a = args[0].as_f64().unwrap_or(0.0);
//!         let b = args[1].as_f64().unwrap_or(0.0);
//!         Ok(goroutine::Value::Number(a + b))
//!     });
//! }
//! ```

pub mod codec;
pub mod entry;
pub mod error;
pub mod eval;
pub mod facade;
pub mod options;
pub mod pool;
pub mod protocol;
pub mod registry;
pub mod transport;
pub mod worker_runtime;

pub use codec::{decode, encode, Encodable, TypedArrayKind, Value};
pub use entry::maybe_run_worker;
pub use error::{GoroutineError, Result};
pub use facade::{
    call_fn, call_inline, is_main_thread, prometheus_metrics, register, start, terminate, thread_id, use_module,
    worker_data, workers, WorkerSnapshot,
};
pub use options::{DispatchPolicy, StartOptions, TransportKind, WorkerOptions};
