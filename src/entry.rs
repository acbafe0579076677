//! Resolving which binary the process transport re-executes as a worker.
//!
//! A compiled binary has no meaningful analogue of walking upward through a
//! source tree looking for a project manifest, so resolution is a two-step
//! chain that mirrors `cylo::exec::find_command`'s probe-then-fall-back-
//! then-error shape: an explicit override, else the currently running
//! executable, else a configuration error.

use std::path::PathBuf;

use clap::Parser;

use crate::error::GoroutineError;
use crate::options::WorkerOptions;

/// Resolve the binary a freshly spawned worker subprocess should run.
pub fn resolve_worker_binary(options: &WorkerOptions) -> Result<PathBuf, GoroutineError> {
    if let Some(filename) = &options.filename {
        return Ok(filename.clone());
    }
    std::env::current_exe()
        .map_err(|e| GoroutineError::Config(format!("could not resolve current executable: {e}")))
}

/// Flags the process transport passes to a re-exec'd worker, parsed with
/// the same `clap` derive style `cylo::cli` uses.
#[derive(Parser, Debug)]
#[command(name = "goroutine-worker", hide = true)]
struct WorkerArgs {
    /// Present only on a process spawned as a worker.
    #[arg(long)]
    go_worker: bool,
    #[arg(long)]
    worker_id: Option<u32>,
    #[arg(long)]
    worker_data: Option<String>,
}

/// Call this at the very top of `main()`. On a worker subprocess it runs
/// the worker's event loop over stdio and never returns — it exits the
/// process itself. On the main process (or any process not launched in
/// worker mode) it returns immediately so normal startup continues.
pub fn maybe_run_worker() {
    let args = match WorkerArgs::try_parse() {
        Ok(args) if args.go_worker => args,
        _ => return,
    };

    let worker_id = args.worker_id.unwrap_or(0);
    let worker_data = args
        .worker_data
        .as_deref()
        .and_then(|s| serde_json::from_str(s).ok());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build worker process runtime");

    let exit_code = runtime.block_on(run_stdio_worker(worker_id, worker_data));
    std::process::exit(exit_code);
}

async fn run_stdio_worker(worker_id: u32, worker_data: Option<serde_json::Value>) -> i32 {
    crate::facade::set_worker_data(worker_data).await;

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();

    let (to_worker_tx, to_worker_rx) = tokio::sync::mpsc::channel(64);
    let (from_worker_tx, mut from_worker_rx) = tokio::sync::mpsc::channel(64);

    tokio::spawn(async move {
        loop {
            match crate::protocol::read_frame(&mut stdin).await {
                Ok(Some(msg)) => {
                    if to_worker_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                _ => break,
            }
        }
    });

    let writer = tokio::spawn(async move {
        while let Some(msg) = from_worker_rx.recv().await {
            if crate::protocol::write_frame(&mut stdout, &msg).await.is_err() {
                break;
            }
        }
    });

    let code = crate::worker_runtime::run(worker_id, to_worker_rx, from_worker_tx).await;
    let _ = writer.await;
    code
}
