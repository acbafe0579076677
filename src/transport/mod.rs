//! Transport adapters: the uniform `{spawn, terminate, sendFromWorker}`
//! capability set over two back-ends. The set is closed at two members, so
//! this is modeled as two free-function modules plus one shared handle type
//! rather than a `dyn Transport` object.

pub mod process;
pub mod thread;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::warn;

use crate::protocol::Message;

const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);
const SHUTDOWN_POLL: Duration = Duration::from_millis(5);

enum ExitState {
    Thread {
        finished: Arc<AtomicBool>,
        handle: Option<std::thread::JoinHandle<i32>>,
    },
    Process {
        child: tokio::process::Child,
    },
}

/// A transport-neutral handle to one worker, produced by either adapter's
/// `spawn()` and consumed uniformly by the pool.
pub struct WorkerLink {
    pub worker_id: u32,
    pub to_worker: mpsc::Sender<Message>,
    exit: Mutex<ExitState>,
}

impl WorkerLink {
    fn thread(worker_id: u32, to_worker: mpsc::Sender<Message>, finished: Arc<AtomicBool>, handle: std::thread::JoinHandle<i32>) -> Self {
        Self {
            worker_id,
            to_worker,
            exit: Mutex::new(ExitState::Thread {
                finished,
                handle: Some(handle),
            }),
        }
    }

    fn process(worker_id: u32, to_worker: mpsc::Sender<Message>, child: tokio::process::Child) -> Self {
        Self {
            worker_id,
            to_worker,
            exit: Mutex::new(ExitState::Process { child }),
        }
    }

    /// Ask the worker to exit in an orderly fashion, falling back to a
    /// forced kill after a short grace period. Returns `true` if the exit
    /// was the transport's definition of "normal" (see the thread/process
    /// modules for the exact tie-break each one uses).
    pub async fn terminate(&self) -> bool {
        let _ = self.to_worker.send(Message::Shutdown).await;
        let mut state = self.exit.lock().await;
        match &mut *state {
            ExitState::Thread { finished, handle } => {
                let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
                while !finished.load(Ordering::SeqCst) {
                    if tokio::time::Instant::now() >= deadline {
                        warn!(worker_id = self.worker_id, "worker thread did not exit within the shutdown grace period");
                        return false;
                    }
                    tokio::time::sleep(SHUTDOWN_POLL).await;
                }
                match handle.take() {
                    Some(h) => match tokio::task::spawn_blocking(move || h.join()).await {
                        Ok(Ok(code)) => code == thread::NORMAL_EXIT_CODE,
                        _ => false,
                    },
                    None => true,
                }
            }
            ExitState::Process { child } => match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(Ok(status)) => status.success(),
                Ok(Err(e)) => {
                    warn!(worker_id = self.worker_id, error = %e, "failed to wait on worker process");
                    false
                }
                Err(_) => {
                    warn!(worker_id = self.worker_id, "worker process did not exit within the shutdown grace period, killing");
                    let _ = child.kill().await;
                    false
                }
            },
        }
    }
}
