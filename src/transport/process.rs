//! Process transport: a subprocess produced by re-executing the current
//! binary with a worker-mode flag, communicating over length-prefixed
//! `bincode` frames on its stdio pipes.
//!
//! Spawning follows `cylo::exec`'s `std::process::Command` usage; this
//! crate uses `tokio::process::Command` instead so the stdio pumps can be
//! plain async tasks rather than dedicated blocking threads.

use std::process::Stdio;

use tokio::sync::mpsc;
use tracing::debug;

use super::WorkerLink;
use crate::entry;
use crate::error::GoroutineError;
use crate::options::WorkerOptions;
use crate::protocol::{self, Message};

const CHANNEL_CAPACITY: usize = 64;

/// Spawn a worker subprocess, returning its link plus the receiver the
/// caller should pump to learn about responses, readiness and ticks.
pub fn spawn(worker_id: u32, options: &WorkerOptions) -> Result<(WorkerLink, mpsc::Receiver<Message>), GoroutineError> {
    let exe = entry::resolve_worker_binary(options)?;

    let mut cmd = tokio::process::Command::new(exe);
    cmd.arg("--go-worker").arg("--worker-id").arg(worker_id.to_string());
    if let Some(data) = &options.worker_data {
        cmd.arg("--worker-data").arg(data.to_string());
    }
    cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::inherit());

    let mut child = cmd
        .spawn()
        .map_err(|e| GoroutineError::Transport(format!("failed to spawn worker process: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| GoroutineError::Transport("worker process has no stdin pipe".into()))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| GoroutineError::Transport("worker process has no stdout pipe".into()))?;

    let (to_worker_tx, mut to_worker_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);
    let (from_worker_tx, from_worker_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(msg) = to_worker_rx.recv().await {
            if protocol::write_frame(&mut stdin, &msg).await.is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        loop {
            match protocol::read_frame(&mut stdout).await {
                Ok(Some(msg)) => {
                    if from_worker_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!(worker_id, "worker process closed its stdout");
                    break;
                }
                Err(e) => {
                    debug!(worker_id, error = %e, "worker process frame error");
                    break;
                }
            }
        }
    });

    Ok((WorkerLink::process(worker_id, to_worker_tx, child), from_worker_rx))
}
