//! The loop run inside every worker, regardless of transport: emit `Ready`
//! once, emit `Tick` on a fixed interval, and service `CallRequest`s
//! concurrently as they arrive. Grounded on the `tokio::select!`-driven
//! worker loop in `candle::pool::capabilities::text_to_text`, generalized
//! from one capability-specific channel to the two-target call dispatch
//! this spec requires.

use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use crate::codec::Value;
use crate::eval;
use crate::options::DEFAULT_TICK_INTERVAL;
use crate::protocol::{self, CallTarget, Message};
use crate::registry;

/// Run a worker's event loop until it receives `Message::Shutdown` or its
/// inbox closes. Returns the exit code the owning transport uses to decide
/// whether the exit was orderly.
#[instrument(skip(inbox, outbox), fields(worker_id))]
pub async fn run(worker_id: u32, mut inbox: mpsc::Receiver<Message>, outbox: mpsc::Sender<Message>) -> i32 {
    crate::facade::mark_current_thread_as_worker(worker_id);

    if outbox.send(Message::Ready).await.is_err() {
        warn!(worker_id, "could not send Ready, pool side already gone");
        return 0;
    }
    debug!(worker_id, "worker ready");

    let mut ticker = tokio::time::interval(DEFAULT_TICK_INTERVAL);
    ticker.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            received = inbox.recv() => {
                match received {
                    Some(Message::CallRequest { uid, target, sig, args }) => {
                        let outbox = outbox.clone();
                        tokio::spawn(async move {
                            let response = match dispatch_call(target, sig, args).await {
                                Ok(result) => Message::CallResponse { uid, error: None, result: Some(result) },
                                Err(err) => Message::CallResponse { uid, error: Some(protocol::encode_error(&err)), result: None },
                            };
                            let _ = outbox.send(response).await;
                        });
                    }
                    Some(Message::Shutdown) => {
                        debug!(worker_id, "worker received Shutdown");
                        return crate::transport::thread::NORMAL_EXIT_CODE;
                    }
                    Some(_) => {
                        // Control tokens the worker itself never expects to receive
                        // (Ready/Tick/CallResponse) are dropped, not treated as fatal.
                    }
                    None => {
                        debug!(worker_id, "inbox closed, treating as shutdown");
                        return crate::transport::thread::NORMAL_EXIT_CODE;
                    }
                }
            }
            _ = ticker.tick() => {
                if outbox.send(Message::Tick).await.is_err() {
                    return crate::transport::thread::NORMAL_EXIT_CODE;
                }
            }
        }
    }
}

async fn dispatch_call(target: CallTarget, sig: u32, args: Vec<Value>) -> Result<Value, crate::error::GoroutineError> {
    match target {
        CallTarget::Registered(index) => registry::global().call(index, sig, args).await,
        CallTarget::Inline(source) => eval::eval_inline(&source, &args),
    }
}
