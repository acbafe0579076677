//! The message protocol exchanged between the pool and every worker,
//! regardless of transport. The thread transport passes [`Message`] values
//! directly through an in-process `tokio::sync::mpsc` channel; the process
//! transport frames them with [`write_frame`]/[`read_frame`] over the
//! child's stdio pipes.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::Value;
use crate::error::GoroutineError;

/// How a call's target function is identified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallTarget {
    /// Index into the process-local registry, checked against `sig` before
    /// the call is allowed to run.
    Registered(u32),
    /// Source text evaluated inline by the worker, for callers that never
    /// registered the function up front.
    Inline(String),
}

/// The wire protocol. `Ready` and `Tick` are the liveness control tokens;
/// `Shutdown` is this crate's orderly-termination signal, used internally
/// by both transports so `terminate()` has a uniform way to ask a worker to
/// exit before falling back to a forced kill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    CallRequest {
        uid: u64,
        target: CallTarget,
        sig: u32,
        args: Vec<Value>,
    },
    CallResponse {
        uid: u64,
        /// The failed call's error, carried through the same value codec as
        /// every other payload rather than flattened to a bare string, so
        /// the receiving side can recover more than just the message text.
        error: Option<Value>,
        result: Option<Value>,
    },
    /// Sent exactly once, the first time a worker becomes able to accept
    /// calls.
    Ready,
    /// Sent on a fixed interval as long as the worker's event loop is
    /// making progress.
    Tick,
    Shutdown,
}

/// The name tag a [`GoroutineError`] is encoded under, so the receiving
/// side can rebuild the right variant instead of collapsing every failure
/// into a generic one.
fn error_kind(err: &GoroutineError) -> &'static str {
    match err {
        GoroutineError::User(_) => "UserError",
        GoroutineError::RegistryMismatch => "RegistryMismatch",
        GoroutineError::InvalidArgument(_) => "InvalidArgument",
        GoroutineError::ThreadMisuse => "ThreadMisuse",
        GoroutineError::Config(_) => "ConfigError",
        GoroutineError::Transport(_) => "TransportFailure",
        GoroutineError::Io(_) => "IoError",
    }
}

/// Encode a failed call's error as a `Value::Error`, the same value codec
/// used for every other payload crossing the wire.
pub fn encode_error(err: &GoroutineError) -> Value {
    Value::Error {
        name: error_kind(err).to_string(),
        message: err.to_string(),
        stack: None,
    }
}

/// Rebuild a [`GoroutineError`] from a decoded `Value::Error`, matching on
/// the name tag [`encode_error`] wrote so the original taxonomy survives
/// the trip across the wire instead of collapsing to a single variant.
pub fn decode_error(value: Value) -> GoroutineError {
    match value {
        Value::Error { name, message, .. } => match name.as_str() {
            "RegistryMismatch" => GoroutineError::RegistryMismatch,
            "InvalidArgument" => GoroutineError::InvalidArgument(message),
            "ThreadMisuse" => GoroutineError::ThreadMisuse,
            "ConfigError" => GoroutineError::Config(message),
            "TransportFailure" => GoroutineError::Transport(message),
            _ => GoroutineError::User(message),
        },
        other => GoroutineError::User(format!("malformed error payload: {other:?}")),
    }
}

const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

/// Write a length-prefixed `bincode` frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, msg: &Message) -> std::io::Result<()> {
    let body = bincode::serialize(msg)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    w.write_all(&(body.len() as u32).to_be_bytes()).await?;
    w.write_all(&body).await?;
    w.flush().await
}

/// Read one length-prefixed `bincode` frame, or `Ok(None)` on clean EOF.
///
/// A frame that fails to decode is treated as a protocol error, not
/// silently dropped — unlike an unrecognized `Message` variant received
/// intact, which the worker runtime ignores rather than treats as fatal.
pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> std::io::Result<Option<Message>> {
    let mut len_buf = [0u8; 4];
    match r.read_exact(&mut len_buf).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds the {MAX_FRAME_BYTES} byte limit"),
        ));
    }
    let mut body = vec![0u8; len as usize];
    r.read_exact(&mut body).await?;
    let msg = bincode::deserialize(&body)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(Some(msg))
}
