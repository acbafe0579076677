//! Error taxonomy for the crate, following the one-variant-per-failure-mode
//! style used throughout `cylo`'s error module.

use thiserror::Error;

/// Every way a call into this crate can fail.
///
/// Variants are deliberately coarse — callers are expected to match on the
/// taxonomy (user error vs. infrastructure error), not on exact wording.
#[derive(Debug, Error)]
pub enum GoroutineError {
    /// The registered function itself returned or raised an error.
    #[error("{0}")]
    User(String),

    /// The worker's registry entry at the targeted index is absent or its
    /// signature doesn't match the caller's — the main process and this
    /// worker were bootstrapped with diverged registration code. The
    /// message is fixed verbatim rather than naming the function, matching
    /// upstream's contract.
    #[error("Goroutine registry malformed, function call cannot be performed")]
    RegistryMismatch,

    /// A call argument or registry operation was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A goroutine API was invoked from a thread other than the one that
    /// called `start()`.
    #[error("goroutine APIs may only be used from the thread that called start()")]
    ThreadMisuse,

    /// `StartOptions`/`WorkerOptions` could not be satisfied.
    #[error("configuration error: {0}")]
    Config(String),

    /// The underlying worker transport (thread or subprocess) failed.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GoroutineError>;
