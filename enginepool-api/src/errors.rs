//! # Pool Error Types
//!
//! Every failure surfaced by the pool is terminal for its scope; nothing is
//! retried inside the pool.
//!
//! - `StartupFailure`: initialization aborted, the process must not report
//!   readiness
//! - `ResourceExhaustion`: no idle worker at `acquire()` time; callers should
//!   turn this into backpressure
//! - `StateProtocolViolation`: an illegal lifecycle call, such as acquiring
//!   after drain or initializing twice
//!
//! ## Usage Example
//!
//! ```rust
//! use enginepool_api::errors::PoolError;
//!
//! fn status_code(error: &PoolError) -> u16 {
//!     match error {
//!         PoolError::ResourceExhaustion { .. } => 503,
//!         _ => 500,
//!     }
//! }
//! ```

use thiserror::Error;

use crate::state::ThreadState;

/// Result alias for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors surfaced by the worker pool.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The engine or a worker context failed to come up.
    #[error("Pool startup failed: {0}")]
    StartupFailure(String),

    /// Every worker is busy or already handed to shutdown.
    #[error("No inactive worker available (pool size: {num_workers})")]
    ResourceExhaustion { num_workers: usize },

    /// A lifecycle transition that the protocol does not allow.
    #[error("Illegal state transition from {current} to {requested}")]
    StateProtocolViolation {
        current: ThreadState,
        requested: ThreadState,
    },

    /// The pool configuration was rejected.
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// A job did not complete on its worker thread.
    #[error("Execution failed on worker {index}: {reason}")]
    ExecutionFailed { index: usize, reason: String },

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PoolError {
    /// Whether the error aborts the whole process rather than a single call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PoolError::StartupFailure(_))
    }
}
