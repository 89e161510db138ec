//! # Foreign Engine Boundary
//!
//! This module defines how the pool sees the native engine it fronts. The pool
//! never looks inside the engine; it only drives its lifecycle:
//!
//! 1. `startup(n)` runs once on the engine's own main thread. Returning `Ok`
//!    signals that bootstrap is complete.
//! 2. `create_context(i)` runs once on each worker's dedicated OS thread.
//! 3. `intern(key)` is called while building the symbol caches.
//! 4. `teardown_context(i, ctx)` runs on the same worker thread during drain.
//! 5. `shutdown()` runs on the engine main thread after every worker is done.
//!
//! ## Threading
//!
//! `Context` is deliberately not required to be `Send`: it is created, used and
//! destroyed on exactly one OS thread. `Symbol` values are shared read-only by
//! every request handler and must be `Send + Sync`.

use thiserror::Error;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures reported by the native engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Process-wide bootstrap did not complete.
    #[error("Engine bootstrap failed: {0}")]
    Startup(String),

    /// A per-thread execution context could not be created.
    #[error("Failed to create engine context for worker {index}: {reason}")]
    Context { index: usize, reason: String },

    /// Catch-all for other engine errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A foreign, non-reentrant execution engine.
pub trait Engine: Send + Sync + 'static {
    /// One native execution context, pinned to a single OS thread.
    type Context: 'static;

    /// A pre-interned, immutable native string handle.
    type Symbol: Send + Sync + 'static;

    /// Bootstraps the engine for `num_workers` worker threads.
    fn startup(&self, num_workers: usize) -> EngineResult<()>;

    /// Tears the engine down once every worker context is gone.
    fn shutdown(&self);

    /// Creates the execution context for worker `index`.
    fn create_context(&self, index: usize) -> EngineResult<Self::Context>;

    /// Destroys the execution context of worker `index`.
    fn teardown_context(&self, index: usize, context: Self::Context);

    /// Interns `key` as a persistent native string.
    fn intern(&self, key: &str) -> Self::Symbol;
}
