//! # Pool Lifecycle
//!
//! The seam through which the owning process starts and stops a pool without
//! knowing which engine it fronts.

use async_trait::async_trait;

use crate::errors::PoolResult;
use crate::state::ThreadState;

/// Startup and shutdown hooks of a worker pool.
#[async_trait]
pub trait PoolLifecycle: Send + Sync {
    /// Provisions every worker and bootstraps the engine.
    async fn initialize(&self) -> PoolResult<()>;

    /// Lets in-flight work finish, then tears every worker down.
    async fn drain(&self) -> PoolResult<()>;

    /// Fixed number of workers in the pool.
    fn num_workers(&self) -> usize;

    /// Current supervisor state.
    fn state(&self) -> ThreadState;

    /// Whether the pool currently admits work.
    fn is_ready(&self) -> bool;
}
