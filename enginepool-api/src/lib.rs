//! # Engine Pool API
//!
//! Boundary vocabulary for pools of dedicated OS threads that front a foreign,
//! non-reentrant execution engine. Each engine context may be entered by one
//! caller at a time and must live on a single OS thread for its entire life.
//!
//! ## Core Components
//!
//! - **Engine**: the foreign engine as seen by the pool (bootstrap, per-thread
//!   contexts, interned strings)
//! - **Thread states**: the lifecycle shared by workers and their supervisor
//! - **Errors**: the failure taxonomy surfaced to the owning process
//! - **Lifecycle**: the startup/shutdown seam used by serving front-ends
//!
//! ## Module Organization
//!
//! - [`engine`]: the `Engine` trait and `EngineError`
//! - [`state`]: `ThreadState`
//! - [`errors`]: `PoolError` and `PoolResult`
//! - [`lifecycle`]: the `PoolLifecycle` trait

pub mod engine;
pub mod errors;
pub mod lifecycle;
pub mod state;

pub use engine::{Engine, EngineError, EngineResult};
pub use errors::{PoolError, PoolResult};
pub use lifecycle::PoolLifecycle;
pub use state::ThreadState;
