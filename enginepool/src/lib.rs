// Engine Pool
//
// A fixed-size pool of dedicated threads bridging async Rust code to a foreign,
// non-reentrant execution engine. Boundary types live in `enginepool-api`.

pub mod logging;
pub mod pool;

// Re-export commonly used types
pub use enginepool_api::{
    Engine, EngineError, EngineResult, PoolError, PoolLifecycle, PoolResult, ThreadState,
};
pub use pool::{PoolConfig, Supervisor, SymbolCache, WorkerGuard};
