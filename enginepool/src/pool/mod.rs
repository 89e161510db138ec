//! # Engine Worker Pool
//!
//! A fixed pool of dedicated OS threads, each permanently bound to one context
//! of a foreign, non-reentrant engine, coordinated from async code.
//!
//! ## Key Concepts
//! - Supervisor: provisions the pool, admits work with `acquire()` and shuts
//!   it down with `drain()`
//! - Worker: one thread, one engine context, one handler lock
//! - Thread state machine: awaitable lifecycle shared by both
//! - Symbol cache: strings the engine interned once at startup
//!
//! ## Design Principles
//! - Mutual exclusion: an engine context is reachable only through the
//!   `WorkerGuard` holding its worker's lock
//! - Deterministic startup: topology is final before the engine boots
//! - Cooperative shutdown: in-flight work always finishes; nothing is
//!   preempted, lost or handed out twice

pub mod config;
pub mod signal;
pub mod state;
pub mod supervisor;
pub mod symbols;
pub mod worker;

pub use config::PoolConfig;
pub use signal::Signal;
pub use state::StateMachine;
pub use supervisor::Supervisor;
pub use symbols::{header_variable_name, SymbolCache, COMMON_REQUEST_HEADERS, KNOWN_SERVER_KEYS};
pub use worker::{Worker, WorkerGuard};
