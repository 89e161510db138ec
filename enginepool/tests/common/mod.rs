// Shared test fixtures: an in-process stand-in for the native engine.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::Duration;

use enginepool::logging;
use enginepool::{Engine, EngineError, EngineResult, PoolConfig, Supervisor};

/// Default upper bound for lifecycle calls in tests
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-worker context. Records the thread it was created on.
#[derive(Debug)]
pub struct MockContext {
    pub index: usize,
    pub thread: ThreadId,
    pub jobs_run: usize,
}

#[derive(Debug, Default)]
pub struct MockEngine {
    pub fail_startup: bool,
    pub fail_context: Option<usize>,
    pub panic_on_teardown: bool,
    pub panic_on_shutdown: bool,
    pub startup_calls: Mutex<Vec<usize>>,
    pub created: Mutex<Vec<usize>>,
    pub torn_down: Mutex<Vec<usize>>,
    pub shut_down: AtomicBool,
    pub interned: AtomicUsize,
}

impl MockEngine {
    pub fn failing_startup() -> Self {
        Self {
            fail_startup: true,
            ..Default::default()
        }
    }

    pub fn failing_context(index: usize) -> Self {
        Self {
            fail_context: Some(index),
            ..Default::default()
        }
    }

    pub fn panicking_teardown() -> Self {
        Self {
            panic_on_teardown: true,
            ..Default::default()
        }
    }

    pub fn panicking_shutdown() -> Self {
        Self {
            panic_on_shutdown: true,
            ..Default::default()
        }
    }

    pub fn created(&self) -> Vec<usize> {
        let mut created = self.created.lock().unwrap().clone();
        created.sort_unstable();
        created
    }

    pub fn torn_down(&self) -> Vec<usize> {
        let mut torn_down = self.torn_down.lock().unwrap().clone();
        torn_down.sort_unstable();
        torn_down
    }
}

impl Engine for MockEngine {
    type Context = MockContext;
    type Symbol = Arc<str>;

    fn startup(&self, num_workers: usize) -> EngineResult<()> {
        self.startup_calls.lock().unwrap().push(num_workers);
        if self.fail_startup {
            return Err(EngineError::Startup("mock startup failure".to_string()));
        }
        Ok(())
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        if self.panic_on_shutdown {
            panic!("mock shutdown panic");
        }
    }

    fn create_context(&self, index: usize) -> EngineResult<MockContext> {
        if self.fail_context == Some(index) {
            return Err(EngineError::Context {
                index,
                reason: "mock context failure".to_string(),
            });
        }
        self.created.lock().unwrap().push(index);
        Ok(MockContext {
            index,
            thread: std::thread::current().id(),
            jobs_run: 0,
        })
    }

    fn teardown_context(&self, index: usize, context: MockContext) {
        assert_eq!(context.thread, std::thread::current().id());
        self.torn_down.lock().unwrap().push(index);
        if self.panic_on_teardown {
            panic!("mock teardown panic");
        }
    }

    fn intern(&self, key: &str) -> Arc<str> {
        self.interned.fetch_add(1, Ordering::SeqCst);
        Arc::from(key)
    }
}

/// Builds and initializes a pool of `num_workers` over a fresh mock engine.
pub async fn ready_pool(num_workers: usize) -> (Arc<MockEngine>, Arc<Supervisor<MockEngine>>) {
    ready_pool_with(MockEngine::default(), num_workers).await
}

/// Builds and initializes a pool of `num_workers` over `engine`.
pub async fn ready_pool_with(
    engine: MockEngine,
    num_workers: usize,
) -> (Arc<MockEngine>, Arc<Supervisor<MockEngine>>) {
    logging::init_test();
    let engine = Arc::new(engine);
    let supervisor = Supervisor::new(Arc::clone(&engine), PoolConfig::with_workers(num_workers))
        .expect("valid config");
    tokio::time::timeout(TEST_TIMEOUT, supervisor.initialize())
        .await
        .expect("initialize timed out")
        .expect("initialize failed");
    (engine, Arc::new(supervisor))
}

/// Drains `supervisor`, failing the test if it takes too long.
pub async fn drain(supervisor: &Supervisor<MockEngine>) {
    tokio::time::timeout(TEST_TIMEOUT, supervisor.drain())
        .await
        .expect("drain timed out")
        .expect("drain failed");
}
