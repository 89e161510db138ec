//! # Pool Supervisor
//!
//! The single coordinator that provisions, starts and tears down the worker
//! pool, and the only owner of the worker array and symbol caches.
//!
//! ## Startup Order
//! 1. Every worker record is moved to `Inactive` before the engine runs, so
//!    engine-side bootstrap observes the final topology
//! 2. The engine main thread runs `Engine::startup` and reports `Ready`
//! 3. Each worker thread creates its native context
//! 4. Symbol caches are built
//! 5. `acquire()` starts admitting work
//!
//! Any failure aborts the sequence, tears down whatever already started and
//! leaves the supervisor and every worker in `Done`.
//!
//! ## Drain Protocol
//! Phase 1 takes every worker's handler lock (waiting out in-flight work),
//! moves the worker to `ShuttingDown` and closes its drain signal. Phase 2
//! closes the supervisor's done signal, waits for every worker to reach `Done`,
//! releases the locks and finally drives the supervisor through
//! `ShuttingDown → Done`.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::JoinHandle;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::oneshot;
use tracing::{Instrument, debug, error, info, warn};
use uuid::Uuid;

use enginepool_api::{Engine, EngineResult, PoolError, PoolLifecycle, PoolResult, ThreadState};

use crate::logging;
use crate::pool::config::PoolConfig;
use crate::pool::signal::Signal;
use crate::pool::state::StateMachine;
use crate::pool::symbols::SymbolCache;
use crate::pool::worker::{panic_message, Worker, WorkerGuard};

/// Owner of a fixed pool of engine-bound worker threads.
pub struct Supervisor<E: Engine> {
    /// Instance id, recorded on every span
    id: Uuid,

    config: PoolConfig,

    engine: Arc<E>,

    /// Shared with the engine main thread, which drives `Ready` and `Done`
    state: Arc<StateMachine>,

    /// Closed when drain enters its second phase
    done: Signal,

    /// Fixed at construction
    workers: Vec<Arc<Worker<E>>>,

    common_headers: OnceLock<SymbolCache<E::Symbol>>,

    server_keys: OnceLock<SymbolCache<E::Symbol>>,

    main_thread: Mutex<Option<JoinHandle<()>>>,

    /// Set by the first `initialize` call
    started: AtomicBool,

    /// Set by the first `drain` call
    draining: AtomicBool,
}

impl<E: Engine> fmt::Debug for Supervisor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("id", &self.id)
            .field("state", &self.state.get())
            .field("num_workers", &self.workers.len())
            .field("draining", &self.draining.load(Ordering::Relaxed))
            .finish()
    }
}

impl<E: Engine> Supervisor<E> {
    /// Creates a supervisor for `engine`.
    ///
    /// Allocates the worker records but starts nothing; call
    /// [`initialize`](Self::initialize) next.
    pub fn new(engine: Arc<E>, config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        let workers = (0..config.num_workers)
            .map(|index| Arc::new(Worker::new(index)))
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            config,
            engine,
            state: Arc::new(StateMachine::new()),
            done: Signal::new(),
            workers,
            common_headers: OnceLock::new(),
            server_keys: OnceLock::new(),
            main_thread: Mutex::new(None),
            started: AtomicBool::new(false),
            draining: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    pub fn state(&self) -> ThreadState {
        self.state.get()
    }

    /// Snapshot of every worker's state, by index.
    pub fn worker_states(&self) -> Vec<ThreadState> {
        self.workers.iter().map(|w| w.state().get()).collect()
    }

    pub fn worker(&self, index: usize) -> Option<&Worker<E>> {
        self.workers.get(index).map(Arc::as_ref)
    }

    /// Closed once drain reaches its second phase.
    pub fn done_signal(&self) -> &Signal {
        &self.done
    }

    /// Whether `acquire()` currently admits work.
    pub fn is_ready(&self) -> bool {
        self.state.is(ThreadState::Ready)
            && self.server_keys.get().is_some()
            && !self.draining.load(Ordering::Acquire)
    }

    /// Interned handle for a common request header, by lowercase name.
    pub fn common_header(&self, header: &str) -> Option<&E::Symbol> {
        self.common_headers.get()?.get(header)
    }

    /// Interned handle for a well-known server variable.
    pub fn server_key(&self, key: &str) -> Option<&E::Symbol> {
        self.server_keys.get()?.get(key)
    }

    /// Provisions the workers, bootstraps the engine and builds the symbol
    /// caches. Valid exactly once per instance.
    pub async fn initialize(&self) -> PoolResult<()> {
        let span = crate::pool_span!(self.id, self.workers.len());
        self.initialize_inner().instrument(span).await
    }

    async fn initialize_inner(&self) -> PoolResult<()> {
        if self.started.swap(true, Ordering::AcqRel) || !self.state.is(ThreadState::Uninitialized) {
            return Err(PoolError::StateProtocolViolation {
                current: self.state.get(),
                requested: ThreadState::Ready,
            });
        }

        // Must precede engine startup: the engine inspects the topology.
        for worker in &self.workers {
            worker.state().request_safe_state_change(ThreadState::Inactive)?;
        }
        debug!(num_workers = self.workers.len(), "workers provisioned");

        if let Err(e) = self.start_engine().await {
            crate::log_error!(e, phase = "engine startup");
            self.state.set(ThreadState::Done);
            for worker in &self.workers {
                worker.state().set(ThreadState::Done);
            }
            self.join_main_thread().await;
            return Err(e);
        }

        if let Err(e) = self.start_workers().await {
            crate::log_error!(e, phase = "worker startup");
            if let Err(teardown) = self.teardown().await {
                crate::log_error!(teardown, phase = "startup rollback");
            }
            return Err(e);
        }

        let _ = self.common_headers.set(SymbolCache::common_headers(&*self.engine));
        let _ = self.server_keys.set(SymbolCache::server_keys(&*self.engine));

        info!(num_workers = self.workers.len(), "pool ready");
        Ok(())
    }

    /// Hands out the lowest-indexed inactive worker.
    ///
    /// A released worker turns Inactive just before its lock is freed; a
    /// worker caught in that gap is retried briefly rather than skipped.
    ///
    /// Never blocks on in-flight work. When every worker is busy this fails with
    /// `ResourceExhaustion`; callers translate that into backpressure.
    pub fn acquire(&self) -> PoolResult<WorkerGuard<E>> {
        if !self.is_ready() {
            let current = if self.draining.load(Ordering::Acquire) {
                ThreadState::ShuttingDown
            } else {
                self.state.get()
            };
            return Err(PoolError::StateProtocolViolation {
                current,
                requested: ThreadState::Active,
            });
        }

        for worker in &self.workers {
            if let Some(guard) = worker.try_acquire() {
                debug!(pool = %self.id, worker = guard.index(), "worker acquired");
                return Ok(guard);
            }
        }

        warn!(pool = %self.id, num_workers = self.workers.len(), "no inactive worker available");
        Err(PoolError::ResourceExhaustion {
            num_workers: self.workers.len(),
        })
    }

    /// Graceful two-phase shutdown. In-flight work finishes first; no worker
    /// is handed out again once drain holds its lock.
    pub async fn drain(&self) -> PoolResult<()> {
        let span = crate::pool_span!(self.id, self.workers.len());
        self.drain_inner().instrument(span).await
    }

    async fn drain_inner(&self) -> PoolResult<()> {
        if !self.is_ready() || self.draining.swap(true, Ordering::AcqRel) {
            let current = if self.draining.load(Ordering::Acquire) {
                ThreadState::ShuttingDown
            } else {
                self.state.get()
            };
            return Err(PoolError::StateProtocolViolation {
                current,
                requested: ThreadState::ShuttingDown,
            });
        }

        info!("draining pool");
        self.teardown().await?;
        info!("pool drained");
        Ok(())
    }

    async fn start_engine(&self) -> PoolResult<()> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let engine = Arc::clone(&self.engine);
        let state = Arc::clone(&self.state);
        let num_workers = self.workers.len();
        let dispatch = logging::current_subscriber();

        let handle = std::thread::Builder::new()
            .name(self.config.engine_thread_name.clone())
            .spawn(move || {
                tracing::dispatcher::with_default(&dispatch, || {
                    engine_thread_main(engine, state, num_workers, ready_tx);
                });
            })
            .map_err(|e| PoolError::StartupFailure(format!("failed to spawn engine main thread: {e}")))?;
        *self.main_thread.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(PoolError::StartupFailure(e.to_string())),
            Err(_) => {
                return Err(PoolError::StartupFailure(
                    "engine main thread exited before signalling readiness".to_string(),
                ));
            }
        }

        self.state.wait_for(ThreadState::Ready).await;
        debug!("engine bootstrap complete");
        Ok(())
    }

    async fn start_workers(&self) -> PoolResult<()> {
        let mut boots = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            let name = self.config.worker_thread_name(worker.index());
            boots.push(worker.start(Arc::clone(&self.engine), name)?);
        }

        let mut failure = None;
        for (worker, boot) in self.workers.iter().zip(join_all(boots).await) {
            let reason = match boot {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(_) => {
                    // The thread died without reporting; nobody else will mark it.
                    worker.state().set(ThreadState::Done);
                    format!("worker {} exited before creating its context", worker.index())
                }
            };
            failure.get_or_insert(reason);
        }

        match failure {
            Some(reason) => Err(PoolError::StartupFailure(reason)),
            None => Ok(()),
        }
    }

    async fn teardown(&self) -> PoolResult<()> {
        let mut handlers = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            let handler = worker.lock_handler().await;
            if let Err(e) = worker.state().request_safe_state_change(ThreadState::ShuttingDown) {
                debug!(worker = worker.index(), error = %e, "worker already stopped");
            }
            worker.drain_signal().close();
            if !worker.is_started() {
                worker.state().set(ThreadState::Done);
            }
            handlers.push(handler);
        }

        self.done.close();
        join_all(self.workers.iter().map(|w| w.state().wait_for(ThreadState::Done))).await;
        drop(handlers);

        for worker in &self.workers {
            if let Some(handle) = worker.take_thread() {
                join_thread(handle, format!("worker {}", worker.index())).await;
            }
        }

        self.state.request_safe_state_change(ThreadState::ShuttingDown)?;
        self.state.wait_for(ThreadState::Done).await;
        self.join_main_thread().await;
        Ok(())
    }

    async fn join_main_thread(&self) {
        let handle = self.main_thread.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            join_thread(handle, "engine main".to_string()).await;
        }
    }
}

impl<E: Engine> Drop for Supervisor<E> {
    fn drop(&mut self) {
        if self.state.is(ThreadState::Ready) {
            warn!(pool = %self.id, "supervisor dropped without drain; engine threads keep running");
        }
    }
}

#[async_trait]
impl<E: Engine> PoolLifecycle for Supervisor<E> {
    async fn initialize(&self) -> PoolResult<()> {
        Supervisor::initialize(self).await
    }

    async fn drain(&self) -> PoolResult<()> {
        Supervisor::drain(self).await
    }

    fn num_workers(&self) -> usize {
        Supervisor::num_workers(self)
    }

    fn state(&self) -> ThreadState {
        Supervisor::state(self)
    }

    fn is_ready(&self) -> bool {
        Supervisor::is_ready(self)
    }
}

/// Body of the engine main thread. It must outlive every worker thread.
fn engine_thread_main<E: Engine>(
    engine: Arc<E>,
    state: Arc<StateMachine>,
    num_workers: usize,
    ready_tx: oneshot::Sender<EngineResult<()>>,
) {
    if let Err(e) = engine.startup(num_workers) {
        let _ = ready_tx.send(Err(e));
        state.set(ThreadState::Done);
        return;
    }

    state.set(ThreadState::Ready);
    let _ = ready_tx.send(Ok(()));

    state.wait_for_blocking(ThreadState::ShuttingDown);
    match panic::catch_unwind(AssertUnwindSafe(|| engine.shutdown())) {
        Ok(()) => info!("engine shut down"),
        Err(payload) => {
            error!(panic = %panic_message(payload.as_ref()), "engine shutdown panicked");
        }
    }
    state.set(ThreadState::Done);
}

async fn join_thread(handle: JoinHandle<()>, name: String) {
    match tokio::task::spawn_blocking(move || handle.join()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => error!(thread = %name, "thread panicked"),
        Err(e) => error!(thread = %name, error = %e, "failed to join thread"),
    }
}
