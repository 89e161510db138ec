//! # Worker Thread Module
//!
//! A worker is one fixed-identity binding between the async side of the pool and
//! one native engine context living on its own dedicated OS thread.
//!
//! ## Key Concepts
//! - Handler lock: an async mutex guarding the job sender. Holding it is the
//!   only way to reach the native context.
//! - Drain signal: closed once by the supervisor; wakes the worker thread so it
//!   can tear its context down and reach `Done`.
//! - `WorkerGuard`: the scoped capability handed out by `acquire()`. Dropping it
//!   returns the worker to `Inactive` and releases the lock.
//!
//! ## Worker Thread Lifecycle
//! 1. Build a current-thread Tokio runtime
//! 2. Create the native context and report the boot result
//! 3. Run jobs until the drain signal closes
//! 4. Tear the context down and move `ShuttingDown → Done`

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use tokio::sync::{oneshot, Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{error, info, warn};

use enginepool_api::{Engine, EngineError, EngineResult, PoolError, PoolResult, ThreadState};

use crate::logging;
use crate::pool::signal::Signal;
use crate::pool::state::StateMachine;

/// How often `try_acquire` re-checks the lock of a worker that is Inactive
/// but still locked by a releasing guard.
const RELEASE_RETRIES: usize = 64;

/// Unit of work shipped to a worker thread.
type Job<E> = Box<dyn FnOnce(&mut <E as Engine>::Context) + Send + 'static>;

/// One worker slot of the pool.
pub struct Worker<E: Engine> {
    /// Stable index in `[0, N)`
    index: usize,

    /// Lifecycle state
    state: StateMachine,

    /// Handler lock; guards the only way into the native context
    handler: Arc<AsyncMutex<flume::Sender<Job<E>>>>,

    /// Closed once when shutdown begins for this worker
    drain: Signal,

    /// Receiving end of the job channel, handed to the thread on start
    jobs: Mutex<Option<flume::Receiver<Job<E>>>>,

    /// Dedicated OS thread
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl<E: Engine> fmt::Debug for Worker<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("index", &self.index)
            .field("state", &self.state.get())
            .field("draining", &self.drain.is_closed())
            .finish()
    }
}

impl<E: Engine> Worker<E> {
    /// Allocates a worker record in `Uninitialized`. No thread runs yet.
    pub(crate) fn new(index: usize) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            index,
            state: StateMachine::new(),
            handler: Arc::new(AsyncMutex::new(tx)),
            drain: Signal::new(),
            jobs: Mutex::new(Some(rx)),
            thread: Mutex::new(None),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> &StateMachine {
        &self.state
    }

    pub(crate) fn drain_signal(&self) -> &Signal {
        &self.drain
    }

    /// Spawns the dedicated OS thread.
    ///
    /// The returned receiver resolves once the native context exists, or with
    /// the engine error that prevented it.
    pub(crate) fn start(
        self: &Arc<Self>,
        engine: Arc<E>,
        thread_name: String,
    ) -> PoolResult<oneshot::Receiver<EngineResult<()>>> {
        let jobs = self
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| {
                PoolError::StartupFailure(format!("worker {} was already started", self.index))
            })?;

        let (booted_tx, booted_rx) = oneshot::channel();
        let worker = Arc::clone(self);
        let dispatch = logging::current_subscriber();

        let handle = std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                tracing::dispatcher::with_default(&dispatch, || {
                    Self::worker_thread_main(worker, engine, jobs, booted_tx);
                });
            })
            .map_err(|e| {
                // The job receiver went down with the closure; nothing will
                // ever drive this worker to Done.
                self.state.set(ThreadState::Done);
                PoolError::StartupFailure(format!(
                    "failed to spawn thread for worker {}: {}",
                    self.index, e
                ))
            })?;

        *self.thread.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(booted_rx)
    }

    /// Whether `start` has handed the job channel to a thread.
    pub(crate) fn is_started(&self) -> bool {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    /// Takes the OS thread handle so the supervisor can join it.
    pub(crate) fn take_thread(&self) -> Option<JoinHandle<()>> {
        self.thread.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Locks the handler, waiting for any in-flight holder to release it.
    pub(crate) async fn lock_handler(&self) -> OwnedMutexGuard<flume::Sender<Job<E>>> {
        Arc::clone(&self.handler).lock_owned().await
    }

    /// Hands the worker out if it is idle and nobody holds its lock.
    pub(crate) fn try_acquire(self: &Arc<Self>) -> Option<WorkerGuard<E>> {
        if !self.state.is(ThreadState::Inactive) {
            return None;
        }
        // A releasing guard marks the worker Inactive just before it unlocks,
        // so an Inactive worker with a held lock is about to become free.
        let mut attempts = 0;
        let handler = loop {
            match Arc::clone(&self.handler).try_lock_owned() {
                Ok(handler) => break handler,
                Err(_) if attempts < RELEASE_RETRIES && self.state.is(ThreadState::Inactive) => {
                    attempts += 1;
                    std::thread::yield_now();
                }
                Err(_) => return None,
            }
        };
        self.state
            .request_safe_state_change(ThreadState::Active)
            .ok()?;

        Some(WorkerGuard {
            worker: Arc::clone(self),
            handler,
        })
    }

    fn worker_thread_main(
        worker: Arc<Self>,
        engine: Arc<E>,
        jobs: flume::Receiver<Job<E>>,
        booted_tx: oneshot::Sender<EngineResult<()>>,
    ) {
        let index = worker.index;

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                let _ = booted_tx.send(Err(EngineError::Context {
                    index,
                    reason: format!("failed to build runtime: {e}"),
                }));
                worker.state.set(ThreadState::Done);
                return;
            }
        };

        let booted = runtime.block_on(async {
            let mut context = match engine.create_context(index) {
                Ok(context) => context,
                Err(e) => {
                    error!(worker = index, error = %e, "engine context creation failed");
                    let _ = booted_tx.send(Err(e));
                    return false;
                }
            };
            crate::log_worker!(index, "context created");
            let _ = booted_tx.send(Ok(()));

            loop {
                tokio::select! {
                    biased;
                    _ = worker.drain.closed() => break,
                    job = jobs.recv_async() => match job {
                        Ok(job) => {
                            let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(&mut context)));
                            if let Err(payload) = outcome {
                                error!(worker = index, panic = %panic_message(payload.as_ref()), "job panicked");
                            }
                        }
                        Err(_) => break,
                    },
                }
            }

            let torn_down =
                panic::catch_unwind(AssertUnwindSafe(|| engine.teardown_context(index, context)));
            match torn_down {
                Ok(()) => crate::log_worker!(index, "context torn down"),
                Err(payload) => {
                    error!(worker = index, panic = %panic_message(payload.as_ref()), "context teardown panicked");
                }
            }
            true
        });

        if !booted {
            worker.state.set(ThreadState::Done);
            return;
        }

        if let Err(e) = worker.state.request_safe_state_change(ThreadState::Done) {
            warn!(worker = index, error = %e, "worker left its loop outside of shutdown");
            worker.state.set(ThreadState::Done);
        }
        info!(worker = index, "worker thread finished");
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}

/// Exclusive access to one worker's native context.
///
/// Obtained from `Supervisor::acquire`. The context is reachable only through
/// [`execute`](Self::execute) while the guard is alive. Dropping the guard (or
/// calling [`release`](Self::release)) moves the worker back to `Inactive` and
/// releases its handler lock, on every exit path.
pub struct WorkerGuard<E: Engine> {
    worker: Arc<Worker<E>>,
    handler: OwnedMutexGuard<flume::Sender<Job<E>>>,
}

impl<E: Engine> fmt::Debug for WorkerGuard<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerGuard")
            .field("index", &self.worker.index)
            .finish()
    }
}

impl<E: Engine> WorkerGuard<E> {
    /// Index of the held worker.
    pub fn index(&self) -> usize {
        self.worker.index
    }

    /// Runs `f` against the native context on the worker's dedicated thread.
    pub async fn execute<F, R>(&mut self, f: F) -> PoolResult<R>
    where
        F: FnOnce(&mut E::Context) -> R + Send + 'static,
        R: Send + 'static,
    {
        let index = self.worker.index;
        let (result_tx, result_rx) = oneshot::channel();
        let job: Job<E> = Box::new(move |context: &mut E::Context| {
            let _ = result_tx.send(f(context));
        });

        self.handler
            .send_async(job)
            .await
            .map_err(|_| PoolError::ExecutionFailed {
                index,
                reason: "worker thread is gone".to_string(),
            })?;

        result_rx.await.map_err(|_| PoolError::ExecutionFailed {
            index,
            reason: "job did not complete".to_string(),
        })
    }

    /// Gives the worker back to the pool.
    pub fn release(self) {}
}

impl<E: Engine> Drop for WorkerGuard<E> {
    fn drop(&mut self) {
        // The lock is released after this body runs, once `handler` drops.
        if let Err(e) = self.worker.state.request_safe_state_change(ThreadState::Inactive) {
            error!(worker = self.worker.index, error = %e, "failed to release worker");
        }
    }
}
