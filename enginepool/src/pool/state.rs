//! # Thread State Machine
//!
//! An observable, awaitable `ThreadState` cell shared between the async side of
//! the pool and the dedicated OS threads it drives.
//!
//! ## Key Concepts
//! - `set`: unconditional overwrite, used for signals coming from the engine
//! - `request_safe_state_change`: guarded transition, rejects anything outside
//!   the permitted predecessor set
//! - `wait_for`: suspends the calling task until the state is reached
//!
//! Built on `tokio::sync::watch`, so every waiter observes the latest value and
//! a transition between a waiter's check and its wait is never missed.

use tokio::sync::watch;
use tracing::trace;

use enginepool_api::{PoolError, PoolResult, ThreadState};

/// Awaitable lifecycle state of a worker or of the supervisor.
#[derive(Debug)]
pub struct StateMachine {
    tx: watch::Sender<ThreadState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Creates a state machine in `Uninitialized`.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ThreadState::Uninitialized);
        Self { tx }
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> ThreadState {
        *self.tx.borrow()
    }

    /// Non-blocking check against `state`.
    pub fn is(&self, state: ThreadState) -> bool {
        *self.tx.borrow() == state
    }

    /// Overwrites the state and wakes every waiter.
    pub fn set(&self, state: ThreadState) {
        let previous = self.tx.send_replace(state);
        trace!(from = %previous, to = %state, "state set");
    }

    /// Moves to `next` if the current state is one of its permitted
    /// predecessors.
    ///
    /// The check and the write happen under the channel's write lock, so two
    /// concurrent requests can never both succeed from the same source state.
    pub fn request_safe_state_change(&self, next: ThreadState) -> PoolResult<()> {
        let mut current = ThreadState::Uninitialized;
        let changed = self.tx.send_if_modified(|state| {
            current = *state;
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        });

        if changed {
            trace!(from = %current, to = %next, "state changed");
            Ok(())
        } else {
            Err(PoolError::StateProtocolViolation {
                current,
                requested: next,
            })
        }
    }

    /// Waits until the state equals `state`. Returns at once if it already does.
    pub async fn wait_for(&self, state: ThreadState) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|current| *current == state).await;
    }

    /// Blocking variant of [`wait_for`](Self::wait_for) for dedicated OS
    /// threads that are not driven by an async runtime.
    pub fn wait_for_blocking(&self, state: ThreadState) {
        futures::executor::block_on(self.wait_for(state));
    }
}
