//! # Thread States
//!
//! The lifecycle vocabulary shared by pool workers and the supervisor that owns
//! them. Workers move through `Uninitialized → Inactive ⇄ Active → ShuttingDown
//! → Done`; the supervisor moves through `Uninitialized → Ready → ShuttingDown →
//! Done`.

use std::fmt;

/// Lifecycle state of a worker thread or of the pool supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadState {
    /// Allocated but not yet provisioned
    Uninitialized,
    /// Idle and safe to hand out (workers only)
    Inactive,
    /// Handed out to exactly one caller (workers only)
    Active,
    /// Engine bootstrap completed (supervisor only)
    Ready,
    /// Shutdown has begun; never handed out again
    ShuttingDown,
    /// Terminal
    Done,
}

impl ThreadState {
    /// States from which a guarded transition into `self` is permitted.
    ///
    /// `Uninitialized` can never be re-entered and `Done` is only reachable
    /// through `ShuttingDown`.
    pub fn permitted_predecessors(self) -> &'static [ThreadState] {
        use ThreadState::*;
        match self {
            Uninitialized => &[],
            Inactive => &[Uninitialized, Active],
            Active => &[Inactive],
            Ready => &[Uninitialized],
            ShuttingDown => &[Uninitialized, Inactive, Active, Ready],
            Done => &[ShuttingDown],
        }
    }

    /// Whether a guarded transition from `self` to `next` is permitted.
    pub fn can_transition_to(self, next: ThreadState) -> bool {
        next.permitted_predecessors().contains(&self)
    }

    /// Whether this is the terminal state.
    pub fn is_terminal(self) -> bool {
        self == ThreadState::Done
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThreadState::Uninitialized => "uninitialized",
            ThreadState::Inactive => "inactive",
            ThreadState::Active => "active",
            ThreadState::Ready => "ready",
            ThreadState::ShuttingDown => "shutting down",
            ThreadState::Done => "done",
        };
        f.write_str(name)
    }
}
