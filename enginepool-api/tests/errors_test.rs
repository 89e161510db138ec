use enginepool_api::engine::EngineError;
use enginepool_api::errors::PoolError;
use enginepool_api::state::ThreadState;
use anyhow::anyhow;
use std::error::Error;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_failure() {
        let error = PoolError::StartupFailure("engine exited".to_string());

        assert_eq!(error.to_string(), "Pool startup failed: engine exited");
        assert!(error.is_fatal());
        assert!(error.source().is_none());
    }

    #[test]
    fn test_resource_exhaustion() {
        let error = PoolError::ResourceExhaustion { num_workers: 4 };

        assert_eq!(
            error.to_string(),
            "No inactive worker available (pool size: 4)"
        );
        assert!(!error.is_fatal());
    }

    #[test]
    fn test_state_protocol_violation() {
        let error = PoolError::StateProtocolViolation {
            current: ThreadState::Done,
            requested: ThreadState::Active,
        };

        assert_eq!(error.to_string(), "Illegal state transition from done to active");
        assert!(!error.is_fatal());
    }

    #[test]
    fn test_execution_failed() {
        let error = PoolError::ExecutionFailed {
            index: 2,
            reason: "job panicked".to_string(),
        };

        assert_eq!(error.to_string(), "Execution failed on worker 2: job panicked");
    }

    #[test]
    fn test_other_error_is_transparent() {
        let error = PoolError::from(anyhow!("something odd"));

        assert_eq!(error.to_string(), "something odd");
    }

    #[test]
    fn test_engine_errors() {
        assert_eq!(
            EngineError::Startup("no ini".to_string()).to_string(),
            "Engine bootstrap failed: no ini"
        );
        assert_eq!(
            EngineError::Context { index: 3, reason: "tsrm".to_string() }.to_string(),
            "Failed to create engine context for worker 3: tsrm"
        );
    }
}
