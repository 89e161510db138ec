use enginepool_api::state::ThreadState;
use enginepool_api::state::ThreadState::*;

#[test]
fn test_worker_transitions() {
    assert!(Uninitialized.can_transition_to(Inactive));
    assert!(Inactive.can_transition_to(Active));
    assert!(Active.can_transition_to(Inactive));
    assert!(Active.can_transition_to(ShuttingDown));
    assert!(Inactive.can_transition_to(ShuttingDown));
    assert!(ShuttingDown.can_transition_to(Done));
}

#[test]
fn test_supervisor_transitions() {
    assert!(Uninitialized.can_transition_to(Ready));
    assert!(Ready.can_transition_to(ShuttingDown));
    assert!(!Ready.can_transition_to(Ready));
}

#[test]
fn test_forbidden_transitions() {
    assert!(!Done.can_transition_to(Active));
    assert!(!Done.can_transition_to(ShuttingDown));
    assert!(!ShuttingDown.can_transition_to(Active));
    assert!(!Active.can_transition_to(Active));
    assert!(!Inactive.can_transition_to(Done));

    // Nothing returns to Uninitialized
    for state in [Inactive, Active, Ready, ShuttingDown, Done] {
        assert!(!state.can_transition_to(Uninitialized));
    }
}

#[test]
fn test_display() {
    assert_eq!(ThreadState::ShuttingDown.to_string(), "shutting down");
    assert_eq!(ThreadState::Inactive.to_string(), "inactive");
    assert!(Done.is_terminal());
    assert!(!ShuttingDown.is_terminal());
}
