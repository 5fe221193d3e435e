//! Busy/Cancel State Machine
//!
//! Tracks whether the commander is executing and whether a successor waits in
//! the single pending slot. The machine never terminates.

use crate::{motion, Admission};

/// Whether a command is currently executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyState {
    Idle,
    Executing,
}

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEvent {
    /// A new command was submitted
    Submitted,
    /// The executing command ran to its configured duration
    Completed,
    /// The executing gesture was cancelled
    Cancelled,
    /// The backend failed while executing
    Faulted,
    /// The most recent admission was taken back before reaching the worker
    Withdrawn,
}

/// Result of a state transition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Submission accepted
    Admitted(Admission),
    /// Submission rejected, both slots are taken
    Rejected,
    /// Terminal event with nothing pending, machine is idle again
    Released,
    /// Terminal event promoted the pending command to executing
    Promoted,
    /// Admission undone
    Withdrawn,
    /// Event does not apply to the current state
    Invalid { from: BusyState, event: DispatchEvent },
}

/// Admission and release bookkeeping for the dispatch queue
#[derive(Debug)]
pub struct BusyStateMachine {
    current_state: BusyState,
    queued: usize,
}

impl Default for BusyStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl BusyStateMachine {
    /// Create a new state machine in Idle state
    pub fn new() -> Self {
        Self {
            current_state: BusyState::Idle,
            queued: 0,
        }
    }

    /// Get current state
    pub fn state(&self) -> BusyState {
        self.current_state
    }

    pub fn is_busy(&self) -> bool {
        self.current_state == BusyState::Executing
    }

    /// Number of commands waiting behind the executing one
    pub fn queued(&self) -> usize {
        self.queued
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: DispatchEvent) -> TransitionResult {
        use BusyState::*;
        use DispatchEvent::*;

        match (self.current_state, event) {
            (Idle, Submitted) => {
                self.current_state = Executing;
                TransitionResult::Admitted(Admission::Running)
            }
            (Executing, Submitted) => {
                if self.queued < motion::QUEUE_CAPACITY {
                    self.queued += 1;
                    TransitionResult::Admitted(Admission::Queued)
                } else {
                    TransitionResult::Rejected
                }
            }
            (Executing, Completed | Cancelled | Faulted) => {
                if self.queued > 0 {
                    self.queued -= 1;
                    TransitionResult::Promoted
                } else {
                    self.current_state = Idle;
                    TransitionResult::Released
                }
            }
            (Executing, Withdrawn) => {
                if self.queued > 0 {
                    self.queued -= 1;
                } else {
                    self.current_state = Idle;
                }
                TransitionResult::Withdrawn
            }
            (Idle, Completed | Cancelled | Faulted | Withdrawn) => TransitionResult::Invalid {
                from: self.current_state,
                event,
            },
        }
    }
}

/// Check if a transition from one state to another is valid
pub fn is_valid_transition(from: BusyState, to: BusyState) -> bool {
    use BusyState::*;

    match (from, to) {
        // Submissions while executing and promotions keep the machine busy
        (a, b) if a == b => true,
        (Idle, Executing) => true,
        (Executing, Idle) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let fsm = BusyStateMachine::new();
        assert_eq!(fsm.state(), BusyState::Idle);
        assert!(!fsm.is_busy());
        assert_eq!(fsm.queued(), 0);
    }

    #[test]
    fn test_admission_order() {
        let mut fsm = BusyStateMachine::new();

        let result = fsm.process_event(DispatchEvent::Submitted);
        assert_eq!(result, TransitionResult::Admitted(Admission::Running));
        assert!(fsm.is_busy());

        let result = fsm.process_event(DispatchEvent::Submitted);
        assert_eq!(result, TransitionResult::Admitted(Admission::Queued));

        let result = fsm.process_event(DispatchEvent::Submitted);
        assert_eq!(result, TransitionResult::Rejected);
        assert_eq!(fsm.queued(), 1);
    }

    #[test]
    fn test_completion_promotes_pending() {
        let mut fsm = BusyStateMachine::new();
        fsm.process_event(DispatchEvent::Submitted);
        fsm.process_event(DispatchEvent::Submitted);

        let result = fsm.process_event(DispatchEvent::Completed);
        assert_eq!(result, TransitionResult::Promoted);
        assert!(fsm.is_busy());
        assert_eq!(fsm.queued(), 0);

        let result = fsm.process_event(DispatchEvent::Completed);
        assert_eq!(result, TransitionResult::Released);
        assert_eq!(fsm.state(), BusyState::Idle);
    }

    #[test]
    fn test_cancel_and_fault_release() {
        let mut fsm = BusyStateMachine::new();

        fsm.process_event(DispatchEvent::Submitted);
        assert_eq!(
            fsm.process_event(DispatchEvent::Cancelled),
            TransitionResult::Released
        );

        fsm.process_event(DispatchEvent::Submitted);
        assert_eq!(
            fsm.process_event(DispatchEvent::Faulted),
            TransitionResult::Released
        );
        assert_eq!(fsm.state(), BusyState::Idle);
    }

    #[test]
    fn test_rejection_leaves_state_untouched() {
        let mut fsm = BusyStateMachine::new();
        fsm.process_event(DispatchEvent::Submitted);
        fsm.process_event(DispatchEvent::Submitted);

        for _ in 0..3 {
            assert_eq!(
                fsm.process_event(DispatchEvent::Submitted),
                TransitionResult::Rejected
            );
        }
        assert!(fsm.is_busy());
        assert_eq!(fsm.queued(), 1);
    }

    #[test]
    fn test_withdraw_undoes_admission() {
        let mut fsm = BusyStateMachine::new();
        fsm.process_event(DispatchEvent::Submitted);
        fsm.process_event(DispatchEvent::Submitted);

        assert_eq!(
            fsm.process_event(DispatchEvent::Withdrawn),
            TransitionResult::Withdrawn
        );
        assert!(fsm.is_busy());
        assert_eq!(fsm.queued(), 0);

        fsm.process_event(DispatchEvent::Withdrawn);
        assert_eq!(fsm.state(), BusyState::Idle);
    }

    #[test]
    fn test_invalid_transition() {
        let mut fsm = BusyStateMachine::new();

        // Nothing is running, so there is nothing to complete
        let result = fsm.process_event(DispatchEvent::Cancelled);
        assert!(matches!(result, TransitionResult::Invalid { .. }));
        assert_eq!(fsm.state(), BusyState::Idle);
    }

    #[test]
    fn test_valid_transitions() {
        assert!(is_valid_transition(BusyState::Idle, BusyState::Executing));
        assert!(is_valid_transition(BusyState::Executing, BusyState::Idle));
        assert!(is_valid_transition(BusyState::Executing, BusyState::Executing));
    }
}
