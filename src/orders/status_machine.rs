use crate::orders::OrderStatus;

/// Validates order status transitions
///
/// The lifecycle moves forward through pending, confirmed, preparing, ready
/// and completed. Cancellation is reachable from every state (including
/// completed, for refunds) and is terminal. Same-status transitions are
/// idempotent.
pub struct StatusMachine;

impl StatusMachine {
    /// Whether `from` may transition to `to`
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        use OrderStatus::*;

        if from == to {
            return true;
        }

        match from {
            Pending => matches!(to, Confirmed | Cancelled),
            Confirmed => matches!(to, Preparing | Cancelled),
            Preparing => matches!(to, Ready | Cancelled),
            Ready => matches!(to, Completed | Cancelled),
            Completed => matches!(to, Cancelled),
            Cancelled => false,
        }
    }

    /// Attempt the transition, returning the new status or a message
    /// describing why it is invalid
    pub fn transition(from: OrderStatus, to: OrderStatus) -> Result<OrderStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid status transition from {} to {}", from, to))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_forward_lifecycle() {
        assert!(StatusMachine::is_valid_transition(Pending, Confirmed));
        assert!(StatusMachine::is_valid_transition(Confirmed, Preparing));
        assert!(StatusMachine::is_valid_transition(Preparing, Ready));
        assert!(StatusMachine::is_valid_transition(Ready, Completed));
    }

    #[test]
    fn test_no_skipping_states() {
        assert!(!StatusMachine::is_valid_transition(Pending, Preparing));
        assert!(!StatusMachine::is_valid_transition(Pending, Ready));
        assert!(!StatusMachine::is_valid_transition(Confirmed, Completed));
    }

    #[test]
    fn test_no_moving_backwards() {
        assert!(!StatusMachine::is_valid_transition(Completed, Pending));
        assert!(!StatusMachine::is_valid_transition(Ready, Preparing));
        assert!(!StatusMachine::is_valid_transition(Confirmed, Pending));
    }

    #[test]
    fn test_cancellation_from_any_state() {
        for from in [Pending, Confirmed, Preparing, Ready, Completed] {
            assert!(StatusMachine::is_valid_transition(from, Cancelled));
        }
    }

    #[test]
    fn test_cancelled_is_terminal() {
        for to in [Pending, Confirmed, Preparing, Ready, Completed] {
            assert!(!StatusMachine::is_valid_transition(Cancelled, to));
        }
    }

    #[test]
    fn test_same_status_is_idempotent() {
        for status in [Pending, Confirmed, Preparing, Ready, Completed, Cancelled] {
            assert!(StatusMachine::is_valid_transition(status, status));
        }
    }

    #[test]
    fn test_transition_error_message() {
        let err = StatusMachine::transition(Cancelled, Pending).unwrap_err();
        assert_eq!(err, "Invalid status transition from cancelled to pending");
    }
}
