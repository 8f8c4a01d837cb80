//! State machine trait for lifecycle enums.
//!
//! Provides a consistent interface for validating and performing state transitions
//! across lifecycle statuses such as the streaming connection phase.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for StreamPhase {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (Idle, Connecting) | (Connecting, Open) /* ... */)
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Idle => vec![Connecting, ClosedFinal],
///             // ... etc
///         }
///     }
/// }
///
/// let next = phase.transition_to(StreamPhase::Open)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Lamp {
        Off,
        On,
        Broken,
    }

    impl StateMachine for Lamp {
        fn can_transition_to(&self, target: &Self) -> bool {
            use Lamp::*;
            matches!((self, target), (Off, On) | (On, Off) | (On, Broken))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Lamp::*;
            match self {
                Off => vec![On],
                On => vec![Off, Broken],
                Broken => vec![],
            }
        }
    }

    #[test]
    fn valid_transition_succeeds() {
        assert_eq!(Lamp::Off.transition_to(Lamp::On).unwrap(), Lamp::On);
    }

    #[test]
    fn invalid_transition_fails_with_message() {
        let err = Lamp::Off.transition_to(Lamp::Broken).unwrap_err();
        assert!(err.to_string().contains("Cannot transition from Off to Broken"));
    }

    #[test]
    fn terminal_state_detected() {
        assert!(Lamp::Broken.is_terminal());
        assert!(!Lamp::On.is_terminal());
    }
}
