//! State machine trait for status enums.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// ```ignore
/// let settled = PaymentStatus::Pending.transition_to(PaymentStatus::Success)?;
/// assert!(settled.is_terminal());
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
    enum Light {
        Off,
        On,
        Broken,
    }

    impl StateMachine for Light {
        fn can_transition_to(&self, target: &Self) -> bool {
            use Light::*;
            matches!((self, target), (Off, On) | (On, Off) | (Off, Broken) | (On, Broken))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Light::*;
            match self {
                Off => vec![On, Broken],
                On => vec![Off, Broken],
                Broken => vec![],
            }
        }
    }

    #[test]
    fn valid_transition_returns_target() {
        assert_eq!(Light::Off.transition_to(Light::On).unwrap(), Light::On);
    }

    #[test]
    fn invalid_transition_returns_error() {
        let err = Light::Broken.transition_to(Light::On).unwrap_err();
        assert_eq!(err.field(), "state_transition");
    }

    #[test]
    fn terminal_state_has_no_transitions() {
        assert!(Light::Broken.is_terminal());
        assert!(!Light::Off.is_terminal());
    }

    #[test]
    fn valid_transitions_agree_with_can_transition_to() {
        for state in [Light::Off, Light::On, Light::Broken] {
            for target in state.valid_transitions() {
                assert!(state.can_transition_to(&target));
            }
        }
    }
}
