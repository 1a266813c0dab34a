//! Factory lifecycle state machine

use std::fmt;

/// Lifecycle state of an operation factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FactoryState {
    /// Ready for parameter edits, updates and commit
    #[default]
    Idle,
    /// A preview update is in flight
    Updating,
    /// A commit is in flight
    Committing,
    /// The result has been committed (terminal)
    Committed,
    /// The factory was cancelled (terminal)
    Cancelled,
}

impl FactoryState {
    /// Check if no further edits, updates or commits are accepted
    pub fn is_terminal(&self) -> bool {
        matches!(self, FactoryState::Committed | FactoryState::Cancelled)
    }

    /// Check if parameter writes are legal
    pub fn accepts_parameters(&self) -> bool {
        matches!(self, FactoryState::Idle | FactoryState::Updating)
    }

    /// Check if a commit may start from this state
    pub fn can_commit(&self) -> bool {
        matches!(self, FactoryState::Idle | FactoryState::Updating)
    }

    /// Check if a transition from this state to `target` is valid.
    ///
    /// - Idle and Updating move freely between each other and on to
    ///   Committing or Cancelled
    /// - Committing settles to Committed, or back to Idle on failure
    /// - Terminal states only leave through a reset or revert to Idle
    pub fn can_transition_to(&self, target: FactoryState) -> bool {
        use FactoryState::*;
        if *self == target {
            return true;
        }
        matches!(
            (self, target),
            (Idle, Updating | Committing | Cancelled)
                | (Updating, Idle | Committing | Cancelled)
                | (Committing, Committed | Idle | Cancelled)
                | (Committed | Cancelled, Idle)
        )
    }
}

impl fmt::Display for FactoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Updating => write!(f, "Updating"),
            Self::Committing => write!(f, "Committing"),
            Self::Committed => write!(f, "Committed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(FactoryState::default(), FactoryState::Idle);
    }

    #[test]
    fn test_terminal_states() {
        assert!(FactoryState::Committed.is_terminal());
        assert!(FactoryState::Cancelled.is_terminal());
        assert!(!FactoryState::Idle.is_terminal());
        assert!(!FactoryState::Updating.is_terminal());
        assert!(!FactoryState::Committing.is_terminal());
    }

    #[test]
    fn test_commit_and_parameters_only_from_idle_or_updating() {
        for state in [
            FactoryState::Idle,
            FactoryState::Updating,
            FactoryState::Committing,
            FactoryState::Committed,
            FactoryState::Cancelled,
        ] {
            let expected = matches!(state, FactoryState::Idle | FactoryState::Updating);
            assert_eq!(state.can_commit(), expected);
            assert_eq!(state.accepts_parameters(), expected);
        }
    }

    #[test]
    fn test_transitions() {
        use FactoryState::*;
        assert!(Idle.can_transition_to(Updating));
        assert!(Updating.can_transition_to(Idle));
        assert!(Committing.can_transition_to(Committed));
        assert!(Committing.can_transition_to(Idle));
        assert!(Committed.can_transition_to(Idle));
        assert!(!Committed.can_transition_to(Updating));
        assert!(!Cancelled.can_transition_to(Committing));
        assert!(!Idle.can_transition_to(Committed));
    }

    #[test]
    fn test_display() {
        assert_eq!(FactoryState::Updating.to_string(), "Updating");
        assert_eq!(FactoryState::Cancelled.to_string(), "Cancelled");
    }
}
