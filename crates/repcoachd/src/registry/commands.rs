//! Registry actor commands and errors.

use chrono::{DateTime, Utc};
use repcoach_core::{Delta, ExerciseKind, ExerciseSnapshot, Milestone};
use thiserror::Error;
use tokio::sync::oneshot;

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// Each command carries a oneshot sender for its reply.
#[derive(Debug)]
pub enum RegistryCommand {
    /// Fold a detector delta into the entry for `exercise`.
    ///
    /// Only the worker owning `exercise` sends this.
    Apply {
        exercise: ExerciseKind,
        /// Boxed to keep the enum small
        delta: Box<Delta>,
        /// Capture time of the frame that produced the delta
        at: DateTime<Utc>,
        respond_to: oneshot::Sender<Result<(), RegistryError>>,
    },

    /// Read one entry.
    Get {
        exercise: ExerciseKind,
        respond_to: oneshot::Sender<Result<ExerciseSnapshot, RegistryError>>,
    },

    /// Read every entry.
    GetAll {
        respond_to: oneshot::Sender<Vec<ExerciseSnapshot>>,
    },

    /// Snapshot every entry and drain its queued milestones in one step.
    DrainTick {
        respond_to: oneshot::Sender<Vec<TickReport>>,
    },
}

/// What the dispatcher publishes for one entry on one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub snapshot: ExerciseSnapshot,
    /// Milestones raised since the previous tick, oldest first
    pub milestones: Vec<Milestone>,
}

// ============================================================================
// Registry Errors
// ============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No entry for this key. Entries are created at startup, so this
    /// means the registry was built with a restricted key set.
    #[error("No registry entry for exercise: {0}")]
    UnknownExercise(ExerciseKind),

    /// The actor has stopped.
    #[error("Registry channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::UnknownExercise(ExerciseKind::JumpRope);
        assert_eq!(err.to_string(), "No registry entry for exercise: jump-rope");
        assert_eq!(
            RegistryError::ChannelClosed.to_string(),
            "Registry channel closed"
        );
    }
}
