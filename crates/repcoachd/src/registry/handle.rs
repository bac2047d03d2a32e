//! Cheap-to-clone client interface for the registry actor.
//!
//! # Panic-Free Guarantees
//!
//! Channel errors are mapped to `RegistryError::ChannelClosed`; bulk reads
//! on a stopped actor return an empty list.

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use repcoach_core::{Delta, ExerciseKind, ExerciseSnapshot};

use super::commands::{RegistryCommand, RegistryError, TickReport};

/// Handle shared by feed workers, the dispatcher and connection handlers.
#[derive(Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    pub fn new(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Folds `delta` into the entry for `exercise`.
    ///
    /// # Errors
    ///
    /// - `RegistryError::UnknownExercise` if the registry has no such entry
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn apply(
        &self,
        exercise: ExerciseKind,
        delta: Delta,
        at: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Apply {
                exercise,
                delta: Box::new(delta),
                at,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    /// Consistent snapshot of one entry.
    pub async fn get(&self, exercise: ExerciseKind) -> Result<ExerciseSnapshot, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Get {
                exercise,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    /// Snapshots of every entry, in registry order.
    pub async fn get_all(&self) -> Vec<ExerciseSnapshot> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::GetAll { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Snapshots every entry and drains its pending milestones.
    pub async fn drain_tick(&self) -> Result<Vec<TickReport>, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::DrainTick { respond_to: tx })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }
}
