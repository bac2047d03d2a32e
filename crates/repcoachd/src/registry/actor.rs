//! Registry actor - owns every exercise entry and processes commands.
//!
//! Commands are handled one at a time inside a single task, so a reader
//! always sees an entry either entirely before or entirely after a delta
//! was applied.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Missing entries are reported as `RegistryError::UnknownExercise`
//! - Reply send failures are ignored (the caller went away)

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use repcoach_core::{Delta, ExerciseKind, ExerciseSnapshot, ExerciseState};

use super::commands::{RegistryCommand, RegistryError, TickReport};

pub struct RegistryActor {
    receiver: mpsc::Receiver<RegistryCommand>,

    /// One entry per key, created up front and never removed
    entries: HashMap<ExerciseKind, ExerciseState>,

    /// Key order used for bulk reads
    order: Vec<ExerciseKind>,
}

impl RegistryActor {
    /// Creates an actor with one fresh entry per key in `exercises`.
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>, exercises: &[ExerciseKind]) -> Self {
        let mut order = Vec::with_capacity(exercises.len());
        let mut entries = HashMap::with_capacity(exercises.len());
        for &kind in exercises {
            if entries.insert(kind, ExerciseState::new(kind)).is_none() {
                order.push(kind);
            }
        }

        Self {
            receiver,
            entries,
            order,
        }
    }

    /// Runs until every handle has been dropped.
    pub async fn run(mut self) {
        info!(entries = self.entries.len(), "Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("Registry actor stopped");
    }

    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Apply {
                exercise,
                delta,
                at,
                respond_to,
            } => {
                let result = self.handle_apply(exercise, *delta, at);
                let _ = respond_to.send(result);
            }
            RegistryCommand::Get {
                exercise,
                respond_to,
            } => {
                let result = self
                    .entries
                    .get(&exercise)
                    .map(ExerciseState::snapshot)
                    .ok_or(RegistryError::UnknownExercise(exercise));
                let _ = respond_to.send(result);
            }
            RegistryCommand::GetAll { respond_to } => {
                let _ = respond_to.send(self.snapshots());
            }
            RegistryCommand::DrainTick { respond_to } => {
                let _ = respond_to.send(self.handle_drain_tick());
            }
        }
    }

    fn handle_apply(
        &mut self,
        exercise: ExerciseKind,
        delta: Delta,
        at: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let entry = self
            .entries
            .get_mut(&exercise)
            .ok_or(RegistryError::UnknownExercise(exercise))?;

        let before = entry.count();
        entry.apply(delta, at);
        if entry.count() > before {
            debug!(
                exercise = %exercise,
                count = entry.count(),
                "Count advanced"
            );
        } else {
            trace!(exercise = %exercise, "Delta applied");
        }
        Ok(())
    }

    fn snapshots(&self) -> Vec<ExerciseSnapshot> {
        self.order
            .iter()
            .filter_map(|kind| self.entries.get(kind))
            .map(ExerciseState::snapshot)
            .collect()
    }

    fn handle_drain_tick(&mut self) -> Vec<TickReport> {
        let mut reports = Vec::with_capacity(self.order.len());
        for kind in &self.order {
            if let Some(entry) = self.entries.get_mut(kind) {
                reports.push(TickReport {
                    snapshot: entry.snapshot(),
                    milestones: entry.take_milestones(),
                });
            }
        }
        reports
    }
}
