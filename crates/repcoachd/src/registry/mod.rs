//! Session registry using the actor pattern.
//!
//! The registry holds one [`ExerciseState`](repcoach_core::ExerciseState)
//! per exercise-type key for the lifetime of the process. Feed workers
//! write through [`RegistryHandle::apply`]; the broadcast dispatcher and
//! connection handlers read snapshots.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  Apply   ┌─────────────────┐  DrainTick  ┌──────────────────────┐
//! │ ExerciseWorker  │─────────▶│  RegistryActor  │◀────────────│ BroadcastDispatcher  │
//! │  (one per key)  │          │                 │             │   (500 ms ticker)    │
//! └─────────────────┘          └────────┬────────┘             └──────────────────────┘
//!                                       │
//!                            HashMap<ExerciseKind,
//!                                 ExerciseState>
//! ```
//!
//! Each key has exactly one writer, and the actor processes commands one
//! at a time, so snapshots are never torn.

use tokio::sync::mpsc;

use repcoach_core::ExerciseKind;

mod actor;
mod commands;
mod handle;

pub use actor::RegistryActor;
pub use commands::{RegistryCommand, RegistryError, TickReport};
pub use handle::RegistryHandle;

/// Command channel buffer size
const COMMAND_BUFFER: usize = 256;

/// Spawns the registry actor with an entry for every exercise key.
pub fn spawn_registry() -> RegistryHandle {
    spawn_registry_for(&ExerciseKind::ALL)
}

/// Spawns the registry actor with entries for `exercises` only.
pub fn spawn_registry_for(exercises: &[ExerciseKind]) -> RegistryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = RegistryActor::new(cmd_rx, exercises);
    tokio::spawn(actor.run());

    RegistryHandle::new(cmd_tx)
}
