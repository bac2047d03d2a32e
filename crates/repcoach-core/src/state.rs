//! Per-exercise session state, detector deltas, and the read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ExerciseKind, TipSet};

/// Status every entry starts with before its first frame.
pub const INITIAL_STATUS: &str = "Ready to start";

/// Phase label before a detector has reported one.
pub const INITIAL_PHASE: &str = "IDLE";

// ============================================================================
// Milestones
// ============================================================================

/// Discrete events a detector raises exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Milestone {
    /// A full multi-posture cycle finished. `cycles` is the running total.
    CycleComplete { cycles: u64 },
}

// ============================================================================
// Delta
// ============================================================================

/// What one frame changed.
///
/// `None` fields leave the registry value untouched; `tips`, when present,
/// replaces the whole set since tips always reflect the current posture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    pub count_increment: f64,
    pub phase: Option<&'static str>,
    pub form_gate: Option<bool>,
    pub status: Option<String>,
    pub tips: Option<TipSet>,
    pub progress: Option<u8>,
    /// Repetitions per second over the detector's recent window
    pub rate: Option<f64>,
    pub milestone: Option<Milestone>,
}

impl Delta {
    /// The delta for a detection gap: changes nothing.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// ExerciseState
// ============================================================================

/// Canonical state for one exercise-type key.
#[derive(Debug, Clone)]
pub struct ExerciseState {
    exercise: ExerciseKind,
    count: f64,
    phase: String,
    form_gate: bool,
    status: String,
    tips: TipSet,
    progress: Option<u8>,
    rate: Option<f64>,
    updated_at: Option<DateTime<Utc>>,
    pending_milestones: Vec<Milestone>,
}

impl ExerciseState {
    pub fn new(exercise: ExerciseKind) -> Self {
        Self {
            exercise,
            count: 0.0,
            phase: INITIAL_PHASE.to_string(),
            form_gate: false,
            status: INITIAL_STATUS.to_string(),
            tips: TipSet::new(),
            progress: None,
            rate: None,
            updated_at: None,
            pending_milestones: Vec::new(),
        }
    }

    pub fn exercise(&self) -> ExerciseKind {
        self.exercise
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn tips(&self) -> &TipSet {
        &self.tips
    }

    /// Folds a delta into the state. `count` only ever grows.
    pub fn apply(&mut self, delta: Delta, at: DateTime<Utc>) {
        if delta.is_noop() {
            return;
        }

        if delta.count_increment.is_finite() && delta.count_increment > 0.0 {
            self.count += delta.count_increment;
        }
        if let Some(phase) = delta.phase {
            if self.phase != phase {
                self.phase = phase.to_string();
            }
        }
        if let Some(gate) = delta.form_gate {
            self.form_gate = gate;
        }
        if let Some(status) = delta.status {
            self.status = status;
        }
        if let Some(tips) = delta.tips {
            self.tips = tips;
        }
        if delta.progress.is_some() {
            self.progress = delta.progress;
        }
        if let Some(rate) = delta.rate.filter(|r| r.is_finite() && *r >= 0.0) {
            self.rate = Some(rate);
        }
        if let Some(milestone) = delta.milestone {
            self.pending_milestones.push(milestone);
        }
        self.updated_at = Some(at);
    }

    /// Consistent copy of the public fields.
    pub fn snapshot(&self) -> ExerciseSnapshot {
        ExerciseSnapshot {
            exercise: self.exercise,
            count: self.count,
            reps: self.count.trunc() as u64,
            phase: self.phase.clone(),
            form_gate: self.form_gate,
            status: self.status.clone(),
            tips: self.tips.to_vec(),
            progress: self.progress,
            rate: self.rate,
            updated_at: self.updated_at,
        }
    }

    /// Drains milestones queued since the last call.
    pub fn take_milestones(&mut self) -> Vec<Milestone> {
        std::mem::take(&mut self.pending_milestones)
    }
}

// ============================================================================
// ExerciseSnapshot
// ============================================================================

/// Read model handed to the dispatcher and to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSnapshot {
    pub exercise: ExerciseKind,
    /// Half-rep resolution count
    pub count: f64,
    /// Truncated integer count reported to subscribers
    pub reps: u64,
    pub phase: String,
    pub form_gate: bool,
    pub status: String,
    pub tips: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Recent repetitions per second, for exercises that measure pace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
