//! repcoach Core - Pose-based repetition counting
//!
//! This crate provides the domain types shared between the daemon
//! (repcoachd) and the wire protocol: landmark frames, joint-angle
//! measurement, the per-exercise detectors and the session state they
//! update.
//!
//! Nothing here performs I/O or blocks. Detectors are driven one frame at
//! a time by the daemon's feed workers.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod angle;
pub mod config;
pub mod detector;
pub mod error;
pub mod exercise;
pub mod landmark;
pub mod state;
pub mod tips;

// Re-exports for convenience
pub use angle::{joint_angle, AngleCalculator, JointTriple};
pub use config::DetectorConfig;
pub use detector::{build_detector, ExerciseDetector};
pub use error::{CoreError, CoreResult};
pub use exercise::ExerciseKind;
pub use landmark::{Frame, Landmark, LandmarkId, Point, LANDMARK_COUNT};
pub use state::{Delta, ExerciseSnapshot, ExerciseState, Milestone, INITIAL_STATUS};
pub use tips::TipSet;
