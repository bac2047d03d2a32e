//! Per-exercise repetition detectors.
//!
//! Every detector is a small finite-state machine fed one frame at a time.
//! It turns joint angles into a [`Delta`]: count increments in half-rep
//! (or whole-cycle) steps, a status line, and the tips that apply to the
//! current posture.
//!
//! A `None` frame is a detection gap and always yields [`Delta::none`].
//!
//! Detectors never block and never fail; degenerate geometry is absorbed
//! by [`AngleCalculator`](crate::AngleCalculator).

use crate::{Delta, DetectorConfig, ExerciseKind, Frame};

mod curl;
mod jump_rope;
mod mountain_climbers;
mod pushup;
mod squat;
mod sun_salutation;
mod yoga_blocks;

pub use curl::{CurlDetector, CurlPhase, CurlReading, Side};
pub use jump_rope::{JumpPhase, JumpReading, JumpRopeDetector};
pub use mountain_climbers::{ClimberPhase, ClimberReading, Leg, MountainClimbersDetector};
pub use pushup::{PushupDetector, PushupPhase, PushupReading};
pub use squat::{SquatDetector, SquatPhase, SquatReading};
pub use sun_salutation::{SunPose, SunReading, SunSalutationDetector};
pub use yoga_blocks::{BlockPose, BlockReading, YogaBlocksDetector};

/// Common interface for all exercise variants.
pub trait ExerciseDetector: Send {
    /// The exercise this detector counts.
    fn kind(&self) -> ExerciseKind;

    /// Consumes one frame (or a detection gap) and reports what changed.
    fn update(&mut self, frame: Option<&Frame>) -> Delta;
}

/// Creates the detector for `kind`. Called once per session.
pub fn build_detector(kind: ExerciseKind, config: &DetectorConfig) -> Box<dyn ExerciseDetector> {
    match kind {
        ExerciseKind::LeftBicep => Box::new(CurlDetector::new(Side::Left)),
        ExerciseKind::RightBicep => Box::new(CurlDetector::new(Side::Right)),
        ExerciseKind::Pushup => Box::new(PushupDetector::new()),
        ExerciseKind::Squat => Box::new(SquatDetector::new()),
        ExerciseKind::JumpRope => Box::new(JumpRopeDetector::new(config.jump_air_timeout())),
        ExerciseKind::MountainClimbers => Box::new(MountainClimbersDetector::new()),
        ExerciseKind::SunSalutation => Box::new(SunSalutationDetector::new()),
        ExerciseKind::YogaBlocks => Box::new(YogaBlocksDetector::new(config.yoga_hold())),
    }
}

/// Maps `value` onto 0..=100 where `zero_at` is 0% and `full_at` is 100%.
///
/// Works for either direction and clamps outside the range.
pub(crate) fn progress_between(value: f64, zero_at: f64, full_at: f64) -> u8 {
    let span = full_at - zero_at;
    if span == 0.0 || !value.is_finite() {
        return 0;
    }
    let fraction = ((value - zero_at) / span).clamp(0.0, 1.0);
    (fraction * 100.0).round() as u8
}

/// True when `value` lies in the closed interval `[low, high]`.
pub(crate) fn within(value: f64, low: f64, high: f64) -> bool {
    (low..=high).contains(&value)
}
