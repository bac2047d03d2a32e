//! Mountain climbers detector.
//!
//! Legs alternate, starting with the right one. Each knee-to-chest drive
//! followed by a full extension of the same leg is half a rep.
//!
//! Until the active leg completes its current movement, the matching tip
//! ("bring the knee in" or "extend the leg") stays up.

use std::fmt;

use tracing::debug;

use super::{progress_between, ExerciseDetector};
use crate::landmark::LandmarkId::*;
use crate::{AngleCalculator, Delta, ExerciseKind, Frame, TipSet};

const SPINE_PLANK: f64 = 160.0;
const SPINE_TIGHT: f64 = 170.0;
const KNEE_IN: f64 = 100.0;
const HIP_IN: f64 = 100.0;
const KNEE_EXTENDED: f64 = 160.0;
const HIP_EXTENDED: f64 = 160.0;
/// Knee angle the active leg must open past before a drive counts.
const KNEE_ARM: f64 = 120.0;

const STATUS_PLANK: &str = "GET INTO PLANK POSITION";

const TIP_PLANK: &str = "Get into proper plank position";
const TIP_KNEE: &str = "Bring your knee closer to your chest";
const TIP_EXTEND: &str = "Extend your leg fully";
const TIP_CORE: &str = "Keep your core tight throughout the movement";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Left,
    Right,
}

impl Leg {
    fn other(self) -> Self {
        match self {
            Leg::Left => Leg::Right,
            Leg::Right => Leg::Left,
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::Left => write!(f, "LEFT"),
            Leg::Right => write!(f, "RIGHT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimberPhase {
    /// Active leg is back; waiting for the knee drive.
    Extended,
    /// Active knee is at the chest; waiting for the extension.
    KneeIn,
}

impl ClimberPhase {
    pub fn label(self) -> &'static str {
        match self {
            ClimberPhase::Extended => "EXTENDED",
            ClimberPhase::KneeIn => "KNEE_IN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimberReading {
    pub left_hip: f64,
    pub right_hip: f64,
    pub left_knee: f64,
    pub right_knee: f64,
    pub spine: f64,
}

impl ClimberReading {
    /// (hip, knee) angles of `leg`.
    fn leg(&self, leg: Leg) -> (f64, f64) {
        match leg {
            Leg::Left => (self.left_hip, self.left_knee),
            Leg::Right => (self.right_hip, self.right_knee),
        }
    }
}

#[derive(Debug)]
pub struct MountainClimbersDetector {
    angles: AngleCalculator,
    leg: Leg,
    phase: ClimberPhase,
    armed: bool,
}

impl Default for MountainClimbersDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MountainClimbersDetector {
    pub fn new() -> Self {
        Self {
            angles: AngleCalculator::new(),
            leg: Leg::Right,
            phase: ClimberPhase::Extended,
            armed: false,
        }
    }

    /// Leg whose movement is currently being tracked.
    pub fn active_leg(&self) -> Leg {
        self.leg
    }

    fn read(&mut self, frame: &Frame) -> ClimberReading {
        ClimberReading {
            left_hip: self.angles.measure(frame, (LeftShoulder, LeftHip, LeftKnee)),
            right_hip: self.angles.measure(frame, (RightShoulder, RightHip, RightKnee)),
            left_knee: self.angles.measure(frame, (LeftHip, LeftKnee, LeftAnkle)),
            right_knee: self.angles.measure(frame, (RightHip, RightKnee, RightAnkle)),
            spine: self.angles.measure(frame, (LeftEar, LeftShoulder, LeftHip)),
        }
    }

    pub fn step(&mut self, reading: ClimberReading) -> Delta {
        let in_plank = reading.spine > SPINE_PLANK;
        let mut delta = Delta::default();
        let mut tips = TipSet::new();
        tips.toggle(TIP_PLANK, !in_plank);

        if !in_plank {
            delta.status = Some(STATUS_PLANK.to_string());
        } else {
            let (hip, knee) = reading.leg(self.leg);
            match self.phase {
                ClimberPhase::Extended => {
                    if knee > KNEE_ARM {
                        self.armed = true;
                    }
                    if self.armed && knee < KNEE_IN && hip < HIP_IN {
                        self.phase = ClimberPhase::KneeIn;
                        self.armed = false;
                    } else {
                        tips.insert(TIP_KNEE);
                    }
                }
                ClimberPhase::KneeIn => {
                    if knee > KNEE_EXTENDED && hip > HIP_EXTENDED {
                        debug!(leg = %self.leg, "Mountain climber leg extended");
                        self.phase = ClimberPhase::Extended;
                        self.leg = self.leg.other();
                        self.armed = reading.leg(self.leg).1 > KNEE_ARM;
                        delta.count_increment = 0.5;
                    } else {
                        tips.insert(TIP_EXTEND);
                    }
                }
            }

            delta.status = Some(match self.phase {
                ClimberPhase::Extended => format!("BRING {} KNEE TO CHEST", self.leg),
                ClimberPhase::KneeIn => format!("EXTEND {} LEG", self.leg),
            });
            tips.toggle(TIP_CORE, reading.spine < SPINE_TIGHT);

            let (_, active_knee) = reading.leg(self.leg);
            delta.progress = Some(progress_between(active_knee, 170.0, 90.0));
        }

        delta.phase = Some(self.phase.label());
        delta.form_gate = Some(in_plank);
        delta.tips = Some(tips);
        delta
    }
}

impl ExerciseDetector for MountainClimbersDetector {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::MountainClimbers
    }

    fn update(&mut self, frame: Option<&Frame>) -> Delta {
        match frame {
            Some(frame) => {
                let reading = self.read(frame);
                self.step(reading)
            }
            None => Delta::none(),
        }
    }
}
