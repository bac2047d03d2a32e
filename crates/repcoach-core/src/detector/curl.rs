//! Bicep curl detector (one arm).

use tracing::debug;

use super::{progress_between, ExerciseDetector};
use crate::landmark::LandmarkId::{self, *};
use crate::{AngleCalculator, Delta, ExerciseKind, Frame, TipSet};

/// Upper arm must stay close to the torso.
const SHOULDER_MAX: f64 = 40.0;
/// Elbow angle above which the arm counts as extended.
const ELBOW_EXTENDED: f64 = 160.0;
/// Elbow angle below which the arm counts as curled.
const ELBOW_CURLED: f64 = 40.0;
/// Width of the "almost there" band next to each threshold.
const NEAR_MISS: f64 = 20.0;

/// Shown when the elbow reaches either end of the range with a swinging shoulder.
const STATUS_CORRECT: &str = "LOWER YOUR ARM";

const TIP_SHOULDER: &str = "Keep your shoulder stable";
const TIP_EXTEND: &str = "Extend your arm fully";
const TIP_CURL: &str = "Curl your arm completely";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// (shoulder, elbow, wrist, hip) for this arm.
    fn joints(self) -> (LandmarkId, LandmarkId, LandmarkId, LandmarkId) {
        match self {
            Side::Left => (LeftShoulder, LeftElbow, LeftWrist, LeftHip),
            Side::Right => (RightShoulder, RightElbow, RightWrist, RightHip),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurlPhase {
    /// Arm curled (or not yet extended); the next extension is a half-rep.
    Down,
    /// Arm extended; the next full curl is a half-rep.
    Up,
}

impl CurlPhase {
    pub fn label(self) -> &'static str {
        match self {
            CurlPhase::Down => "DOWN",
            CurlPhase::Up => "UP",
        }
    }
}

/// Angles the curl state machine works from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurlReading {
    pub elbow: f64,
    pub shoulder: f64,
}

#[derive(Debug)]
pub struct CurlDetector {
    side: Side,
    angles: AngleCalculator,
    phase: CurlPhase,
    armed: bool,
}

impl CurlDetector {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            angles: AngleCalculator::new(),
            phase: CurlPhase::Down,
            armed: false,
        }
    }

    pub fn phase(&self) -> CurlPhase {
        self.phase
    }

    fn read(&mut self, frame: &Frame) -> CurlReading {
        let (shoulder, elbow, wrist, hip) = self.side.joints();
        CurlReading {
            elbow: self.angles.measure(frame, (shoulder, elbow, wrist)),
            shoulder: self.angles.measure(frame, (elbow, shoulder, hip)),
        }
    }

    /// Advances the state machine by one reading.
    pub fn step(&mut self, reading: CurlReading) -> Delta {
        let CurlReading { elbow, shoulder } = reading;
        let shoulder_ok = shoulder < SHOULDER_MAX;
        if shoulder_ok && !self.armed {
            debug!(side = ?self.side, "Curl form gate satisfied");
            self.armed = true;
        }

        let mut delta = Delta::default();
        let mut tips = TipSet::new();
        tips.toggle(TIP_SHOULDER, !shoulder_ok);

        if self.armed {
            if elbow > ELBOW_EXTENDED && shoulder_ok {
                delta.status = Some(CurlPhase::Up.label().to_string());
                if self.phase == CurlPhase::Down {
                    self.phase = CurlPhase::Up;
                    delta.count_increment = 0.5;
                }
            } else if elbow < ELBOW_CURLED && shoulder_ok {
                delta.status = Some(CurlPhase::Down.label().to_string());
                if self.phase == CurlPhase::Up {
                    self.phase = CurlPhase::Down;
                    delta.count_increment = 0.5;
                }
            } else if !shoulder_ok && (elbow >= ELBOW_EXTENDED || elbow <= ELBOW_CURLED) {
                delta.status = Some(STATUS_CORRECT.to_string());
            }

            tips.toggle(
                TIP_EXTEND,
                self.phase == CurlPhase::Down
                    && elbow > ELBOW_EXTENDED - NEAR_MISS
                    && elbow <= ELBOW_EXTENDED,
            );
            tips.toggle(
                TIP_CURL,
                self.phase == CurlPhase::Up
                    && elbow >= ELBOW_CURLED
                    && elbow < ELBOW_CURLED + NEAR_MISS,
            );
            delta.progress = Some(progress_between(elbow, ELBOW_EXTENDED, ELBOW_CURLED));
        }

        delta.phase = Some(self.phase.label());
        delta.form_gate = Some(self.armed);
        delta.tips = Some(tips);
        delta
    }
}

impl ExerciseDetector for CurlDetector {
    fn kind(&self) -> ExerciseKind {
        match self.side {
            Side::Left => ExerciseKind::LeftBicep,
            Side::Right => ExerciseKind::RightBicep,
        }
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
