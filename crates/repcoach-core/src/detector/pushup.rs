//! Push-up detector.

use tracing::debug;

use super::{progress_between, within, ExerciseDetector};
use crate::landmark::LandmarkId::*;
use crate::{AngleCalculator, Delta, ExerciseKind, Frame, TipSet};

const ELBOW_EXTENDED: f64 = 160.0;
const ELBOW_BOTTOM: f64 = 90.0;
const SHOULDER_MIN: f64 = 40.0;
const HIP_STRAIGHT: f64 = 160.0;

const TIP_BODY: &str = "Keep your body straight";
const TIP_EXTEND: &str = "Extend your arms fully";
const TIP_PUSH: &str = "Push up all the way";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushupPhase {
    /// Arms extended at the top; the next descent is a half-rep.
    Down,
    /// At the bottom; pushing back up is a half-rep.
    Up,
}

impl PushupPhase {
    pub fn label(self) -> &'static str {
        match self {
            PushupPhase::Down => "DOWN",
            PushupPhase::Up => "UP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PushupReading {
    pub elbow: f64,
    pub shoulder: f64,
    pub hip: f64,
}

impl PushupReading {
    /// Straight-body plank with arms locked out.
    fn is_plank(&self) -> bool {
        self.elbow > ELBOW_EXTENDED && self.shoulder > SHOULDER_MIN && self.hip > HIP_STRAIGHT
    }
}

#[derive(Debug)]
pub struct PushupDetector {
    angles: AngleCalculator,
    phase: PushupPhase,
    armed: bool,
}

impl Default for PushupDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PushupDetector {
    pub fn new() -> Self {
        Self {
            angles: AngleCalculator::new(),
            phase: PushupPhase::Down,
            armed: false,
        }
    }

    fn read(&mut self, frame: &Frame) -> PushupReading {
        PushupReading {
            elbow: self.angles.measure(frame, (LeftShoulder, LeftElbow, LeftWrist)),
            shoulder: self.angles.measure(frame, (LeftElbow, LeftShoulder, LeftHip)),
            hip: self.angles.measure(frame, (LeftShoulder, LeftHip, LeftKnee)),
        }
    }

    pub fn step(&mut self, reading: PushupReading) -> Delta {
        let plank = reading.is_plank();
        if plank && !self.armed {
            debug!("Push-up plank position reached");
            self.armed = true;
        }

        let mut delta = Delta::default();
        let mut tips = TipSet::new();
        tips.toggle(TIP_BODY, reading.hip <= HIP_STRAIGHT);
        tips.toggle(TIP_EXTEND, !self.armed && reading.elbow <= ELBOW_EXTENDED);

        if self.armed {
            if reading.elbow <= ELBOW_BOTTOM && reading.hip > HIP_STRAIGHT {
                delta.status = Some(PushupPhase::Up.label().to_string());
                if self.phase == PushupPhase::Down {
                    self.phase = PushupPhase::Up;
                    delta.count_increment = 0.5;
                }
            } else if plank {
                delta.status = Some(PushupPhase::Down.label().to_string());
                if self.phase == PushupPhase::Up {
                    self.phase = PushupPhase::Down;
                    delta.count_increment = 0.5;
                }
            }

            tips.toggle(
                TIP_PUSH,
                self.phase == PushupPhase::Up
                    && within(reading.elbow, ELBOW_EXTENDED - 20.0, ELBOW_EXTENDED),
            );
            delta.progress = Some(progress_between(reading.elbow, ELBOW_BOTTOM, ELBOW_EXTENDED));
        }

        delta.phase = Some(self.phase.label());
        delta.form_gate = Some(self.armed);
        delta.tips = Some(tips);
        delta
    }
}

impl ExerciseDetector for PushupDetector {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::Pushup
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
