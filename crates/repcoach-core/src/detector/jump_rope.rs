//! Jump rope detector.
//!
//! Works on vertical pixel positions rather than angles: a jump is a sharp
//! rise of the ankles followed by a drop. Image y grows downwards, so a
//! rise is a *decrease* in `ankle_y`.
//!
//! An airborne phase that never lands within the configured timeout is
//! discarded without counting.
//!
//! The pace is reported as jumps per second over the last
//! [`RATE_WINDOW`] landings.

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use super::ExerciseDetector;
use crate::landmark::LandmarkId::*;
use crate::{AngleCalculator, Delta, ExerciseKind, Frame, TipSet};

/// Minimum upward ankle movement (px) between frames to start a jump.
const TAKEOFF_RISE: f64 = 15.0;
/// Ankles must sit this far (px) below the knees for a takeoff to count.
const KNEE_ANKLE_GAP: f64 = 50.0;
/// Minimum downward ankle movement (px) that registers a landing.
const LANDING_DROP: f64 = 10.0;
/// Downward movement (px) treated as a hard landing.
const HARD_LANDING_DROP: f64 = 20.0;
const ELBOW_LOW: f64 = 70.0;
const ELBOW_HIGH: f64 = 120.0;
/// Landings kept for the pace estimate.
pub const RATE_WINDOW: usize = 10;

const STATUS_READY: &str = "READY TO START JUMPING";
const STATUS_AIR: &str = "IN THE AIR";
const STATUS_LANDED: &str = "GOOD JUMP";

const TIP_ELBOWS: &str = "Keep elbows close to body";
const TIP_HEIGHT: &str = "Jump just high enough to clear the rope";
const TIP_LANDING: &str = "Land softly on the balls of your feet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpPhase {
    Ground,
    Air,
}

impl JumpPhase {
    pub fn label(self) -> &'static str {
        match self {
            JumpPhase::Ground => "GROUND",
            JumpPhase::Air => "AIR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpReading {
    /// Mean y of both ankles, in pixels.
    pub ankle_y: f64,
    /// Mean y of both knees, in pixels.
    pub knee_y: f64,
    pub left_elbow: f64,
    pub right_elbow: f64,
}

#[derive(Debug)]
pub struct JumpRopeDetector {
    angles: AngleCalculator,
    phase: JumpPhase,
    prev_ankle_y: Option<f64>,
    air_since: Option<DateTime<Utc>>,
    air_timeout: TimeDelta,
    landings: VecDeque<DateTime<Utc>>,
}

impl JumpRopeDetector {
    pub fn new(air_timeout: TimeDelta) -> Self {
        Self {
            angles: AngleCalculator::new(),
            phase: JumpPhase::Ground,
            prev_ankle_y: None,
            air_since: None,
            air_timeout,
            landings: VecDeque::with_capacity(RATE_WINDOW),
        }
    }

    pub fn phase(&self) -> JumpPhase {
        self.phase
    }

    /// Records a landing and returns the pace over the window, once two
    /// landings a positive time apart are known.
    fn record_landing(&mut self, at: DateTime<Utc>) -> Option<f64> {
        if self.landings.len() == RATE_WINDOW {
            self.landings.pop_front();
        }
        self.landings.push_back(at);

        let (first, last) = (self.landings.front()?, self.landings.back()?);
        let span = (*last - *first).num_milliseconds() as f64 / 1000.0;
        if self.landings.len() < 2 || span <= 0.0 {
            return None;
        }
        Some((self.landings.len() - 1) as f64 / span)
    }

    fn read(&mut self, frame: &Frame) -> JumpReading {
        let ankle_y = (frame.point(LeftAnkle).y + frame.point(RightAnkle).y) / 2.0;
        let knee_y = (frame.point(LeftKnee).y + frame.point(RightKnee).y) / 2.0;
        JumpReading {
            ankle_y,
            knee_y,
            left_elbow: self.angles.measure(frame, (LeftShoulder, LeftElbow, LeftWrist)),
            right_elbow: self.angles.measure(frame, (RightShoulder, RightElbow, RightWrist)),
        }
    }

    /// Advances the state machine; `at` is the frame's capture time.
    pub fn step(&mut self, reading: JumpReading, at: DateTime<Utc>) -> Delta {
        let mut delta = Delta::default();

        if let (JumpPhase::Air, Some(since)) = (self.phase, self.air_since) {
            if at - since > self.air_timeout {
                debug!("Jump airborne too long, resetting");
                self.phase = JumpPhase::Ground;
                self.air_since = None;
                delta.status = Some(STATUS_READY.to_string());
            }
        }

        let mut drop = 0.0;
        if let Some(prev) = self.prev_ankle_y {
            match self.phase {
                JumpPhase::Ground => {
                    let rise = prev - reading.ankle_y;
                    let gap = reading.ankle_y - reading.knee_y;
                    if rise > TAKEOFF_RISE && gap > KNEE_ANKLE_GAP {
                        self.phase = JumpPhase::Air;
                        self.air_since = Some(at);
                        delta.status = Some(STATUS_AIR.to_string());
                    }
                }
                JumpPhase::Air => {
                    drop = reading.ankle_y - prev;
                    if drop > LANDING_DROP {
                        self.phase = JumpPhase::Ground;
                        self.air_since = None;
                        delta.count_increment = 1.0;
                        delta.status = Some(STATUS_LANDED.to_string());
                        delta.rate = self.record_landing(at);
                    }
                }
            }
        }
        self.prev_ankle_y = Some(reading.ankle_y);

        let elbows_ok = [reading.left_elbow, reading.right_elbow]
            .iter()
            .all(|e| *e > ELBOW_LOW && *e < ELBOW_HIGH);

        let mut tips = TipSet::new();
        tips.toggle(TIP_ELBOWS, !elbows_ok);
        tips.toggle(TIP_HEIGHT, self.phase == JumpPhase::Air);
        tips.toggle(
            TIP_LANDING,
            self.phase == JumpPhase::Ground && drop > HARD_LANDING_DROP,
        );

        delta.phase = Some(self.phase.label());
        delta.form_gate = Some(elbows_ok);
        delta.tips = Some(tips);
        delta
    }
}

impl ExerciseDetector for JumpRopeDetector {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::JumpRope
    }

    fn update(&mut self, frame: Option<&Frame>) -> Delta {
        match frame {
            Some(frame) => {
                let reading = self.read(frame);
                self.step(reading, frame.timestamp())
            }
            None => Delta::none(),
        }
    }
}
