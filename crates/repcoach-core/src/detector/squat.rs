//! Squat detector.
//!
//! Reaching either end of the knee range with a bent back yields a
//! corrective status instead of a phase change.

use tracing::debug;

use super::{progress_between, within, ExerciseDetector};
use crate::landmark::LandmarkId::*;
use crate::{AngleCalculator, Delta, ExerciseKind, Frame, TipSet};

const BACK_STRAIGHT: f64 = 160.0;
const KNEE_BOTTOM: f64 = 90.0;
const KNEE_STANDING: f64 = 160.0;

const STATUS_CORRECT: &str = "STRAIGHTEN YOUR BACK";

const TIP_BACK: &str = "Keep your back straight";
const TIP_BACK_SQUATTING: &str = "Keep your back straight during the squat";
const TIP_BACK_STANDING: &str = "Keep your back straight while standing";
const TIP_LOWER: &str = "Squat lower";
const TIP_STAND: &str = "Stand up fully";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquatPhase {
    /// Standing; reaching depth is a half-rep.
    Down,
    /// At depth; standing back up is a half-rep.
    Up,
}

impl SquatPhase {
    pub fn label(self) -> &'static str {
        match self {
            SquatPhase::Down => "DOWN",
            SquatPhase::Up => "UP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquatReading {
    /// Ear-shoulder-hip angle
    pub back: f64,
    pub knee: f64,
}

#[derive(Debug)]
pub struct SquatDetector {
    angles: AngleCalculator,
    phase: SquatPhase,
    armed: bool,
}

impl Default for SquatDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SquatDetector {
    pub fn new() -> Self {
        Self {
            angles: AngleCalculator::new(),
            phase: SquatPhase::Down,
            armed: false,
        }
    }

    fn read(&mut self, frame: &Frame) -> SquatReading {
        SquatReading {
            back: self.angles.measure(frame, (LeftEar, LeftShoulder, LeftHip)),
            knee: self.angles.measure(frame, (LeftHip, LeftKnee, LeftAnkle)),
        }
    }

    pub fn step(&mut self, reading: SquatReading) -> Delta {
        let SquatReading { back, knee } = reading;
        let back_ok = back > BACK_STRAIGHT;
        if back_ok && !self.armed {
            debug!("Squat form gate satisfied");
            self.armed = true;
        }

        let mut delta = Delta::default();
        let mut tips = TipSet::new();
        tips.toggle(TIP_BACK, !back_ok);

        if self.armed {
            if knee <= KNEE_BOTTOM && back_ok {
                delta.status = Some(SquatPhase::Up.label().to_string());
                if self.phase == SquatPhase::Down {
                    self.phase = SquatPhase::Up;
                    delta.count_increment = 0.5;
                }
            } else if knee > KNEE_STANDING && back_ok {
                delta.status = Some(SquatPhase::Down.label().to_string());
                if self.phase == SquatPhase::Up {
                    self.phase = SquatPhase::Down;
                    delta.count_increment = 0.5;
                }
            } else if !back_ok && knee <= KNEE_BOTTOM {
                delta.status = Some(STATUS_CORRECT.to_string());
                tips.insert(TIP_BACK_SQUATTING);
            } else if !back_ok && knee >= KNEE_STANDING {
                delta.status = Some(STATUS_CORRECT.to_string());
                tips.insert(TIP_BACK_STANDING);
            }

            tips.toggle(
                TIP_LOWER,
                self.phase == SquatPhase::Down && knee > KNEE_BOTTOM && knee <= KNEE_BOTTOM + 20.0,
            );
            tips.toggle(
                TIP_STAND,
                self.phase == SquatPhase::Up && within(knee, KNEE_STANDING - 20.0, KNEE_STANDING),
            );
            delta.progress = Some(progress_between(knee, KNEE_BOTTOM, KNEE_STANDING));
        }

        delta.phase = Some(self.phase.label());
        delta.form_gate = Some(self.armed);
        delta.tips = Some(tips);
        delta
    }
}

impl ExerciseDetector for SquatDetector {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::Squat
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

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(back: f64, knee: f64) -> SquatReading {
        SquatReading { back, knee }
    }

    #[test]
    fn test_bent_back_adds_tip_once() {
        let mut detector = SquatDetector::new();
        let mut count = 0.0;
        let mut last_tips = TipSet::new();
        for _ in 0..10 {
            let delta = detector.step(reading(150.0, 170.0));
            count += delta.count_increment;
            last_tips = delta.tips.unwrap();
        }
        assert_eq!(count, 0.0);
        assert_eq!(last_tips.to_vec(), vec![TIP_BACK]);
    }

    #[test]
    fn test_full_squat() {
        let mut detector = SquatDetector::new();
        let frames = [
            reading(170.0, 170.0),
            reading(170.0, 120.0),
            reading(170.0, 85.0),
            reading(170.0, 130.0),
            reading(170.0, 170.0),
        ];
        let deltas: Vec<Delta> = frames.into_iter().map(|r| detector.step(r)).collect();
        let total: f64 = deltas.iter().map(|d| d.count_increment).sum();
        assert_eq!(total, 1.0);
        let statuses: Vec<&str> = deltas.iter().filter_map(|d| d.status.as_deref()).collect();
        assert_eq!(statuses, vec!["DOWN", "UP", "DOWN"]);
    }

    #[test]
    fn test_depth_and_stand_tips() {
        let mut detector = SquatDetector::new();
        let delta = detector.step(reading(170.0, 100.0));
        assert!(delta.tips.unwrap().contains(TIP_LOWER));

        detector.step(reading(170.0, 80.0));
        let delta = detector.step(reading(170.0, 150.0));
        let tips = delta.tips.unwrap();
        assert!(tips.contains(TIP_STAND));
        assert!(!tips.contains(TIP_LOWER));
    }

    #[test]
    fn test_leaning_at_depth_does_not_count() {
        let mut detector = SquatDetector::new();
        detector.step(reading(170.0, 170.0));
        let delta = detector.step(reading(140.0, 80.0));
        assert_eq!(delta.count_increment, 0.0);
        assert_eq!(delta.status.as_deref(), Some(STATUS_CORRECT));
        assert_eq!(
            delta.tips.unwrap().to_vec(),
            vec![TIP_BACK, TIP_BACK_SQUATTING]
        );
    }

    #[test]
    fn test_leaning_while_standing_is_corrected() {
        let mut detector = SquatDetector::new();
        detector.step(reading(170.0, 170.0));
        detector.step(reading(170.0, 80.0));

        let delta = detector.step(reading(150.0, 170.0));
        assert_eq!(delta.count_increment, 0.0);
        assert_eq!(delta.status.as_deref(), Some(STATUS_CORRECT));
        assert_eq!(
            delta.tips.unwrap().to_vec(),
            vec![TIP_BACK, TIP_BACK_STANDING]
        );

        // Mid-range leaning only raises the general back tip.
        let delta = detector.step(reading(150.0, 120.0));
        assert!(delta.status.is_none());
        assert_eq!(delta.tips.unwrap().to_vec(), vec![TIP_BACK]);

        let delta = detector.step(reading(170.0, 170.0));
        assert_eq!(delta.status.as_deref(), Some("DOWN"));
        assert_eq!(delta.count_increment, 0.5);
    }
}
