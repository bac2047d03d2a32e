//! Sun salutation sequence detector.
//!
//! Seven postures must be reached strictly in order. Returning to mountain
//! pose after the final forward fold completes one cycle, which is reported
//! once as a [`Milestone::CycleComplete`] alongside the count increment.

use tracing::info;

use super::ExerciseDetector;
use crate::landmark::LandmarkId::*;
use crate::{AngleCalculator, Delta, ExerciseKind, Frame, Milestone, TipSet};

const STATUS_START: &str = "Begin in Mountain Pose";
const STATUS_COMPLETE: &str = "Sequence Complete. Great Work!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunPose {
    Mountain,
    RaisedArms,
    ForwardFold,
    Plank,
    Cobra,
    DownwardDog,
    ReturnFold,
}

impl SunPose {
    /// Postures in the order they must be performed.
    pub const SEQUENCE: [SunPose; 7] = [
        SunPose::Mountain,
        SunPose::RaisedArms,
        SunPose::ForwardFold,
        SunPose::Plank,
        SunPose::Cobra,
        SunPose::DownwardDog,
        SunPose::ReturnFold,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SunPose::Mountain => "MOUNTAIN",
            SunPose::RaisedArms => "RAISED_ARMS",
            SunPose::ForwardFold => "FORWARD_FOLD",
            SunPose::Plank => "PLANK",
            SunPose::Cobra => "COBRA",
            SunPose::DownwardDog => "DOWNWARD_DOG",
            SunPose::ReturnFold => "RETURN_FOLD",
        }
    }

    fn matches(self, r: &SunReading) -> bool {
        match self {
            SunPose::Mountain => {
                r.knee > 160.0 && r.hip > 160.0 && r.shoulder > 80.0 && r.shoulder < 110.0
            }
            SunPose::RaisedArms => r.knee > 160.0 && r.hip > 160.0 && r.shoulder > 170.0,
            SunPose::ForwardFold | SunPose::ReturnFold => r.knee > 120.0 && r.hip < 90.0,
            SunPose::Plank => r.hip > 160.0 && r.shoulder > 80.0 && r.shoulder < 100.0,
            SunPose::Cobra => r.hip < 160.0 && r.shoulder < 80.0,
            SunPose::DownwardDog => r.hip < 100.0 && r.shoulder > 160.0,
        }
    }

    /// Instruction shown once this posture has been reached.
    fn next_cue(self) -> &'static str {
        match self {
            SunPose::Mountain => "Raise arms overhead",
            SunPose::RaisedArms => "Forward fold",
            SunPose::ForwardFold => "Step back to plank",
            SunPose::Plank => "Lower to cobra",
            SunPose::Cobra => "Push up to downward dog",
            SunPose::DownwardDog => "Step forward to forward fold",
            SunPose::ReturnFold => "Rise to mountain pose",
        }
    }

    fn tips(self, r: &SunReading) -> TipSet {
        let mut tips = TipSet::new();
        match self {
            SunPose::Mountain => {
                tips.toggle("Stand tall with knees straight", r.knee < 160.0);
                tips.toggle("Align hips with spine", r.hip < 160.0);
            }
            SunPose::RaisedArms => tips.toggle("Reach arms fully overhead", r.shoulder < 170.0),
            SunPose::ForwardFold | SunPose::ReturnFold => {
                tips.toggle("Bend forward from hips", r.hip > 90.0)
            }
            SunPose::Plank => tips.toggle("Keep body in straight line", r.hip < 160.0),
            SunPose::Cobra => tips.toggle("Open chest forward", r.shoulder > 80.0),
            SunPose::DownwardDog => tips.toggle("Push hips up and back", r.hip > 100.0),
        }
        tips
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunReading {
    pub shoulder: f64,
    pub hip: f64,
    pub knee: f64,
}

#[derive(Debug)]
pub struct SunSalutationDetector {
    angles: AngleCalculator,
    /// Number of postures reached in the current cycle.
    stage: usize,
    cycles: u64,
}

impl Default for SunSalutationDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SunSalutationDetector {
    pub fn new() -> Self {
        Self {
            angles: AngleCalculator::new(),
            stage: 0,
            cycles: 0,
        }
    }

    /// Last posture reached, if any.
    pub fn current_pose(&self) -> Option<SunPose> {
        self.stage
            .checked_sub(1)
            .and_then(|i| SunPose::SEQUENCE.get(i).copied())
    }

    fn read(&mut self, frame: &Frame) -> SunReading {
        SunReading {
            shoulder: self.angles.measure(frame, (LeftElbow, LeftShoulder, LeftHip)),
            hip: self.angles.measure(frame, (LeftShoulder, LeftHip, LeftKnee)),
            knee: self.angles.measure(frame, (LeftHip, LeftKnee, LeftAnkle)),
        }
    }

    pub fn step(&mut self, reading: SunReading) -> Delta {
        let mut delta = Delta::default();
        let total = SunPose::SEQUENCE.len();

        if self.stage == total {
            if SunPose::Mountain.matches(&reading) {
                self.cycles += 1;
                self.stage = 1;
                info!(cycles = self.cycles, "Sun salutation cycle complete");
                delta.count_increment = 1.0;
                delta.milestone = Some(Milestone::CycleComplete {
                    cycles: self.cycles,
                });
                delta.status = Some(STATUS_COMPLETE.to_string());
                delta.progress = Some(100);
            }
        } else if let Some(next) = SunPose::SEQUENCE.get(self.stage).copied() {
            if next.matches(&reading) {
                self.stage += 1;
                delta.status = Some(next.next_cue().to_string());
            } else if self.stage == 0 {
                delta.status = Some(STATUS_START.to_string());
            }
        }

        let held = self.current_pose().unwrap_or(SunPose::Mountain);
        delta.tips = Some(held.tips(&reading));
        delta.phase = Some(held.label());
        if delta.progress.is_none() {
            delta.progress = Some((self.stage * 100 / total) as u8);
        }
        delta
    }
}

impl ExerciseDetector for SunSalutationDetector {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::SunSalutation
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

    fn mountain() -> SunReading {
        SunReading {
            shoulder: 95.0,
            hip: 170.0,
            knee: 170.0,
        }
    }

    fn raised() -> SunReading {
        SunReading {
            shoulder: 175.0,
            hip: 170.0,
            knee: 170.0,
        }
    }

    fn fold() -> SunReading {
        SunReading {
            shoulder: 120.0,
            hip: 60.0,
            knee: 150.0,
        }
    }

    fn plank() -> SunReading {
        SunReading {
            shoulder: 90.0,
            hip: 170.0,
            knee: 150.0,
        }
    }

    fn cobra() -> SunReading {
        SunReading {
            shoulder: 60.0,
            hip: 130.0,
            knee: 170.0,
        }
    }

    fn dog() -> SunReading {
        SunReading {
            shoulder: 170.0,
            hip: 80.0,
            knee: 170.0,
        }
    }

    fn full_cycle() -> Vec<SunReading> {
        vec![
            mountain(),
            raised(),
            fold(),
            plank(),
            cobra(),
            dog(),
            fold(),
            mountain(),
        ]
    }

    #[test]
    fn test_full_cycle_counts_once_with_milestone() {
        let mut detector = SunSalutationDetector::new();
        let deltas: Vec<Delta> = full_cycle()
            .into_iter()
            .map(|r| detector.step(r))
            .collect();

        let total: f64 = deltas.iter().map(|d| d.count_increment).sum();
        assert_eq!(total, 1.0);
        let milestones: Vec<Milestone> = deltas.iter().filter_map(|d| d.milestone).collect();
        assert_eq!(milestones, vec![Milestone::CycleComplete { cycles: 1 }]);

        let last = deltas.last().unwrap();
        assert_eq!(last.status.as_deref(), Some(STATUS_COMPLETE));
        assert_eq!(detector.current_pose(), Some(SunPose::Mountain));
    }

    #[test]
    fn test_out_of_order_pose_is_ignored() {
        let mut detector = SunSalutationDetector::new();
        detector.step(mountain());
        let delta = detector.step(cobra());
        assert!(delta.status.is_none());
        assert_eq!(detector.current_pose(), Some(SunPose::Mountain));
    }

    #[test]
    fn test_second_cycle_reports_running_total() {
        let mut detector = SunSalutationDetector::new();
        for r in full_cycle() {
            detector.step(r);
        }
        // Mountain pose is already reached; the rest of the cycle follows.
        let last = full_cycle()
            .into_iter()
            .skip(1)
            .map(|r| detector.step(r))
            .last()
            .unwrap();
        assert_eq!(last.milestone, Some(Milestone::CycleComplete { cycles: 2 }));
    }

    #[test]
    fn test_tips_describe_held_pose() {
        let mut detector = SunSalutationDetector::new();
        detector.step(mountain());
        detector.step(raised());
        let delta = detector.step(SunReading {
            shoulder: 150.0,
            ..raised()
        });
        assert_eq!(
            delta.tips.unwrap().to_vec(),
            vec!["Reach arms fully overhead"]
        );
        assert_eq!(delta.progress, Some(28));
    }
}
