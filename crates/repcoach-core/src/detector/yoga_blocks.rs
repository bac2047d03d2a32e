//! Yoga-with-blocks detector.
//!
//! Four poses are held in turn. Each needs its qualifying angles to hold
//! without interruption for the configured duration; any disqualifying
//! frame resets the hold to zero. Finishing the bridge pose completes a
//! cycle and returns to mountain pose.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use super::ExerciseDetector;
use crate::landmark::LandmarkId::*;
use crate::{AngleCalculator, Delta, ExerciseKind, Frame, Milestone, TipSet};

const STRAIGHT: f64 = 160.0;
const LEG_STRAIGHT: f64 = 150.0;
const HIP_HINGED: f64 = 120.0;
const KNEE_BENT: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPose {
    Mountain,
    Triangle,
    HalfMoon,
    Bridge,
}

impl BlockPose {
    pub fn label(self) -> &'static str {
        match self {
            BlockPose::Mountain => "MOUNTAIN",
            BlockPose::Triangle => "TRIANGLE",
            BlockPose::HalfMoon => "HALF_MOON",
            BlockPose::Bridge => "BRIDGE",
        }
    }

    pub fn next(self) -> Self {
        match self {
            BlockPose::Mountain => BlockPose::Triangle,
            BlockPose::Triangle => BlockPose::HalfMoon,
            BlockPose::HalfMoon => BlockPose::Bridge,
            BlockPose::Bridge => BlockPose::Mountain,
        }
    }

    fn qualifies(self, r: &BlockReading) -> bool {
        match self {
            BlockPose::Mountain => {
                r.left_knee > STRAIGHT
                    && r.right_knee > STRAIGHT
                    && r.left_hip > STRAIGHT
                    && r.right_hip > STRAIGHT
            }
            BlockPose::Triangle => {
                let hinged = (r.left_hip < HIP_HINGED && r.right_hip > STRAIGHT)
                    || (r.right_hip < HIP_HINGED && r.left_hip > STRAIGHT);
                hinged && r.legs_straight()
            }
            BlockPose::HalfMoon => {
                r.legs_straight() && (r.left_hip > STRAIGHT || r.right_hip > STRAIGHT)
            }
            BlockPose::Bridge => r.left_knee < KNEE_BENT && r.right_knee < KNEE_BENT,
        }
    }

    fn hold_status(self) -> &'static str {
        match self {
            BlockPose::Mountain => "Hold Mountain Pose",
            BlockPose::Triangle => "Hold Triangle Pose - Use Block for Support",
            BlockPose::HalfMoon => "Hold Half Moon Pose - Block Under Hand",
            BlockPose::Bridge => "Hold Bridge Pose - Block Under Sacrum",
        }
    }

    fn hold_tips(self) -> &'static [&'static str] {
        match self {
            BlockPose::Mountain => &[],
            BlockPose::Triangle => &[
                "Place the block beneath your lower hand",
                "Keep both legs straight",
                "Stack your shoulders",
            ],
            BlockPose::HalfMoon => &[
                "Gaze at the top hand",
                "Keep standing leg strong",
                "Hips stacked and square to side",
            ],
            BlockPose::Bridge => &[
                "Press feet into floor",
                "Rest weight on shoulders and feet",
                "Let block support your lower back",
            ],
        }
    }

    /// Status shown when this pose becomes the target.
    fn entry_status(self) -> &'static str {
        match self {
            BlockPose::Mountain => "Sequence Complete! Return to Mountain Pose",
            BlockPose::Triangle => "Move to Triangle Pose with Block",
            BlockPose::HalfMoon => "Transition to Half Moon Pose with Block",
            BlockPose::Bridge => "Move to Bridge Pose with Block",
        }
    }

    fn entry_tips(self) -> &'static [&'static str] {
        match self {
            BlockPose::Mountain => &["Stand tall", "Breathe deeply"],
            BlockPose::Triangle => &[
                "Place block outside your forward foot",
                "Extend your arm toward the block",
            ],
            BlockPose::HalfMoon => &[
                "Place block under supporting hand",
                "Slowly lift back leg parallel to floor",
            ],
            BlockPose::Bridge => &[
                "Lie on back, knees bent",
                "Place block under sacrum for support",
            ],
        }
    }

    /// Corrections for a frame that does not qualify.
    fn fail_tips(self, r: &BlockReading) -> &'static [&'static str] {
        match self {
            BlockPose::Mountain if r.left_knee <= STRAIGHT || r.right_knee <= STRAIGHT => {
                &["Straighten your knees in Mountain Pose"]
            }
            BlockPose::Mountain => &["Stand tall with hips aligned"],
            BlockPose::Triangle if !r.legs_straight() => &[
                "Keep your legs straight in Triangle Pose",
                "Use block for stability without bending knees",
            ],
            BlockPose::Triangle => self.entry_tips(),
            BlockPose::HalfMoon => &[
                "Engage your core in Half Moon Pose",
                "Keep block under hand for balance",
            ],
            BlockPose::Bridge => &[
                "Bend knees at 90 degrees for Bridge Pose",
                "Rest sacrum on block for support",
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockReading {
    pub left_hip: f64,
    pub right_hip: f64,
    pub left_knee: f64,
    pub right_knee: f64,
}

impl BlockReading {
    fn legs_straight(&self) -> bool {
        self.left_knee > LEG_STRAIGHT && self.right_knee > LEG_STRAIGHT
    }
}

#[derive(Debug)]
pub struct YogaBlocksDetector {
    angles: AngleCalculator,
    pose: BlockPose,
    hold_started: Option<DateTime<Utc>>,
    hold: TimeDelta,
    cycles: u64,
}

impl YogaBlocksDetector {
    pub fn new(hold: TimeDelta) -> Self {
        Self {
            angles: AngleCalculator::new(),
            pose: BlockPose::Mountain,
            hold_started: None,
            hold,
            cycles: 0,
        }
    }

    /// Pose currently being worked on.
    pub fn pose(&self) -> BlockPose {
        self.pose
    }

    fn read(&mut self, frame: &Frame) -> BlockReading {
        BlockReading {
            left_hip: self.angles.measure(frame, (LeftShoulder, LeftHip, LeftKnee)),
            right_hip: self.angles.measure(frame, (RightShoulder, RightHip, RightKnee)),
            left_knee: self.angles.measure(frame, (LeftHip, LeftKnee, LeftAnkle)),
            right_knee: self.angles.measure(frame, (RightHip, RightKnee, RightAnkle)),
        }
    }

    fn held_fraction(&self, held: TimeDelta) -> u8 {
        let hold_ms = self.hold.num_milliseconds();
        if hold_ms <= 0 {
            return 100;
        }
        let fraction = held.num_milliseconds() as f64 / hold_ms as f64;
        (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
    }

    /// Advances the hold timer; `at` is the frame's capture time.
    pub fn step(&mut self, reading: BlockReading, at: DateTime<Utc>) -> Delta {
        let mut delta = Delta::default();
        let pose = self.pose;

        if !pose.qualifies(&reading) {
            if self.hold_started.take().is_some() {
                debug!(pose = pose.label(), "Yoga hold broken");
            }
            delta.tips = Some(tips_from(pose.fail_tips(&reading)));
            delta.progress = Some(0);
            delta.phase = Some(pose.label());
            return delta;
        }

        let started = *self.hold_started.get_or_insert(at);
        let held = at - started;

        if held >= self.hold {
            let next = pose.next();
            self.pose = next;
            self.hold_started = None;
            delta.status = Some(next.entry_status().to_string());
            delta.tips = Some(tips_from(next.entry_tips()));
            delta.progress = Some(100);

            if pose == BlockPose::Bridge {
                self.cycles += 1;
                info!(cycles = self.cycles, "Yoga blocks cycle complete");
                delta.count_increment = 1.0;
                delta.milestone = Some(Milestone::CycleComplete {
                    cycles: self.cycles,
                });
            } else {
                debug!(from = pose.label(), to = next.label(), "Yoga pose held");
            }
        } else {
            delta.status = Some(pose.hold_status().to_string());
            delta.tips = Some(tips_from(pose.hold_tips()));
            delta.progress = Some(self.held_fraction(held));
        }

        delta.phase = Some(self.pose.label());
        delta
    }
}

fn tips_from(list: &[&str]) -> TipSet {
    list.iter().map(|tip| tip.to_string()).collect()
}

impl ExerciseDetector for YogaBlocksDetector {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::YogaBlocks
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
