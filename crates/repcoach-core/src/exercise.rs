//! Exercise-type keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The fixed enumeration of exercise-type keys.
///
/// Each key owns one registry entry, one detector worker and one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseKind {
    LeftBicep,
    RightBicep,
    Pushup,
    Squat,
    JumpRope,
    MountainClimbers,
    SunSalutation,
    YogaBlocks,
}

impl ExerciseKind {
    /// All keys, in registry order.
    pub const ALL: [ExerciseKind; 8] = [
        ExerciseKind::LeftBicep,
        ExerciseKind::RightBicep,
        ExerciseKind::Pushup,
        ExerciseKind::Squat,
        ExerciseKind::JumpRope,
        ExerciseKind::MountainClimbers,
        ExerciseKind::SunSalutation,
        ExerciseKind::YogaBlocks,
    ];

    /// Wire key, e.g. `"left-bicep"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeftBicep => "left-bicep",
            Self::RightBicep => "right-bicep",
            Self::Pushup => "pushup",
            Self::Squat => "squat",
            Self::JumpRope => "jump-rope",
            Self::MountainClimbers => "mountain-climbers",
            Self::SunSalutation => "sun-salutation",
            Self::YogaBlocks => "yoga-blocks",
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownExercise(s.to_string()))
    }
}
