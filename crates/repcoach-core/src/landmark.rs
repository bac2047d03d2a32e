//! Body landmarks and frames produced by the external pose estimator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Number of landmarks in one frame (fixed body topology).
pub const LANDMARK_COUNT: usize = 33;

/// Default capture size used when the estimator does not report one.
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;

// ============================================================================
// Landmark Identifiers
// ============================================================================

/// Stable joint identifier, 0-32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum LandmarkId {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkId {
    /// Position of this joint inside a frame's landmark list.
    pub const fn index(self) -> usize {
        self as usize
    }
}

// ============================================================================
// Landmark / Point
// ============================================================================

/// One tracked joint: normalized position plus visibility confidence.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self { x, y, visibility }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.visibility.is_finite()
    }
}

/// A landmark projected into image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// Frame
// ============================================================================

/// The full set of landmarks detected at one time instant.
///
/// A missing detection is represented as `Option<Frame>::None` by callers,
/// never as a partially filled frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    timestamp: DateTime<Utc>,
    width: u32,
    height: u32,
    landmarks: Vec<Landmark>,
}

impl Frame {
    /// Creates a frame, validating topology and coordinates.
    pub fn new(
        timestamp: DateTime<Utc>,
        width: u32,
        height: u32,
        landmarks: Vec<Landmark>,
    ) -> CoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidFrameSize { width, height });
        }
        if landmarks.len() != LANDMARK_COUNT {
            return Err(CoreError::InvalidLandmarkCount {
                got: landmarks.len(),
                expected: LANDMARK_COUNT,
            });
        }
        if let Some(index) = landmarks.iter().position(|lm| !lm.is_finite()) {
            return Err(CoreError::NonFiniteCoordinate { index });
        }

        Ok(Self {
            timestamp,
            width,
            height,
            landmarks,
        })
    }

    /// Builds a frame from a sparse set of normalized positions.
    ///
    /// Joints that are not listed sit at the image origin. Handy for
    /// replaying recorded angles and in tests.
    pub fn from_points(timestamp: DateTime<Utc>, points: &[(LandmarkId, f64, f64)]) -> Self {
        let mut landmarks = vec![Landmark::default(); LANDMARK_COUNT];
        for &(id, x, y) in points {
            if let Some(slot) = landmarks.get_mut(id.index()) {
                *slot = Landmark::new(x, y, 1.0);
            }
        }
        Self {
            timestamp,
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            landmarks,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn landmark(&self, id: LandmarkId) -> Option<&Landmark> {
        self.landmarks.get(id.index())
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Returns the joint position in image pixels.
    pub fn point(&self, id: LandmarkId) -> Point {
        self.landmark(id)
            .map(|lm| {
                Point::new(
                    lm.x * f64::from(self.width),
                    lm.y * f64::from(self.height),
                )
            })
            .unwrap_or_default()
    }
}
