//! Landmark frames as pushed by pose-estimator feeds.
//!
//! The raw structures are lenient: size and timestamp may be omitted.
//! Conversion into a core [`Frame`] is where topology and coordinates are
//! validated.

use chrono::{DateTime, Utc};
use repcoach_core::landmark::{DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH};
use repcoach_core::{CoreResult, Frame, Landmark};
use serde::{Deserialize, Serialize};

/// One landmark in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawLandmark {
    pub x: f64,
    pub y: f64,
    /// Estimator confidence; feeds that do not report it are trusted.
    #[serde(default = "default_visibility")]
    pub visibility: f64,
}

fn default_visibility() -> f64 {
    1.0
}

/// Frame payload carried by a `frame` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Capture time; defaults to the time the daemon received the frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    pub landmarks: Vec<RawLandmark>,
}

fn default_width() -> u32 {
    DEFAULT_FRAME_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_FRAME_HEIGHT
}

impl RawFrame {
    /// Validates and converts into a core frame.
    pub fn into_frame(self, received_at: DateTime<Utc>) -> CoreResult<Frame> {
        let landmarks = self
            .landmarks
            .into_iter()
            .map(|lm| Landmark::new(lm.x, lm.y, lm.visibility))
            .collect();
        Frame::new(
            self.timestamp.unwrap_or(received_at),
            self.width,
            self.height,
            landmarks,
        )
    }
}

impl From<&Frame> for RawFrame {
    fn from(frame: &Frame) -> Self {
        Self {
            timestamp: Some(frame.timestamp()),
            width: frame.width(),
            height: frame.height(),
            landmarks: frame
                .landmarks()
                .iter()
                .map(|lm| RawLandmark {
                    x: lm.x,
                    y: lm.y,
                    visibility: lm.visibility,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repcoach_core::{CoreError, LandmarkId, LANDMARK_COUNT};

    fn landmarks(n: usize) -> Vec<serde_json::Value> {
        (0..n)
            .map(|i| serde_json::json!({"x": 0.01 * i as f64, "y": 0.5}))
            .collect()
    }

    #[test]
    fn test_minimal_payload_uses_defaults() {
        let json = serde_json::json!({ "landmarks": landmarks(LANDMARK_COUNT) });
        let raw: RawFrame = serde_json::from_value(json).unwrap();
        assert_eq!(raw.width, 640);
        assert_eq!(raw.height, 480);

        let received = Utc::now();
        let frame = raw.into_frame(received).unwrap();
        assert_eq!(frame.timestamp(), received);
        assert_eq!(frame.landmark(LandmarkId::Nose).unwrap().visibility, 1.0);
        assert_eq!(frame.point(LandmarkId::LeftEyeInner).y, 240.0);
    }

    #[test]
    fn test_short_frame_rejected() {
        let json = serde_json::json!({ "landmarks": landmarks(12) });
        let raw: RawFrame = serde_json::from_value(json).unwrap();
        assert_eq!(
            raw.into_frame(Utc::now()).unwrap_err(),
            CoreError::InvalidLandmarkCount {
                got: 12,
                expected: LANDMARK_COUNT
            }
        );
    }

    #[test]
    fn test_from_core_frame() {
        let frame = Frame::from_points(Utc::now(), &[(LandmarkId::LeftKnee, 0.4, 0.7)]);
        let raw = RawFrame::from(&frame);
        assert_eq!(raw.landmarks.len(), LANDMARK_COUNT);
        assert_eq!(raw.into_frame(Utc::now()).unwrap(), frame);
    }
}
