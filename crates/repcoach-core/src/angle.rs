//! Planar joint angles.

use std::collections::HashMap;

use crate::landmark::{Frame, LandmarkId, Point};

/// Three joints defining an angle at the middle one.
pub type JointTriple = (LandmarkId, LandmarkId, LandmarkId);

/// Angle at vertex `p2` between rays `p2->p1` and `p2->p3`, in [0, 180].
///
/// Returns `None` when either ray has zero length.
pub fn joint_angle(p1: Point, p2: Point, p3: Point) -> Option<f64> {
    if p1 == p2 || p3 == p2 {
        return None;
    }

    let raw = ((p3.y - p2.y).atan2(p3.x - p2.x) - (p1.y - p2.y).atan2(p1.x - p2.x)).to_degrees();
    let normalized = raw.rem_euclid(360.0);
    let folded = if normalized > 180.0 {
        360.0 - normalized
    } else {
        normalized
    };

    folded.is_finite().then_some(folded)
}

/// Measures joint angles from frames, remembering the last valid value
/// per triple so a degenerate frame never yields NaN.
#[derive(Debug, Default, Clone)]
pub struct AngleCalculator {
    last_valid: HashMap<JointTriple, f64>,
}

impl AngleCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Angle for `triple` in `frame`, falling back to the previous valid
    /// angle for that triple, or 0 if there is none.
    pub fn measure(&mut self, frame: &Frame, triple: JointTriple) -> f64 {
        let (a, b, c) = triple;
        match joint_angle(frame.point(a), frame.point(b), frame.point(c)) {
            Some(angle) => {
                self.last_valid.insert(triple, angle);
                angle
            }
            None => self.last_valid.get(&triple).copied().unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_straight_line_is_180() {
        let angle = joint_angle(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        )
        .unwrap();
        assert!(approx(angle, 180.0));
    }

    #[test]
    fn test_right_angle() {
        let angle = joint_angle(
            Point::new(0.0, 1.0),
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
        )
        .unwrap();
        assert!(approx(angle, 90.0));
    }

    #[test]
    fn test_reflex_is_folded() {
        // Same rays in the opposite winding order measure the same angle.
        let a = joint_angle(Point::new(1.0, 0.0), Point::new(0.0, 0.0), Point::new(0.0, 1.0));
        let b = joint_angle(Point::new(0.0, 1.0), Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        assert!(approx(a.unwrap(), b.unwrap()));
        assert!(approx(a.unwrap(), 90.0));
    }

    #[test]
    fn test_degenerate_vector() {
        let p = Point::new(3.0, 3.0);
        assert!(joint_angle(p, p, Point::new(1.0, 1.0)).is_none());
        assert!(joint_angle(Point::new(1.0, 1.0), p, p).is_none());
    }

    #[test]
    fn test_calculator_falls_back_to_last_valid() {
        use LandmarkId::{LeftElbow, LeftShoulder, LeftWrist};
        let triple = (LeftShoulder, LeftElbow, LeftWrist);
        let mut calc = AngleCalculator::new();

        // Nothing seen yet: coincident joints yield 0.
        let empty = Frame::from_points(Utc::now(), &[]);
        assert_eq!(calc.measure(&empty, triple), 0.0);

        let straight = Frame::from_points(
            Utc::now(),
            &[
                (LeftShoulder, 0.1, 0.5),
                (LeftElbow, 0.3, 0.5),
                (LeftWrist, 0.5, 0.5),
            ],
        );
        assert!(approx(calc.measure(&straight, triple), 180.0));

        let collapsed = Frame::from_points(
            Utc::now(),
            &[
                (LeftShoulder, 0.3, 0.5),
                (LeftElbow, 0.3, 0.5),
                (LeftWrist, 0.5, 0.5),
            ],
        );
        let angle = calc.measure(&collapsed, triple);
        assert!(approx(angle, 180.0));
        assert!(!angle.is_nan());
    }
}
