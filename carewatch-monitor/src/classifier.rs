//! Pose classification from body landmarks
//!
//! The landmark extractor (the CV front-end) is an external collaborator;
//! frames arrive with landmarks already attached. Classification itself is
//! geometric threshold arithmetic over normalized landmark coordinates,
//! using the 33-point layout common to pose estimation models.

use crate::source::Frame;
use carewatch_common::PoseLabel;
use serde::{Deserialize, Serialize};

/// Landmark indices used by the geometric rules (33-point body layout)
pub mod landmark_index {
    pub const NOSE: usize = 0;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const LEFT_KNEE: usize = 25;
    pub const RIGHT_KNEE: usize = 26;

    pub const COUNT: usize = 33;
}

/// One normalized body landmark (coordinates in 0.0..=1.0 frame space,
/// y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default)]
    pub visibility: f32,
}

/// Full landmark set for one detected person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmarks {
    pub points: Vec<LandmarkPoint>,
}

impl Landmarks {
    pub fn point(&self, index: usize) -> Option<&LandmarkPoint> {
        self.points.get(index)
    }
}

/// Axis-aligned person bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

/// Per-frame classifier output consumed by the monitor engine
#[derive(Debug, Clone)]
pub struct Classification {
    /// None when no person/pose was detected this frame
    pub landmarks: Option<Landmarks>,
    /// Whether the detected person matches the monitored-subject heuristic
    pub subject_of_interest: bool,
    /// Always one of the four labels, Unknown when detection failed
    pub pose: PoseLabel,
    pub bounding_box: Option<BoundingBox>,
}

impl Classification {
    fn empty() -> Self {
        Self {
            landmarks: None,
            subject_of_interest: false,
            pose: PoseLabel::Unknown,
            bounding_box: None,
        }
    }
}

/// Seam for the per-frame classification step so the engine can run
/// against any front-end (live extractor, replay, test double).
pub trait PoseClassifier: Send {
    fn classify(&mut self, frame: &Frame) -> Classification;
}

/// Threshold-based classifier over extracted landmarks.
#[derive(Debug, Clone)]
pub struct GeometricClassifier {
    /// Torso flatter than this reads as lying (with the head below the hips)
    torso_flat_threshold: f32,
    /// Torso and leg spans below this read as a bent, seated posture
    bent_posture_threshold: f32,
    /// Shoulder-to-hip vertical bend above this marks the subject of interest
    elderly_bend_threshold: f32,
}

impl Default for GeometricClassifier {
    fn default() -> Self {
        Self {
            torso_flat_threshold: 0.15,
            bent_posture_threshold: 0.3,
            elderly_bend_threshold: 0.15,
        }
    }
}

impl GeometricClassifier {
    /// Classify a landmark set into a pose label
    pub fn classify_pose(&self, landmarks: &Landmarks) -> PoseLabel {
        use landmark_index::*;

        let (Some(nose), Some(ls), Some(rs), Some(lh), Some(rh), Some(lk), Some(rk)) = (
            landmarks.point(NOSE),
            landmarks.point(LEFT_SHOULDER),
            landmarks.point(RIGHT_SHOULDER),
            landmarks.point(LEFT_HIP),
            landmarks.point(RIGHT_HIP),
            landmarks.point(LEFT_KNEE),
            landmarks.point(RIGHT_KNEE),
        ) else {
            return PoseLabel::Unknown;
        };

        let shoulder_height = (ls.y + rs.y) / 2.0;
        let hip_height = (lh.y + rh.y) / 2.0;
        let knee_height = (lk.y + rk.y) / 2.0;

        let torso_span = (shoulder_height - hip_height).abs();
        let leg_span = (hip_height - knee_height).abs();

        // Head below the hip line with a flat torso: horizontal body
        if nose.y > hip_height && torso_span < self.torso_flat_threshold {
            PoseLabel::Lying
        } else if torso_span < self.bent_posture_threshold && leg_span < self.bent_posture_threshold
        {
            PoseLabel::Sitting
        } else {
            PoseLabel::Standing
        }
    }

    /// Heuristic for whether the detected person is the monitored subject
    /// (pronounced shoulder-to-hip bend)
    pub fn estimate_subject_of_interest(&self, landmarks: &Landmarks) -> bool {
        use landmark_index::*;

        let (Some(shoulder), Some(hip)) = (
            landmarks.point(LEFT_SHOULDER),
            landmarks.point(LEFT_HIP),
        ) else {
            return false;
        };

        (shoulder.y - hip.y).abs() > self.elderly_bend_threshold
    }
}

impl PoseClassifier for GeometricClassifier {
    fn classify(&mut self, frame: &Frame) -> Classification {
        let Some(landmarks) = frame.landmarks.clone() else {
            return Classification::empty();
        };

        let pose = self.classify_pose(&landmarks);
        let subject_of_interest = self.estimate_subject_of_interest(&landmarks);

        Classification {
            landmarks: Some(landmarks),
            subject_of_interest,
            pose,
            bounding_box: frame.bounding_box,
        }
    }
}

/// Angle at `vertex` formed by `a` and `b`, in degrees. Joint-angle helper
/// for posture heuristics.
pub fn angle_between(a: &LandmarkPoint, vertex: &LandmarkPoint, b: &LandmarkPoint) -> f32 {
    let v1 = (a.x - vertex.x, a.y - vertex.y);
    let v2 = (b.x - vertex.x, b.y - vertex.y);

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let norm = (v1.0 * v1.0 + v1.1 * v1.1).sqrt() * (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if norm == 0.0 {
        return 0.0;
    }

    (dot / norm).clamp(-1.0, 1.0).acos().to_degrees()
}


#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;

    #[test]
    fn classifies_lying() {
        let classifier = GeometricClassifier::default();
        assert_eq!(classifier.classify_pose(&lying_landmarks()), PoseLabel::Lying);
        assert!(classifier.estimate_subject_of_interest(&lying_landmarks()));
    }

    #[test]
    fn classifies_sitting() {
        let classifier = GeometricClassifier::default();
        assert_eq!(
            classifier.classify_pose(&sitting_landmarks()),
            PoseLabel::Sitting
        );
    }

    #[test]
    fn classifies_standing() {
        let classifier = GeometricClassifier::default();
        assert_eq!(
            classifier.classify_pose(&standing_landmarks()),
            PoseLabel::Standing
        );
    }

    #[test]
    fn missing_landmarks_classify_unknown() {
        let classifier = GeometricClassifier::default();
        let truncated = Landmarks {
            points: vec![
                LandmarkPoint {
                    x: 0.5,
                    y: 0.5,
                    z: 0.0,
                    visibility: 1.0
                };
                5
            ],
        };
        assert_eq!(classifier.classify_pose(&truncated), PoseLabel::Unknown);
    }

    #[test]
    fn right_angle_in_degrees() {
        let vertex = LandmarkPoint {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 1.0,
        };
        let a = LandmarkPoint {
            x: 1.0,
            y: 0.0,
            z: 0.0,
            visibility: 1.0,
        };
        let b = LandmarkPoint {
            x: 0.0,
            y: 1.0,
            z: 0.0,
            visibility: 1.0,
        };
        assert!((angle_between(&a, &vertex, &b) - 90.0).abs() < 1e-3);
    }
}
