//! Pose persistence tracking
//!
//! Per-frame classifications flicker; a pose only becomes actionable after
//! it has been held for a wall-clock-calibrated number of consecutive
//! frames. The tracker is the single source of truth for "is this pose
//! confirmed": both the alert trigger and progress reporting read it.

use carewatch_common::config::PoseConfirmation;
use carewatch_common::PoseLabel;
use tracing::debug;

/// Debounces the per-frame pose stream into confirmed poses.
///
/// State is process-lifetime only; after any interruption confirmation
/// restarts from zero.
#[derive(Debug)]
pub struct PoseDurationTracker {
    current_pose: Option<PoseLabel>,
    consecutive_frames: u32,
}

impl PoseDurationTracker {
    pub fn new() -> Self {
        Self {
            current_pose: None,
            consecutive_frames: 0,
        }
    }

    /// Feed the latest classified pose. Returns true once the pose has been
    /// observed for the required number of consecutive frames.
    ///
    /// The call that first observes a pose change never confirms. Once a
    /// pose confirms it keeps confirming every frame until the pose
    /// changes; the dispatcher's throttling absorbs the re-triggers.
    pub fn confirm(&mut self, pose: PoseLabel, fps: f64, durations: &PoseConfirmation) -> bool {
        if self.current_pose != Some(pose) {
            debug!(pose = %pose, "pose changed");
            self.current_pose = Some(pose);
            self.consecutive_frames = 1;
            return false;
        }

        self.consecutive_frames += 1;
        self.consecutive_frames >= required_frames(pose, fps, durations)
    }

    /// Observed and required frame counts for the current pose, for status
    /// reporting. `None` before the first observation.
    pub fn progress(&self, fps: f64, durations: &PoseConfirmation) -> Option<(u32, u32)> {
        let pose = self.current_pose?;
        Some((
            self.consecutive_frames,
            required_frames(pose, fps, durations),
        ))
    }

    pub fn current_pose(&self) -> Option<PoseLabel> {
        self.current_pose
    }
}

impl Default for PoseDurationTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames a pose must persist: confirmation window times the processing
/// rate. Lying is treated as a possible fall and uses the independently
/// configured emergency window.
fn required_frames(pose: PoseLabel, fps: f64, durations: &PoseConfirmation) -> u32 {
    let duration_secs = if pose == PoseLabel::Lying {
        durations.emergency_secs
    } else {
        durations.standard_secs
    };
    (duration_secs * fps).round().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const DURATIONS: PoseConfirmation = PoseConfirmation {
        standard_secs: 3.0,
        emergency_secs: 1.0,
    };

    #[test]
    fn confirms_at_exactly_the_required_frame() {
        let mut tracker = PoseDurationTracker::new();
        // fps=10, standard=3.0s -> 30 frames
        for call in 1..=29 {
            assert!(
                !tracker.confirm(PoseLabel::Sitting, 10.0, &DURATIONS),
                "call {} must not confirm",
                call
            );
        }
        assert!(tracker.confirm(PoseLabel::Sitting, 10.0, &DURATIONS));
    }

    #[test]
    fn keeps_confirming_until_pose_changes() {
        let mut tracker = PoseDurationTracker::new();
        for _ in 0..30 {
            tracker.confirm(PoseLabel::Sitting, 10.0, &DURATIONS);
        }
        for _ in 0..5 {
            assert!(tracker.confirm(PoseLabel::Sitting, 10.0, &DURATIONS));
        }
    }

    #[test]
    fn pose_change_resets_and_returns_false() {
        let mut tracker = PoseDurationTracker::new();
        for _ in 0..30 {
            tracker.confirm(PoseLabel::Sitting, 10.0, &DURATIONS);
        }
        // change after a confirm still returns false on that call
        assert!(!tracker.confirm(PoseLabel::Standing, 10.0, &DURATIONS));
        assert_eq!(tracker.current_pose(), Some(PoseLabel::Standing));
        assert_eq!(tracker.progress(10.0, &DURATIONS), Some((1, 30)));
    }

    #[test]
    fn lying_uses_emergency_duration_independently() {
        let durations = PoseConfirmation {
            standard_secs: 5.0,
            emergency_secs: 1.0,
        };
        let mut lying = PoseDurationTracker::new();
        for call in 1..=9 {
            assert!(
                !lying.confirm(PoseLabel::Lying, 10.0, &durations),
                "lying call {} must not confirm",
                call
            );
        }
        assert!(lying.confirm(PoseLabel::Lying, 10.0, &durations));

        let mut sitting = PoseDurationTracker::new();
        for _ in 1..=49 {
            assert!(!sitting.confirm(PoseLabel::Sitting, 10.0, &durations));
        }
        assert!(sitting.confirm(PoseLabel::Sitting, 10.0, &durations));
    }

    #[test]
    fn interleaved_flicker_never_confirms() {
        let mut tracker = PoseDurationTracker::new();
        for _ in 0..50 {
            assert!(!tracker.confirm(PoseLabel::Lying, 10.0, &DURATIONS));
            assert!(!tracker.confirm(PoseLabel::Unknown, 10.0, &DURATIONS));
        }
    }

    #[test]
    fn required_frames_rounds_to_nearest() {
        let durations = PoseConfirmation {
            standard_secs: 2.5,
            emergency_secs: 0.25,
        };
        // 2.5s * 3fps = 7.5 -> 8 frames
        assert_eq!(required_frames(PoseLabel::Sitting, 3.0, &durations), 8);
        // 0.25s * 3fps = 0.75 -> 1 frame, floor at one
        assert_eq!(required_frames(PoseLabel::Lying, 3.0, &durations), 1);
    }
}
