//! Frame-processing engine
//!
//! Single synchronous decision path: one frame in, one decision out.
//! Classifier output feeds the duration tracker; a confirmed pose resolves
//! its risk tier and goes to the dispatcher, which does its own throttling.
//! Alert delivery failures are logged and the loop continues.

use crate::classifier::PoseClassifier;
use crate::dispatcher::{AlertDispatcher, DispatchOutcome};
use crate::error::{Error, Result};
use crate::source::{Frame, FrameSource};
use crate::tracker::PoseDurationTracker;
use carewatch_common::config::MonitorConfig;
use carewatch_common::PoseLabel;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Moving-average window for per-frame processing times
const STATS_WINDOW: usize = 30;

/// How often the timing average is logged, in frames
const STATS_LOG_EVERY: u64 = 100;

/// What the engine decided for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Frame is near-identical to the previous one; nothing ran
    Unchanged,
    /// No landmarks this frame; tracker and dispatcher untouched
    NoSubject,
    /// A person was detected but is not the monitored subject
    NotOfInterest,
    /// Subject observed, pose not yet held long enough
    Pending,
    /// Pose confirmed and handed to the dispatcher
    Confirmed(DispatchOutcome),
    /// Pose confirmed but the outbound delivery failed (logged, recoverable)
    DeliveryFailed,
}

/// Moving average of frame processing times
#[derive(Debug, Default)]
struct FrameStats {
    samples: Vec<Duration>,
    frames_processed: u64,
}

impl FrameStats {
    fn record(&mut self, elapsed: Duration) {
        self.frames_processed += 1;
        self.samples.push(elapsed);
        if self.samples.len() > STATS_WINDOW {
            self.samples.remove(0);
        }
    }

    fn average_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: Duration = self.samples.iter().sum();
        total.as_secs_f64() * 1000.0 / self.samples.len() as f64
    }
}

/// Drives the per-frame pipeline at the configured rate.
pub struct MonitorEngine {
    config: Arc<MonitorConfig>,
    classifier: Box<dyn PoseClassifier>,
    tracker: PoseDurationTracker,
    dispatcher: Arc<AlertDispatcher>,
    stats: FrameStats,
    previous_luma: Option<image::GrayImage>,
}

impl MonitorEngine {
    pub fn new(
        config: Arc<MonitorConfig>,
        classifier: Box<dyn PoseClassifier>,
        dispatcher: Arc<AlertDispatcher>,
    ) -> Self {
        Self {
            config,
            classifier,
            tracker: PoseDurationTracker::new(),
            dispatcher,
            stats: FrameStats::default(),
            previous_luma: None,
        }
    }

    /// Mean-grayscale-difference gate against the previous frame.
    ///
    /// A static scene produces near-identical frames; classifying them all
    /// is wasted work. The stored frame is only replaced when the scene
    /// actually moved, so slow drift still accumulates into a change.
    fn frame_changed(&mut self, image: &image::RgbImage) -> bool {
        let threshold = self.config.monitoring.performance.frame_change_threshold;
        if threshold <= 0.0 {
            return true;
        }

        let luma = image::imageops::grayscale(image);
        let changed = match &self.previous_luma {
            None => true,
            Some(prev) if prev.dimensions() != luma.dimensions() => true,
            Some(prev) => {
                let total: u64 = prev
                    .pixels()
                    .zip(luma.pixels())
                    .map(|(a, b)| u64::from(a.0[0].abs_diff(b.0[0])))
                    .sum();
                let pixels = u64::from(luma.width()) * u64::from(luma.height());
                total as f64 / pixels as f64 > threshold
            }
        };
        if changed {
            self.previous_luma = Some(luma);
        }
        changed
    }

    /// Pull frames from the source at the configured fps until it ends.
    pub async fn run(&mut self, source: &mut dyn FrameSource) -> Result<()> {
        let fps = self.config.monitoring.performance.fps;
        let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(fps, "monitoring started");
        loop {
            ticker.tick().await;
            let Some(frame) = source.next_frame()? else {
                info!("frame source ended");
                return Ok(());
            };
            self.process_frame(&frame).await?;
        }
    }

    /// Run the decision pipeline for one frame.
    ///
    /// Only configuration-level faults propagate as errors; a failed alert
    /// delivery is logged and reported as `DeliveryFailed` so the loop
    /// keeps running.
    pub async fn process_frame(&mut self, frame: &Frame) -> Result<FrameOutcome> {
        let started = std::time::Instant::now();
        let outcome = self.decide(frame).await?;
        self.stats.record(started.elapsed());

        if self.stats.frames_processed % STATS_LOG_EVERY == 0 {
            debug!(
                frames = self.stats.frames_processed,
                avg_ms = self.stats.average_ms(),
                "frame timing"
            );
        }
        Ok(outcome)
    }

    async fn decide(&mut self, frame: &Frame) -> Result<FrameOutcome> {
        if !self.frame_changed(&frame.image) {
            trace!("frame unchanged, skipping");
            return Ok(FrameOutcome::Unchanged);
        }

        let classification = self.classifier.classify(frame);

        // No landmarks means no subject detected, not an error
        if classification.landmarks.is_none() {
            trace!("no pose detected this frame");
            return Ok(FrameOutcome::NoSubject);
        }
        if !classification.subject_of_interest {
            trace!(pose = %classification.pose, "person detected but not the monitored subject");
            return Ok(FrameOutcome::NotOfInterest);
        }

        let pose = classification.pose;
        let fps = self.config.monitoring.performance.fps;
        let durations = &self.config.monitoring.pose_confirmation;

        let confirmed = self.tracker.confirm(pose, fps, durations);
        if let Some((observed, required)) = self.tracker.progress(fps, durations) {
            trace!(pose = %pose, observed, required, "pose persistence");
        }

        if !confirmed {
            return Ok(FrameOutcome::Pending);
        }

        let risk = self.config.risk_for(pose)?;
        let outcome = match self
            .dispatcher
            .notify(pose, &risk, Some(&frame.image))
            .await
        {
            Ok(outcome) => FrameOutcome::Confirmed(outcome),
            Err(Error::Notification { reason, recipient }) => {
                // Recoverable: surfaced in the log with the risk tier; the
                // next confirmed frame retries once the throttle allows
                warn!(
                    severity = %risk.severity,
                    recipient = %recipient,
                    reason = %reason,
                    at = %chrono::Utc::now().to_rfc3339(),
                    "alert delivery failed"
                );
                FrameOutcome::DeliveryFailed
            }
            Err(e) => return Err(e),
        };

        // Configured escape hatch for the sticky acknowledgement: a subject
        // confirmed back on their feet clears it so later incidents alert.
        if self.config.acknowledgement.reset_on_recovery
            && pose == PoseLabel::Standing
            && self.dispatcher.is_acknowledged()
        {
            self.dispatcher.reset_acknowledgement();
        }

        Ok(outcome)
    }
}
