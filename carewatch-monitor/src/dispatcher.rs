//! Alert dispatch: throttling and operator acknowledgement
//!
//! `notify` runs on every confirmed frame, so it throttles itself: one
//! outbound delivery per throttle interval, nothing at all once an operator
//! has acknowledged. The acknowledgement flag is the only state shared with
//! another task (the inbound listener), held in an atomic.

use crate::error::Result;
use async_trait::async_trait;
use carewatch_common::messages::MessageCatalog;
use carewatch_common::{PoseLabel, RiskLevel};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

/// Alert snapshot image, encoded to JPEG at delivery time
pub type Snapshot = image::RgbImage;

/// Outbound delivery channel. Object-safe so tests can inject a recorder
/// in place of the Telegram client.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Deliver a photo with a caption. The file at `photo` lives only for
    /// the duration of the call.
    async fn send_photo(&self, photo: &Path, caption: &str) -> Result<()>;
}

/// What a `notify` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// One outbound delivery was made
    Sent,
    /// Dropped: within the throttle interval of the previous delivery
    Throttled,
    /// Dropped: an operator acknowledged; no further alerts this run
    Acknowledged,
}

/// Rate-limited, acknowledgeable notifier.
///
/// Constructed once and shared by reference; no ambient globals.
pub struct AlertDispatcher {
    transport: Arc<dyn AlertTransport>,
    catalog: Arc<MessageCatalog>,
    interval: Duration,
    acknowledged: AtomicBool,
    /// Set only after a confirmed send success, so a failed delivery does
    /// not consume the throttle window
    last_alert: Mutex<Option<Instant>>,
}

impl AlertDispatcher {
    pub fn new(
        transport: Arc<dyn AlertTransport>,
        catalog: Arc<MessageCatalog>,
        interval: Duration,
    ) -> Self {
        Self {
            transport,
            catalog,
            interval,
            acknowledged: AtomicBool::new(false),
            last_alert: Mutex::new(None),
        }
    }

    /// Decide whether to deliver an alert for a confirmed risky pose, and
    /// deliver it. Called on every confirmed frame.
    ///
    /// Exactly one outbound message per `Sent` outcome: photo-with-caption
    /// when a snapshot is available, text-only otherwise, never both.
    pub async fn notify(
        &self,
        pose: PoseLabel,
        risk: &RiskLevel,
        snapshot: Option<&Snapshot>,
    ) -> Result<DispatchOutcome> {
        if self.acknowledged.load(Ordering::Acquire) {
            return Ok(DispatchOutcome::Acknowledged);
        }

        // Throttle check under the lock; the lock is released before the
        // transport await so the listener is never blocked on network I/O.
        {
            let last_alert = self.last_alert.lock().await;
            if let Some(last) = *last_alert {
                if last.elapsed() < self.interval {
                    debug!(pose = %pose, severity = %risk.severity, "alert throttled");
                    return Ok(DispatchOutcome::Throttled);
                }
            }
        }

        let message = self
            .catalog
            .format(&risk.message_key, &[("pose", pose.as_str())])?;

        match snapshot {
            Some(snapshot) => self.send_snapshot(snapshot, &message).await?,
            None => self.transport.send_text(&message).await?,
        }

        *self.last_alert.lock().await = Some(Instant::now());
        info!(
            pose = %pose,
            severity = %risk.severity,
            caption = %message,
            "alert sent"
        );
        Ok(DispatchOutcome::Sent)
    }

    /// Write the snapshot to a scoped temp file and deliver it as a
    /// photo-with-caption. The temp file is removed when the guard drops,
    /// send failure included.
    async fn send_snapshot(&self, snapshot: &Snapshot, caption: &str) -> Result<()> {
        let temp = tempfile::Builder::new()
            .prefix("carewatch_alert_")
            .suffix(".jpg")
            .tempfile()?;
        snapshot.save_with_format(temp.path(), image::ImageFormat::Jpeg)?;

        self.transport.send_photo(temp.path(), caption).await
    }

    /// Operator acknowledgement: absorbs every later `notify` for the rest
    /// of the run (unless recovery reset is enabled in config).
    pub fn acknowledge(&self) {
        self.acknowledged.store(true, Ordering::Release);
        info!("alert acknowledged by operator");
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged.load(Ordering::Acquire)
    }

    /// Clear a previous acknowledgement. Only invoked by the engine when
    /// `acknowledgement.reset_on_recovery` is enabled and the subject is
    /// confirmed back to standing.
    pub fn reset_acknowledgement(&self) {
        if self.acknowledged.swap(false, Ordering::AcqRel) {
            info!("acknowledgement cleared after recovery");
        }
    }
}
