//! Configuration loading and validation
//!
//! All runtime configuration comes from a single TOML file loaded once at
//! startup. Validation is fail-fast: a missing risk table entry or a
//! non-positive rate is a fatal `Error::Config`, never a per-frame check.
//!
//! Config file resolution priority:
//! 1. Command-line argument (`--config`, also fed by `CAREWATCH_CONFIG`)
//! 2. Platform config dir (`~/.config/carewatch/carewatch.toml` on Linux)

use crate::messages::MessageCatalog;
use crate::pose::{PoseLabel, RiskLevel, RiskSeverity};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level configuration loaded from `carewatch.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    pub monitoring: MonitoringConfig,

    #[serde(default)]
    pub alerting: AlertingConfig,

    #[serde(default)]
    pub acknowledgement: AcknowledgementConfig,

    #[serde(default)]
    pub i18n: I18nConfig,
}

/// Pose confirmation, pacing, and risk mapping
#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub pose_confirmation: PoseConfirmation,
    pub performance: PerformanceConfig,

    /// Pose name (lowercase) to risk severity. Poses absent from this map
    /// resolve to the lowest tier.
    #[serde(default)]
    pub pose_risks: HashMap<PoseLabel, RiskSeverity>,

    /// Severity to display color and message key
    pub risk_levels: HashMap<RiskSeverity, RiskLevelEntry>,
}

/// How long a pose must persist before it is acted on, in wall-clock seconds
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PoseConfirmation {
    /// Window for ordinary poses (sitting too long, etc.)
    pub standard_secs: f64,
    /// Shorter window for the emergency pose (lying, treated as a fall)
    pub emergency_secs: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PerformanceConfig {
    /// Target frame-processing rate; also converts confirmation durations
    /// into frame counts
    pub fps: f64,

    /// Mean grayscale pixel difference (0-255 scale) below which a frame
    /// counts as unchanged and skips the pipeline. Zero disables the check.
    #[serde(default = "default_frame_change_threshold")]
    pub frame_change_threshold: f64,
}

/// Per-severity display and messaging attributes
#[derive(Debug, Clone, Deserialize)]
pub struct RiskLevelEntry {
    pub color: String,
    pub message_key: String,
}

/// Outbound alert throttling and transport timeouts
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AlertingConfig {
    /// Minimum spacing between two outbound deliveries
    #[serde(default = "default_alert_interval_secs")]
    pub interval_secs: u64,

    /// Timeout applied to each transport send so a hang cannot wedge the
    /// frame loop
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_alert_interval_secs(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

/// Operator-acknowledgement policy
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct AcknowledgementConfig {
    /// When true, a confirmed return to Standing clears a previous
    /// acknowledgement so later incidents alert again. Off by default:
    /// an acknowledgement is sticky until restart.
    #[serde(default)]
    pub reset_on_recovery: bool,
}

/// Message localization
#[derive(Debug, Clone, Deserialize)]
pub struct I18nConfig {
    /// Selects `i18n/<language>.toml` next to the config file
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

fn default_alert_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_frame_change_threshold() -> f64 {
    0.1
}

fn default_language() -> String {
    "pt".to_string()
}

impl MonitorConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: MonitorConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Resolve the config file path: explicit argument first, then the
    /// platform config directory.
    pub fn resolve_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = cli_arg {
            return Ok(path.to_path_buf());
        }

        if let Some(dir) = dirs::config_dir() {
            let candidate = dir.join("carewatch").join("carewatch.toml");
            if candidate.exists() {
                return Ok(candidate);
            }
        }

        Err(Error::Config(
            "no config file found; pass --config or create carewatch/carewatch.toml \
             in the platform config directory"
                .to_string(),
        ))
    }

    /// Fail-fast startup validation
    pub fn validate(&self) -> Result<()> {
        let perf = &self.monitoring.performance;
        if perf.fps <= 0.0 || !perf.fps.is_finite() {
            return Err(Error::Config(format!(
                "performance.fps must be positive, got {}",
                perf.fps
            )));
        }
        if perf.frame_change_threshold < 0.0 || !perf.frame_change_threshold.is_finite() {
            return Err(Error::Config(format!(
                "performance.frame_change_threshold must be zero or positive, got {}",
                perf.frame_change_threshold
            )));
        }

        let durations = &self.monitoring.pose_confirmation;
        if durations.standard_secs <= 0.0 || durations.emergency_secs <= 0.0 {
            return Err(Error::Config(format!(
                "pose_confirmation durations must be positive, got standard={} emergency={}",
                durations.standard_secs, durations.emergency_secs
            )));
        }

        if self.alerting.interval_secs == 0 {
            return Err(Error::Config(
                "alerting.interval_secs must be positive".to_string(),
            ));
        }
        if self.alerting.send_timeout_secs == 0 {
            return Err(Error::Config(
                "alerting.send_timeout_secs must be positive".to_string(),
            ));
        }

        // Every severity a pose can resolve to must have a risk_levels entry,
        // including the Low fallback for unmapped poses.
        for pose in PoseLabel::ALL {
            let severity = self.severity_for(pose);
            if !self.monitoring.risk_levels.contains_key(&severity) {
                return Err(Error::Config(format!(
                    "pose '{}' resolves to severity '{}' but risk_levels has no such entry",
                    pose, severity
                )));
            }
        }

        Ok(())
    }

    /// Verify every configured message key resolves in the loaded catalog.
    /// Called once at startup after the catalog is loaded.
    pub fn validate_messages(&self, catalog: &MessageCatalog) -> Result<()> {
        for (severity, entry) in &self.monitoring.risk_levels {
            if !catalog.contains(&entry.message_key) {
                return Err(Error::Config(format!(
                    "risk_levels.{}.message_key '{}' not found in message catalog",
                    severity, entry.message_key
                )));
            }
        }
        Ok(())
    }

    fn severity_for(&self, pose: PoseLabel) -> RiskSeverity {
        self.monitoring
            .pose_risks
            .get(&pose)
            .copied()
            .unwrap_or(RiskSeverity::Low)
    }

    /// Resolve the risk entry for a pose. Returns a fresh owned value per
    /// call. Unmapped poses default to the lowest tier; a missing
    /// risk_levels entry is a configuration error caught by `validate`.
    pub fn risk_for(&self, pose: PoseLabel) -> Result<RiskLevel> {
        let severity = self.severity_for(pose);
        let entry = self
            .monitoring
            .risk_levels
            .get(&severity)
            .ok_or_else(|| Error::Config(format!("no risk_levels entry for '{}'", severity)))?;

        Ok(RiskLevel {
            severity,
            color_hint: entry.color.clone(),
            message_key: entry.message_key.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [monitoring.pose_confirmation]
        standard_secs = 3.0
        emergency_secs = 1.0

        [monitoring.performance]
        fps = 10.0

        [monitoring.pose_risks]
        lying = "emergency"
        sitting = "moderate"

        [monitoring.risk_levels.low]
        color = "green"
        message_key = "alerts.low"

        [monitoring.risk_levels.moderate]
        color = "yellow"
        message_key = "alerts.moderate"

        [monitoring.risk_levels.emergency]
        color = "red"
        message_key = "alerts.emergency"

        [alerting]
        interval_secs = 300
    "#;

    fn sample_config() -> MonitorConfig {
        let config: MonitorConfig = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();
        config
    }

    #[test]
    fn parses_and_validates_sample() {
        let config = sample_config();
        assert_eq!(config.monitoring.performance.fps, 10.0);
        assert_eq!(config.alerting.interval_secs, 300);
        // defaults fill in unlisted sections
        assert_eq!(config.alerting.send_timeout_secs, 30);
        assert_eq!(config.monitoring.performance.frame_change_threshold, 0.1);
        assert!(!config.acknowledgement.reset_on_recovery);
        assert_eq!(config.i18n.language, "pt");
    }

    #[test]
    fn rejects_negative_frame_change_threshold() {
        let mut config: MonitorConfig = toml::from_str(SAMPLE).unwrap();
        config.monitoring.performance.frame_change_threshold = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn mapped_pose_resolves_to_configured_tier() {
        let config = sample_config();
        let risk = config.risk_for(PoseLabel::Lying).unwrap();
        assert_eq!(risk.severity, RiskSeverity::Emergency);
        assert_eq!(risk.color_hint, "red");
        assert_eq!(risk.message_key, "alerts.emergency");
    }

    #[test]
    fn unmapped_pose_defaults_to_low() {
        let config = sample_config();
        let risk = config.risk_for(PoseLabel::Standing).unwrap();
        assert_eq!(risk.severity, RiskSeverity::Low);
        assert_eq!(risk.message_key, "alerts.low");
    }

    #[test]
    fn risk_for_returns_fresh_values() {
        let config = sample_config();
        let a = config.risk_for(PoseLabel::Lying).unwrap();
        let b = config.risk_for(PoseLabel::Lying).unwrap();
        assert_eq!(a, b);
        // owned clones, not views into shared state
        drop(a);
        assert_eq!(b.color_hint, "red");
    }

    #[test]
    fn rejects_non_positive_fps() {
        let mut config: MonitorConfig = toml::from_str(SAMPLE).unwrap();
        config.monitoring.performance.fps = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_durations() {
        let mut config: MonitorConfig = toml::from_str(SAMPLE).unwrap();
        config.monitoring.pose_confirmation.emergency_secs = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_missing_risk_level_entry() {
        let mut config: MonitorConfig = toml::from_str(SAMPLE).unwrap();
        config.monitoring.risk_levels.remove(&RiskSeverity::Low);
        // Standing is unmapped and falls back to Low, which must exist
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unresolvable_message_key() {
        let config = sample_config();
        let catalog = MessageCatalog::from_toml_str(
            r#"
            [alerts]
            low = "ok"
            moderate = "watch"
            "#,
        )
        .unwrap();
        // emergency key missing from the catalog
        assert!(config.validate_messages(&catalog).is_err());
    }
}
