//! Pose and risk domain types
//!
//! `PoseLabel` is what the per-frame classifier emits; `RiskSeverity` and
//! `RiskLevel` describe the tier a confirmed pose escalates to. The
//! pose-to-risk mapping itself lives in configuration (see `config`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Body pose label produced by the classifier every frame.
///
/// Serialized lowercase; config keys and log fields use the lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseLabel {
    Standing,
    Sitting,
    Lying,
    Unknown,
}

impl PoseLabel {
    /// All labels the classifier can emit
    pub const ALL: [PoseLabel; 4] = [
        PoseLabel::Standing,
        PoseLabel::Sitting,
        PoseLabel::Lying,
        PoseLabel::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PoseLabel::Standing => "standing",
            PoseLabel::Sitting => "sitting",
            PoseLabel::Lying => "lying",
            PoseLabel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PoseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk tier for a confirmed pose, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSeverity {
    Low,
    Moderate,
    High,
    Emergency,
}

impl RiskSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskSeverity::Low => "low",
            RiskSeverity::Moderate => "moderate",
            RiskSeverity::High => "high",
            RiskSeverity::Emergency => "emergency",
        }
    }
}

impl fmt::Display for RiskSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved risk entry for a pose.
///
/// Returned as a fresh owned value per lookup; callers never share or
/// mutate a cached entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskLevel {
    pub severity: RiskSeverity,
    /// Display color for console panels and overlays ("red", "yellow", ...)
    pub color_hint: String,
    /// Dotted path into the message catalog ("alerts.emergency")
    pub message_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(RiskSeverity::Low < RiskSeverity::Moderate);
        assert!(RiskSeverity::Moderate < RiskSeverity::High);
        assert!(RiskSeverity::High < RiskSeverity::Emergency);
    }

    #[test]
    fn pose_label_lowercase_serde() {
        let label: PoseLabel = serde_json::from_str("\"lying\"").unwrap();
        assert_eq!(label, PoseLabel::Lying);
        assert_eq!(label.to_string(), "lying");
    }
}
