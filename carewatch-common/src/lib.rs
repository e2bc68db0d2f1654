//! # CareWatch Common Library
//!
//! Shared code for the CareWatch elderly-monitoring workspace:
//! - Pose and risk domain types
//! - Configuration loading and validation
//! - Localized message catalog
//! - Common error types

pub mod config;
pub mod error;
pub mod messages;
pub mod pose;

pub use error::{Error, Result};
pub use pose::{PoseLabel, RiskLevel, RiskSeverity};
