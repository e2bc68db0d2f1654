//! # CareWatch Monitor
//!
//! Elderly-monitoring service: classifies body pose per frame, debounces
//! the noisy classification stream into confirmed poses, and raises
//! rate-limited, operator-acknowledgeable alerts over Telegram.
//!
//! Pipeline: frame source → classifier → [`PoseDurationTracker`] →
//! risk lookup → [`AlertDispatcher`] → transport.
//!
//! [`PoseDurationTracker`]: tracker::PoseDurationTracker
//! [`AlertDispatcher`]: dispatcher::AlertDispatcher

pub mod classifier;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod source;
pub mod telegram;
pub mod tracker;

pub use error::{Error, Result};
