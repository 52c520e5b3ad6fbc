//! Voice recognition configuration

use serde::{Deserialize, Serialize};

/// Recognition settings, read from the `[voice]` table
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// BCP 47 language tag passed to the recognizer
    pub language: String,
    /// Keep listening after a final result
    pub continuous: bool,
    /// Deliver non-final results as they arrive
    pub interim_results: bool,
    pub max_alternatives: u32,
    /// Minimum confidence (exclusive) for a final result to dispatch
    pub sensitivity: f64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            continuous: true,
            interim_results: true,
            max_alternatives: 1,
            sensitivity: 0.7,
        }
    }
}
