//! Voice command error types

use thiserror::Error;

/// Errors raised while registering voice commands
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoiceError {
    /// A command needs at least one trigger phrase
    #[error("Voice command has no triggers")]
    NoTriggers,

    /// A trigger phrase is empty after trimming and would match everything
    #[error("Voice command trigger {0} is empty")]
    EmptyTrigger(usize),
}

/// Result type for voice operations
pub type Result<T> = std::result::Result<T, VoiceError>;
