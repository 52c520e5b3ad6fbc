//! Gateway Voice Control
//!
//! Turns speech recognition results into gateway actions. Recognized
//! transcripts are matched against registered trigger phrases; the default
//! command set queues events on the core [`EventBus`](gateway_core::EventBus).
//!
//! # Example
//!
//! ```rust
//! use gateway_voice::{RecognitionResult, VoiceCommands};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let commands = VoiceCommands::default();
//! let helped = Rc::new(Cell::new(false));
//! let h = helped.clone();
//! commands.add_command(["help"], "Show help", move |_| h.set(true)).unwrap();
//!
//! commands.start();
//! commands.handle_result(&RecognitionResult::final_result("Help me", 0.92));
//! assert!(helped.get());
//! ```

mod commands;
mod config;
mod defaults;
mod error;

pub use commands::{audio_level, CommandId, CommandMatch, RecognitionResult, VoiceCommands};
pub use config::VoiceConfig;
pub use defaults::{install_default_commands, PORTALS};
pub use error::{Result, VoiceError};
