//! Voice command registry
//!
//! Commands are matched against recognized speech in registration order.
//! A transcript is lowercased and trimmed, then the first command with a
//! trigger phrase contained in it runs; later commands are not considered.
//!
//! Recognition results arrive through [`VoiceCommands::handle_result`]. Only
//! final results whose confidence exceeds the configured sensitivity are
//! dispatched, and only while the registry is listening.

use crate::config::VoiceConfig;
use crate::error::{Result, VoiceError};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt::Write;
use std::rc::Rc;

new_key_type! {
    /// Unique identifier for a voice command
    pub struct CommandId;
}

type CommandCallback = Rc<dyn Fn(&str)>;
type ResultObserver = Rc<dyn Fn(&RecognitionResult)>;

/// One result from the speech recognizer
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub transcript: String,
    /// Recognizer confidence in `0.0..=1.0`
    pub confidence: f64,
    /// `false` for interim results that may still change
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn final_result(transcript: impl Into<String>, confidence: f64) -> Self {
        Self {
            transcript: transcript.into(),
            confidence,
            is_final: true,
        }
    }
}

/// A command that matched a transcript
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMatch {
    pub id: CommandId,
    /// Trigger phrase found in the transcript
    pub trigger: String,
}

struct VoiceCommand {
    triggers: SmallVec<[String; 4]>,
    description: String,
    callback: CommandCallback,
}

/// Registry of voice commands and the listening state
pub struct VoiceCommands {
    commands: RefCell<SlotMap<CommandId, VoiceCommand>>,
    order: RefCell<Vec<CommandId>>,
    observers: RefCell<Vec<ResultObserver>>,
    listening: Cell<bool>,
    config: VoiceConfig,
}

impl VoiceCommands {
    pub fn new(config: VoiceConfig) -> Self {
        Self {
            commands: RefCell::new(SlotMap::with_key()),
            order: RefCell::new(Vec::new()),
            observers: RefCell::new(Vec::new()),
            listening: Cell::new(false),
            config,
        }
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    /// Register a command fired by any of `triggers`
    ///
    /// Triggers are matched case-insensitively. The callback receives the
    /// normalized transcript.
    pub fn add_command<I, S, F>(
        &self,
        triggers: I,
        description: &str,
        callback: F,
    ) -> Result<CommandId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) + 'static,
    {
        let triggers: SmallVec<[String; 4]> = triggers
            .into_iter()
            .map(|t| normalize(t.as_ref()))
            .collect();
        if triggers.is_empty() {
            return Err(VoiceError::NoTriggers);
        }
        if let Some(index) = triggers.iter().position(|t| t.is_empty()) {
            return Err(VoiceError::EmptyTrigger(index));
        }

        let id = self.commands.borrow_mut().insert(VoiceCommand {
            triggers,
            description: description.to_string(),
            callback: Rc::new(callback),
        });
        self.order.borrow_mut().push(id);
        Ok(id)
    }

    pub fn remove_command(&self, id: CommandId) -> bool {
        if self.commands.borrow_mut().remove(id).is_none() {
            return false;
        }
        self.order.borrow_mut().retain(|c| *c != id);
        true
    }

    pub fn command_count(&self) -> usize {
        self.order.borrow().len()
    }

    /// Run the first command whose trigger occurs in `transcript`
    pub fn process(&self, transcript: &str) -> Option<CommandMatch> {
        let transcript = normalize(transcript);

        let found = {
            let commands = self.commands.borrow();
            self.order.borrow().iter().find_map(|id| {
                let command = commands.get(*id)?;
                let trigger = command.triggers.iter().find(|t| transcript.contains(t.as_str()))?;
                Some((*id, trigger.clone(), Rc::clone(&command.callback)))
            })
        };

        match found {
            Some((id, trigger, callback)) => {
                tracing::info!("Executing voice command: \"{}\"", trigger);
                callback(&transcript);
                Some(CommandMatch { id, trigger })
            }
            None => {
                tracing::warn!("Unrecognized voice command: \"{}\"", transcript);
                None
            }
        }
    }

    /// Feed one recognizer result
    ///
    /// Observers see every result. The result is dispatched when it is final,
    /// its confidence exceeds the sensitivity and the registry is listening.
    pub fn handle_result(&self, result: &RecognitionResult) -> Option<CommandMatch> {
        tracing::debug!(
            "Voice input: \"{}\" (confidence: {})",
            result.transcript,
            result.confidence
        );

        let observers: Vec<ResultObserver> = self.observers.borrow().clone();
        for observer in observers {
            observer(result);
        }

        if !self.listening.get() {
            tracing::debug!("Ignoring voice input while not listening");
            return None;
        }
        if !result.is_final || result.confidence <= self.config.sensitivity {
            return None;
        }
        self.process(&result.transcript)
    }

    /// Observe every recognition result, dispatched or not
    pub fn on_result<F>(&self, observer: F)
    where
        F: Fn(&RecognitionResult) + 'static,
    {
        self.observers.borrow_mut().push(Rc::new(observer));
    }

    /// Begin accepting results. Returns `true` once listening.
    pub fn start(&self) -> bool {
        if self.listening.replace(true) {
            tracing::debug!("Voice recognition already running");
        } else {
            tracing::info!("Voice recognition started ({})", self.config.language);
        }
        true
    }

    pub fn stop(&self) {
        if self.listening.replace(false) {
            tracing::info!("Voice recognition stopped");
        }
    }

    /// Flip the listening state, returning the new state
    pub fn toggle(&self) -> bool {
        if self.listening.get() {
            self.stop();
            false
        } else {
            self.start()
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.get()
    }

    /// Human-readable list of commands, one per line
    pub fn help_text(&self) -> String {
        let commands = self.commands.borrow();
        let mut text = String::from("Available Commands:\n");
        for id in self.order.borrow().iter() {
            let Some(command) = commands.get(*id) else {
                continue;
            };
            let _ = write!(text, "  - {}", command.triggers.join(", "));
            if !command.description.is_empty() {
                let _ = write!(text, " : {}", command.description);
            }
            text.push('\n');
        }
        text
    }
}

impl Default for VoiceCommands {
    fn default() -> Self {
        Self::new(VoiceConfig::default())
    }
}

/// Average level of a microphone frequency frame, in `0.0..=1.0`
pub fn audio_level(frequency_data: &[u8]) -> f64 {
    if frequency_data.is_empty() {
        return 0.0;
    }
    let sum: u64 = frequency_data.iter().map(|b| u64::from(*b)).sum();
    sum as f64 / frequency_data.len() as f64 / 255.0
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
