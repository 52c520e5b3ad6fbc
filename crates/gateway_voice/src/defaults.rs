//! Default voice commands
//!
//! The built-in commands do not act on the scene directly. Each one queues a
//! named event on the [`EventBus`], so the action runs during the next tick
//! alongside every other queued event.

use crate::commands::{CommandId, VoiceCommands};
use crate::error::Result;
use gateway_core::events::names;
use gateway_core::{EventBus, StateValue};
use std::rc::{Rc, Weak};

/// Portals reachable by voice, with the phrases that select them
pub const PORTALS: [(&str, [&str; 3]); 3] = [
    ("education", ["education", "learning", "school"]),
    ("connection", ["connection", "connect", "social"]),
    ("analysis", ["analysis", "data", "analytics"]),
];

/// Register the built-in command set, bridged onto `bus`
///
/// The stop command also stops `commands` itself once its event drains.
pub fn install_default_commands(
    commands: &Rc<VoiceCommands>,
    bus: &Rc<EventBus>,
) -> Result<Vec<CommandId>> {
    let mut ids = vec![
        queue_on(
            commands,
            bus,
            ["go home", "home", "reset position"],
            "Return to the starting position",
            names::RESET_POSITION,
            None,
        )?,
        queue_on(
            commands,
            bus,
            ["help", "show help", "commands"],
            "List voice commands",
            names::SHOW_HELP,
            None,
        )?,
        queue_on(
            commands,
            bus,
            ["stop listening", "stop voice", "disable voice"],
            "Stop voice control",
            names::VOICE_STOP,
            None,
        )?,
    ];

    for (portal, triggers) in PORTALS {
        ids.push(queue_on(
            commands,
            bus,
            triggers,
            &format!("Go to the {} portal", portal),
            names::NAVIGATE_PORTAL,
            Some(portal.into()),
        )?);
    }

    ids.push(queue_on(
        commands,
        bus,
        ["enter vr", "start vr", "vr mode"],
        "Enter VR mode",
        names::ENTER_VR,
        None,
    )?);
    ids.push(queue_on(
        commands,
        bus,
        ["exit vr", "stop vr", "desktop mode"],
        "Return to desktop mode",
        names::EXIT_VR,
        None,
    )?);

    let weak = Rc::downgrade(commands);
    bus.on(names::VOICE_STOP, move |_| {
        if let Some(commands) = weak.upgrade() {
            commands.stop();
        }
    });

    let weak = Rc::downgrade(commands);
    bus.on(names::SHOW_HELP, move |_| {
        if let Some(commands) = weak.upgrade() {
            tracing::info!("{}", commands.help_text());
        }
    });

    Ok(ids)
}

fn queue_on<const N: usize>(
    commands: &VoiceCommands,
    bus: &Rc<EventBus>,
    triggers: [&str; N],
    description: &str,
    event: &'static str,
    data: Option<StateValue>,
) -> Result<CommandId> {
    let bus: Weak<EventBus> = Rc::downgrade(bus);
    commands.add_command(triggers, description, move |_| {
        if let Some(bus) = bus.upgrade() {
            bus.queue_event(event, data.clone());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::RecognitionResult;
    use std::cell::RefCell;

    fn setup() -> (Rc<VoiceCommands>, Rc<EventBus>) {
        let commands = Rc::new(VoiceCommands::default());
        let bus = Rc::new(EventBus::new());
        install_default_commands(&commands, &bus).unwrap();
        (commands, bus)
    }

    #[test]
    fn test_default_command_set() {
        let (commands, _bus) = setup();
        assert_eq!(commands.command_count(), 8);
        assert!(commands.help_text().contains("go home, home, reset position"));
    }

    #[test]
    fn test_commands_queue_events() {
        let (commands, bus) = setup();
        let portals = Rc::new(RefCell::new(Vec::new()));
        let p = portals.clone();
        bus.on(names::NAVIGATE_PORTAL, move |data| {
            p.borrow_mut()
                .extend(data.and_then(StateValue::as_str).map(str::to_string));
        });

        commands.process("take me to social");
        commands.process("show me the analytics");
        // Queued, not emitted
        assert!(portals.borrow().is_empty());
        assert_eq!(bus.pending(), 2);

        bus.drain();
        assert_eq!(*portals.borrow(), vec!["connection", "analysis"]);
    }

    #[test]
    fn test_stop_listening_stops_recognition() {
        let (commands, bus) = setup();
        commands.start();

        let matched = commands.handle_result(&RecognitionResult::final_result("Stop listening", 0.9));
        assert!(matched.is_some());
        assert!(commands.is_listening());

        bus.drain();
        assert!(!commands.is_listening());
    }

    #[test]
    fn test_enter_vr_phrase() {
        let (commands, bus) = setup();
        let entered = Rc::new(RefCell::new(0));
        let e = entered.clone();
        bus.on(names::ENTER_VR, move |_| *e.borrow_mut() += 1);

        commands.process("VR mode please");
        bus.drain();
        assert_eq!(*entered.borrow(), 1);
    }
}
