use super::{Button as DemoButton, ButtonSet, InputError, InputSource};
use gilrs::{Button, Event, EventType, GamepadId, Gilrs};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Gamepad read through gilrs
///
/// Every call drains the pending gilrs events, keeps the button presses of the active
/// gamepad and then waits one frame, mirroring a blocking per-frame pad read.
pub struct GamepadInput {
    gilrs: Gilrs,
    active_gamepad: Option<GamepadId>,
    frame_interval: Duration,
}

impl GamepadInput {
    pub fn new(gamepad_index: usize, frame_interval: Duration) -> Result<Self, InputError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => g,
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(InputError::InitializationError(e.to_string()));
            }
        };

        let gamepads: Vec<GamepadId> = gilrs.gamepads().map(|(id, _)| id).collect();
        let active_gamepad = if gamepads.is_empty() {
            warn!("No gamepad connected, waiting for one to appear");
            None
        } else {
            for (idx, (id, gamepad)) in gilrs.gamepads().enumerate() {
                info!("  [{}] ID: {}, Name: {}", idx, id, gamepad.name());
            }
            let id = gamepads
                .get(gamepad_index)
                .copied()
                .unwrap_or(gamepads[0]);
            info!("Selected gamepad {}", id);
            Some(id)
        };

        Ok(Self {
            gilrs,
            active_gamepad,
            frame_interval,
        })
    }

    fn handle_event(&mut self, id: GamepadId, event: EventType, triggers: &mut ButtonSet) {
        match event {
            EventType::Connected => {
                info!("Gamepad {} connected", id);
                if self.active_gamepad.is_none() {
                    info!("Selected gamepad {}", id);
                    self.active_gamepad = Some(id);
                }
            }
            EventType::Disconnected => {
                warn!("Gamepad {} disconnected", id);
                if self.active_gamepad == Some(id) {
                    self.active_gamepad = None;
                }
            }
            EventType::ButtonPressed(button, _) => {
                if self.active_gamepad.is_some_and(|active| active != id) {
                    debug!("Skipping press from non-active gamepad {}", id);
                    return;
                }
                if let Some(mapped) = map_button(button) {
                    debug!("Button pressed: {:?} -> {:?}", button, mapped);
                    triggers.insert(mapped);
                }
            }
            EventType::ButtonRepeated(button, _) => {
                debug!("Button repeat ignored: {:?}", button);
            }
            _ => {}
        }
    }
}

impl InputSource for GamepadInput {
    fn poll_triggers(&mut self) -> Result<ButtonSet, InputError> {
        let mut triggers = ButtonSet::empty();
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            self.handle_event(id, event, &mut triggers);
        }

        std::thread::sleep(self.frame_interval);
        Ok(triggers)
    }
}

fn map_button(button: Button) -> Option<DemoButton> {
    match button {
        Button::South => Some(DemoButton::A),
        Button::East => Some(DemoButton::B),
        Button::North => Some(DemoButton::X),
        Button::West => Some(DemoButton::Y),
        Button::LeftTrigger => Some(DemoButton::L),
        Button::Mode => Some(DemoButton::Home),
        _ => None,
    }
}
