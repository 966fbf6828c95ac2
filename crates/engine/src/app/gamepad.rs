use gilrs::{Axis, Button, EventType, Gilrs};
use tracing::{info, warn};

use super::input::InputEvent;

/// Polls connected gamepads and reports their input with the classic
/// joystick numbering: axes 0/1 left stick, 2 left trigger, 3/4 right stick,
/// 5 right trigger; buttons 0..=3 face, 4..=7 shoulders, 8 select, 9 start.
pub(crate) struct GamepadSource {
    gilrs: Gilrs,
}

impl GamepadSource {
    /// `None` when the platform has no gamepad backend.
    pub(crate) fn open() -> Option<Self> {
        match Gilrs::new() {
            Ok(gilrs) => {
                let pads = gilrs.gamepads().count();
                info!(pads, "gamepads_ready");
                Some(Self { gilrs })
            }
            Err(error) => {
                warn!(error = %error, "gamepads_unavailable");
                None
            }
        }
    }

    pub(crate) fn drain(&mut self, mut sink: impl FnMut(InputEvent)) {
        while let Some(event) = self.gilrs.next_event() {
            if let Some(input) = translate(event.event) {
                sink(input);
            }
        }
    }
}

fn translate(event: EventType) -> Option<InputEvent> {
    match event {
        EventType::ButtonPressed(button, _) => button_event(button),
        EventType::AxisChanged(axis, value, _) => axis_event(axis, value),
        _ => None,
    }
}

fn button_event(button: Button) -> Option<InputEvent> {
    let button = match button {
        Button::South => 0,
        Button::East => 1,
        Button::West => 2,
        Button::North => 3,
        Button::LeftTrigger => 4,
        Button::RightTrigger => 5,
        Button::LeftTrigger2 => 6,
        Button::RightTrigger2 => 7,
        Button::Select => 8,
        Button::Start => 9,
        _ => return None,
    };
    Some(InputEvent::JoyButton { button })
}

/// Vertical stick axes are flipped so that up reads negative.
fn axis_event(axis: Axis, value: f32) -> Option<InputEvent> {
    let (axis, value) = match axis {
        Axis::LeftStickX => (0, value),
        Axis::LeftStickY => (1, -value),
        Axis::LeftZ => (2, value),
        Axis::RightStickX => (3, value),
        Axis::RightStickY => (4, -value),
        Axis::RightZ => (5, value),
        _ => return None,
    };
    Some(InputEvent::JoyAxis { axis, value })
}
