use super::action::Signal;

/// Keys the platform layer forwards to scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Space,
    P,
    W,
    A,
    S,
    D,
    I,
    J,
    K,
    L,
    Up,
    Down,
    Left,
    Right,
    Keypad2,
    Keypad4,
    Keypad6,
    Keypad7,
    Keypad8,
    Keypad9,
}

const KEY_COUNT: usize = 22;

impl Key {
    const fn index(self) -> usize {
        match self {
            Key::Escape => 0,
            Key::Enter => 1,
            Key::Space => 2,
            Key::P => 3,
            Key::W => 4,
            Key::A => 5,
            Key::S => 6,
            Key::D => 7,
            Key::I => 8,
            Key::J => 9,
            Key::K => 10,
            Key::L => 11,
            Key::Up => 12,
            Key::Down => 13,
            Key::Left => 14,
            Key::Right => 15,
            Key::Keypad2 => 16,
            Key::Keypad4 => 17,
            Key::Keypad6 => 18,
            Key::Keypad7 => 19,
            Key::Keypad8 => 20,
            Key::Keypad9 => 21,
        }
    }
}

/// Platform event with a type-specific payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
    JoyAxis { axis: u8, value: f32 },
    JoyButton { button: u8 },
    Custom(Signal),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEventKind {
    KeyDown,
    KeyUp,
    JoyAxis,
    JoyButton,
    Custom,
    Quit,
}

impl InputEvent {
    pub fn kind(&self) -> InputEventKind {
        match self {
            InputEvent::KeyDown(_) => InputEventKind::KeyDown,
            InputEvent::KeyUp(_) => InputEventKind::KeyUp,
            InputEvent::JoyAxis { .. } => InputEventKind::JoyAxis,
            InputEvent::JoyButton { .. } => InputEventKind::JoyButton,
            InputEvent::Custom(_) => InputEventKind::Custom,
            InputEvent::Quit => InputEventKind::Quit,
        }
    }
}

/// Which keys are currently held, updated as events are pumped.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeldKeys {
    down: [bool; KEY_COUNT],
}

impl HeldKeys {
    pub fn observe(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(key) => self.down[key.index()] = true,
            InputEvent::KeyUp(key) => self.down[key.index()] = false,
            _ => {}
        }
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.down[key.index()]
    }

    pub fn release_all(&mut self) {
        self.down = [false; KEY_COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_keys_follow_down_and_up_events() {
        let mut held = HeldKeys::default();
        held.observe(&InputEvent::KeyDown(Key::S));
        held.observe(&InputEvent::KeyDown(Key::K));
        assert!(held.is_down(Key::S) && held.is_down(Key::K));
        held.observe(&InputEvent::KeyUp(Key::S));
        assert!(!held.is_down(Key::S));
        held.observe(&InputEvent::JoyButton { button: 9 });
        assert!(held.is_down(Key::K));
    }

    #[test]
    fn key_indices_are_unique() {
        let keys = [
            Key::Escape, Key::Enter, Key::Space, Key::P, Key::W, Key::A, Key::S, Key::D, Key::I,
            Key::J, Key::K, Key::L, Key::Up, Key::Down, Key::Left, Key::Right, Key::Keypad2,
            Key::Keypad4, Key::Keypad6, Key::Keypad7, Key::Keypad8, Key::Keypad9,
        ];
        let mut seen = [false; KEY_COUNT];
        for key in keys {
            assert!(!seen[key.index()], "{key:?}");
            seen[key.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
