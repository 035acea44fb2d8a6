use std::fmt;

/// Keyboard key identifier.
///
/// Every variant has a stable scancode in the USB HID usage table (the numbering SDL
/// uses), which is what binding files store. Keys without a named variant round-trip
/// through `Key::Unknown(scancode)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    // Common control keys
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,

    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    // Modifiers as keys (left/right collapsed)
    Shift,
    Control,
    Alt,
    Meta,

    // Letters
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    // Digits
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    // Function keys
    F1, F2, F3, F4, F5, F6,
    F7, F8, F9, F10, F11, F12,

    /// Key not represented above, carrying its scancode.
    Unknown(u32),
}

const LETTERS: [Key; 26] = [
    Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H, Key::I, Key::J, Key::K,
    Key::L, Key::M, Key::N, Key::O, Key::P, Key::Q, Key::R, Key::S, Key::T, Key::U, Key::V,
    Key::W, Key::X, Key::Y, Key::Z,
];

// HID order is 1..9 then 0.
const DIGITS: [Key; 10] = [
    Key::Digit1, Key::Digit2, Key::Digit3, Key::Digit4, Key::Digit5,
    Key::Digit6, Key::Digit7, Key::Digit8, Key::Digit9, Key::Digit0,
];

const FUNCTION_KEYS: [Key; 12] = [
    Key::F1, Key::F2, Key::F3, Key::F4, Key::F5, Key::F6,
    Key::F7, Key::F8, Key::F9, Key::F10, Key::F11, Key::F12,
];

impl Key {
    /// Stable scancode for this key.
    pub fn scancode(self) -> u32 {
        if let Some(i) = LETTERS.iter().position(|&k| k == self) {
            return 4 + i as u32;
        }
        if let Some(i) = DIGITS.iter().position(|&k| k == self) {
            return 30 + i as u32;
        }
        if let Some(i) = FUNCTION_KEYS.iter().position(|&k| k == self) {
            return 58 + i as u32;
        }
        match self {
            Key::Enter => 40,
            Key::Escape => 41,
            Key::Backspace => 42,
            Key::Tab => 43,
            Key::Space => 44,
            Key::Insert => 73,
            Key::Home => 74,
            Key::PageUp => 75,
            Key::Delete => 76,
            Key::End => 77,
            Key::PageDown => 78,
            Key::ArrowRight => 79,
            Key::ArrowLeft => 80,
            Key::ArrowDown => 81,
            Key::ArrowUp => 82,
            Key::Control => 224,
            Key::Shift => 225,
            Key::Alt => 226,
            Key::Meta => 227,
            Key::Unknown(code) => code,
            _ => 0,
        }
    }

    /// Inverse of [`Key::scancode`].
    pub fn from_scancode(code: u32) -> Key {
        match code {
            4..=29 => LETTERS[(code - 4) as usize],
            30..=39 => DIGITS[(code - 30) as usize],
            58..=69 => FUNCTION_KEYS[(code - 58) as usize],
            40 => Key::Enter,
            41 => Key::Escape,
            42 => Key::Backspace,
            43 => Key::Tab,
            44 => Key::Space,
            73 => Key::Insert,
            74 => Key::Home,
            75 => Key::PageUp,
            76 => Key::Delete,
            77 => Key::End,
            78 => Key::PageDown,
            79 => Key::ArrowRight,
            80 => Key::ArrowLeft,
            81 => Key::ArrowDown,
            82 => Key::ArrowUp,
            224 | 228 => Key::Control,
            225 | 229 => Key::Shift,
            226 | 230 => Key::Alt,
            227 | 231 => Key::Meta,
            other => Key::Unknown(other),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

impl MouseButton {
    /// Button number as stored in binding files (1 = left, 2 = middle, 3 = right, ...).
    pub fn number(self) -> u16 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
            MouseButton::Back => 4,
            MouseButton::Forward => 5,
            MouseButton::Other(n) => n,
        }
    }

    pub fn from_number(n: u16) -> MouseButton {
        match n {
            1 => MouseButton::Left,
            2 => MouseButton::Middle,
            3 => MouseButton::Right,
            4 => MouseButton::Back,
            5 => MouseButton::Forward,
            other => MouseButton::Other(other),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MouseButtonState {
    Pressed,
    Released,
}

/// Modifier keys state.
///
/// This is stored as booleans rather than bitflags to keep it explicit and stable.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false, ctrl: false, alt: false, meta: false };
    pub const SHIFT: Modifiers = Modifiers { shift: true, ctrl: false, alt: false, meta: false };
    pub const CTRL: Modifiers = Modifiers { shift: false, ctrl: true, alt: false, meta: false };
    pub const ALT: Modifiers = Modifiers { shift: false, ctrl: false, alt: true, meta: false };

    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// Mouse wheel delta.
///
/// `Line` corresponds to "scroll lines" style input; `Pixel` is high precision.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MouseWheelDelta {
    Line { x: f32, y: f32 },
    Pixel { x: f32, y: f32 },
}

/// Pointer move event in logical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerMoveEvent {
    pub x: f32,
    pub y: f32,
}

/// Pointer button event.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerButtonEvent {
    pub button: MouseButton,
    pub state: MouseButtonState,
    pub x: f32,
    pub y: f32,
    pub modifiers: Modifiers,
}

/// Raw keyboard event.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct KeyEvent {
    pub key: Key,
    pub state: KeyState,
    pub modifiers: Modifiers,
    /// True when event is a key-repeat.
    pub repeat: bool,
}

impl KeyEvent {
    pub fn pressed(key: Key, modifiers: Modifiers) -> Self {
        Self { key, state: KeyState::Pressed, modifiers, repeat: false }
    }

    pub fn released(key: Key, modifiers: Modifiers) -> Self {
        Self { key, state: KeyState::Released, modifiers, repeat: false }
    }
}

/// Events delivered to pointer listeners.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PointerEvent {
    Moved(PointerMoveEvent),
    Button(PointerButtonEvent),
    Wheel { delta: MouseWheelDelta, modifiers: Modifiers },
    Left,
}

/// Platform-agnostic input events emitted by the runtime.
///
/// Runtime translates window system events into these.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    ModifiersChanged(Modifiers),

    Key(KeyEvent),

    PointerMoved(PointerMoveEvent),
    PointerButton(PointerButtonEvent),

    MouseWheel {
        delta: MouseWheelDelta,
        modifiers: Modifiers,
    },

    /// Pointer left the window surface.
    PointerLeft,

    /// Window focus change.
    Focused(bool),
}

impl InputEvent {
    /// The pointer-listener view of this event, if it is a pointer event.
    pub fn pointer_event(&self) -> Option<PointerEvent> {
        match self {
            InputEvent::PointerMoved(m) => Some(PointerEvent::Moved(*m)),
            InputEvent::PointerButton(b) => Some(PointerEvent::Button(*b)),
            InputEvent::MouseWheel { delta, modifiers } => Some(PointerEvent::Wheel {
                delta: *delta,
                modifiers: *modifiers,
            }),
            InputEvent::PointerLeft => Some(PointerEvent::Left),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scancodes_match_hid_table() {
        assert_eq!(Key::A.scancode(), 4);
        assert_eq!(Key::Z.scancode(), 29);
        assert_eq!(Key::Digit1.scancode(), 30);
        assert_eq!(Key::Digit0.scancode(), 39);
        assert_eq!(Key::Space.scancode(), 44);
        assert_eq!(Key::F12.scancode(), 69);
        assert_eq!(Key::ArrowUp.scancode(), 82);
    }

    #[test]
    fn named_keys_round_trip_through_scancodes() {
        let keys = [
            Key::Escape, Key::Enter, Key::Tab, Key::Backspace, Key::Space, Key::Insert,
            Key::Delete, Key::Home, Key::End, Key::PageUp, Key::PageDown, Key::ArrowUp,
            Key::ArrowDown, Key::ArrowLeft, Key::ArrowRight, Key::Shift, Key::Control,
            Key::Alt, Key::Meta, Key::Q, Key::Digit5, Key::F7,
        ];
        for key in keys {
            assert_eq!(Key::from_scancode(key.scancode()), key, "{key}");
        }
    }

    #[test]
    fn unknown_scancode_is_preserved() {
        assert_eq!(Key::from_scancode(300), Key::Unknown(300));
        assert_eq!(Key::Unknown(300).scancode(), 300);
    }

    #[test]
    fn right_hand_modifiers_collapse() {
        assert_eq!(Key::from_scancode(229), Key::Shift);
        assert_eq!(Key::from_scancode(228), Key::Control);
    }

    #[test]
    fn mouse_button_numbers_round_trip() {
        for b in [MouseButton::Left, MouseButton::Middle, MouseButton::Right, MouseButton::Back, MouseButton::Forward, MouseButton::Other(9)] {
            assert_eq!(MouseButton::from_number(b.number()), b);
        }
    }
}
