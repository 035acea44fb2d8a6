use std::collections::HashSet;
use std::hash::Hash;

use super::types::{
    InputEvent, Key, KeyEvent, KeyState, Modifiers, MouseButton, MouseButtonState, PointerButtonEvent,
    PointerMoveEvent,
};

/// Level state derived from the input event stream: what is held, where the pointer is.
///
/// The stage keeps one for scenes to poll. The window runtime keeps another so the
/// platform translator can attach modifiers and the pointer position to events that
/// arrive without them.
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,
    pub focused: bool,
    /// Logical pixels; `None` while the pointer is outside the window.
    pub pointer_pos: Option<(f32, f32)>,
    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    pub fn apply_event(&mut self, ev: &InputEvent) {
        match ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = *m,
            InputEvent::Focused(focused) => {
                self.focused = *focused;
                // Releases are not delivered to an unfocused window.
                if !focused {
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }
            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => self.pointer_pos = Some((*x, *y)),
            InputEvent::PointerLeft => self.pointer_pos = None,
            InputEvent::Key(KeyEvent { key, state, modifiers, .. }) => {
                self.modifiers = *modifiers;
                set_held(&mut self.keys_down, *key, *state == KeyState::Pressed);
            }
            InputEvent::PointerButton(PointerButtonEvent { button, state, x, y, modifiers }) => {
                self.pointer_pos = Some((*x, *y));
                self.modifiers = *modifiers;
                set_held(&mut self.buttons_down, *button, *state == MouseButtonState::Pressed);
            }
            InputEvent::MouseWheel { modifiers, .. } => self.modifiers = *modifiers,
        }
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}

fn set_held<T: Eq + Hash>(set: &mut HashSet<T>, item: T, held: bool) {
    if held {
        set.insert(item);
    } else {
        set.remove(&item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn left(state: MouseButtonState, x: f32, y: f32) -> InputEvent {
        InputEvent::PointerButton(PointerButtonEvent {
            button: MouseButton::Left,
            state,
            x,
            y,
            modifiers: Modifiers::NONE,
        })
    }

    #[test]
    fn focus_loss_clears_held_keys_and_buttons() {
        let mut state = InputState::default();
        state.apply_event(&InputEvent::Key(KeyEvent::pressed(Key::W, Modifiers::NONE)));
        state.apply_event(&left(MouseButtonState::Pressed, 3.0, 4.0));
        assert!(state.key_down(Key::W));
        assert!(state.button_down(MouseButton::Left));
        assert_eq!(state.pointer_pos, Some((3.0, 4.0)));

        state.apply_event(&InputEvent::Focused(false));
        assert!(!state.key_down(Key::W));
        assert!(!state.button_down(MouseButton::Left));
    }

    #[test]
    fn key_events_track_modifiers() {
        let mut state = InputState::default();
        state.apply_event(&InputEvent::Key(KeyEvent::pressed(Key::S, Modifiers::CTRL)));
        assert_eq!(state.modifiers, Modifiers::CTRL);
        state.apply_event(&InputEvent::Key(KeyEvent::released(Key::S, Modifiers::NONE)));
        assert!(!state.key_down(Key::S));
        assert!(!state.modifiers.any());
    }

    #[test]
    fn pointer_leaving_forgets_the_position() {
        let mut state = InputState::default();
        state.apply_event(&InputEvent::PointerMoved(PointerMoveEvent { x: 10.0, y: 20.0 }));
        assert_eq!(state.pointer_pos, Some((10.0, 20.0)));
        state.apply_event(&InputEvent::PointerLeft);
        assert_eq!(state.pointer_pos, None);
    }
}
