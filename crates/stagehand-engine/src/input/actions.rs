use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use super::types::{InputEvent, Key, KeyEvent, KeyState, Modifiers, MouseButton, MouseButtonState};

/// Capabilities fixed when an action is declared.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ActionCaps {
    /// Can be driven by a digital input (key or pointer button).
    pub button: bool,
    /// Can be driven by an analog trigger.
    pub trigger: bool,
    /// Can be driven by an axis.
    pub axis: bool,
    /// Key bindings to this action require an exact modifier set.
    pub cares_about_modifiers: bool,
}

impl ActionCaps {
    /// Digital action that ignores modifiers.
    pub const BUTTON: ActionCaps = ActionCaps {
        button: true,
        trigger: false,
        axis: false,
        cares_about_modifiers: false,
    };

    /// Digital action bound to exact modifier sets.
    pub const BUTTON_WITH_MODIFIERS: ActionCaps = ActionCaps {
        button: true,
        trigger: false,
        axis: false,
        cares_about_modifiers: true,
    };
}

/// Modifier set a key binding requires. Meta is not part of bindings.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct ModifierRequirement {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl ModifierRequirement {
    pub const NONE: ModifierRequirement = ModifierRequirement { shift: false, ctrl: false, alt: false };
    pub const SHIFT: ModifierRequirement = ModifierRequirement { shift: true, ctrl: false, alt: false };
    pub const CTRL: ModifierRequirement = ModifierRequirement { shift: false, ctrl: true, alt: false };
    pub const ALT: ModifierRequirement = ModifierRequirement { shift: false, ctrl: false, alt: true };

    #[inline]
    pub fn matches(self, m: Modifiers) -> bool {
        self.shift == m.shift && self.ctrl == m.ctrl && self.alt == m.alt
    }
}

impl From<Modifiers> for ModifierRequirement {
    fn from(m: Modifiers) -> Self {
        Self { shift: m.shift, ctrl: m.ctrl, alt: m.alt }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ActionState {
    Pressed,
    Released,
}

/// A declared action changing state.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ActionEvent {
    pub name: String,
    pub state: ActionState,
}

impl ActionEvent {
    fn new(name: &str, state: ActionState) -> Self {
        Self { name: name.to_owned(), state }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("action `{0}` has not been declared")]
    UndeclaredAction(String),

    #[error("action name {0:?} is empty, padded, or contains a comma or line break")]
    InvalidActionName(String),

    #[error("action `{action}` cannot be driven by a {device}")]
    Unsupported { action: String, device: &'static str },

    #[error("binding file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
struct KeyBinding {
    action: String,
    /// `None` for modifier-agnostic bindings.
    modifiers: Option<ModifierRequirement>,
    /// Set while this binding owns the current press of its key.
    fired: bool,
}

impl KeyBinding {
    #[inline]
    fn accepts(&self, m: Modifiers) -> bool {
        self.modifiers.is_none_or(|req| req.matches(m))
    }
}

/// Maps raw key and pointer-button input to declared actions.
///
/// Each physical key press is claimed by at most one binding: bindings on a key are tried
/// in the order they were added and the first whose modifier requirement accepts the
/// current modifiers wins. The matching release is routed back to the same binding, so
/// modifier changes during a press cannot strand an action in the held state.
#[derive(Debug, Default)]
pub struct ActionMapper {
    declared: BTreeMap<String, ActionCaps>,
    keys: HashMap<Key, Vec<KeyBinding>>,
    pointer: HashMap<MouseButton, String>,
    pointer_fired: HashSet<MouseButton>,

    // Number of bindings currently holding each action down.
    held: HashMap<String, u32>,
    just_pressed: HashSet<String>,
    just_released: HashSet<String>,
}

impl ActionMapper {
    pub fn new() -> Self {
        Self::default()
    }

    // ── declarations ──────────────────────────────────────────────────────

    /// Declares `name` with `caps`. Redeclaring replaces the capabilities; existing
    /// bindings are kept.
    ///
    /// Names must survive a trip through the binding file, so empty names, names with
    /// surrounding whitespace, and names holding `,`, `\n` or `\r` are refused.
    pub fn declare_action(&mut self, name: impl Into<String>, caps: ActionCaps) -> Result<(), BindingError> {
        let name = name.into();
        if !is_valid_action_name(&name) {
            return Err(BindingError::InvalidActionName(name));
        }
        if let Some(prev) = self.declared.insert(name.clone(), caps) {
            if prev != caps {
                log::debug!("action `{name}` redeclared with different capabilities");
            }
        }
        Ok(())
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declared.contains_key(name)
    }

    pub fn caps(&self, name: &str) -> Option<ActionCaps> {
        self.declared.get(name).copied()
    }

    /// Declared actions in name order.
    pub fn declared_actions(&self) -> impl Iterator<Item = (&str, ActionCaps)> {
        self.declared.iter().map(|(name, caps)| (name.as_str(), *caps))
    }

    // ── key bindings ──────────────────────────────────────────────────────

    /// Binds `key` (with `modifiers`) to `action`.
    ///
    /// Actions declared without `cares_about_modifiers` produce a modifier-agnostic
    /// binding that evicts every other binding on the key. Modifier-aware bindings evict
    /// the binding with the same modifier set, or a lone modifier-agnostic binding.
    pub fn add_key_action(
        &mut self,
        key: Key,
        modifiers: ModifierRequirement,
        action: &str,
    ) -> Result<(), BindingError> {
        let caps = self.require_caps(action)?;
        if !caps.button {
            return Err(BindingError::Unsupported { action: action.to_owned(), device: "key" });
        }

        let requirement = caps.cares_about_modifiers.then_some(modifiers);
        let bindings = self.keys.entry(key).or_default();

        let evicted: Vec<KeyBinding> = match requirement {
            None => std::mem::take(bindings),
            Some(req) => {
                if let Some(pos) = bindings.iter().position(|b| b.modifiers == Some(req)) {
                    vec![bindings.remove(pos)]
                } else if bindings.len() == 1 && bindings[0].modifiers.is_none() {
                    std::mem::take(bindings)
                } else {
                    Vec::new()
                }
            }
        };

        bindings.push(KeyBinding {
            action: action.to_owned(),
            modifiers: requirement,
            fired: false,
        });

        for old in evicted {
            log::debug!("key {key}: binding to `{}` replaced by `{action}`", old.action);
            if old.fired {
                self.release(&old.action);
            }
        }
        Ok(())
    }

    /// Removes every binding of `action` on `key`. Returns whether anything was removed.
    pub fn remove_key_action(&mut self, key: Key, action: &str) -> bool {
        let Some(bindings) = self.keys.get_mut(&key) else {
            return false;
        };
        let before = bindings.len();
        let mut released = Vec::new();
        bindings.retain(|b| {
            let keep = b.action != action;
            if !keep && b.fired {
                released.push(b.action.clone());
            }
            keep
        });
        let removed = bindings.len() != before;
        if bindings.is_empty() {
            self.keys.remove(&key);
        }
        for name in released {
            self.release(&name);
        }
        removed
    }

    /// Bindings on `key` in claim order, as `(modifier requirement, action)`.
    pub fn actions_for_key(&self, key: Key) -> Vec<(Option<ModifierRequirement>, &str)> {
        self.keys
            .get(&key)
            .map(|bindings| {
                bindings
                    .iter()
                    .map(|b| (b.modifiers, b.action.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every key binding, keys ordered by scancode.
    pub fn key_bindings(&self) -> Vec<(Key, Option<ModifierRequirement>, &str)> {
        let mut keys: Vec<&Key> = self.keys.keys().collect();
        keys.sort_by_key(|k| k.scancode());
        keys.into_iter()
            .flat_map(|&key| {
                self.keys[&key]
                    .iter()
                    .map(move |b| (key, b.modifiers, b.action.as_str()))
            })
            .collect()
    }

    // ── pointer bindings ──────────────────────────────────────────────────

    /// Binds `button` to `action`, replacing any previous action on the button.
    pub fn add_pointer_action(&mut self, button: MouseButton, action: &str) -> Result<(), BindingError> {
        let caps = self.require_caps(action)?;
        if !caps.button {
            return Err(BindingError::Unsupported { action: action.to_owned(), device: "pointer button" });
        }
        if let Some(old) = self.pointer.insert(button, action.to_owned()) {
            log::debug!("pointer {button:?}: binding to `{old}` replaced by `{action}`");
            if self.pointer_fired.remove(&button) {
                self.release(&old);
            }
        }
        Ok(())
    }

    pub fn clear_pointer_action(&mut self, button: MouseButton) -> Option<String> {
        let old = self.pointer.remove(&button)?;
        if self.pointer_fired.remove(&button) {
            self.release(&old);
        }
        Some(old)
    }

    pub fn pointer_action(&self, button: MouseButton) -> Option<&str> {
        self.pointer.get(&button).map(String::as_str)
    }

    /// Every pointer binding, ordered by button number.
    pub fn pointer_bindings(&self) -> Vec<(MouseButton, &str)> {
        let mut out: Vec<(MouseButton, &str)> = self
            .pointer
            .iter()
            .map(|(b, a)| (*b, a.as_str()))
            .collect();
        out.sort_by_key(|(b, _)| b.number());
        out
    }

    // ── routing ───────────────────────────────────────────────────────────

    /// Routes a key press. Repeats and keys already claimed by a binding produce nothing.
    pub fn key_down(&mut self, key: Key, modifiers: Modifiers) -> Option<ActionEvent> {
        let bindings = self.keys.get_mut(&key)?;
        if bindings.iter().any(|b| b.fired) {
            return None;
        }
        let binding = bindings.iter_mut().find(|b| b.accepts(modifiers))?;
        binding.fired = true;
        let name = binding.action.clone();
        self.press(&name);
        Some(ActionEvent::new(&name, ActionState::Pressed))
    }

    /// Routes a key release to the binding that claimed the press, if any.
    pub fn key_up(&mut self, key: Key) -> Option<ActionEvent> {
        let binding = self.keys.get_mut(&key)?.iter_mut().find(|b| b.fired)?;
        binding.fired = false;
        let name = binding.action.clone();
        self.release(&name);
        Some(ActionEvent::new(&name, ActionState::Released))
    }

    pub fn pointer_down(&mut self, button: MouseButton) -> Option<ActionEvent> {
        let name = self.pointer.get(&button)?.clone();
        if !self.pointer_fired.insert(button) {
            return None;
        }
        self.press(&name);
        Some(ActionEvent::new(&name, ActionState::Pressed))
    }

    pub fn pointer_up(&mut self, button: MouseButton) -> Option<ActionEvent> {
        if !self.pointer_fired.remove(&button) {
            return None;
        }
        let name = self.pointer.get(&button)?.clone();
        self.release(&name);
        Some(ActionEvent::new(&name, ActionState::Released))
    }

    /// Routes a key event (press or release).
    pub fn route_key(&mut self, ev: &KeyEvent) -> Option<ActionEvent> {
        match ev.state {
            KeyState::Pressed => self.key_down(ev.key, ev.modifiers),
            KeyState::Released => self.key_up(ev.key),
        }
    }

    /// Routes any input event that can trigger an action.
    pub fn route(&mut self, ev: &InputEvent) -> Option<ActionEvent> {
        match ev {
            InputEvent::Key(k) => self.route_key(k),
            InputEvent::PointerButton(b) => match b.state {
                MouseButtonState::Pressed => self.pointer_down(b.button),
                MouseButtonState::Released => self.pointer_up(b.button),
            },
            _ => None,
        }
    }

    /// Releases every claimed binding (e.g. on focus loss) and returns the releases.
    pub fn release_all(&mut self) -> Vec<ActionEvent> {
        let mut out = Vec::new();
        for bindings in self.keys.values_mut() {
            for b in bindings.iter_mut().filter(|b| b.fired) {
                b.fired = false;
                out.push(ActionEvent::new(&b.action, ActionState::Released));
            }
        }
        for button in self.pointer_fired.drain() {
            if let Some(name) = self.pointer.get(&button) {
                out.push(ActionEvent::new(name, ActionState::Released));
            }
        }
        for ev in &out {
            self.just_released.insert(ev.name.clone());
        }
        self.held.clear();
        out
    }

    // ── queries ───────────────────────────────────────────────────────────

    pub fn held(&self, action: &str) -> bool {
        self.held.contains_key(action)
    }

    pub fn just_pressed(&self, action: &str) -> bool {
        self.just_pressed.contains(action)
    }

    pub fn just_released(&self, action: &str) -> bool {
        self.just_released.contains(action)
    }

    /// Clears per-frame edge sets. Call once per simulation tick after input routing.
    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }

    fn require_caps(&self, action: &str) -> Result<ActionCaps, BindingError> {
        self.caps(action)
            .ok_or_else(|| BindingError::UndeclaredAction(action.to_owned()))
    }

    fn press(&mut self, name: &str) {
        let count = self.held.entry(name.to_owned()).or_insert(0);
        if *count == 0 {
            self.just_pressed.insert(name.to_owned());
        }
        *count += 1;
    }

    fn release(&mut self, name: &str) {
        if let Some(count) = self.held.get_mut(name) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.held.remove(name);
                self.just_released.insert(name.to_owned());
            }
        }
    }
}

fn is_valid_action_name(name: &str) -> bool {
    !name.is_empty() && name.trim() == name && !name.contains([',', '\n', '\r'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> ActionMapper {
        let mut m = ActionMapper::new();
        m.declare_action("FORWARD", ActionCaps::BUTTON).unwrap();
        m.declare_action("SPRINT", ActionCaps::BUTTON_WITH_MODIFIERS).unwrap();
        m.declare_action("SAVE", ActionCaps::BUTTON_WITH_MODIFIERS).unwrap();
        m.declare_action("FIRE", ActionCaps::BUTTON).unwrap();
        m
    }

    #[test]
    fn undeclared_action_is_rejected() {
        let mut m = ActionMapper::new();
        let err = m.add_key_action(Key::W, ModifierRequirement::NONE, "FORWARD").unwrap_err();
        assert!(matches!(err, BindingError::UndeclaredAction(name) if name == "FORWARD"));
    }

    #[test]
    fn names_the_binding_file_cannot_hold_are_refused() {
        let mut m = ActionMapper::new();
        for bad in ["", "JUMP,FIRE", "JUMP\nK", "CR\r", " PADDED"] {
            let err = m.declare_action(bad, ActionCaps::BUTTON).unwrap_err();
            assert!(matches!(err, BindingError::InvalidActionName(ref name) if name == bad), "{bad:?}");
        }
        assert_eq!(m.declared_actions().count(), 0);
        m.declare_action("JUMP_HIGH", ActionCaps::BUTTON).unwrap();
        assert!(m.is_declared("JUMP_HIGH"));
    }

    #[test]
    fn axis_only_action_cannot_take_a_key() {
        let mut m = ActionMapper::new();
        m.declare_action("LOOK", ActionCaps { axis: true, ..ActionCaps::default() }).unwrap();
        assert!(matches!(
            m.add_key_action(Key::L, ModifierRequirement::NONE, "LOOK"),
            Err(BindingError::Unsupported { .. })
        ));
    }

    #[test]
    fn modifier_aware_binding_evicts_lone_agnostic_binding() {
        let mut m = mapper();
        m.add_key_action(Key::W, ModifierRequirement::NONE, "FORWARD").unwrap();
        m.add_key_action(Key::W, ModifierRequirement::SHIFT, "SPRINT").unwrap();

        assert_eq!(m.actions_for_key(Key::W), vec![(Some(ModifierRequirement::SHIFT), "SPRINT")]);
        assert_eq!(m.key_down(Key::W, Modifiers::NONE), None);

        let ev = m.key_down(Key::W, Modifiers::SHIFT).unwrap();
        assert_eq!(ev, ActionEvent::new("SPRINT", ActionState::Pressed));
    }

    #[test]
    fn agnostic_binding_evicts_everything() {
        let mut m = mapper();
        m.add_key_action(Key::S, ModifierRequirement::CTRL, "SAVE").unwrap();
        m.add_key_action(Key::S, ModifierRequirement::SHIFT, "SPRINT").unwrap();
        m.add_key_action(Key::S, ModifierRequirement::NONE, "FORWARD").unwrap();

        assert_eq!(m.actions_for_key(Key::S), vec![(None, "FORWARD")]);
    }

    #[test]
    fn same_modifier_set_is_replaced_and_others_kept() {
        let mut m = mapper();
        m.add_key_action(Key::S, ModifierRequirement::CTRL, "SAVE").unwrap();
        m.add_key_action(Key::S, ModifierRequirement::SHIFT, "SPRINT").unwrap();
        m.add_key_action(Key::S, ModifierRequirement::CTRL, "SPRINT").unwrap();

        assert_eq!(
            m.actions_for_key(Key::S),
            vec![
                (Some(ModifierRequirement::SHIFT), "SPRINT"),
                (Some(ModifierRequirement::CTRL), "SPRINT"),
            ]
        );
    }

    #[test]
    fn press_fires_once_and_release_returns_to_claiming_binding() {
        let mut m = mapper();
        m.add_key_action(Key::Space, ModifierRequirement::NONE, "FORWARD").unwrap();

        assert!(m.key_down(Key::Space, Modifiers::NONE).is_some());
        // OS key repeat and modifier changes while held do not refire.
        assert_eq!(m.key_down(Key::Space, Modifiers::NONE), None);
        assert_eq!(m.key_down(Key::Space, Modifiers::SHIFT), None);
        assert!(m.held("FORWARD"));
        assert!(m.just_pressed("FORWARD"));

        m.end_frame();
        let up = m.key_up(Key::Space).unwrap();
        assert_eq!(up.state, ActionState::Released);
        assert!(!m.held("FORWARD"));
        assert!(m.just_released("FORWARD"));
        assert_eq!(m.key_up(Key::Space), None);
    }

    #[test]
    fn first_compatible_binding_claims_the_key() {
        let mut m = mapper();
        m.add_key_action(Key::S, ModifierRequirement::CTRL, "SAVE").unwrap();
        m.add_key_action(Key::S, ModifierRequirement::NONE, "SPRINT").unwrap();

        assert_eq!(m.key_down(Key::S, Modifiers::NONE).map(|e| e.name), Some("SPRINT".into()));
        m.key_up(Key::S);
        assert_eq!(m.key_down(Key::S, Modifiers::CTRL).map(|e| e.name), Some("SAVE".into()));
    }

    #[test]
    fn pointer_rebinding_replaces_previous_action() {
        let mut m = mapper();
        m.add_pointer_action(MouseButton::Left, "FIRE").unwrap();
        m.add_pointer_action(MouseButton::Left, "FORWARD").unwrap();

        assert_eq!(m.pointer_action(MouseButton::Left), Some("FORWARD"));
        let down = m.pointer_down(MouseButton::Left).unwrap();
        assert_eq!(down.name, "FORWARD");
        assert_eq!(m.pointer_down(MouseButton::Left), None);
        assert!(m.pointer_up(MouseButton::Left).is_some());
    }

    #[test]
    fn action_held_by_two_inputs_stays_held_until_both_release() {
        let mut m = mapper();
        m.add_key_action(Key::F, ModifierRequirement::NONE, "FIRE").unwrap();
        m.add_pointer_action(MouseButton::Left, "FIRE").unwrap();

        m.key_down(Key::F, Modifiers::NONE);
        m.pointer_down(MouseButton::Left);
        m.key_up(Key::F);
        assert!(m.held("FIRE"));
        m.pointer_up(MouseButton::Left);
        assert!(!m.held("FIRE"));
    }

    #[test]
    fn release_all_clears_claims() {
        let mut m = mapper();
        m.add_key_action(Key::W, ModifierRequirement::NONE, "FORWARD").unwrap();
        m.add_pointer_action(MouseButton::Right, "FIRE").unwrap();
        m.key_down(Key::W, Modifiers::NONE);
        m.pointer_down(MouseButton::Right);

        let mut released: Vec<String> = m.release_all().into_iter().map(|e| e.name).collect();
        released.sort();
        assert_eq!(released, vec!["FIRE".to_string(), "FORWARD".to_string()]);
        assert!(!m.held("FORWARD"));
        assert!(m.key_down(Key::W, Modifiers::NONE).is_some());
    }

    #[test]
    fn remove_key_action_drops_binding() {
        let mut m = mapper();
        m.add_key_action(Key::S, ModifierRequirement::CTRL, "SAVE").unwrap();
        assert!(m.remove_key_action(Key::S, "SAVE"));
        assert!(m.actions_for_key(Key::S).is_empty());
        assert!(!m.remove_key_action(Key::S, "SAVE"));
    }
}
