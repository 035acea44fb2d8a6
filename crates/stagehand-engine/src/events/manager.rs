use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::input::{ActionEvent, KeyEvent, PointerEvent};
use crate::render::{DirectionalLight, PointLight, Renderer};

use super::priority::{Either, ListenerId, Priority, PriorityError, PriorityList};
use super::result::EventResult;

pub type KeyListener = Box<dyn FnMut(&KeyEvent) -> EventResult>;
pub type PointerListener = Box<dyn FnMut(&PointerEvent) -> EventResult>;
pub type ActionListener = Box<dyn FnMut(&ActionEvent) -> EventResult>;
pub type UpdateListener = Box<dyn FnMut(f32)>;
pub type DrawListener = Box<dyn FnMut(&mut dyn Renderer)>;

/// Draw lists, in the order the stage runs them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DrawPass {
    /// MRT geometry (color/normal/depth). Only runs when the scene enables 3D.
    Geometry,
    /// After composite, still in 3D. Only runs when the scene enables 3D.
    PostProcess,
    /// Orthographic 2D overlay. Always runs.
    Overlay,
}

impl DrawPass {
    pub const ALL: [DrawPass; 3] = [DrawPass::Geometry, DrawPass::PostProcess, DrawPass::Overlay];

    #[inline]
    fn index(self) -> usize {
        match self {
            DrawPass::Geometry => 0,
            DrawPass::PostProcess => 1,
            DrawPass::Overlay => 2,
        }
    }
}

// ── EventCommands ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum EventCommand {
    Remove(ListenerId),
    ChangePriority(ListenerId, Priority),
}

/// Mailbox for listener-set changes requested from inside a dispatch pass.
///
/// Listeners capture a clone and queue changes; the owning [`EventManager`] applies them
/// after the current pass has finished walking its lists.
#[derive(Debug, Clone, Default)]
pub struct EventCommands {
    queue: Arc<Mutex<Vec<EventCommand>>>,
}

impl EventCommands {
    pub fn remove(&self, id: ListenerId) {
        self.push(EventCommand::Remove(id));
    }

    pub fn change_priority(&self, id: ListenerId, priority: Priority) {
        self.push(EventCommand::ChangePriority(id, priority));
    }

    fn push(&self, cmd: EventCommand) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cmd);
    }

    fn drain(&self) -> Vec<EventCommand> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

// ── EventManager ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Owner {
    Key,
    Pointer,
    Action(String),
    Update,
    Draw(DrawPass),
    PointLight,
    DirectionalLight,
}

/// Owns every dispatch list of one phase of the stage (steady state or load phase).
///
/// Input dispatch stops at the first listener returning [`EventResult::Handled`].
/// Update and draw passes visit every listener. Listener-set changes requested via
/// [`EventManager::commands`] are applied at the end of each pass.
pub struct EventManager {
    keys: PriorityList<KeyListener>,
    pointer: PriorityList<PointerListener>,
    actions: HashMap<String, PriorityList<ActionListener>>,
    updates: PriorityList<UpdateListener>,
    draw: [PriorityList<DrawListener>; 3],
    point_lights: PriorityList<PointLight>,
    directional_lights: PriorityList<DirectionalLight>,
    commands: EventCommands,
}

impl EventManager {
    pub fn new() -> Self {
        Self {
            keys: PriorityList::new(),
            pointer: PriorityList::new(),
            actions: HashMap::new(),
            updates: PriorityList::new(),
            draw: std::array::from_fn(|_| PriorityList::new()),
            point_lights: PriorityList::new(),
            directional_lights: PriorityList::new(),
            commands: EventCommands::default(),
        }
    }

    /// Handle for deferring removals and re-prioritisations from inside listeners.
    pub fn commands(&self) -> EventCommands {
        self.commands.clone()
    }

    // ── registration ──────────────────────────────────────────────────────

    pub fn add_key_listener(
        &mut self,
        priority: Priority,
        f: impl FnMut(&KeyEvent) -> EventResult + 'static,
    ) -> ListenerId {
        self.keys.push(priority, Box::new(f))
    }

    pub fn add_pointer_listener(
        &mut self,
        priority: Priority,
        f: impl FnMut(&PointerEvent) -> EventResult + 'static,
    ) -> ListenerId {
        self.pointer.push(priority, Box::new(f))
    }

    /// Registers a listener for the named action. Key and pointer listeners share one
    /// priority order with it when the action is triggered by that device.
    pub fn add_action_listener(
        &mut self,
        action: impl Into<String>,
        priority: Priority,
        f: impl FnMut(&ActionEvent) -> EventResult + 'static,
    ) -> ListenerId {
        self.actions
            .entry(action.into())
            .or_default()
            .push(priority, Box::new(f))
    }

    pub fn add_update_listener(&mut self, priority: Priority, f: impl FnMut(f32) + 'static) -> ListenerId {
        self.updates.push(priority, Box::new(f))
    }

    pub fn add_draw_listener(
        &mut self,
        pass: DrawPass,
        priority: Priority,
        f: impl FnMut(&mut dyn Renderer) + 'static,
    ) -> ListenerId {
        self.draw[pass.index()].push(priority, Box::new(f))
    }

    pub fn add_point_light(&mut self, light: PointLight) -> ListenerId {
        self.point_lights.push(Priority::MEDIUM, light)
    }

    pub fn add_directional_light(&mut self, light: DirectionalLight) -> ListenerId {
        self.directional_lights.push(Priority::MEDIUM, light)
    }

    pub fn point_light_mut(&mut self, id: ListenerId) -> Option<&mut PointLight> {
        self.point_lights.get_mut(id)
    }

    pub fn directional_light_mut(&mut self, id: ListenerId) -> Option<&mut DirectionalLight> {
        self.directional_lights.get_mut(id)
    }

    pub fn point_lights(&self) -> Vec<PointLight> {
        self.point_lights.iter().map(|(_, l)| *l).collect()
    }

    pub fn directional_lights(&self) -> Vec<DirectionalLight> {
        self.directional_lights.iter().map(|(_, l)| *l).collect()
    }

    /// Unregisters `id` from whichever list holds it.
    pub fn remove(&mut self, id: ListenerId) -> Result<(), PriorityError> {
        let Some(owner) = self.owner_of(id) else {
            log::warn!("event manager: cannot remove {id}, it is not registered");
            return Err(PriorityError::Missing(id));
        };
        match owner {
            Owner::Key => self.keys.remove(id).map(drop),
            Owner::Pointer => self.pointer.remove(id).map(drop),
            Owner::Action(name) => {
                let list = self.actions.get_mut(&name).ok_or(PriorityError::Missing(id))?;
                list.remove(id).map(drop)?;
                if list.is_empty() {
                    self.actions.remove(&name);
                }
                Ok(())
            }
            Owner::Update => self.updates.remove(id).map(drop),
            Owner::Draw(pass) => self.draw[pass.index()].remove(id).map(drop),
            Owner::PointLight => self.point_lights.remove(id).map(drop),
            Owner::DirectionalLight => self.directional_lights.remove(id).map(drop),
        }
    }

    /// Moves `id` to the end of the `priority` bucket of its list.
    pub fn change_priority(&mut self, id: ListenerId, priority: Priority) -> Result<(), PriorityError> {
        let Some(owner) = self.owner_of(id) else {
            log::warn!("event manager: cannot re-prioritize {id}, it is not registered");
            return Err(PriorityError::Missing(id));
        };
        match owner {
            Owner::Key => self.keys.change_priority(priority, id),
            Owner::Pointer => self.pointer.change_priority(priority, id),
            Owner::Action(name) => self
                .actions
                .get_mut(&name)
                .ok_or(PriorityError::Missing(id))?
                .change_priority(priority, id),
            Owner::Update => self.updates.change_priority(priority, id),
            Owner::Draw(pass) => self.draw[pass.index()].change_priority(priority, id),
            Owner::PointLight => self.point_lights.change_priority(priority, id),
            Owner::DirectionalLight => self.directional_lights.change_priority(priority, id),
        }
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.owner_of(id).is_some()
    }

    /// Total number of registered entries across every list.
    pub fn len(&self) -> usize {
        self.keys.len()
            + self.pointer.len()
            + self.actions.values().map(PriorityList::len).sum::<usize>()
            + self.updates.len()
            + self.draw.iter().map(PriorityList::len).sum::<usize>()
            + self.point_lights.len()
            + self.directional_lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every listener and light. Pending commands are discarded.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.pointer.clear();
        self.actions.clear();
        self.updates.clear();
        for list in &mut self.draw {
            list.clear();
        }
        self.point_lights.clear();
        self.directional_lights.clear();
        self.commands.drain();
    }

    // ── dispatch ──────────────────────────────────────────────────────────

    /// Routes a key event through key listeners merged with the listeners of `action`
    /// (if the action mapper resolved one). Key listeners win priority ties.
    pub fn dispatch_key(&mut self, event: &KeyEvent, action: Option<&ActionEvent>) -> EventResult {
        let mut none = PriorityList::new();
        let action_list = match action {
            Some(a) => self.actions.get_mut(&a.name).unwrap_or(&mut none),
            None => &mut none,
        };

        let mut result = EventResult::PassThrough;
        for (_, entry) in self.keys.union_mut(action_list) {
            result = match (entry, action) {
                (Either::Left(listener), _) => listener(event),
                (Either::Right(listener), Some(a)) => listener(a),
                (Either::Right(_), None) => EventResult::PassThrough,
            };
            if result.is_handled() {
                break;
            }
        }

        self.apply_commands();
        result
    }

    /// Pointer counterpart of [`EventManager::dispatch_key`].
    pub fn dispatch_pointer(&mut self, event: &PointerEvent, action: Option<&ActionEvent>) -> EventResult {
        let mut none = PriorityList::new();
        let action_list = match action {
            Some(a) => self.actions.get_mut(&a.name).unwrap_or(&mut none),
            None => &mut none,
        };

        let mut result = EventResult::PassThrough;
        for (_, entry) in self.pointer.union_mut(action_list) {
            result = match (entry, action) {
                (Either::Left(listener), _) => listener(event),
                (Either::Right(listener), Some(a)) => listener(a),
                (Either::Right(_), None) => EventResult::PassThrough,
            };
            if result.is_handled() {
                break;
            }
        }

        self.apply_commands();
        result
    }

    /// Delivers an action event to its listeners alone.
    pub fn dispatch_action(&mut self, action: &ActionEvent) -> EventResult {
        let mut result = EventResult::PassThrough;
        if let Some(list) = self.actions.get_mut(&action.name) {
            for (_, listener) in list.iter_mut() {
                result = listener(action);
                if result.is_handled() {
                    break;
                }
            }
        }
        self.apply_commands();
        result
    }

    /// Runs every update listener in priority order.
    pub fn run_updates(&mut self, dt: f32) {
        for (_, listener) in self.updates.iter_mut() {
            listener(dt);
        }
        self.apply_commands();
    }

    /// Runs the draw list for `pass` in priority order.
    pub fn draw(&mut self, pass: DrawPass, renderer: &mut dyn Renderer) {
        for (_, listener) in self.draw[pass.index()].iter_mut() {
            listener(&mut *renderer);
        }
        self.apply_commands();
    }

    pub fn has_draw_listeners(&self, pass: DrawPass) -> bool {
        !self.draw[pass.index()].is_empty()
    }

    /// Applies queued listener commands. Returns how many of them failed; each failure
    /// is already logged as a warning by the list it targeted.
    pub fn apply_commands(&mut self) -> usize {
        let mut failed = 0;
        for cmd in self.commands.drain() {
            let result = match &cmd {
                EventCommand::Remove(id) => self.remove(*id),
                EventCommand::ChangePriority(id, priority) => self.change_priority(*id, *priority),
            };
            if let Err(e) = result {
                log::debug!("deferred {cmd:?} not applied: {e}");
                failed += 1;
            }
        }
        failed
    }

    fn owner_of(&self, id: ListenerId) -> Option<Owner> {
        if self.keys.contains(id) {
            return Some(Owner::Key);
        }
        if self.pointer.contains(id) {
            return Some(Owner::Pointer);
        }
        if let Some((name, _)) = self.actions.iter().find(|(_, list)| list.contains(id)) {
            return Some(Owner::Action(name.clone()));
        }
        if self.updates.contains(id) {
            return Some(Owner::Update);
        }
        if let Some(pass) = DrawPass::ALL.into_iter().find(|p| self.draw[p.index()].contains(id)) {
            return Some(Owner::Draw(pass));
        }
        if self.point_lights.contains(id) {
            return Some(Owner::PointLight);
        }
        if self.directional_lights.contains(id) {
            return Some(Owner::DirectionalLight);
        }
        None
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("keys", &self.keys.len())
            .field("pointer", &self.pointer.len())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("updates", &self.updates.len())
            .field("draw", &self.draw.iter().map(PriorityList::len).collect::<Vec<_>>())
            .field("point_lights", &self.point_lights.len())
            .field("directional_lights", &self.directional_lights.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::input::{ActionState, Key, Modifiers};
    use crate::render::{Color, Quad, RecordingRenderer, Rect, RenderOp, Viewport};

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn key_listener(log: &Log, tag: &'static str, result: EventResult) -> impl FnMut(&KeyEvent) -> EventResult + 'static {
        let log = log.clone();
        move |_| {
            log.borrow_mut().push(tag);
            result
        }
    }

    fn action_listener(log: &Log, tag: &'static str, result: EventResult) -> impl FnMut(&ActionEvent) -> EventResult + 'static {
        let log = log.clone();
        move |_| {
            log.borrow_mut().push(tag);
            result
        }
    }

    fn jump_pressed() -> ActionEvent {
        ActionEvent { name: "JUMP".into(), state: ActionState::Pressed }
    }

    #[test]
    fn key_dispatch_stops_at_first_handled() {
        let log: Log = Rc::default();
        let mut events = EventManager::new();
        events.add_key_listener(Priority::LOW, key_listener(&log, "low", EventResult::PassThrough));
        events.add_key_listener(Priority::HIGH, key_listener(&log, "high", EventResult::PassThrough));
        events.add_key_listener(Priority::MEDIUM, key_listener(&log, "medium", EventResult::Handled));

        let result = events.dispatch_key(&KeyEvent::pressed(Key::A, Modifiers::NONE), None);

        assert_eq!(result, EventResult::Handled);
        assert_eq!(*log.borrow(), vec!["high", "medium"]);
    }

    #[test]
    fn key_and_action_listeners_share_one_order() {
        let log: Log = Rc::default();
        let mut events = EventManager::new();
        events.add_key_listener(Priority::MEDIUM, key_listener(&log, "key-medium", EventResult::PassThrough));
        events.add_key_listener(Priority::LOW, key_listener(&log, "key-low", EventResult::PassThrough));
        events.add_action_listener("JUMP", Priority::MEDIUM, action_listener(&log, "jump-medium", EventResult::PassThrough));
        events.add_action_listener("JUMP", Priority::HIGH, action_listener(&log, "jump-high", EventResult::PassThrough));
        events.add_action_listener("FIRE", Priority::HIGHEST, action_listener(&log, "fire", EventResult::Handled));

        let jump = jump_pressed();
        events.dispatch_key(&KeyEvent::pressed(Key::Space, Modifiers::NONE), Some(&jump));

        assert_eq!(*log.borrow(), vec!["jump-high", "key-medium", "jump-medium", "key-low"]);
    }

    #[test]
    fn key_without_action_skips_action_listeners() {
        let log: Log = Rc::default();
        let mut events = EventManager::new();
        events.add_action_listener("JUMP", Priority::HIGH, action_listener(&log, "jump", EventResult::Handled));
        events.add_key_listener(Priority::LOW, key_listener(&log, "key", EventResult::PassThrough));

        let result = events.dispatch_key(&KeyEvent::pressed(Key::Q, Modifiers::NONE), None);

        assert_eq!(result, EventResult::PassThrough);
        assert_eq!(*log.borrow(), vec!["key"]);
    }

    #[test]
    fn listener_can_remove_itself_through_commands() {
        let mut events = EventManager::new();
        let commands = events.commands();
        let calls = Rc::new(RefCell::new(0));

        let slot: Rc<RefCell<Option<ListenerId>>> = Rc::default();
        let id = {
            let calls = calls.clone();
            let slot = slot.clone();
            events.add_key_listener(Priority::MEDIUM, move |_| {
                *calls.borrow_mut() += 1;
                if let Some(id) = *slot.borrow() {
                    commands.remove(id);
                }
                EventResult::Handled
            })
        };
        *slot.borrow_mut() = Some(id);

        let ev = KeyEvent::pressed(Key::A, Modifiers::NONE);
        events.dispatch_key(&ev, None);
        events.dispatch_key(&ev, None);

        assert_eq!(*calls.borrow(), 1);
        assert!(!events.contains(id));
    }

    #[test]
    fn change_priority_reorders_updates() {
        let log: Log = Rc::default();
        let mut events = EventManager::new();
        let first = {
            let log = log.clone();
            events.add_update_listener(Priority::HIGH, move |_| log.borrow_mut().push("first"))
        };
        {
            let log = log.clone();
            events.add_update_listener(Priority::MEDIUM, move |_| log.borrow_mut().push("second"));
        }

        events.change_priority(first, Priority::LOW).unwrap();
        events.run_updates(1.0 / 60.0);

        assert_eq!(*log.borrow(), vec!["second", "first"]);
        assert!(events.change_priority(first, Priority::LOW).is_err());
    }

    #[test]
    fn priority_change_during_dispatch_applies_to_the_next_pass() {
        let log: Log = Rc::default();
        let mut events = EventManager::new();
        let commands = events.commands();
        events.add_key_listener(Priority::HIGH, key_listener(&log, "high", EventResult::PassThrough));

        let slot: Rc<RefCell<Option<ListenerId>>> = Rc::default();
        let late = {
            let log = log.clone();
            let slot = slot.clone();
            events.add_key_listener(Priority::LOW, move |_| {
                log.borrow_mut().push("late");
                if let Some(id) = slot.borrow_mut().take() {
                    commands.change_priority(id, Priority::HIGHEST);
                }
                EventResult::PassThrough
            })
        };
        *slot.borrow_mut() = Some(late);
        events.add_key_listener(Priority::LOWEST, key_listener(&log, "lowest", EventResult::PassThrough));

        let ev = KeyEvent::pressed(Key::A, Modifiers::NONE);
        events.dispatch_key(&ev, None);
        assert_eq!(*log.borrow(), vec!["high", "late", "lowest"]);

        log.borrow_mut().clear();
        events.dispatch_key(&ev, None);
        assert_eq!(*log.borrow(), vec!["late", "high", "lowest"]);
    }

    #[test]
    fn stale_deferred_commands_are_counted_and_dropped() {
        let mut events = EventManager::new();
        let commands = events.commands();
        let id = events.add_update_listener(Priority::MEDIUM, |_| {});

        commands.remove(id);
        commands.remove(id);
        commands.change_priority(id, Priority::HIGH);

        assert_eq!(events.apply_commands(), 2);
        assert!(!events.contains(id));
        assert_eq!(events.apply_commands(), 0);
    }

    #[test]
    fn remove_searches_every_list() {
        let mut events = EventManager::new();
        let light = events.add_point_light(PointLight::new([0.0, 0.0, 0.5], Color::WHITE, 10.0));
        let action = events.add_action_listener("JUMP", Priority::MEDIUM, |_| EventResult::PassThrough);
        let draw = events.add_draw_listener(DrawPass::Overlay, Priority::MEDIUM, |_| {});
        assert_eq!(events.len(), 3);

        events.remove(action).unwrap();
        events.remove(light).unwrap();
        events.remove(draw).unwrap();

        assert!(events.is_empty());
        assert_eq!(events.remove(draw), Err(PriorityError::Missing(draw)));
    }

    #[test]
    fn draw_runs_only_requested_pass() {
        let mut events = EventManager::new();
        events.add_draw_listener(DrawPass::Overlay, Priority::MEDIUM, |r| {
            r.draw_quad(Quad::new(Rect::new(0.0, 0.0, 2.0, 2.0), Color::WHITE));
        });
        events.add_draw_listener(DrawPass::Geometry, Priority::MEDIUM, |r| {
            r.draw_quad(Quad::new(Rect::new(1.0, 1.0, 1.0, 1.0), Color::BLACK));
        });

        let mut renderer = RecordingRenderer::new(Viewport::new(8.0, 8.0));
        events.draw(DrawPass::Overlay, &mut renderer);

        assert_eq!(
            renderer.ops,
            vec![RenderOp::Quad(Quad::new(Rect::new(0.0, 0.0, 2.0, 2.0), Color::WHITE))]
        );
    }

    #[test]
    fn clear_drops_everything() {
        let mut events = EventManager::new();
        events.add_key_listener(Priority::MEDIUM, |_| EventResult::PassThrough);
        events.add_update_listener(Priority::MEDIUM, |_| {});
        events.add_directional_light(DirectionalLight::new([0.0, -1.0, 0.0], Color::WHITE));
        events.clear();
        assert!(events.is_empty());
    }
}
