//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! Runtime code is responsible for translating platform events into `InputEvent`s;
//! the `ActionMapper` turns them into declared actions.

mod actions;
mod bindings;
mod state;
mod types;

pub mod platform;

pub use actions::{
    ActionCaps,
    ActionEvent,
    ActionMapper,
    ActionState,
    BindingError,
    ModifierRequirement,
};
pub use bindings::BindingReport;
pub use state::InputState;
pub use types::{
    InputEvent,
    Key,
    KeyEvent,
    KeyState,
    Modifiers,
    MouseButton,
    MouseButtonState,
    MouseWheelDelta,
    PointerButtonEvent,
    PointerEvent,
    PointerMoveEvent,
};
