//! Priority-ordered event dispatch.
//!
//! Responsibilities:
//! - `PriorityList`: stable, bucketed listener storage keyed by `ListenerId`
//! - `EventManager`: the input, update, draw and light lists of one stage phase
//! - `EventCommands`: deferred listener-set changes, applied after a pass completes

mod manager;
mod priority;
mod result;

pub use manager::{
    ActionListener,
    DrawListener,
    DrawPass,
    EventCommands,
    EventManager,
    KeyListener,
    PointerListener,
    UpdateListener,
};
pub use priority::{union, Either, ListenerId, Priority, PriorityError, PriorityList, Union};
pub use result::EventResult;
