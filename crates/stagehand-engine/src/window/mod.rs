//! Window runtime.
//!
//! Owns the winit event loop and the single stage window, translates its events into
//! engine input and calls the app once per redraw.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
