//! Contract between the window runtime and what it runs.
//!
//! Responsibilities:
//! - `App`: per-frame and lifecycle callbacks
//! - `FrameCtx`: window, GPU, input and timing for one frame

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
