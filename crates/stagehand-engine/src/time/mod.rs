//! Frame timing.
//!
//! `FrameClock` measures wall-clock time per rendered frame; `FixedStep` turns that into
//! whole simulation ticks of a fixed length.

mod fixed_step;
mod frame_clock;

pub use fixed_step::FixedStep;
pub use frame_clock::{FrameClock, FrameTime};
