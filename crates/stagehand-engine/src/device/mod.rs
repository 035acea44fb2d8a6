//! wgpu device and window surface.
//!
//! Responsibilities:
//! - adapter, device and queue selection
//! - surface format and present mode, including the vsync setting
//! - per-frame acquisition and recovery from surface errors

mod gpu;

pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
