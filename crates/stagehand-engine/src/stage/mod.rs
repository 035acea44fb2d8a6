//! Scene driver.
//!
//! Responsibilities:
//! - `Scene`: the lifecycle contract content implements
//! - `Stage`: fixed-timestep ticks, the scene-switch protocol, background loading and the
//!   fixed draw pipeline
//! - `StageApp`: adapts a `Stage` to the window runtime and the wgpu renderer

mod driver;
mod runner;
mod scene;

pub use driver::{Stage, StageConfig, StageError};
pub use runner::{run_stage, StageApp};
pub use scene::{Scene, StageCtx};
