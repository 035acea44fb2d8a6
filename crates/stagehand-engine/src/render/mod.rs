//! Rendering surface driven by the stage.
//!
//! Responsibilities:
//! - define the fixed draw pipeline as the [`Renderer`] trait
//! - provide a headless [`RecordingRenderer`] for tests and tools
//! - provide the wgpu backend in [`gpu`]
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down).
//! - Vertex shaders convert to NDC using a viewport uniform.

pub mod gpu;
mod renderer;
mod types;

pub use renderer::{RecordingRenderer, RenderOp, Renderer};
pub use types::{Color, DirectionalLight, PointLight, Quad, Rect, Viewport};
