use winit::window::{Window, WindowId};

use crate::device::{Gpu, SurfaceErrorAction};
use crate::input::{InputEvent, InputState};
use crate::render::Viewport;
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id:     WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Returns the window size in logical pixels.
    pub fn viewport(&self) -> Viewport {
        let phys  = self.window.inner_size();
        let scale = self.window.scale_factor();
        let logi: winit::dpi::LogicalSize<f64> = phys.to_logical(scale);
        Viewport::new(logi.width as f32, logi.height as f32)
    }

    pub fn scale_factor(&self) -> f32 {
        self.window.scale_factor() as f32
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window:       WindowCtx<'a>,
    pub gpu:          &'a mut Gpu<'w>,
    /// Input state after every event of this frame was applied.
    pub input:        &'a InputState,
    /// Input events received since the previous frame, in arrival order.
    pub input_events: &'a [InputEvent],
    pub time:         FrameTime,
    pub runtime:      &'a mut RuntimeCtx,
}

impl FrameCtx<'_, '_> {
    /// Recovers from a failed surface acquisition.
    ///
    /// Lost or outdated surfaces are reconfigured and the frame is skipped; running out
    /// of memory ends the loop.
    pub fn surface_error(&mut self, err: wgpu::SurfaceError) -> AppControl {
        match self.gpu.handle_surface_error(err) {
            SurfaceErrorAction::Fatal => AppControl::Exit,
            SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => AppControl::Continue,
        }
    }

    /// Signals the window system that a frame is about to be presented.
    pub fn pre_present(&self) {
        self.window.window.pre_present_notify();
    }
}
