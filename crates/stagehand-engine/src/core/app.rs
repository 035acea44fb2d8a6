use winit::event::WindowEvent;
use winit::window::WindowId;

use super::ctx::FrameCtx;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// What the window runtime drives. [`StageApp`](crate::stage::StageApp) is the
/// implementation the engine ships.
pub trait App {
    /// Raw window events, seen before input translation is handed to `on_frame`.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// One rendered frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// The loop has stopped and the window is gone.
    fn on_exit(&mut self) {}
}
