use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::input::platform::translate_window_event;
use crate::input::{InputEvent, InputState};
use crate::time::FrameClock;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Report every elapsed second to the app, however long the frame stalled.
    pub unclamped_clock: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "stagehand".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            unclamped_clock: false,
        }
    }
}

/// Requests the app makes of the runtime during a frame. Applied once the frame ends.
#[derive(Default)]
pub struct RuntimeCtx {
    title: Option<String>,
    exit: bool,
}

impl RuntimeCtx {
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn exit(&mut self) {
        self.exit = true;
    }
}

/// Opens one window and drives an [`App`] from it until the app or the user ends it.
pub struct Runtime;

impl Runtime {
    /// Runs the event loop to completion and hands the app back.
    ///
    /// `App::on_exit` runs after the window and its surface are gone.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<A>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create the event loop")?;
        let mut state = RuntimeState {
            config,
            gpu_init,
            app,
            window: None,
            exiting: false,
            init_error: None,
        };

        let result = event_loop
            .run_app(&mut state)
            .context("event loop terminated with an error");

        state.window = None;
        state.app.on_exit();

        if let Some(err) = state.init_error.take() {
            return Err(err);
        }
        result?;
        Ok(state.app)
    }
}

#[self_referencing]
struct WindowEntry {
    input_state: InputState,
    /// Events since the last frame, in arrival order.
    pending: Vec<InputEvent>,
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

impl WindowEntry {
    fn open(event_loop: &ActiveEventLoop, config: &RuntimeConfig, gpu_init: GpuInit) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.initial_size);
        let window = event_loop.create_window(attrs).context("failed to create the window")?;

        let clock = if config.unclamped_clock {
            FrameClock::unclamped()
        } else {
            FrameClock::new()
        };

        WindowEntryTryBuilder {
            input_state: InputState::default(),
            pending: Vec::new(),
            clock,
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)).context("GPU initialization failed"),
        }
        .try_build()
    }

    fn request_redraw(&self) {
        self.with_window(|w| w.request_redraw());
    }

    fn resize_to_window(&mut self) {
        let size = self.with_window(|w| w.inner_size());
        self.with_gpu_mut(|gpu| gpu.resize(size));
    }

    /// Runs one app frame, then applies what it asked for.
    fn frame<A: App>(&mut self, app: &mut A) -> RuntimeCtx {
        let mut runtime = RuntimeCtx::default();
        self.with_mut(|fields| {
            let time = fields.clock.tick();
            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id: fields.window.id(),
                    window: fields.window,
                },
                gpu: fields.gpu,
                input: fields.input_state,
                input_events: fields.pending.as_slice(),
                time,
                runtime: &mut runtime,
            };
            if app.on_frame(&mut ctx) == AppControl::Exit {
                ctx.runtime.exit();
            }
            fields.pending.clear();

            if let Some(title) = &runtime.title {
                fields.window.set_title(title);
            }
        });
        runtime
    }
}

struct RuntimeState<A: App + 'static> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    window: Option<WindowEntry>,
    exiting: bool,
    init_error: Option<anyhow::Error>,
}

impl<A: App + 'static> RuntimeState<A> {
    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exiting = true;
        event_loop.exit();
    }
}

impl<A: App + 'static> ApplicationHandler for RuntimeState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match WindowEntry::open(event_loop, &self.config, self.gpu_init.clone()) {
            Ok(entry) => {
                entry.request_redraw();
                self.window = Some(entry);
            }
            Err(e) => {
                log::error!("failed to open the window: {e:#}");
                self.init_error = Some(e);
                self.exit(event_loop);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exiting {
            event_loop.exit();
            return;
        }
        // Simulation runs continuously, not only on input.
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(entry) = &self.window {
            entry.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.exiting {
            return;
        }
        let Some(entry) = self.window.as_mut() else {
            return;
        };

        let app = &mut self.app;
        let mut app_exit = false;
        entry.with_mut(|fields| {
            if let Some(ev) = translate_window_event(fields.window, fields.input_state, &event) {
                fields.input_state.apply_event(&ev);
                fields.pending.push(ev);
            }
            app_exit = app.on_window_event(window_id, &event) == AppControl::Exit;
        });
        if app_exit {
            self.exit(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("window closed");
                self.window = None;
                self.exit(event_loop);
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                entry.resize_to_window();
                entry.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                let requests = entry.frame(&mut self.app);
                if requests.exit {
                    self.exit(event_loop);
                }
            }
            _ => {}
        }
    }
}
