use anyhow::Context;
use winit::dpi::LogicalSize;

use crate::config::EngineConfig;
use crate::core::{App, AppControl, FrameCtx};
use crate::device::GpuInit;
use crate::render::gpu::GpuRenderer;
use crate::window::{Runtime, RuntimeConfig};

use super::driver::{Stage, StageError};

/// Drives a [`Stage`] from the window runtime: input, fixed-step simulation, drawing.
pub struct StageApp {
    stage: Stage,
    renderer: GpuRenderer,
    title: String,
    shown_scene: Option<String>,
    error: Option<StageError>,
}

impl StageApp {
    pub fn new(stage: Stage, title: impl Into<String>) -> Self {
        Self {
            stage,
            renderer: GpuRenderer::new(),
            title: title.into(),
            shown_scene: None,
            error: None,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn renderer_mut(&mut self) -> &mut GpuRenderer {
        &mut self.renderer
    }

    /// The error that stopped the loop, if any.
    pub fn into_result(self) -> Result<(), StageError> {
        self.error.map_or(Ok(()), Err)
    }
}

impl App for StageApp {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        for ev in ctx.input_events {
            self.stage.handle_input(ev);
        }

        if let Err(e) = self.stage.advance(ctx.time.dt_secs) {
            log::error!("stage stopped: {e}");
            self.error = Some(e);
            return AppControl::Exit;
        }
        if self.stage.exit_requested() {
            log::info!("exit requested by scene");
            return AppControl::Exit;
        }

        let scene = self.stage.scene_name().map(str::to_owned);
        if scene != self.shown_scene {
            let title = match &scene {
                Some(name) => format!("{} - {name}", self.title),
                None => self.title.clone(),
            };
            ctx.runtime.set_title(title);
            self.shown_scene = scene;
        }

        self.renderer.set_viewport(ctx.window.viewport());
        self.stage.draw(&mut self.renderer);

        ctx.pre_present();
        match self.renderer.flush(ctx.gpu, ctx.window.scale_factor()) {
            Ok(()) => AppControl::Continue,
            Err(e) => ctx.surface_error(e),
        }
    }

    fn on_exit(&mut self) {
        self.stage.shutdown();
    }
}

/// Opens a window sized by `config` and runs `stage` until a scene exits or fails.
///
/// Switch to the first scene before calling this.
pub fn run_stage(config: &EngineConfig, title: &str, stage: Stage) -> anyhow::Result<()> {
    let runtime = RuntimeConfig {
        title: title.to_owned(),
        initial_size: LogicalSize::new(config.res_width as f64, config.res_height as f64),
        // Fixed-step simulation must see every elapsed second.
        unclamped_clock: true,
    };
    let gpu_init = GpuInit::from_config(config);

    let app = Runtime::run(runtime, gpu_init, StageApp::new(stage, title))?;
    app.into_result().context("stage failed")
}
