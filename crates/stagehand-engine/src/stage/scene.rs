use crate::assets::AssetManager;
use crate::events::EventManager;
use crate::input::{ActionMapper, InputState};
use crate::render::Color;

/// A unit of content driven by the [`Stage`](super::Stage).
///
/// Lifecycle, in order:
///
/// 1. `preload` on the main thread. `ctx.events` is the load-phase event manager, so a
///    progress screen registered here never collides with steady-state listeners.
/// 2. `load`, possibly on the background load thread, after the asset manager has
///    loaded the keep and preload sets.
/// 3. `finish_load` on the main thread once loading is done and `min_load_time` has
///    elapsed. Steady-state listeners are registered here.
/// 4. `update` once per simulation tick, before the update listeners.
/// 5. `dispose` when the stage switches away. Listeners are already cleared by then.
///
/// Scenes must be `Send` because `load` may run on another thread. Listener closures
/// stay on the main thread and need not be.
pub trait Scene: Send {
    fn name(&self) -> &str;

    /// Assets needed for the whole active lifetime of the scene.
    fn keep_assets(&self) -> Vec<String> {
        Vec::new()
    }

    /// Assets needed only while this scene loads (its loading screen).
    fn preload_assets(&self) -> Vec<String> {
        Vec::new()
    }

    /// Minimum simulated seconds between the switch and `finish_load`.
    fn min_load_time(&self) -> f64 {
        0.0
    }

    /// Whether the geometry, lighting and post-process passes run.
    fn enables_3d(&self) -> bool {
        false
    }

    fn clear_color(&self) -> Color {
        Color::BLACK
    }

    fn preload(&mut self, ctx: &mut StageCtx<'_>) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Heavy initialization. Must not touch anything owned by the main thread.
    fn load(&mut self, assets: &mut AssetManager) -> anyhow::Result<()> {
        let _ = assets;
        Ok(())
    }

    fn finish_load(&mut self, ctx: &mut StageCtx<'_>) -> anyhow::Result<()>;

    fn update(&mut self, dt: f32, ctx: &mut StageCtx<'_>) -> anyhow::Result<()> {
        let _ = (dt, ctx);
        Ok(())
    }

    fn dispose(&mut self, assets: &mut AssetManager) {
        let _ = assets;
    }
}

/// Requests a scene makes of the stage. Applied after the current tick.
#[derive(Default)]
pub(crate) struct StageRequests {
    pub next: Option<Box<dyn Scene>>,
    pub exit: bool,
}

/// Stage services handed to scene callbacks.
pub struct StageCtx<'a> {
    pub assets: &'a mut AssetManager,
    pub events: &'a mut EventManager,
    pub actions: &'a mut ActionMapper,
    pub input: &'a InputState,
    /// Simulated seconds since the stage started.
    pub time: f64,
    pub(crate) requests: &'a mut StageRequests,
}

impl StageCtx<'_> {
    /// Switches to `scene` once the current tick finishes.
    pub fn switch_to(&mut self, scene: Box<dyn Scene>) {
        if let Some(prev) = self.requests.next.replace(scene) {
            log::warn!("scene switch to `{}` superseded", prev.name());
        }
    }

    pub fn request_exit(&mut self) {
        self.requests.exit = true;
    }
}
