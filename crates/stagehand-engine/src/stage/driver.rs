use std::mem;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::assets::{AssetError, AssetManager};
use crate::events::{DrawPass, EventManager, EventResult};
use crate::input::{ActionMapper, InputEvent, InputState};
use crate::render::{Color, Renderer};
use crate::time::FixedStep;

use super::scene::{Scene, StageCtx, StageRequests};

// Simulated-time comparisons tolerate summation drift.
const TIME_EPSILON: f64 = 1e-9;

/// Stage failures. All of them are fatal to the frame loop.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("scene `{scene}` failed during {step}")]
    Scene {
        scene: String,
        step: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("load thread for scene `{0}` exited without reporting")]
    LoadPanicked(String),

    #[error("failed to spawn the load thread")]
    Spawn(#[source] std::io::Error),

    #[error("asset manager is owned by the load thread")]
    AssetsBusy,
}

impl StageError {
    fn scene(scene: &dyn Scene, step: &'static str, source: anyhow::Error) -> Self {
        StageError::Scene { scene: scene.name().to_owned(), step, source }
    }
}

#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Simulation tick in seconds.
    pub fixed_step: f64,
    /// Run loads with real work on a background thread. When false, loads run inline
    /// during the switch.
    pub background_loading: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            fixed_step: 1.0 / 60.0,
            background_loading: true,
        }
    }
}

// ── Load job ──────────────────────────────────────────────────────────────

struct LoadOutcome {
    assets: AssetManager,
    scene: Box<dyn Scene>,
    result: Result<(), StageError>,
}

enum LoadWork {
    Running {
        done: Receiver<LoadOutcome>,
        handle: JoinHandle<()>,
    },
    Done(LoadOutcome),
}

struct LoadJob {
    scene_name: String,
    keep: Vec<String>,
    preload: Vec<String>,
    min_load_time: f64,
    elapsed: f64,
    work: LoadWork,
}

impl LoadJob {
    /// Picks up the outcome if the thread has reported. Never blocks.
    fn poll(&mut self) -> Result<(), StageError> {
        let LoadWork::Running { done, .. } = &self.work else {
            return Ok(());
        };
        let outcome = match done.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return Ok(()),
            Err(TryRecvError::Disconnected) => return Err(StageError::LoadPanicked(self.scene_name.clone())),
        };
        if let LoadWork::Running { handle, .. } = mem::replace(&mut self.work, LoadWork::Done(outcome)) {
            if handle.join().is_err() {
                log::error!("load thread for `{}` panicked after reporting", self.scene_name);
            }
        }
        Ok(())
    }

    /// Both gates: the load has reported and the minimum load time has passed.
    fn ready(&self) -> bool {
        matches!(self.work, LoadWork::Done(_)) && self.elapsed + TIME_EPSILON >= self.min_load_time
    }
}

impl LoadWork {
    /// Blocks until the load finishes. Loads are never cancelled.
    fn wait(self) -> Option<LoadOutcome> {
        match self {
            LoadWork::Done(outcome) => Some(outcome),
            LoadWork::Running { done, handle } => {
                let outcome = done.recv().ok();
                let _ = handle.join();
                outcome
            }
        }
    }
}

/// `start_load` followed by the scene's own load callback.
fn run_load(
    assets: &mut AssetManager,
    scene: &mut dyn Scene,
    keep: &[String],
    preload: &[String],
) -> Result<(), StageError> {
    let report = assets.start_load(keep, preload)?;
    log::debug!(
        "scene `{}`: {} assets loaded, {} disposed",
        scene.name(),
        report.loaded.len(),
        report.unloaded.len()
    );
    scene
        .load(assets)
        .map_err(|source| StageError::scene(scene, "load", source))
}

enum Phase {
    Empty,
    Active(Box<dyn Scene>),
    Loading(LoadJob),
}

// ── Stage ─────────────────────────────────────────────────────────────────

/// Scene driver: fixed-timestep updates, the scene-switch protocol and the draw
/// pipeline.
///
/// A switch runs `Active(a) -> clear a's listeners -> dispose a -> pre_load(b) ->
/// b.preload -> load (inline or on the load thread) -> finish_load -> Active(b)`.
/// While loading, input, updates and drawing go to a separate load-phase
/// [`EventManager`]. The load thread is polled once per tick and never joined while
/// still running.
pub struct Stage {
    config: StageConfig,
    clock: FixedStep,

    assets: Option<AssetManager>,
    events: EventManager,
    loading_events: EventManager,
    actions: ActionMapper,
    input: InputState,

    phase: Phase,
    requests: StageRequests,
    frame_misses: u64,
}

impl Stage {
    pub fn new(config: StageConfig, assets: AssetManager) -> Self {
        Self {
            clock: FixedStep::new(config.fixed_step),
            config,
            assets: Some(assets),
            events: EventManager::new(),
            loading_events: EventManager::new(),
            actions: ActionMapper::new(),
            input: InputState::default(),
            phase: Phase::Empty,
            requests: StageRequests::default(),
            frame_misses: 0,
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    /// The asset manager, unless the load thread currently owns it.
    pub fn assets(&self) -> Option<&AssetManager> {
        self.assets.as_ref()
    }

    pub fn assets_mut(&mut self) -> Option<&mut AssetManager> {
        self.assets.as_mut()
    }

    pub fn events(&self) -> &EventManager {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventManager {
        &mut self.events
    }

    pub fn loading_events(&self) -> &EventManager {
        &self.loading_events
    }

    pub fn actions(&self) -> &ActionMapper {
        &self.actions
    }

    pub fn actions_mut(&mut self) -> &mut ActionMapper {
        &mut self.actions
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading(_))
    }

    /// Name of the active scene, or of the scene being loaded.
    pub fn scene_name(&self) -> Option<&str> {
        match &self.phase {
            Phase::Empty => None,
            Phase::Active(scene) => Some(scene.name()),
            Phase::Loading(job) => Some(&job.scene_name),
        }
    }

    /// Simulated seconds so far.
    pub fn time(&self) -> f64 {
        self.clock.total_time
    }

    pub fn tick_count(&self) -> u64 {
        self.clock.step_count
    }

    pub fn ticks_this_frame(&self) -> u32 {
        self.clock.steps_this_frame
    }

    /// Frames that needed more than one simulation tick.
    pub fn frame_misses(&self) -> u64 {
        self.frame_misses
    }

    pub fn exit_requested(&self) -> bool {
        self.requests.exit
    }

    // ── scene switching ───────────────────────────────────────────────────

    /// Starts switching to `scene`. While another scene is still loading, the switch is
    /// queued and starts once that load finishes.
    pub fn switch_to(&mut self, scene: Box<dyn Scene>) -> Result<(), StageError> {
        if self.is_loading() {
            log::debug!("queueing switch to `{}` behind the current load", scene.name());
            if let Some(prev) = self.requests.next.replace(scene) {
                log::warn!("scene switch to `{}` superseded", prev.name());
            }
            return Ok(());
        }
        self.begin_switch(scene)
    }

    fn begin_switch(&mut self, mut next: Box<dyn Scene>) -> Result<(), StageError> {
        let assets = self.assets.as_mut().ok_or(StageError::AssetsBusy)?;

        if let Phase::Active(mut old) = mem::replace(&mut self.phase, Phase::Empty) {
            log::info!("leaving scene `{}`", old.name());
            self.events.clear();
            old.dispose(assets);
        }
        self.loading_events.clear();

        log::info!("loading scene `{}`", next.name());
        let keep = next.keep_assets();
        let preload = next.preload_assets();
        assets.pre_load(&preload)?;

        let mut ctx = StageCtx {
            assets,
            events: &mut self.loading_events,
            actions: &mut self.actions,
            input: &self.input,
            time: self.clock.total_time,
            requests: &mut self.requests,
        };
        next.preload(&mut ctx)
            .map_err(|source| StageError::scene(next.as_ref(), "preload", source))?;

        let background = self.config.background_loading && ctx.assets.load_has_work_to_do(&keep, &preload);
        let scene_name = next.name().to_owned();
        let min_load_time = next.min_load_time();
        let mut assets = self.assets.take().ok_or(StageError::AssetsBusy)?;

        let work = if background {
            let (tx, done) = mpsc::channel();
            let (keep, preload) = (keep.clone(), preload.clone());
            let handle = thread::Builder::new()
                .name("stagehand-load".into())
                .spawn(move || {
                    let mut scene = next;
                    let result = run_load(&mut assets, scene.as_mut(), &keep, &preload);
                    // The receiver only goes away if the stage itself was dropped.
                    let _ = tx.send(LoadOutcome { assets, scene, result });
                })
                .map_err(StageError::Spawn)?;
            LoadWork::Running { done, handle }
        } else {
            let result = run_load(&mut assets, next.as_mut(), &keep, &preload);
            LoadWork::Done(LoadOutcome { assets, scene: next, result })
        };

        self.phase = Phase::Loading(LoadJob {
            scene_name,
            keep,
            preload,
            min_load_time,
            elapsed: 0.0,
            work,
        });
        Ok(())
    }

    fn finish_load(&mut self, job: LoadJob) -> Result<(), StageError> {
        let LoadJob { scene_name, keep, preload, elapsed, work, .. } = job;
        let Some(LoadOutcome { assets, mut scene, result }) = work.wait() else {
            return Err(StageError::LoadPanicked(scene_name));
        };
        self.assets = Some(assets);
        result?;

        let assets = self.assets.as_mut().ok_or(StageError::AssetsBusy)?;
        assets.end_load(&keep, &preload)?;
        self.loading_events.clear();

        let mut ctx = StageCtx {
            assets,
            events: &mut self.events,
            actions: &mut self.actions,
            input: &self.input,
            time: self.clock.total_time,
            requests: &mut self.requests,
        };
        scene
            .finish_load(&mut ctx)
            .map_err(|source| StageError::scene(scene.as_ref(), "finish_load", source))?;

        log::info!("scene `{}` active after {elapsed:.2}s of loading", scene.name());
        self.phase = Phase::Active(scene);
        Ok(())
    }

    // ── frame loop ────────────────────────────────────────────────────────

    /// Feeds one rendered frame of wall-clock time and runs the resulting ticks.
    ///
    /// Returns the number of ticks run. More than one tick counts as a frame miss.
    pub fn advance(&mut self, frame_dt: f64) -> Result<u32, StageError> {
        self.clock.begin_frame(frame_dt);
        while self.clock.should_step() {
            self.tick(self.clock.step())?;
        }

        let ticks = self.clock.steps_this_frame;
        if ticks > 1 {
            self.frame_misses += 1;
            log::debug!("frame miss: {ticks} ticks in one frame");
        }
        Ok(ticks)
    }

    /// One simulation tick of `dt` seconds.
    pub fn tick(&mut self, dt: f64) -> Result<(), StageError> {
        let dt32 = dt as f32;

        if let Phase::Active(scene) = &mut self.phase {
            let assets = self.assets.as_mut().ok_or(StageError::AssetsBusy)?;
            let mut ctx = StageCtx {
                assets,
                events: &mut self.events,
                actions: &mut self.actions,
                input: &self.input,
                time: self.clock.total_time,
                requests: &mut self.requests,
            };
            scene
                .update(dt32, &mut ctx)
                .map_err(|source| StageError::scene(scene.as_ref(), "update", source))?;
            self.events.run_updates(dt32);
        } else if let Phase::Loading(job) = &mut self.phase {
            self.loading_events.run_updates(dt32);
            job.elapsed += dt;
            job.poll()?;
            if job.ready() {
                if let Phase::Loading(job) = mem::replace(&mut self.phase, Phase::Empty) {
                    self.finish_load(job)?;
                }
            }
        }

        self.actions.end_frame();

        if !self.is_loading() {
            if let Some(next) = self.requests.next.take() {
                self.begin_switch(next)?;
            }
        }
        Ok(())
    }

    /// Routes one input event through the action mapper to the current event manager.
    pub fn handle_input(&mut self, ev: &InputEvent) -> EventResult {
        self.input.apply_event(ev);

        let events = match self.phase {
            Phase::Loading(_) => &mut self.loading_events,
            _ => &mut self.events,
        };

        if let InputEvent::Focused(false) = ev {
            for release in self.actions.release_all() {
                events.dispatch_action(&release);
            }
            return EventResult::PassThrough;
        }

        let action = self.actions.route(ev);
        match ev {
            InputEvent::Key(key) => events.dispatch_key(key, action.as_ref()),
            _ => match ev.pointer_event() {
                Some(pointer) => events.dispatch_pointer(&pointer, action.as_ref()),
                None => action.map_or(EventResult::PassThrough, |a| events.dispatch_action(&a)),
            },
        }
    }

    /// Runs the fixed draw pipeline for the current phase.
    pub fn draw(&mut self, renderer: &mut dyn Renderer) {
        let (enables_3d, clear) = match &self.phase {
            Phase::Active(scene) => (scene.enables_3d(), scene.clear_color()),
            _ => (false, Color::BLACK),
        };
        let events = match self.phase {
            Phase::Loading(_) => &mut self.loading_events,
            _ => &mut self.events,
        };

        renderer.clear_targets(clear);
        if enables_3d {
            renderer.begin_geometry_pass();
            events.draw(DrawPass::Geometry, renderer);
            renderer.accumulate_lights(&events.point_lights(), &events.directional_lights());
            renderer.composite();
            renderer.begin_post_process();
            events.draw(DrawPass::PostProcess, renderer);
        }
        renderer.begin_overlay();
        events.draw(DrawPass::Overlay, renderer);
        renderer.present();
    }

    /// Disposes the current scene, waiting for an in-flight load to finish first.
    pub fn shutdown(&mut self) {
        match mem::replace(&mut self.phase, Phase::Empty) {
            Phase::Empty => {}
            Phase::Active(mut scene) => {
                self.events.clear();
                if let Some(assets) = self.assets.as_mut() {
                    scene.dispose(assets);
                }
            }
            Phase::Loading(job) => {
                log::info!("waiting for `{}` to finish loading before shutdown", job.scene_name);
                if let Some(LoadOutcome { mut assets, mut scene, .. }) = job.work.wait() {
                    scene.dispose(&mut assets);
                    self.assets = Some(assets);
                }
            }
        }
        self.loading_events.clear();
        self.requests.next = None;
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        self.shutdown();
    }
}
