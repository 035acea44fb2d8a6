use std::path::Path;
use std::sync::{Arc, Mutex};

use stagehand_engine::assets::{AssetKind, AssetManager, BlobWriter, LoadState};
use stagehand_engine::events::{DrawPass, Priority};
use stagehand_engine::render::{Color, Quad, RecordingRenderer, Rect, RenderOp, Viewport};
use stagehand_engine::stage::{Scene, Stage, StageConfig, StageCtx};

const STEP: f64 = 1.0 / 60.0;

type Log = Arc<Mutex<Vec<String>>>;

fn write_blob(path: &Path) {
    let mut writer = BlobWriter::new();
    writer
        .add("title.wgsl", AssetKind::Shader, b"@fragment fn main() {}".to_vec())
        .unwrap();
    writer.add("level", AssetKind::Buffer, vec![1, 2, 3, 4]).unwrap();
    writer.add("spinner", AssetKind::Buffer, vec![9; 16]).unwrap();
    writer.add("music", AssetKind::Buffer, vec![0; 64]).unwrap();
    writer.add("banner", AssetKind::Buffer, vec![7; 8]).unwrap();
    writer.write_file(path).unwrap();
}

struct Title {
    log: Log,
}

impl Scene for Title {
    fn name(&self) -> &str {
        "title"
    }

    fn keep_assets(&self) -> Vec<String> {
        vec!["title.wgsl".into(), "music".into()]
    }

    fn finish_load(&mut self, ctx: &mut StageCtx<'_>) -> anyhow::Result<()> {
        let shader = ctx.assets.get_shader("title.wgsl")?;
        self.log.lock().unwrap().push(format!("title:shader {}", shader.source.len()));
        ctx.events.add_draw_listener(DrawPass::Overlay, Priority::MEDIUM, |r| {
            r.draw_quad(Quad::new(Rect::new(0.0, 0.0, 10.0, 10.0), Color::WHITE));
        });
        Ok(())
    }

    fn update(&mut self, _dt: f32, ctx: &mut StageCtx<'_>) -> anyhow::Result<()> {
        if ctx.time + 1e-9 >= 0.25 {
            ctx.switch_to(Box::new(Level { log: Arc::clone(&self.log) }));
        }
        Ok(())
    }

    fn dispose(&mut self, _assets: &mut AssetManager) {
        self.log.lock().unwrap().push("title:dispose".into());
    }
}

struct Level {
    log: Log,
}

impl Scene for Level {
    fn name(&self) -> &str {
        "level"
    }

    fn keep_assets(&self) -> Vec<String> {
        vec!["level".into(), "music".into()]
    }

    fn preload_assets(&self) -> Vec<String> {
        vec!["spinner".into(), "banner".into()]
    }

    fn min_load_time(&self) -> f64 {
        0.5
    }

    fn enables_3d(&self) -> bool {
        true
    }

    fn preload(&mut self, ctx: &mut StageCtx<'_>) -> anyhow::Result<()> {
        let spinner = ctx.assets.get_buffer("spinner")?;
        self.log.lock().unwrap().push(format!("level:preload {}", spinner.len()));
        ctx.events.add_draw_listener(DrawPass::Overlay, Priority::MEDIUM, |r| {
            r.draw_quad(Quad::new(Rect::new(1.0, 1.0, 4.0, 4.0), Color::BLACK));
        });
        Ok(())
    }

    fn load(&mut self, assets: &mut AssetManager) -> anyhow::Result<()> {
        let level = assets.get_buffer("level")?;
        self.log.lock().unwrap().push(format!("level:load {}", level.len()));
        Ok(())
    }

    fn finish_load(&mut self, ctx: &mut StageCtx<'_>) -> anyhow::Result<()> {
        self.log.lock().unwrap().push("level:finish".into());
        ctx.events.add_draw_listener(DrawPass::Geometry, Priority::MEDIUM, |r| {
            r.draw_quad(Quad::new(Rect::new(0.0, 0.0, 32.0, 32.0), Color::WHITE).at_depth(0.5));
        });
        Ok(())
    }
}

#[test]
fn title_to_level_through_a_blob_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let blob = dir.path().join("game.blob");
    write_blob(&blob);

    let mut assets = AssetManager::new();
    assets.mount_blob(&blob).unwrap();
    assert_eq!(assets.kind_of("title.wgsl"), Some(AssetKind::Shader));

    let log = Log::default();
    let config = StageConfig { fixed_step: STEP, background_loading: false };
    let mut stage = Stage::new(config, assets);
    stage.switch_to(Box::new(Title { log: Arc::clone(&log) })).unwrap();

    // First tick finishes the inline load.
    stage.tick(STEP).unwrap();
    assert_eq!(stage.scene_name(), Some("title"));
    assert!(!stage.is_loading());
    {
        let assets = stage.assets().unwrap();
        assert!(assets.is_loaded("title.wgsl") && assets.is_loaded("music"));
        assert!(!assets.is_loaded("level"));
        assert_eq!(assets.open_streams(), 0);
    }

    let mut renderer = RecordingRenderer::new(Viewport::new(320.0, 240.0));
    stage.draw(&mut renderer);
    let ops = renderer.take();
    assert!(!ops.contains(&RenderOp::BeginGeometry));
    assert_eq!(ops.iter().filter(|op| matches!(op, RenderOp::Quad(_))).count(), 1);

    // Title asks for the level a quarter second in.
    let mut guard = 0;
    while !stage.is_loading() {
        stage.advance(STEP).unwrap();
        guard += 1;
        assert!(guard < 120, "title never switched");
    }
    assert_eq!(stage.scene_name(), Some("level"));
    assert!(stage.assets().is_none(), "the pending load holds the asset manager");

    // Loading screen only: the spinner quad, no 3D passes.
    stage.draw(&mut renderer);
    let ops = renderer.take();
    assert!(!ops.contains(&RenderOp::BeginGeometry));
    assert!(ops.contains(&RenderOp::Quad(Quad::new(Rect::new(1.0, 1.0, 4.0, 4.0), Color::BLACK))));

    // min_load_time holds the load for 0.5s of ticks.
    let mut ticks = 0;
    while stage.is_loading() {
        stage.tick(STEP).unwrap();
        ticks += 1;
        assert!(ticks < 120, "level never finished loading");
    }
    assert_eq!(ticks, 30);

    let assets = stage.assets().unwrap();
    assert_eq!(assets.state(), LoadState::Idle);
    // Fetched while loading, so it joins the working set; the untouched one goes.
    assert!(assets.is_loaded("spinner"));
    assert!(!assets.is_loaded("banner"));
    assert!(assets.is_loaded("level") && assets.is_loaded("music"));
    assert!(!assets.is_loaded("title.wgsl"));
    assert_eq!(assets.open_streams(), 0);

    stage.draw(&mut renderer);
    let ops = renderer.take();
    let geometry = ops.iter().position(|op| *op == RenderOp::BeginGeometry).unwrap();
    let composite = ops.iter().position(|op| *op == RenderOp::Composite).unwrap();
    assert!(geometry < composite);
    assert_eq!(ops.last(), Some(&RenderOp::Present));

    assert_eq!(
        *log.lock().unwrap(),
        [
            format!("title:shader {}", "@fragment fn main() {}".len()),
            "title:dispose".to_owned(),
            "level:preload 16".to_owned(),
            "level:load 4".to_owned(),
            "level:finish".to_owned(),
        ]
    );
}

#[test]
fn duplicate_names_across_blobs_refuse_the_second_mount() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.blob");
    let second = dir.path().join("b.blob");
    write_blob(&first);
    write_blob(&second);

    let mut assets = AssetManager::new();
    assets.mount_blob(&first).unwrap();
    assert!(assets.mount_blob(&second).is_err());
    assert_eq!(assets.blob_count(), 1);
    assert!(assets.contains("level"));
}
