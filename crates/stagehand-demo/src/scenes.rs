use std::sync::Arc;

use anyhow::Context as _;

use stagehand_engine::assets::AssetManager;
use stagehand_engine::events::{DrawPass, ListenerId, Priority};
use stagehand_engine::render::{Color, DirectionalLight, PointLight, Quad, Rect};
use stagehand_engine::stage::{Scene, StageCtx};

use crate::assets::{Palette, Terrain, PALETTE, TERRAIN};
use crate::progress::add_progress_bar;

pub const CONFIRM: &str = "CONFIRM";
pub const BACK: &str = "BACK";
pub const QUIT: &str = "QUIT";

const SPLASH_SECONDS: f64 = 4.0;

// ── splash ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct SplashScene {
    shown_for: f64,
}

impl Scene for SplashScene {
    fn name(&self) -> &str {
        "splash"
    }

    fn keep_assets(&self) -> Vec<String> {
        vec![PALETTE.into()]
    }

    fn min_load_time(&self) -> f64 {
        0.75
    }

    fn clear_color(&self) -> Color {
        Color::rgb(0.05, 0.06, 0.09)
    }

    fn preload(&mut self, ctx: &mut StageCtx<'_>) -> anyhow::Result<()> {
        add_progress_bar(ctx.events, self.min_load_time(), Color::rgb(0.2, 0.2, 0.2), Color::WHITE);
        Ok(())
    }

    fn finish_load(&mut self, ctx: &mut StageCtx<'_>) -> anyhow::Result<()> {
        let palette = ctx.assets.get_custom::<Palette>(PALETTE)?;
        ctx.events.add_draw_listener(DrawPass::Overlay, Priority::MEDIUM, move |r| {
            let vp = r.viewport();
            let (cx, cy) = (vp.width * 0.5, vp.height * 0.45);
            r.draw_quad(Quad::new(Rect::new(cx - 160.0, cy - 60.0, 320.0, 120.0), palette.panel));
            for i in 0..3 {
                let x = cx - 100.0 + i as f32 * 70.0;
                r.draw_quad(Quad::new(Rect::new(x, cy - 30.0, 60.0, 60.0), palette.accent));
            }
            r.draw_quad(Quad::new(Rect::new(cx - 160.0, cy - 60.0, 320.0, 8.0), palette.highlight));
        });
        Ok(())
    }

    fn update(&mut self, dt: f32, ctx: &mut StageCtx<'_>) -> anyhow::Result<()> {
        self.shown_for += dt as f64;
        if ctx.actions.just_pressed(QUIT) {
            ctx.request_exit();
        } else if ctx.actions.just_pressed(CONFIRM) || self.shown_for >= SPLASH_SECONDS {
            ctx.switch_to(Box::new(LitScene::default()));
        }
        Ok(())
    }
}

// ── lit scene ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct LitScene {
    terrain: Option<Arc<Terrain>>,
    lights: Vec<ListenerId>,
    time: f32,
}

impl Scene for LitScene {
    fn name(&self) -> &str {
        "lit"
    }

    fn keep_assets(&self) -> Vec<String> {
        vec![PALETTE.into(), TERRAIN.into()]
    }

    fn min_load_time(&self) -> f64 {
        1.5
    }

    fn enables_3d(&self) -> bool {
        true
    }

    fn preload(&mut self, ctx: &mut StageCtx<'_>) -> anyhow::Result<()> {
        let palette = ctx.assets.get_custom::<Palette>(PALETTE)?;
        add_progress_bar(ctx.events, self.min_load_time(), palette.panel, palette.accent);
        Ok(())
    }

    fn load(&mut self, assets: &mut AssetManager) -> anyhow::Result<()> {
        let terrain = assets.get_custom::<Terrain>(TERRAIN).context("terrain missing")?;
        log::debug!("terrain ready: {} tiles", terrain.tiles.len());
        self.terrain = Some(terrain);
        Ok(())
    }

    fn finish_load(&mut self, ctx: &mut StageCtx<'_>) -> anyhow::Result<()> {
        let terrain = self.terrain.clone().context("load did not run")?;
        let palette = ctx.assets.get_custom::<Palette>(PALETTE)?;

        ctx.events.add_draw_listener(DrawPass::Geometry, Priority::MEDIUM, move |r| {
            let vp = r.viewport();
            for tile in &terrain.tiles {
                let rect = Rect::new(
                    tile.rect.x * vp.width,
                    tile.rect.y * vp.height,
                    tile.rect.w * vp.width,
                    tile.rect.h * vp.height,
                );
                r.draw_quad(Quad { rect, ..*tile });
            }
        });

        // Post-process: dim bands top and bottom.
        ctx.events.add_draw_listener(DrawPass::PostProcess, Priority::MEDIUM, |r| {
            let vp = r.viewport();
            let band = Color::new(0.0, 0.0, 0.0, 0.35);
            r.draw_quad(Quad::new(Rect::new(0.0, 0.0, vp.width, vp.height * 0.06), band));
            r.draw_quad(Quad::new(Rect::new(0.0, vp.height * 0.94, vp.width, vp.height * 0.06), band));
        });

        let hud = Arc::clone(&palette);
        ctx.events.add_draw_listener(DrawPass::Overlay, Priority::MEDIUM, move |r| {
            r.draw_quad(Quad::new(Rect::new(16.0, 16.0, 180.0, 28.0), hud.panel));
            r.draw_quad(Quad::new(Rect::new(20.0, 20.0, 12.0, 20.0), hud.accent));
        });

        let warm = Color::rgb(1.0, 0.75, 0.45);
        let cool = Color::rgb(0.45, 0.65, 1.0);
        self.lights = vec![
            ctx.events.add_point_light(PointLight::new([0.0, 0.0, -0.5], warm, 420.0)),
            ctx.events.add_point_light(PointLight::new([0.0, 0.0, -0.5], cool, 360.0)),
        ];
        ctx.events.add_directional_light(DirectionalLight {
            intensity: 0.35,
            ..DirectionalLight::new([0.3, 0.5, 1.0], Color::rgb(0.8, 0.85, 1.0))
        });
        Ok(())
    }

    fn update(&mut self, dt: f32, ctx: &mut StageCtx<'_>) -> anyhow::Result<()> {
        self.time += dt;
        if ctx.actions.just_pressed(QUIT) {
            ctx.request_exit();
            return Ok(());
        }
        if ctx.actions.just_pressed(BACK) {
            ctx.switch_to(Box::new(SplashScene::default()));
            return Ok(());
        }

        // Two lights orbiting the middle of a 1280x720 view in opposite directions.
        for (i, id) in self.lights.iter().enumerate() {
            let phase = self.time * 0.6 * if i == 0 { 1.0 } else { -1.3 };
            if let Some(light) = ctx.events.point_light_mut(*id) {
                light.position[0] = 640.0 + 360.0 * phase.cos();
                light.position[1] = 360.0 + 200.0 * phase.sin();
            }
        }
        Ok(())
    }

    fn dispose(&mut self, _assets: &mut AssetManager) {
        self.terrain = None;
        self.lights.clear();
    }
}
