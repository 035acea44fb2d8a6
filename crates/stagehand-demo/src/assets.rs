//! Procedural demo assets, registered as loaders so the demo runs without a blob.

use stagehand_engine::assets::{Asset, AssetError, AssetKind, AssetManager};
use stagehand_engine::render::{Color, Quad, Rect};

pub const PALETTE: &str = "palette";
pub const TERRAIN: &str = "terrain";

#[derive(Debug)]
pub struct Palette {
    pub background: Color,
    pub panel: Color,
    pub accent: Color,
    pub highlight: Color,
}

/// Tiles in unit coordinates; draw listeners scale them to the viewport.
#[derive(Debug)]
pub struct Terrain {
    pub tiles: Vec<Quad>,
}

pub fn register(assets: &mut AssetManager) -> Result<(), AssetError> {
    assets.register_loader(PALETTE, AssetKind::Custom, || {
        Ok(Asset::custom(Palette {
            background: Color::rgb(0.05, 0.06, 0.09),
            panel: Color::rgb(0.16, 0.18, 0.24),
            accent: Color::rgb(0.95, 0.55, 0.2),
            highlight: Color::new(1.0, 1.0, 1.0, 0.12),
        }))
    })?;
    assets.register_loader(TERRAIN, AssetKind::Custom, || Ok(Asset::custom(build_terrain(24, 14))))?;
    Ok(())
}

fn build_terrain(cols: u32, rows: u32) -> Terrain {
    let (w, h) = (1.0 / cols as f32, 1.0 / rows as f32);
    let mut tiles = Vec::with_capacity((cols * rows) as usize);
    for row in 0..rows {
        for col in 0..cols {
            let (fx, fy) = (col as f32 / cols as f32, row as f32 / rows as f32);
            // Rolling height field: nearer tiles are brighter.
            let height = 0.5 + 0.25 * (fx * 9.0).sin() * (fy * 7.0).cos();
            let shade = 0.35 + 0.5 * (1.0 - height);
            let checker = if (row + col) % 2 == 0 { 1.0 } else { 0.85 };
            tiles.push(
                Quad::new(
                    Rect::new(fx, fy, w, h),
                    Color::rgb(0.4 * shade * checker, 0.7 * shade * checker, 0.5 * shade * checker),
                )
                .at_depth(height),
            );
        }
    }
    Terrain { tiles }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terrain_covers_the_unit_square() {
        let t = build_terrain(4, 2);
        assert_eq!(t.tiles.len(), 8);
        let last = t.tiles.last().unwrap().rect;
        assert!((last.x + last.w - 1.0).abs() < 1e-6);
        assert!((last.y + last.h - 1.0).abs() < 1e-6);
        assert!(t.tiles.iter().all(|q| (0.0..=1.0).contains(&q.depth)));
    }

    #[test]
    fn loaders_produce_typed_assets() {
        let mut assets = AssetManager::new();
        register(&mut assets).unwrap();
        assets.pre_load::<&str>(&[]).unwrap();
        assets.start_load(&[PALETTE, TERRAIN], &[] as &[&str]).unwrap();
        assert!(assets.get_custom::<Palette>(PALETTE).is_ok());
        assert_eq!(assets.get_custom::<Terrain>(TERRAIN).unwrap().tiles.len(), 24 * 14);
    }
}
