//! Turns manifest entries into blob payloads.

use std::fs;
use std::io::Cursor;

use anyhow::{bail, Context, Result};

use stagehand_engine::assets::{
    encode_vertex_payload, AssetKind, FontData, FontType, Glyph, FALLBACK_CHAR,
};

use crate::manifest::Entry;

const DEFAULT_FONT_SIZE: f32 = 32.0;
const ATLAS_WIDTH: u32 = 512;
const GLYPH_PADDING: u32 = 1;

/// Reads and converts the file behind `entry` into the payload layout the engine decodes.
pub fn payload(entry: &Entry) -> Result<Vec<u8>> {
    let bytes = fs::read(&entry.path)
        .with_context(|| format!("failed to read {}", entry.path.display()))?;

    match entry.kind {
        AssetKind::Shader => {
            std::str::from_utf8(&bytes).context("shader source is not UTF-8")?;
            Ok(bytes)
        }
        AssetKind::Texture if entry.options.premultiply => premultiply_png(&bytes),
        AssetKind::Texture => {
            image::guess_format(&bytes).context("unrecognised image format")?;
            Ok(bytes)
        }
        AssetKind::VertexBuffer => {
            let Some(stride) = entry.options.stride else {
                bail!("vertex entries need a stride=N option");
            };
            if bytes.len() % stride as usize != 0 {
                bail!("{} bytes do not divide into stride {stride}", bytes.len());
            }
            Ok(encode_vertex_payload(stride, &bytes))
        }
        AssetKind::Font if is_outline_font(entry) => {
            let size = entry.options.size.unwrap_or(DEFAULT_FONT_SIZE);
            let font = bake_font(&bytes, size, entry.options.chars.as_deref())?;
            Ok(font.to_bytes())
        }
        AssetKind::Font => {
            FontData::parse(&bytes).context("not a valid font resource")?;
            Ok(bytes)
        }
        AssetKind::Buffer | AssetKind::Custom => Ok(bytes),
    }
}

fn is_outline_font(entry: &Entry) -> bool {
    entry
        .path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ttf") || e.eq_ignore_ascii_case("otf"))
}

// ── textures ──────────────────────────────────────────────────────────────

fn premultiply_png(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut img = image::load_from_memory(bytes)
        .context("failed to decode texture")?
        .to_rgba8();
    premultiply(&mut img);

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .context("failed to re-encode texture")?;
    Ok(out.into_inner())
}

fn premultiply(img: &mut image::RgbaImage) {
    for px in img.pixels_mut() {
        let a = px[3] as u32;
        for c in &mut px.0[..3] {
            *c = ((*c as u32 * a + 127) / 255) as u8;
        }
    }
}

// ── fonts ─────────────────────────────────────────────────────────────────

/// Rasterizes printable ASCII (plus `extra`) into a white RGBA atlas with coverage in
/// every channel (premultiplied).
fn bake_font(bytes: &[u8], size: f32, extra: Option<&str>) -> Result<FontData> {
    let settings = fontdue::FontSettings { scale: size, ..Default::default() };
    let font = fontdue::Font::from_bytes(bytes, settings)
        .map_err(|e| anyhow::anyhow!("font parse error: {e}"))?;

    let mut chars: Vec<char> = (' '..='~').chain(extra.unwrap_or("").chars()).collect();
    chars.sort_unstable();
    chars.dedup();
    chars.retain(|&ch| ch == FALLBACK_CHAR || font.lookup_glyph_index(ch) != 0);

    let rasters: Vec<(char, fontdue::Metrics, Vec<u8>)> = chars
        .iter()
        .map(|&ch| {
            let (metrics, coverage) = font.rasterize(ch, size);
            (ch, metrics, coverage)
        })
        .collect();

    let sizes: Vec<(u32, u32)> = rasters
        .iter()
        .map(|(_, m, _)| (m.width as u32, m.height as u32))
        .collect();
    let (slots, atlas_height) = shelf_pack(&sizes, ATLAS_WIDTH, GLYPH_PADDING)?;

    let mut atlas = vec![0u8; (ATLAS_WIDTH * atlas_height * 4) as usize];
    let mut glyphs = Vec::with_capacity(rasters.len());
    for ((ch, metrics, coverage), (x, y)) in rasters.iter().zip(&slots) {
        for row in 0..metrics.height {
            for col in 0..metrics.width {
                let c = coverage[row * metrics.width + col];
                let at = (((*y as usize + row) * ATLAS_WIDTH as usize) + *x as usize + col) * 4;
                atlas[at..at + 4].copy_from_slice(&[c, c, c, c]);
            }
        }
        glyphs.push((
            *ch,
            Glyph {
                x: *x as u16,
                y: *y as u16,
                w: metrics.width as u16,
                h: metrics.height as u16,
                bearing_x: metrics.xmin as f32,
                bearing_y: (metrics.ymin + metrics.height as i32) as f32,
                advance: metrics.advance_width,
            },
        ));
    }

    let mut kerning = Vec::new();
    for &a in &chars {
        for &b in &chars {
            if let Some(k) = font.horizontal_kern(a, b, size).filter(|k| *k != 0.0) {
                kerning.push(((a, b), k));
            }
        }
    }

    let (ascender, descender, cell_height) = match font.horizontal_line_metrics(size) {
        Some(m) => (m.ascent, m.descent, m.new_line_size),
        None => (size, 0.0, size),
    };

    log::info!(
        "baked {} glyphs at {size}px into a {ATLAS_WIDTH}x{atlas_height} atlas ({} kerning pairs)",
        glyphs.len(),
        kerning.len()
    );

    Ok(FontData::from_parts(
        FontType::Normal,
        cell_height,
        ascender,
        descender,
        GLYPH_PADDING,
        ATLAS_WIDTH,
        atlas_height,
        atlas,
        glyphs,
        kerning,
    ))
}

/// Places rectangles left to right in rows. Returns top-left corners and the atlas height.
fn shelf_pack(sizes: &[(u32, u32)], width: u32, padding: u32) -> Result<(Vec<(u32, u32)>, u32)> {
    let mut slots = Vec::with_capacity(sizes.len());
    let (mut x, mut y, mut row_height) = (padding, padding, 0);
    for &(w, h) in sizes {
        if w + 2 * padding > width {
            bail!("glyph {w}px wide does not fit a {width}px atlas");
        }
        if x + w + padding > width {
            x = padding;
            y += row_height + padding;
            row_height = 0;
        }
        slots.push((x, y));
        x += w + padding;
        row_height = row_height.max(h);
    }
    Ok((slots, (y + row_height + padding).max(1)))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::manifest::Options;

    fn entry(kind: AssetKind, path: PathBuf, options: Options) -> Entry {
        Entry { kind, name: "e".into(), path, options, line: 1 }
    }

    #[test]
    fn shelf_pack_wraps_rows() {
        let (slots, height) = shelf_pack(&[(4, 3), (4, 5), (4, 2)], 12, 1).unwrap();
        assert_eq!(slots, vec![(1, 1), (6, 1), (1, 7)]);
        assert_eq!(height, 10);
        assert!(shelf_pack(&[(20, 1)], 12, 1).is_err());
    }

    #[test]
    fn premultiply_scales_color_by_alpha() {
        let mut img = image::RgbaImage::from_raw(1, 1, vec![255, 128, 0, 128]).unwrap();
        premultiply(&mut img);
        assert_eq!(img.into_raw(), vec![128, 64, 0, 128]);
    }

    #[test]
    fn vertex_payload_needs_a_matching_stride() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.bin");
        fs::write(&path, [0u8; 24]).unwrap();

        let ok = payload(&entry(
            AssetKind::VertexBuffer,
            path.clone(),
            Options { stride: Some(8), ..Options::default() },
        ))
        .unwrap();
        assert_eq!(&ok[..4], &8u32.to_le_bytes());
        assert_eq!(ok.len(), 28);

        let bad_stride = Options { stride: Some(10), ..Options::default() };
        assert!(payload(&entry(AssetKind::VertexBuffer, path.clone(), bad_stride)).is_err());
        assert!(payload(&entry(AssetKind::VertexBuffer, path, Options::default())).is_err());
    }

    #[test]
    fn shader_must_be_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wgsl");
        fs::write(&path, [0xff, 0xfe]).unwrap();
        assert!(payload(&entry(AssetKind::Shader, path, Options::default())).is_err());
    }
}
