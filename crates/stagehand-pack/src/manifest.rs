//! Pack manifest parsing.
//!
//! One asset per line: `<kind> <name> <path> [options...]`. Paths are relative to the
//! manifest. `#` starts a comment line.
//!
//! Options:
//! - `premultiply` (texture): multiply color by alpha before packing
//! - `stride=N` (vertex): bytes per vertex, required for vertex entries
//! - `size=N` (font): pixel size when baking a TrueType/OpenType font
//! - `chars=...` (font): characters to bake in addition to printable ASCII
//!
//! Malformed lines and bad options are logged and skipped; the rest of the manifest
//! still packs.

use std::path::{Path, PathBuf};

use stagehand_engine::assets::AssetKind;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub premultiply: bool,
    pub stride: Option<u32>,
    pub size: Option<f32>,
    pub chars: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub kind: AssetKind,
    pub name: String,
    pub path: PathBuf,
    pub options: Options,
    /// 1-based manifest line, for diagnostics.
    pub line: usize,
}

#[derive(Debug, Default)]
pub struct Manifest {
    pub entries: Vec<Entry>,
    pub skipped_lines: usize,
    pub skipped_options: usize,
}

impl Manifest {
    pub fn parse(text: &str, base_dir: &Path) -> Self {
        let mut manifest = Manifest::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_line(line, idx + 1, base_dir, &mut manifest.skipped_options) {
                Ok(entry) => manifest.entries.push(entry),
                Err(reason) => {
                    log::warn!("manifest line {}: {reason}; skipped `{line}`", idx + 1);
                    manifest.skipped_lines += 1;
                }
            }
        }
        manifest
    }
}

fn parse_line(
    line: &str,
    line_no: usize,
    base_dir: &Path,
    skipped_options: &mut usize,
) -> Result<Entry, String> {
    let mut fields = line.split_whitespace();
    let (Some(kind), Some(name), Some(path)) = (fields.next(), fields.next(), fields.next()) else {
        return Err("expected `<kind> <name> <path>`".into());
    };
    let kind: AssetKind = kind.parse()?;

    let mut options = Options::default();
    for opt in fields {
        if let Err(reason) = apply_option(&mut options, kind, opt) {
            log::warn!("manifest line {line_no}: {reason}; option ignored");
            *skipped_options += 1;
        }
    }

    Ok(Entry {
        kind,
        name: name.to_owned(),
        path: base_dir.join(path),
        options,
        line: line_no,
    })
}

fn apply_option(options: &mut Options, kind: AssetKind, opt: &str) -> Result<(), String> {
    let (key, value) = match opt.split_once('=') {
        Some((k, v)) => (k, Some(v)),
        None => (opt, None),
    };
    match (key, value, kind) {
        ("premultiply", None, AssetKind::Texture) => options.premultiply = true,
        ("stride", Some(v), AssetKind::VertexBuffer) => {
            let stride: u32 = v.parse().map_err(|_| format!("bad stride `{v}`"))?;
            if stride == 0 {
                return Err("stride must be positive".into());
            }
            options.stride = Some(stride);
        }
        ("size", Some(v), AssetKind::Font) => {
            let size: f32 = v.parse().map_err(|_| format!("bad font size `{v}`"))?;
            if !(size.is_finite() && size > 0.0) {
                return Err(format!("bad font size `{v}`"));
            }
            options.size = Some(size);
        }
        ("chars", Some(v), AssetKind::Font) => options.chars = Some(v.to_owned()),
        _ => return Err(format!("option `{opt}` does not apply to {kind} entries")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_with_options() {
        let text = "\
# sample
texture logo img/logo.png premultiply
vertex quad mesh/quad.bin stride=16
font body fonts/body.ttf size=24 chars=äö
shader lit shaders/lit.wgsl
";
        let m = Manifest::parse(text, Path::new("assets"));
        assert_eq!(m.entries.len(), 4);
        assert_eq!(m.skipped_lines, 0);

        assert!(m.entries[0].options.premultiply);
        assert_eq!(m.entries[0].path, Path::new("assets/img/logo.png"));
        assert_eq!(m.entries[1].options.stride, Some(16));
        assert_eq!(m.entries[2].options.size, Some(24.0));
        assert_eq!(m.entries[2].options.chars.as_deref(), Some("äö"));
        assert_eq!(m.entries[3].kind, AssetKind::Shader);
        assert_eq!(m.entries[3].line, 5);
    }

    #[test]
    fn bad_lines_are_skipped() {
        let text = "sprite hero hero.png\ntexture lonely\nbuffer ok data.bin\n";
        let m = Manifest::parse(text, Path::new("."));
        assert_eq!(m.skipped_lines, 2);
        assert_eq!(m.entries.len(), 1);
        assert_eq!(m.entries[0].name, "ok");
    }

    #[test]
    fn bad_options_are_dropped_but_the_entry_stays() {
        let text = "texture t t.png stride=4 shiny\nvertex v v.bin stride=0\n";
        let m = Manifest::parse(text, Path::new("."));
        assert_eq!(m.entries.len(), 2);
        assert_eq!(m.skipped_options, 3);
        assert_eq!(m.entries[0].options, Options::default());
        assert_eq!(m.entries[1].options.stride, None);
    }
}
