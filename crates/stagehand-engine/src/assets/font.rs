//! Font resources produced by the offline font tool.
//!
//! Layout (little-endian):
//!
//! ```text
//! u8    type flag (0 = normal bitmap, 1 = signed distance field)
//! f32   cell height
//! f32   ascender
//! f32   descender
//! u32   packing padding (pixels)
//! u32   atlas width
//! u32   atlas height
//! u32   glyph count
//! per glyph:
//!   u32 codepoint
//!   u16 x, y, w, h        (atlas rectangle)
//!   f32 bearing x, bearing y, advance
//! u32   kerning pair count
//! per pair:
//!   u32 left, u32 right, f32 adjustment
//! u8[atlas width * atlas height * 4]   RGBA atlas
//! ```

use std::collections::HashMap;

use super::bytes::{ByteReader, Short};
use super::error::FontError;

/// Character substituted for glyphs the font does not contain.
pub const FALLBACK_CHAR: char = '?';

impl From<Short> for FontError {
    fn from(s: Short) -> Self {
        FontError::Truncated { at: s.at, need: s.need }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FontType {
    Normal,
    Sdf,
}

impl FontType {
    fn from_flag(v: u8) -> Result<Self, FontError> {
        match v {
            0 => Ok(FontType::Normal),
            1 => Ok(FontType::Sdf),
            other => Err(FontError::UnknownType(other)),
        }
    }

    fn flag(self) -> u8 {
        match self {
            FontType::Normal => 0,
            FontType::Sdf => 1,
        }
    }
}

/// Placement of one glyph in the atlas.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Glyph {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
    pub bearing_x: f32,
    pub bearing_y: f32,
    pub advance: f32,
}

/// Parsed font resource: metrics, glyph table, kerning and RGBA atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct FontData {
    pub font_type: FontType,
    pub cell_height: f32,
    pub ascender: f32,
    pub descender: f32,
    pub padding: u32,
    pub atlas_width: u32,
    pub atlas_height: u32,
    pub atlas: Vec<u8>,
    glyphs: HashMap<char, Glyph>,
    kerning: HashMap<(char, char), f32>,
}

impl FontData {
    /// Parses a font resource. The fallback glyph must be present.
    pub fn parse(data: &[u8]) -> Result<Self, FontError> {
        let mut r = ByteReader::new(data);
        let font_type = FontType::from_flag(r.u8()?)?;
        let cell_height = r.f32()?;
        let ascender = r.f32()?;
        let descender = r.f32()?;
        let padding = r.u32()?;
        let atlas_width = r.u32()?;
        let atlas_height = r.u32()?;

        let glyph_count = r.u32()?;
        let mut glyphs = HashMap::with_capacity(glyph_count.min(65536) as usize);
        for _ in 0..glyph_count {
            let code = r.u32()?;
            let glyph = Glyph {
                x: r.u16()?,
                y: r.u16()?,
                w: r.u16()?,
                h: r.u16()?,
                bearing_x: r.f32()?,
                bearing_y: r.f32()?,
                advance: r.f32()?,
            };
            match char::from_u32(code) {
                Some(ch) => {
                    glyphs.insert(ch, glyph);
                }
                None => log::warn!("font: skipping glyph with invalid codepoint {code:#x}"),
            }
        }

        let pair_count = r.u32()?;
        let mut kerning = HashMap::new();
        for _ in 0..pair_count {
            let (a, b, adjust) = (r.u32()?, r.u32()?, r.f32()?);
            if let (Some(a), Some(b)) = (char::from_u32(a), char::from_u32(b)) {
                kerning.insert((a, b), adjust);
            }
        }

        let expected = atlas_width as usize * atlas_height as usize * 4;
        if r.remaining() != expected {
            return Err(FontError::AtlasSize {
                width: atlas_width,
                height: atlas_height,
                actual: r.remaining(),
            });
        }
        let atlas = r.take(expected)?.to_vec();

        if !glyphs.contains_key(&FALLBACK_CHAR) {
            return Err(FontError::NoFallback(FALLBACK_CHAR));
        }

        Ok(Self {
            font_type,
            cell_height,
            ascender,
            descender,
            padding,
            atlas_width,
            atlas_height,
            atlas,
            glyphs,
            kerning,
        })
    }

    /// Serializes back to the resource layout. Glyphs and pairs are written in
    /// codepoint order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.atlas.len());
        out.push(self.font_type.flag());
        out.extend_from_slice(&self.cell_height.to_le_bytes());
        out.extend_from_slice(&self.ascender.to_le_bytes());
        out.extend_from_slice(&self.descender.to_le_bytes());
        out.extend_from_slice(&self.padding.to_le_bytes());
        out.extend_from_slice(&self.atlas_width.to_le_bytes());
        out.extend_from_slice(&self.atlas_height.to_le_bytes());

        let mut glyphs: Vec<_> = self.glyphs.iter().collect();
        glyphs.sort_by_key(|(ch, _)| **ch);
        out.extend_from_slice(&(glyphs.len() as u32).to_le_bytes());
        for (ch, g) in glyphs {
            out.extend_from_slice(&(*ch as u32).to_le_bytes());
            for v in [g.x, g.y, g.w, g.h] {
                out.extend_from_slice(&v.to_le_bytes());
            }
            for v in [g.bearing_x, g.bearing_y, g.advance] {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }

        let mut pairs: Vec<_> = self.kerning.iter().collect();
        pairs.sort_by_key(|(pair, _)| **pair);
        out.extend_from_slice(&(pairs.len() as u32).to_le_bytes());
        for ((a, b), adjust) in pairs {
            out.extend_from_slice(&(*a as u32).to_le_bytes());
            out.extend_from_slice(&(*b as u32).to_le_bytes());
            out.extend_from_slice(&adjust.to_le_bytes());
        }

        out.extend_from_slice(&self.atlas);
        out
    }

    /// Builds a font from parts. Used by tools that pack fonts.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        font_type: FontType,
        cell_height: f32,
        ascender: f32,
        descender: f32,
        padding: u32,
        atlas_width: u32,
        atlas_height: u32,
        atlas: Vec<u8>,
        glyphs: impl IntoIterator<Item = (char, Glyph)>,
        kerning: impl IntoIterator<Item = ((char, char), f32)>,
    ) -> Self {
        Self {
            font_type,
            cell_height,
            ascender,
            descender,
            padding,
            atlas_width,
            atlas_height,
            atlas,
            glyphs: glyphs.into_iter().collect(),
            kerning: kerning.into_iter().collect(),
        }
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn has_glyph(&self, ch: char) -> bool {
        self.glyphs.contains_key(&ch)
    }

    /// Glyph for `ch`, or the fallback glyph when the font lacks it.
    pub fn glyph(&self, ch: char) -> Glyph {
        match self.glyphs.get(&ch).or_else(|| self.glyphs.get(&FALLBACK_CHAR)) {
            Some(g) => *g,
            // `parse` guarantees the fallback; fonts built from parts may lack it.
            None => Glyph {
                x: 0,
                y: 0,
                w: 0,
                h: 0,
                bearing_x: 0.0,
                bearing_y: 0.0,
                advance: self.cell_height * 0.5,
            },
        }
    }

    /// Kerning adjustment between `left` and `right` (0 when not listed).
    pub fn kerning(&self, left: char, right: char) -> f32 {
        self.kerning.get(&(left, right)).copied().unwrap_or(0.0)
    }

    /// Horizontal advance of `text` on one line, including kerning.
    pub fn measure(&self, text: &str) -> f32 {
        let mut width = 0.0;
        let mut prev: Option<char> = None;
        for ch in text.chars() {
            if let Some(p) = prev {
                width += self.kerning(p, ch);
            }
            width += self.glyph(ch).advance;
            prev = Some(ch);
        }
        width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(advance: f32) -> Glyph {
        Glyph { x: 1, y: 2, w: 3, h: 4, bearing_x: 0.5, bearing_y: 6.0, advance }
    }

    fn sample() -> FontData {
        FontData::from_parts(
            FontType::Sdf,
            16.0,
            12.0,
            -4.0,
            2,
            2,
            1,
            vec![255, 0, 0, 255, 0, 255, 0, 255],
            [('?', glyph(5.0)), ('A', glyph(8.0)), ('V', glyph(7.0))],
            [(('A', 'V'), -1.5)],
        )
    }

    #[test]
    fn parses_serialized_font() {
        let font = sample();
        let parsed = FontData::parse(&font.to_bytes()).unwrap();
        assert_eq!(parsed, font);
        assert_eq!(parsed.font_type, FontType::Sdf);
        assert_eq!(parsed.glyph_count(), 3);
    }

    #[test]
    fn missing_glyph_uses_fallback() {
        let font = sample();
        assert!(!font.has_glyph('Z'));
        assert_eq!(font.glyph('Z'), font.glyph('?'));
        assert_eq!(font.glyph('A').advance, 8.0);
    }

    #[test]
    fn measure_applies_kerning() {
        let font = sample();
        assert_eq!(font.measure("AV"), 8.0 + 7.0 - 1.5);
        assert_eq!(font.measure("VA"), 15.0);
    }

    #[test]
    fn atlas_size_mismatch_is_an_error() {
        let mut bytes = sample().to_bytes();
        bytes.pop();
        assert!(matches!(FontData::parse(&bytes), Err(FontError::AtlasSize { .. })));
    }

    #[test]
    fn font_without_fallback_is_rejected() {
        let font = FontData::from_parts(FontType::Normal, 8.0, 6.0, -2.0, 0, 0, 0, vec![], [('A', glyph(4.0))], []);
        assert_eq!(FontData::parse(&font.to_bytes()), Err(FontError::NoFallback('?')));
    }

    #[test]
    fn unknown_type_flag() {
        let mut bytes = sample().to_bytes();
        bytes[0] = 9;
        assert_eq!(FontData::parse(&bytes), Err(FontError::UnknownType(9)));
    }
}
