use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::font::FontData;
use super::kind::AssetKind;

/// Shader source (WGSL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shader {
    pub source: String,
}

/// Decoded RGBA8 texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Interleaved vertex data with a fixed stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBuffer {
    pub stride: u32,
    pub data: Vec<u8>,
}

impl VertexBuffer {
    pub fn vertex_count(&self) -> usize {
        if self.stride == 0 { 0 } else { self.data.len() / self.stride as usize }
    }
}

/// A loaded asset.
///
/// The asset manager's loaded table holds the authoritative copy; callers get cheap
/// clones that share the payload. Typed accessors on the manager match on the variant,
/// so asking for the wrong kind is an error rather than a failed cast.
#[derive(Clone)]
pub enum Asset {
    Shader(Arc<Shader>),
    Texture(Arc<Texture>),
    VertexBuffer(Arc<VertexBuffer>),
    Font(Arc<FontData>),
    Buffer(Arc<[u8]>),
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Shader(_) => AssetKind::Shader,
            Asset::Texture(_) => AssetKind::Texture,
            Asset::VertexBuffer(_) => AssetKind::VertexBuffer,
            Asset::Font(_) => AssetKind::Font,
            Asset::Buffer(_) => AssetKind::Buffer,
            Asset::Custom(_) => AssetKind::Custom,
        }
    }

    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Asset::Custom(Arc::new(value))
    }

    /// Approximate CPU memory held by the payload.
    pub fn byte_size(&self) -> usize {
        match self {
            Asset::Shader(s) => s.source.len(),
            Asset::Texture(t) => t.pixels.len(),
            Asset::VertexBuffer(v) => v.data.len(),
            Asset::Font(f) => f.atlas.len(),
            Asset::Buffer(b) => b.len(),
            Asset::Custom(_) => 0,
        }
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Asset::{:?}({} bytes)", self.kind(), self.byte_size())
    }
}
