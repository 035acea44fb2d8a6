use std::sync::Arc;

use super::asset::{Asset, Shader, Texture, VertexBuffer};
use super::error::AssetError;
use super::font::FontData;
use super::kind::AssetKind;

/// Turns raw blob payloads into assets.
///
/// Runs on whichever thread performs the load, including the background load thread,
/// so implementations must be thread-safe.
pub trait AssetFactory: Send + Sync {
    fn create(&self, name: &str, kind: AssetKind, bytes: Vec<u8>) -> Result<Asset, AssetError>;
}

/// Default factory: decodes payloads into CPU-side data.
///
/// - shaders: UTF-8 WGSL source
/// - textures: any image format the `image` crate reads, converted to RGBA8
/// - vertex buffers: `u32` stride followed by interleaved vertex bytes
/// - fonts: the font resource layout
/// - buffers and custom payloads: raw bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct DecodeFactory;

impl AssetFactory for DecodeFactory {
    fn create(&self, name: &str, kind: AssetKind, bytes: Vec<u8>) -> Result<Asset, AssetError> {
        match kind {
            AssetKind::Shader => {
                let source = String::from_utf8(bytes)
                    .map_err(|e| AssetError::decode(name, kind, e.to_string()))?;
                Ok(Asset::Shader(Arc::new(Shader { source })))
            }
            AssetKind::Texture => {
                let img = image::load_from_memory(&bytes)
                    .map_err(|e| AssetError::decode(name, kind, e.to_string()))?
                    .to_rgba8();
                let (width, height) = img.dimensions();
                Ok(Asset::Texture(Arc::new(Texture {
                    width,
                    height,
                    pixels: img.into_raw(),
                })))
            }
            AssetKind::VertexBuffer => {
                if bytes.len() < 4 {
                    return Err(AssetError::decode(name, kind, "missing stride header"));
                }
                let stride = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                let data = bytes[4..].to_vec();
                if stride == 0 || data.len() % stride as usize != 0 {
                    return Err(AssetError::decode(
                        name,
                        kind,
                        format!("{} data bytes do not divide into stride {stride}", data.len()),
                    ));
                }
                Ok(Asset::VertexBuffer(Arc::new(VertexBuffer { stride, data })))
            }
            AssetKind::Font => {
                let font = FontData::parse(&bytes).map_err(|source| AssetError::Font {
                    name: name.to_owned(),
                    source,
                })?;
                Ok(Asset::Font(Arc::new(font)))
            }
            AssetKind::Buffer => Ok(Asset::Buffer(bytes.into())),
            AssetKind::Custom => Ok(Asset::custom(bytes)),
        }
    }
}

/// Encodes a vertex buffer payload in the layout `DecodeFactory` reads.
pub fn encode_vertex_payload(stride: u32, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + data.len());
    out.extend_from_slice(&stride.to_le_bytes());
    out.extend_from_slice(data);
    out
}
