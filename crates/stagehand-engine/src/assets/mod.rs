//! Asset subsystem.
//!
//! Responsibilities:
//! - blob archives: a header table of named, typed records followed by payload bytes
//! - `AssetManager`: registration, the `Idle -> Preloading -> Loading -> Idle` lifecycle
//!   and set-difference load planning
//! - `AssetFactory`: decoding raw payloads into typed assets
//! - font resources: glyph metrics, kerning and the packed atlas

mod asset;
mod blob;
mod bytes;
mod error;
mod factory;
mod font;
mod kind;
mod manager;

pub use asset::{Asset, Shader, Texture, VertexBuffer};
pub use blob::{BlobHeader, BlobRecord, BlobWriter};
pub use error::{AssetError, BlobError, FontError};
pub use factory::{encode_vertex_payload, AssetFactory, DecodeFactory};
pub use font::{FontData, FontType, Glyph, FALLBACK_CHAR};
pub use kind::AssetKind;
pub use manager::{
    AssetManager,
    LoadReport,
    LoadState,
    LoaderFn,
    MissingAssetPolicy,
};
