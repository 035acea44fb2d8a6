use std::path::PathBuf;

use super::kind::AssetKind;
use super::manager::LoadState;

/// Blob archive read/write failures.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("header truncated at byte {at} (needed {need} more)")]
    Truncated { at: usize, need: usize },

    #[error("malformed header: {0}")]
    Malformed(String),

    #[error("record `{name}` has unknown kind {kind}")]
    UnknownKind { name: String, kind: i32 },

    #[error("record `{name}` spans {offset}+{length}, past the {available} payload bytes")]
    OutOfRange { name: String, offset: u64, length: u64, available: u64 },

    #[error("duplicate record name `{0}`")]
    DuplicateName(String),
}

/// Font resource parse failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FontError {
    #[error("font data truncated at byte {at} (needed {need} more)")]
    Truncated { at: usize, need: usize },

    #[error("unknown font type flag {0}")]
    UnknownType(u8),

    #[error("atlas is {width}x{height} but {actual} pixel bytes follow")]
    AtlasSize { width: u32, height: u32, actual: usize },

    #[error("font has no glyph for the fallback character {0:?}")]
    NoFallback(char),
}

/// Asset registry and lifecycle failures.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// A lifecycle transition was called from the wrong state.
    #[error("{op} requires state {expected:?}, but the asset manager is {actual:?}")]
    Phase {
        op: &'static str,
        expected: LoadState,
        actual: LoadState,
    },

    #[error("no blob or loader provides asset `{0}`")]
    UnknownAsset(String),

    #[error("asset name `{name}` is already registered (id {existing})")]
    DuplicateName { name: String, existing: u32 },

    #[error("asset `{name}` is a {found}, not a {expected}")]
    KindMismatch {
        name: String,
        expected: AssetKind,
        found: AssetKind,
    },

    #[error("asset `{0}` requested outside a load phase and was not declared")]
    NotLoaded(String),

    #[error("blob {path}: {source}")]
    Blob {
        path: PathBuf,
        #[source]
        source: BlobError,
    },

    #[error("cannot decode {kind} `{name}`: {reason}")]
    Decode {
        name: String,
        kind: AssetKind,
        reason: String,
    },

    #[error("font `{name}`: {source}")]
    Font {
        name: String,
        #[source]
        source: FontError,
    },

    #[error("loader for `{name}` failed")]
    Loader {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AssetError {
    pub(crate) fn decode(name: &str, kind: AssetKind, reason: impl Into<String>) -> Self {
        AssetError::Decode {
            name: name.to_owned(),
            kind,
            reason: reason.into(),
        }
    }
}
