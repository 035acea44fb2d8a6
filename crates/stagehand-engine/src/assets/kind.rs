use std::fmt;
use std::str::FromStr;

/// Asset type tag. The discriminants are the values stored in blob headers.
#[repr(i32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum AssetKind {
    Shader = 0,
    Texture = 1,
    VertexBuffer = 2,
    Font = 3,
    Buffer = 4,
    Custom = 5,
}

impl AssetKind {
    pub const ALL: [AssetKind; 6] = [
        AssetKind::Shader,
        AssetKind::Texture,
        AssetKind::VertexBuffer,
        AssetKind::Font,
        AssetKind::Buffer,
        AssetKind::Custom,
    ];

    #[inline]
    pub fn to_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(v: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.to_i32() == v)
    }

    /// Lowercase name used in pack manifests and log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Shader => "shader",
            AssetKind::Texture => "texture",
            AssetKind::VertexBuffer => "vertex",
            AssetKind::Font => "font",
            AssetKind::Buffer => "buffer",
            AssetKind::Custom => "custom",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown asset kind `{s}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_are_stable() {
        assert_eq!(AssetKind::Shader.to_i32(), 0);
        assert_eq!(AssetKind::Custom.to_i32(), 5);
        assert_eq!(AssetKind::from_i32(2), Some(AssetKind::VertexBuffer));
        assert_eq!(AssetKind::from_i32(6), None);
        assert_eq!(AssetKind::from_i32(-1), None);
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!("Texture".parse::<AssetKind>(), Ok(AssetKind::Texture));
        assert!("mesh".parse::<AssetKind>().is_err());
    }
}
