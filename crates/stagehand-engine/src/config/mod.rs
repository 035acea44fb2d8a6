//! Engine config file.
//!
//! One `key:value` pair per line; `#` starts a comment line. Keys are case-insensitive.
//!
//! ```text
//! reswidth:1280
//! resheight:720
//! vsync:true
//! loglevel:info
//! assetpolicy:ondemand
//! ```
//!
//! Unknown keys and bad values are logged and skipped; the rest of the file still applies.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::LevelFilter;

use crate::assets::MissingAssetPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub res_width: u32,
    pub res_height: u32,
    pub vsync: bool,
    pub log_level: LevelFilter,
    pub missing_asset_policy: MissingAssetPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            res_width: 1280,
            res_height: 720,
            vsync: true,
            log_level: LevelFilter::Info,
            missing_asset_policy: MissingAssetPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parses config text over the defaults. Never fails; bad lines are logged.
    pub fn parse(text: &str) -> Self {
        let (config, problems) = Self::parse_collecting(text);
        for problem in problems {
            log::warn!("{problem}");
        }
        config
    }

    /// Like [`parse`](Self::parse) but returns the per-line problems instead of logging
    /// them, for callers that read the config before the logger exists.
    pub fn parse_collecting(text: &str) -> (Self, Vec<String>) {
        let mut config = Self::default();
        let mut problems = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Err(reason) = config.apply_line(line) {
                problems.push(format!("config line {}: {reason}; skipped `{line}`", idx + 1));
            }
        }
        (config, problems)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text);
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads `path`, falling back to the defaults when it is missing or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{e}; using default config");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        fs::write(path, self.to_text()).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "reswidth:{}", self.res_width);
        let _ = writeln!(out, "resheight:{}", self.res_height);
        let _ = writeln!(out, "vsync:{}", self.vsync);
        let _ = writeln!(out, "loglevel:{}", self.log_level.as_str().to_ascii_lowercase());
        let policy = match self.missing_asset_policy {
            MissingAssetPolicy::LoadOnDemand => "ondemand",
            MissingAssetPolicy::Strict => "strict",
        };
        let _ = writeln!(out, "assetpolicy:{policy}");
        out
    }

    fn apply_line(&mut self, line: &str) -> Result<(), String> {
        let Some((key, value)) = line.split_once(':') else {
            return Err("expected `key:value`".into());
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "reswidth" => self.res_width = parse_resolution(value)?,
            "resheight" => self.res_height = parse_resolution(value)?,
            "vsync" => self.vsync = parse_bool(value)?,
            "loglevel" => {
                self.log_level = value
                    .parse::<LevelFilter>()
                    .map_err(|_| format!("bad log level `{value}`"))?;
            }
            "assetpolicy" => {
                self.missing_asset_policy = match value.to_ascii_lowercase().as_str() {
                    "ondemand" => MissingAssetPolicy::LoadOnDemand,
                    "strict" => MissingAssetPolicy::Strict,
                    _ => return Err(format!("bad asset policy `{value}`")),
                };
            }
            _ => return Err(format!("unknown key `{key}` (possible error)")),
        }
        Ok(())
    }
}

fn parse_resolution(s: &str) -> Result<u32, String> {
    match s.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("bad resolution `{s}`")),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(format!("bad boolean `{s}`")),
    }
}
