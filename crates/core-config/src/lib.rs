//! Configuration loading and parsing.
//!
//! Parses `linetrack.toml` (or an override path provided by the binary).
//! Missing files and missing fields fall back to defaults; unknown fields are
//! ignored so older binaries accept newer files. A file that fails to parse
//! also falls back to defaults, with a warning on the `config` target.
//!
//! ```toml
//! [tracking]
//! line_break = "auto"   # auto | lf | crlf | cr
//! on_close = "discard"  # discard | keep | reset
//!
//! [diagnostics]
//! self_test = false
//! ```

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE: &str = "linetrack.toml";

/// Line break used when emitting original/current text.
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LineBreakSetting {
    /// Reuse the style detected in the original file.
    #[default]
    Auto,
    Lf,
    Crlf,
    Cr,
}

/// Snapshot retention when a document closes.
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OnClose {
    #[default]
    Discard,
    Keep,
    Reset,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TrackingConfig {
    #[serde(default)]
    pub line_break: LineBreakSetting,
    #[serde(default)]
    pub on_close: OnClose,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct DiagnosticsConfig {
    #[serde(default)]
    pub self_test: bool,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// File the values came from; `None` when defaults are in use.
    pub path: Option<PathBuf>,
    /// Parsed (or default) data.
    pub file: ConfigFile,
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("linetrack").join(CONFIG_FILE);
    }
    PathBuf::from(CONFIG_FILE)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config loaded");
            Ok(Config {
                path: Some(path),
                file,
            })
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    pub fn line_break(&self) -> LineBreakSetting {
        self.file.tracking.line_break
    }

    pub fn on_close(&self) -> OnClose {
        self.file.tracking.on_close
    }

    pub fn self_test(&self) -> bool {
        self.file.diagnostics.self_test
    }
}
