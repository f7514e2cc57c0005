use crate::error::ConfigError;
use crate::features::HarrisParams;
use crate::locator::LocatorParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Both,
}

impl OutputFormat {
    pub fn includes_text(self) -> bool {
        matches!(self, OutputFormat::Text | OutputFormat::Both)
    }

    pub fn includes_json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json_out: Option<PathBuf>,
    pub format: OutputFormat,
    /// PNG of the matched document with the localized region outlined.
    pub overlay_png: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LocateToolConfig {
    /// Folder of reference document scans.
    pub images_dir: PathBuf,
    /// Query frame: a single image or a folder of extracted video frames.
    pub query: PathBuf,
    /// Index snapshot; loaded when present, written by `--index-only`.
    #[serde(default)]
    pub index_json: Option<PathBuf>,
    #[serde(default)]
    pub locator: LocatorParams,
    #[serde(default)]
    pub extractor: HarrisParams,
    #[serde(default)]
    pub output: OutputConfig,
}

pub fn load_config(path: &Path) -> Result<LocateToolConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
