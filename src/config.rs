use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

use crate::types::Zoom;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub spreadsheet: PathBuf,
    /// Written in place of an empty or absent non-coordinate cell.
    #[serde(default = "default_missing_cell")]
    pub missing_cell: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub default_zoom: u8,
    pub width: u32,
    pub height: u32,
    pub marker_size: u32,
    pub marker_color: String,
    pub basemap: String,
    pub default_center: [f64; 2], // [lat, lon]
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub snapshot_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

fn default_missing_cell() -> String {
    "None".to_string()
}

fn default_delimiter() -> char {
    ','
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_zoom: 6,
            width: 1000,
            height: 600,
            marker_size: 8,
            marker_color: "blue".to_string(),
            basemap: "carto-positron".to_string(),
            default_center: [-14.235, -51.9253],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { snapshot_dir: PathBuf::from("snapshots") }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8050,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl MapConfig {
    pub fn default_zoom(&self) -> Result<Zoom> {
        Ok(Zoom::new(self.default_zoom)?)
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.map.default_zoom()
            .with_context(|| "Invalid [map] default_zoom")?;
        if !config.input.delimiter.is_ascii() {
            anyhow::bail!("Input delimiter must be a single ASCII character");
        }
        Ok(config)
    }
}
