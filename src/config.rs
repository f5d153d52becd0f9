use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub output: OutputConfig,
    pub map: MapConfig,
    pub image: ImageConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted upload body.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub map_dir: PathBuf,
    pub image_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            map_dir: PathBuf::from("Output/Maps"),
            image_dir: PathBuf::from("Output/Images"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    /// `[lat, lon]` shown before any layer is added.
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: Vec<TileConfig>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [51.44, 9.83],
            zoom: 6,
            tiles: vec![
                TileConfig {
                    name: "OpenTopoMap".to_string(),
                    url: "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png".to_string(),
                    attribution: "Map data: &copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors".to_string(),
                },
                TileConfig {
                    name: "Google Satellite Hybrid".to_string(),
                    url: "https://mt1.google.com/vt/lyrs=y&x={x}&y={y}&z={z}".to_string(),
                    attribution: "Imagery @2024 TerraMetrics".to_string(),
                },
            ],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TileConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub attribution: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ImageConfig {
    pub width: u32,
    pub height: u32,
    /// Any CSS color.
    pub background: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 1000,
            background: "white".to_string(),
        }
    }
}

/// Values used when a visualization request leaves a field empty.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DefaultsConfig {
    pub numeric_colormap: String,
    pub categorical_colormap: String,
    pub scheme: String,
    pub classes: i64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            numeric_colormap: "YlOrRd".to_string(),
            categorical_colormap: "Set3".to_string(),
            scheme: "Quantiles".to_string(),
            classes: 5,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML configuration in {:?}", path))?;
        Ok(config)
    }

    /// Like [`AppConfig::load_from_file`], but a missing file means built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }
}
