//! One user's working state: loaded datasets, the layers built from them and the map
//! they are drawn on. Every user action is a method call; a failed call leaves the
//! session as it was.

use crate::config::{AppConfig, OutputConfig};
use crate::data::{check_extension, parse_geojson};
use crate::error::SessionError;
use crate::map::MapDocument;
use crate::render::{render_layer_png, ImageOptions};
use crate::selector::{RenderParameters, Selector, VisualizationRequest};
use crate::style::style_layer;
use crate::types::Dataset;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%d%m%Y_%H%M%S";

/// A layer on the map together with the request that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct LayerRecord {
    pub name: String,
    pub dataset: String,
    pub request: VisualizationRequest,
    pub params: RenderParameters,
}

#[derive(Debug, Clone)]
pub struct Session {
    datasets: Vec<Arc<Dataset>>,
    next_dataset: usize,
    layers: Vec<LayerRecord>,
    map: MapDocument,
    selector: Selector,
    image: ImageOptions,
    output: OutputConfig,
}

impl Session {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            datasets: Vec::new(),
            next_dataset: 0,
            layers: Vec::new(),
            map: MapDocument::new(config.map.clone()),
            selector: Selector::new(config.defaults.clone()),
            image: ImageOptions::from_config(&config.image),
            output: config.output.clone(),
        }
    }

    /// Parse an uploaded file and keep it as `gdf_<n>`.
    pub fn load_dataset(&mut self, filename: &str, bytes: &[u8]) -> Result<Arc<Dataset>, SessionError> {
        check_extension(filename)?;
        let name = format!("gdf_{}", self.next_dataset);
        let dataset = Arc::new(parse_geojson(&name, filename, bytes)?);
        self.next_dataset += 1;

        info!(
            "Loaded {} as {} ({} features, {} columns)",
            filename,
            name,
            dataset.len(),
            dataset.schema.columns.len()
        );
        self.datasets.push(dataset.clone());
        Ok(dataset)
    }

    pub fn datasets(&self) -> &[Arc<Dataset>] {
        &self.datasets
    }

    pub fn dataset(&self, name: &str) -> Result<&Arc<Dataset>, SessionError> {
        self.datasets
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| SessionError::UnknownDataset(name.to_string()))
    }

    /// The named dataset, or the most recently loaded one.
    pub fn resolve_dataset(&self, name: Option<&str>) -> Result<&Arc<Dataset>, SessionError> {
        match name {
            Some(name) => self.dataset(name),
            None => self.datasets.last().ok_or(SessionError::NoDataset),
        }
    }

    /// `Layer_<dataset>`, suffixed `_1`, `_2`, ... while taken.
    pub fn default_layer_name(&self, dataset: &str) -> String {
        let base = format!("Layer_{}", dataset);
        let taken = |name: &str| self.layers.iter().any(|l| l.name == name);
        if !taken(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Validate `request`, style the layer and put it on the map. A layer with the
    /// same name is replaced.
    pub fn visualize(
        &mut self,
        dataset: Option<&str>,
        layer_name: Option<&str>,
        request: VisualizationRequest,
    ) -> Result<LayerRecord, SessionError> {
        let dataset = self.resolve_dataset(dataset)?.clone();
        let name = match layer_name {
            Some(name) if name.trim().is_empty() => return Err(SessionError::EmptyLayerName),
            Some(name) => name.trim().to_string(),
            None => self.default_layer_name(&dataset.name),
        };

        let params = self.selector.build(&dataset, &request)?;
        let layer = style_layer(&name, dataset.clone(), params.clone())?;

        let record = LayerRecord {
            name: name.clone(),
            dataset: dataset.name.clone(),
            request,
            params,
        };
        match self.layers.iter_mut().find(|l| l.name == name) {
            Some(existing) => *existing = record.clone(),
            None => self.layers.push(record.clone()),
        }
        self.map.add_layer(layer);

        info!("Added layer '{}' ({}) from {}", name, record.params.mode(), dataset.name);
        Ok(record)
    }

    pub fn layers(&self) -> &[LayerRecord] {
        &self.layers
    }

    pub fn map(&self) -> &MapDocument {
        &self.map
    }

    pub fn map_html(&self) -> String {
        self.map.render_html()
    }

    pub fn layer_png(&self, name: &str) -> Result<Vec<u8>, SessionError> {
        let layer = self
            .map
            .layer(name)
            .ok_or_else(|| SessionError::UnknownLayer(name.to_string()))?;
        Ok(render_layer_png(layer, &self.image)?)
    }

    /// Write the whole map as `map_<timestamp>.html` under the map directory.
    pub fn export_html(&self) -> Result<PathBuf, SessionError> {
        let path = self
            .output
            .map_dir
            .join(format!("map_{}.html", timestamp()));
        write_export(&path, self.map_html().as_bytes())?;
        info!("Exported map to {:?}", path);
        Ok(path)
    }

    /// Write one layer as `<layer>_<timestamp>.png` under the image directory.
    pub fn export_layer_png(&self, name: &str) -> Result<PathBuf, SessionError> {
        let bytes = self.layer_png(name)?;
        let path = self
            .output
            .image_dir
            .join(format!("{}_{}.png", file_stem(name), timestamp()));
        write_export(&path, &bytes)?;
        info!("Exported layer '{}' to {:?}", name, path);
        Ok(path)
    }

    /// Start over: datasets, layers and the map are all dropped, and numbering
    /// restarts at `gdf_0`.
    pub fn clear(&mut self) {
        self.datasets.clear();
        self.next_dataset = 0;
        self.layers.clear();
        self.map.clear();
        info!("Cleared session");
    }
}

fn timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn file_stem(layer: &str) -> String {
    layer
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn write_export(path: &Path, bytes: &[u8]) -> Result<(), SessionError> {
    let export_err = |source| SessionError::Export {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(export_err)?;
    }
    fs::write(path, bytes).map_err(export_err)
}
