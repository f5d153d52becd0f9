//! The interactive map: an ordered set of styled layers rendered to a standalone
//! Leaflet page.

use crate::config::MapConfig;
use crate::html::{MAP_CONFIG_PLACEHOLDER, MAP_TEMPLATE, MAP_TITLE_PLACEHOLDER};
use crate::style::{LayerContent, StyledFeature, StyledLayer};
use serde_json::{json, Value};

const FILL_OPACITY: f64 = 0.85;
const STROKE_WEIGHT: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct MapDocument {
    config: MapConfig,
    layers: Vec<StyledLayer>,
    /// Layer the view is fitted to: the one added most recently.
    focus: Option<String>,
}

impl MapDocument {
    pub fn new(config: MapConfig) -> Self {
        Self {
            config,
            layers: Vec::new(),
            focus: None,
        }
    }

    /// Add a layer. One with the same name is replaced and keeps its position.
    pub fn add_layer(&mut self, layer: StyledLayer) {
        self.focus = Some(layer.name.clone());
        match self.layers.iter_mut().find(|l| l.name == layer.name) {
            Some(existing) => *existing = layer,
            None => self.layers.push(layer),
        }
    }

    pub fn layers(&self) -> &[StyledLayer] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&StyledLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.focus = None;
    }

    /// Everything the page script needs, as one JSON object.
    pub fn config_json(&self) -> Value {
        let fit = self
            .focus
            .as_deref()
            .and_then(|name| self.layer(name))
            .and_then(|layer| layer.bounds)
            .map(|r| json!([[r.min().y, r.min().x], [r.max().y, r.max().x]]));

        json!({
            "center": self.config.center,
            "zoom": self.config.zoom,
            "tiles": self.config.tiles,
            "layers": self.layers.iter().map(layer_json).collect::<Vec<_>>(),
            "fit": fit,
        })
    }

    pub fn render_html(&self) -> String {
        // Keep property text from closing the inline script.
        let config = self.config_json().to_string().replace("</", "<\\/");
        let title = if self.layers.is_empty() {
            "Map".to_string()
        } else {
            self.layers
                .iter()
                .map(|l| html_escape(&l.name))
                .collect::<Vec<_>>()
                .join(", ")
        };

        fill_template(
            MAP_TEMPLATE,
            &[(MAP_TITLE_PLACEHOLDER, &title), (MAP_CONFIG_PLACEHOLDER, &config)],
        )
    }
}

/// Substitute placeholders in a single pass, so inserted text is never scanned again.
fn fill_template(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some((pos, placeholder, value)) = substitutions
        .iter()
        .filter_map(|&(p, v)| rest.find(p).map(|i| (i, p, v)))
        .min_by_key(|&(i, _, _)| i)
    {
        out.push_str(&rest[..pos]);
        out.push_str(value);
        rest = &rest[pos + placeholder.len()..];
    }
    out.push_str(rest);
    out
}

fn layer_json(layer: &StyledLayer) -> Value {
    match &layer.content {
        LayerContent::Heat(points) => json!({
            "name": layer.name,
            "heat": points,
            "legend": layer.legend,
        }),
        LayerContent::Features(features) => {
            let geojson: Vec<Value> = features
                .iter()
                .filter_map(|f| feature_json(layer, f))
                .collect();
            json!({
                "name": layer.name,
                "tooltip": layer.params.column(),
                "geojson": { "type": "FeatureCollection", "features": geojson },
                "legend": layer.legend,
            })
        }
    }
}

fn feature_json(layer: &StyledLayer, styled: &StyledFeature) -> Option<Value> {
    let feature = layer.dataset.features.get(styled.index)?;
    let geometry = geojson::Geometry::new(geojson::Value::from(feature.geometry.as_ref()?));
    let color = styled.fill.to_hex();
    let style = json!({
        "color": color,
        "fillColor": color,
        "weight": STROKE_WEIGHT,
        "fillOpacity": FILL_OPACITY,
    });
    Some(json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": feature.properties,
        "style": style,
    }))
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
