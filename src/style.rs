//! Applies render parameters to a dataset: per-feature colors and a legend.

use crate::classify::{classify, Classification};
use crate::colormap::{self, Colormap, Rgb};
use crate::data::union_rect;
use crate::error::RenderError;
use crate::selector::RenderParameters;
use crate::types::{category_label, Dataset};
use geo::{coord, BoundingRect, Rect};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Number of colors sampled for a continuous colorbar.
const COLORBAR_STOPS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyledFeature {
    /// Index into the dataset's features.
    pub index: usize,
    pub fill: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerContent {
    Features(Vec<StyledFeature>),
    /// Heat points as `[lat, lon]`.
    Heat(Vec<[f64; 2]>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Legend {
    None,
    Classes {
        caption: String,
        entries: Vec<LegendEntry>,
    },
    Colorbar {
        caption: String,
        min: f64,
        max: f64,
        colors: Vec<String>,
    },
    Categories {
        caption: String,
        entries: Vec<LegendEntry>,
    },
}

/// A dataset drawn with one set of render parameters.
#[derive(Debug, Clone)]
pub struct StyledLayer {
    pub name: String,
    pub dataset: Arc<Dataset>,
    pub params: RenderParameters,
    pub content: LayerContent,
    pub legend: Legend,
    /// Extent of what is drawn, used to fit the map.
    pub bounds: Option<Rect<f64>>,
}

impl StyledLayer {
    pub fn features(&self) -> &[StyledFeature] {
        match &self.content {
            LayerContent::Features(features) => features,
            LayerContent::Heat(_) => &[],
        }
    }

    pub fn heat_points(&self) -> &[[f64; 2]] {
        match &self.content {
            LayerContent::Heat(points) => points,
            LayerContent::Features(_) => &[],
        }
    }
}

pub fn style_layer(
    name: &str,
    dataset: Arc<Dataset>,
    params: RenderParameters,
) -> Result<StyledLayer, RenderError> {
    let (content, legend) = match &params {
        RenderParameters::Geometry => (
            LayerContent::Features(uniform(&dataset, Rgb::LEAFLET_BLUE)?),
            Legend::None,
        ),
        RenderParameters::ChoroplethClassified {
            column,
            scheme,
            classes,
            colormap,
            legend_caption,
        } => {
            let values = dataset.numeric_values(column);
            let finite: Vec<f64> = values.iter().flatten().copied().collect();
            let classification = classify(&finite, *scheme, *classes);
            let cmap = resolve(colormap);
            let colors = cmap.sample(classification.k());

            let features = drawable(&dataset)
                .map(|index| StyledFeature {
                    index,
                    fill: class_color(&classification, &colors, values[index]),
                })
                .collect();
            let features = non_empty(features)?;
            let legend = class_legend(legend_caption, &classification, &colors, &values);
            (LayerContent::Features(features), legend)
        }
        RenderParameters::ChoroplethContinuous {
            column,
            min,
            max,
            colormap,
            legend_caption,
        } => {
            let values = dataset.numeric_values(column);
            let cmap = resolve(colormap);
            let features = drawable(&dataset)
                .map(|index| StyledFeature {
                    index,
                    fill: match values[index] {
                        Some(v) if v.is_finite() => cmap.at(normalize(v, *min, *max)),
                        _ => Rgb::LIGHT_GREY,
                    },
                })
                .collect();
            let features = non_empty(features)?;
            let legend = Legend::Colorbar {
                caption: legend_caption.clone(),
                min: *min,
                max: *max,
                colors: cmap.css_stops(COLORBAR_STOPS),
            };
            (LayerContent::Features(features), legend)
        }
        RenderParameters::Categorical {
            column,
            colormap,
            categories,
            legend_caption,
        } => {
            let order = category_order(&dataset, column, categories.as_deref());
            let colors = resolve(colormap).category_colors(order.len());

            let mut features = Vec::new();
            for index in drawable(&dataset) {
                let label = dataset.features[index]
                    .properties
                    .get(column.as_str())
                    .and_then(category_label);
                let slot = label
                    .as_ref()
                    .and_then(|l| order.iter().position(|c| c == l));
                match (slot, categories) {
                    (Some(slot), _) => features.push(StyledFeature {
                        index,
                        fill: colors[slot],
                    }),
                    (None, None) => features.push(StyledFeature {
                        index,
                        fill: Rgb::LIGHT_GREY,
                    }),
                    // Filtered out by the allow-list
                    (None, Some(_)) => {}
                }
            }
            if features.is_empty() {
                return Err(if categories.is_some() {
                    RenderError::EmptySelection
                } else {
                    RenderError::NoGeometries
                });
            }

            let legend = Legend::Categories {
                caption: legend_caption.clone(),
                entries: order
                    .iter()
                    .zip(&colors)
                    .map(|(label, color)| LegendEntry {
                        label: label.clone(),
                        color: color.to_hex(),
                    })
                    .collect(),
            };
            (LayerContent::Features(features), legend)
        }
        RenderParameters::Heatmap => {
            let points = dataset.point_coordinates();
            if points.is_empty() {
                let types = dataset.geometry_types();
                let found = if types.is_empty() {
                    "none".to_string()
                } else {
                    types.join(", ")
                };
                return Err(RenderError::NoPoints(found));
            }
            let heat = points.iter().map(|&(lon, lat)| [lat, lon]).collect();
            (LayerContent::Heat(heat), Legend::None)
        }
    };

    let bounds = match &content {
        LayerContent::Features(features) => features
            .iter()
            .filter_map(|f| dataset.features[f.index].geometry.as_ref()?.bounding_rect())
            .reduce(union_rect),
        LayerContent::Heat(points) => points
            .iter()
            .map(|&[lat, lon]| Rect::new(coord! { x: lon, y: lat }, coord! { x: lon, y: lat }))
            .reduce(union_rect),
    };

    debug!(
        "Styled layer '{}' ({}) from {}: {} features, {} heat points",
        name,
        params.mode(),
        dataset.name,
        match &content {
            LayerContent::Features(f) => f.len(),
            LayerContent::Heat(_) => 0,
        },
        match &content {
            LayerContent::Heat(p) => p.len(),
            LayerContent::Features(_) => 0,
        },
    );

    Ok(StyledLayer {
        name: name.to_string(),
        dataset,
        params,
        content,
        legend,
        bounds,
    })
}

/// Indices of features that have a geometry to draw.
fn drawable(dataset: &Dataset) -> impl Iterator<Item = usize> + '_ {
    dataset
        .features
        .iter()
        .enumerate()
        .filter(|(_, f)| f.geometry.is_some())
        .map(|(i, _)| i)
}

fn uniform(dataset: &Dataset, fill: Rgb) -> Result<Vec<StyledFeature>, RenderError> {
    non_empty(drawable(dataset).map(|index| StyledFeature { index, fill }).collect())
}

fn non_empty(features: Vec<StyledFeature>) -> Result<Vec<StyledFeature>, RenderError> {
    if features.is_empty() {
        Err(RenderError::NoGeometries)
    } else {
        Ok(features)
    }
}

/// Names were validated by the selector; fall back to the default map if one slips through.
fn resolve(name: &str) -> Colormap {
    colormap::lookup(name)
        .or_else(|| colormap::lookup("viridis"))
        .unwrap_or_else(|| Colormap::single(Rgb::LEAFLET_BLUE))
}

fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.5
    }
}

fn class_color(classification: &Classification, colors: &[Rgb], value: Option<f64>) -> Rgb {
    match value {
        Some(v) if v.is_finite() => colors
            .get(classification.class_of(v))
            .copied()
            .unwrap_or(Rgb::LIGHT_GREY),
        _ => Rgb::LIGHT_GREY,
    }
}

fn class_legend(
    caption: &str,
    classification: &Classification,
    colors: &[Rgb],
    values: &[Option<f64>],
) -> Legend {
    let mut entries: Vec<LegendEntry> = classification
        .labels()
        .into_iter()
        .zip(colors)
        .map(|(label, color)| LegendEntry {
            label,
            color: color.to_hex(),
        })
        .collect();
    if values.iter().any(|v| !v.is_some_and(f64::is_finite)) {
        entries.push(LegendEntry {
            label: "Missing".to_string(),
            color: Rgb::LIGHT_GREY.to_hex(),
        });
    }
    Legend::Classes {
        caption: caption.to_string(),
        entries,
    }
}

/// Categories in the order given by the allow-list, otherwise every value sorted.
fn category_order(dataset: &Dataset, column: &str, allow_list: Option<&[String]>) -> Vec<String> {
    match allow_list {
        Some(list) => {
            let mut order: Vec<String> = Vec::with_capacity(list.len());
            for category in list {
                if !order.contains(category) {
                    order.push(category.clone());
                }
            }
            order
        }
        None => dataset.unique_values(column),
    }
}
