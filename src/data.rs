use crate::error::LoadError;
use crate::types::{
    ColumnSchema, ColumnType, Dataset, Feature, FeatureEnvelope, NumericStats, Properties, Schema,
};
use geo::{coord, BoundingRect, CoordsIter, Intersects, Rect};
use geojson::{GeoJson, JsonObject};
use rstar::{RTree, AABB};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Extensions accepted for uploads.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["geojson"];

/// Half-width in degrees of the box used to hit-test points and lines.
pub const IDENTIFY_TOLERANCE: f64 = 0.0005;

pub fn check_extension(filename: &str) -> Result<(), LoadError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(LoadError::UnsupportedFormat(extension))
    }
}

pub fn load_geojson_file(name: &str, path: &Path) -> Result<Dataset, LoadError> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    check_extension(&filename)?;

    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_geojson(name, &filename, &bytes)
}

/// Parse a GeoJSON document (FeatureCollection, Feature or bare Geometry) into a dataset.
///
/// Coordinates must already be WGS84: a legacy `crs` member has to name CRS84/EPSG:4326
/// and every coordinate has to fall inside the longitude/latitude range.
pub fn parse_geojson(name: &str, source: &str, bytes: &[u8]) -> Result<Dataset, LoadError> {
    info!("Loading GeoJSON {} as {}", source, name);
    let geojson = GeoJson::from_reader(bytes).map_err(geojson::Error::MalformedJson)?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => {
            check_crs(fc.foreign_members.as_ref())?;
            fc.features
                .into_iter()
                .enumerate()
                .map(|(i, f)| convert_feature(i, f))
                .collect::<Result<Vec<_>, _>>()?
        }
        GeoJson::Feature(f) => {
            check_crs(f.foreign_members.as_ref())?;
            vec![convert_feature(0, f)?]
        }
        GeoJson::Geometry(g) => {
            check_crs(g.foreign_members.as_ref())?;
            let geometry = convert_geometry(0, g)?;
            vec![Feature {
                geometry: Some(geometry),
                properties: Properties::new(),
            }]
        }
    };

    check_wgs84(&features)?;

    let dataset = build_dataset(name, source, features);
    info!(
        "Loaded {} features with {} columns from {}",
        dataset.len(),
        dataset.schema.columns.len(),
        source
    );
    Ok(dataset)
}

pub fn build_dataset(name: &str, source: &str, features: Vec<Feature>) -> Dataset {
    let schema = infer_schema(&features);

    let tree_items: Vec<FeatureEnvelope> = features
        .iter()
        .enumerate()
        .filter_map(|(index, f)| {
            let rect = f.geometry.as_ref()?.bounding_rect()?;
            Some(FeatureEnvelope {
                index,
                aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            })
        })
        .collect();
    debug!("Building spatial index for {} features", tree_items.len());

    let bounds = features
        .iter()
        .filter_map(|f| f.geometry.as_ref()?.bounding_rect())
        .reduce(union_rect);

    Dataset {
        name: name.to_string(),
        source: source.to_string(),
        features,
        schema,
        bounds,
        index: RTree::bulk_load(tree_items),
    }
}

fn convert_feature(index: usize, feature: geojson::Feature) -> Result<Feature, LoadError> {
    let geometry = match feature.geometry {
        Some(g) => Some(convert_geometry(index, g)?),
        None => None,
    };
    Ok(Feature {
        geometry,
        properties: feature.properties.unwrap_or_default(),
    })
}

fn convert_geometry(index: usize, geometry: geojson::Geometry) -> Result<geo::Geometry<f64>, LoadError> {
    geo::Geometry::<f64>::try_from(geometry.value).map_err(|e| LoadError::InvalidGeometry {
        feature: index,
        message: e.to_string(),
    })
}

fn check_crs(foreign_members: Option<&JsonObject>) -> Result<(), LoadError> {
    let Some(crs) = foreign_members.and_then(|m| m.get("crs")) else {
        return Ok(());
    };
    if crs.is_null() {
        return Ok(());
    }

    let name = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(|| LoadError::UnsupportedCrs(crs.to_string()))?;

    if is_wgs84_name(name) {
        Ok(())
    } else {
        Err(LoadError::UnsupportedCrs(name.to_string()))
    }
}

fn is_wgs84_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    upper.contains("CRS84") || upper.rsplit(':').next() == Some("4326")
}

fn check_wgs84(features: &[Feature]) -> Result<(), LoadError> {
    for (index, feature) in features.iter().enumerate() {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        for c in geometry.coords_iter() {
            let in_range = (-180.0..=180.0).contains(&c.x) && (-90.0..=90.0).contains(&c.y);
            if !in_range {
                return Err(LoadError::OutOfRange {
                    feature: index,
                    x: c.x,
                    y: c.y,
                });
            }
        }
    }
    Ok(())
}

/// Infer the type of every property key. Columns are listed in order of first appearance.
pub fn infer_schema(features: &[Feature]) -> Schema {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for feature in features {
        for key in feature.properties.keys() {
            if seen.insert(key.as_str()) {
                names.push(key.clone());
            }
        }
    }

    Schema {
        columns: names.into_iter().map(|name| infer_column(name, features)).collect(),
    }
}

fn infer_column(name: String, features: &[Feature]) -> ColumnSchema {
    let mut numbers = 0usize;
    let mut booleans = 0usize;
    let mut others = 0usize;
    let mut nulls = 0usize;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for feature in features {
        match feature.properties.get(&name) {
            None | Some(Value::Null) => nulls += 1,
            Some(Value::Number(n)) => {
                numbers += 1;
                if let Some(v) = n.as_f64() {
                    min = min.min(v);
                    max = max.max(v);
                }
            }
            Some(Value::Bool(_)) => booleans += 1,
            Some(_) => others += 1,
        }
    }

    let column_type = if numbers > 0 && booleans == 0 && others == 0 {
        ColumnType::Numeric
    } else if booleans > 0 && numbers == 0 && others == 0 {
        ColumnType::Boolean
    } else {
        ColumnType::Categorical
    };

    let stats = (column_type == ColumnType::Numeric).then_some(NumericStats {
        min,
        max,
        count: numbers,
    });

    ColumnSchema {
        name,
        column_type,
        null_count: nulls,
        stats,
    }
}

impl Dataset {
    /// The first feature whose geometry lies under `(lon, lat)`.
    pub fn identify(&self, lon: f64, lat: f64) -> Option<(usize, &Feature)> {
        let window = Rect::new(
            coord! { x: lon - IDENTIFY_TOLERANCE, y: lat - IDENTIFY_TOLERANCE },
            coord! { x: lon + IDENTIFY_TOLERANCE, y: lat + IDENTIFY_TOLERANCE },
        );
        let envelope = AABB::from_corners(
            [window.min().x, window.min().y],
            [window.max().x, window.max().y],
        );

        let mut candidates: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&envelope)
            .map(|c| c.index)
            .collect();
        candidates.sort_unstable();

        candidates.into_iter().find_map(|index| {
            let feature = self.features.get(index)?;
            let geometry = feature.geometry.as_ref()?;
            geometry.intersects(&window).then_some((index, feature))
        })
    }
}

pub fn union_rect(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
        coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
    )
}
