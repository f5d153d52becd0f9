use geo::{Geometry, Rect};
use rstar::{RTree, RTreeObject, AABB};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

pub type Properties = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct Feature {
    // GeoJSON allows features with a null geometry; they keep their attributes
    // but are never drawn.
    pub geometry: Option<Geometry<f64>>,
    pub properties: Properties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Boolean,
    Categorical,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Numeric)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Boolean => "boolean",
            ColumnType::Categorical => "categorical",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
    pub null_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<NumericStats>,
}

/// Column layout of a dataset, computed once when the file is loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub columns: Vec<ColumnSchema>,
}

impl Schema {
    pub fn get(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.column_type.is_numeric())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Columns offered for categorical maps: strings, booleans and mixed values.
    pub fn categorical_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !c.column_type.is_numeric())
            .map(|c| c.name.as_str())
            .collect()
    }
}

// Wrapper for RTree indexing
#[derive(Debug, Clone)]
pub struct FeatureEnvelope {
    pub index: usize,
    pub aabb: AABB<[f64; 2]>,
}

impl RTreeObject for FeatureEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// A loaded GeoJSON file. Immutable once built; shared between layers as `Arc<Dataset>`.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub source: String,
    pub features: Vec<Feature>,
    pub schema: Schema,
    pub bounds: Option<Rect<f64>>,
    pub(crate) index: RTree<FeatureEnvelope>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Values of a numeric column, `None` where the feature has no number.
    pub fn numeric_values(&self, column: &str) -> Vec<Option<f64>> {
        self.features
            .iter()
            .map(|f| f.properties.get(column).and_then(Value::as_f64))
            .collect()
    }

    /// Distinct display labels of a column, sorted.
    pub fn unique_values(&self, column: &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .features
            .iter()
            .filter_map(|f| f.properties.get(column).and_then(category_label))
            .collect();
        values.sort();
        values.dedup();
        values
    }

    /// Distinct geometry type names in the order they first appear.
    pub fn geometry_types(&self) -> Vec<&'static str> {
        let mut types = Vec::new();
        for geometry in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            let name = geometry_type_name(geometry);
            if !types.contains(&name) {
                types.push(name);
            }
        }
        types
    }

    /// Point locations as `(lon, lat)`, including the members of multipoints.
    pub fn point_coordinates(&self) -> Vec<(f64, f64)> {
        let mut points = Vec::new();
        for geometry in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            match geometry {
                Geometry::Point(p) => points.push((p.x(), p.y())),
                Geometry::MultiPoint(mp) => points.extend(mp.iter().map(|p| (p.x(), p.y()))),
                _ => {}
            }
        }
        points
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            name: self.name.clone(),
            source: self.source.clone(),
            rows: self.len(),
            columns: self.schema.columns.len(),
            geometry_types: self.geometry_types(),
            point_count: self.point_coordinates().len(),
            bounds: self
                .bounds
                .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]),
            numeric_columns: self.schema.numeric_columns().iter().map(|s| s.to_string()).collect(),
            categorical_columns: self
                .schema
                .categorical_columns()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            schema: self.schema.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub name: String,
    pub source: String,
    pub rows: usize,
    pub columns: usize,
    pub geometry_types: Vec<&'static str>,
    pub point_count: usize,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bounds: Option<[f64; 4]>,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub schema: Schema,
}

/// Text used to match and display a value as a category. Nulls have no category.
pub fn category_label(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

pub fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
