use crate::types::ColumnType;
use std::path::PathBuf;
use thiserror::Error;

/// The uploaded file could not be turned into a dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("not valid GeoJSON: {0}")]
    InvalidGeoJson(#[from] geojson::Error),

    #[error("invalid geometry in feature {feature}: {message}")]
    InvalidGeometry { feature: usize, message: String },

    #[error("not WGS84: unsupported crs '{0}'")]
    UnsupportedCrs(String),

    #[error("not WGS84: feature {feature} has coordinate ({x}, {y}) outside the longitude/latitude range")]
    OutOfRange { feature: usize, x: f64, y: f64 },
}

/// A visualization request does not fit the dataset it targets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("column required")]
    ColumnRequired,

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column must be numeric: '{column}' is {found}")]
    ColumnNotNumeric { column: String, found: ColumnType },

    #[error("invalid class count: {0}")]
    InvalidClassCount(i64),

    #[error("invalid bounds: min {min} is greater than max {max}")]
    InvalidBounds { min: f64, max: f64 },

    #[error("unknown classification scheme '{0}'")]
    UnknownScheme(String),

    #[error("unknown colormap '{0}'")]
    UnknownColormap(String),
}

impl ValidationError {
    /// The request field the error belongs to, so a UI can show it next to that control.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::ColumnRequired
            | ValidationError::UnknownColumn(_)
            | ValidationError::ColumnNotNumeric { .. } => "column",
            ValidationError::InvalidClassCount(_) => "classes",
            ValidationError::InvalidBounds { .. } => "bounds",
            ValidationError::UnknownScheme(_) => "scheme",
            ValidationError::UnknownColormap(_) => "colormap",
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no point geometries found; geometry types: {0}")]
    NoPoints(String),

    #[error("no features match the selected categories")]
    EmptySelection,

    #[error("nothing to draw: the layer has no geometries")]
    NoGeometries,

    #[error("could not draw image: {0}")]
    Draw(String),

    #[error("could not encode image: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("unknown layer '{0}'")]
    UnknownLayer(String),

    #[error("no dataset loaded")]
    NoDataset,

    #[error("layer name must not be empty")]
    EmptyLayerName,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("could not visualize layer: {0}")]
    Render(#[from] RenderError),

    #[error("export to {path:?} failed: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
