//! Visualization mode selection.
//!
//! Turns a [`VisualizationRequest`] into the [`RenderParameters`] the styling step
//! consumes, validating the request against the dataset's cached schema. Rules run
//! in a fixed order and the first failure wins:
//!
//! 1. a mode that needs a column has none selected
//! 2. the column is not in the schema
//! 3. a choropleth mode targets a non-numeric column
//! 4. a classified choropleth asks for fewer than one class
//! 5. a continuous choropleth has `min > max`
//!
//! Unknown scheme and colormap names are checked after these five.

use crate::classify::Scheme;
use crate::colormap;
use crate::config::DefaultsConfig;
use crate::error::ValidationError;
use crate::types::{ColumnSchema, Dataset};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum VizMode {
    #[default]
    Geometry,
    ChoroplethClassified,
    ChoroplethContinuous,
    Categorical,
    Heatmap,
}

impl VizMode {
    pub const ALL: &'static [VizMode] = &[
        Self::Geometry,
        Self::ChoroplethClassified,
        Self::ChoroplethContinuous,
        Self::Categorical,
        Self::Heatmap,
    ];

    pub fn requires_column(&self) -> bool {
        !matches!(self, Self::Geometry | Self::Heatmap)
    }

    pub fn is_choropleth(&self) -> bool {
        matches!(self, Self::ChoroplethClassified | Self::ChoroplethContinuous)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::ChoroplethClassified => "choropleth-classified",
            Self::ChoroplethContinuous => "choropleth-continuous",
            Self::Categorical => "categorical",
            Self::Heatmap => "heatmap",
        }
    }
}

impl fmt::Display for VizMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the user asked for. Built fresh for every render action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationRequest {
    pub mode: VizMode,
    pub column: Option<String>,
    pub scheme: Option<String>,
    pub classes: Option<i64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub colormap: Option<String>,
    /// Allow-list for categorical maps; `None` or empty shows every category.
    pub categories: Option<Vec<String>>,
    pub legend_caption: Option<String>,
}

impl VisualizationRequest {
    pub fn new(mode: VizMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn classes(mut self, classes: i64) -> Self {
        self.classes = Some(classes);
        self
    }

    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn colormap(mut self, colormap: impl Into<String>) -> Self {
        self.colormap = Some(colormap.into());
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn legend_caption(mut self, caption: impl Into<String>) -> Self {
        self.legend_caption = Some(caption.into());
        self
    }

    /// Selected column, treating blank input as no selection.
    fn selected_column(&self) -> Option<&str> {
        self.column
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Exactly what the styling step needs for one mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum RenderParameters {
    Geometry,
    ChoroplethClassified {
        column: String,
        scheme: Scheme,
        classes: usize,
        colormap: String,
        legend_caption: String,
    },
    ChoroplethContinuous {
        column: String,
        min: f64,
        max: f64,
        colormap: String,
        legend_caption: String,
    },
    Categorical {
        column: String,
        colormap: String,
        /// `None` keeps every category.
        categories: Option<Vec<String>>,
        legend_caption: String,
    },
    Heatmap,
}

impl RenderParameters {
    pub fn mode(&self) -> VizMode {
        match self {
            Self::Geometry => VizMode::Geometry,
            Self::ChoroplethClassified { .. } => VizMode::ChoroplethClassified,
            Self::ChoroplethContinuous { .. } => VizMode::ChoroplethContinuous,
            Self::Categorical { .. } => VizMode::Categorical,
            Self::Heatmap => VizMode::Heatmap,
        }
    }

    pub fn column(&self) -> Option<&str> {
        match self {
            Self::ChoroplethClassified { column, .. }
            | Self::ChoroplethContinuous { column, .. }
            | Self::Categorical { column, .. } => Some(column),
            Self::Geometry | Self::Heatmap => None,
        }
    }
}

/// Builds render parameters, filling empty request fields from configured defaults.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    defaults: DefaultsConfig,
}

impl Selector {
    pub fn new(defaults: DefaultsConfig) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &DefaultsConfig {
        &self.defaults
    }

    pub fn build(
        &self,
        dataset: &Dataset,
        request: &VisualizationRequest,
    ) -> Result<RenderParameters, ValidationError> {
        let mode = request.mode;
        if !mode.requires_column() {
            return Ok(match mode {
                VizMode::Heatmap => RenderParameters::Heatmap,
                _ => RenderParameters::Geometry,
            });
        }

        // Rule 1
        let column = request
            .selected_column()
            .ok_or(ValidationError::ColumnRequired)?;
        // Rule 2
        let schema = dataset
            .schema
            .get(column)
            .ok_or_else(|| ValidationError::UnknownColumn(column.to_string()))?;
        // Rule 3
        if mode.is_choropleth() && !schema.column_type.is_numeric() {
            return Err(ValidationError::ColumnNotNumeric {
                column: column.to_string(),
                found: schema.column_type,
            });
        }

        match mode {
            VizMode::ChoroplethClassified => self.classified(column, request),
            VizMode::ChoroplethContinuous => self.continuous(schema, request),
            _ => self.categorical(column, request),
        }
    }

    fn classified(
        &self,
        column: &str,
        request: &VisualizationRequest,
    ) -> Result<RenderParameters, ValidationError> {
        // Rule 4
        let classes = request.classes.unwrap_or(self.defaults.classes);
        if classes < 1 {
            return Err(ValidationError::InvalidClassCount(classes));
        }
        let classes =
            usize::try_from(classes).map_err(|_| ValidationError::InvalidClassCount(classes))?;

        let scheme: Scheme = request
            .scheme
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.defaults.scheme)
            .parse()?;

        Ok(RenderParameters::ChoroplethClassified {
            column: column.to_string(),
            scheme,
            classes,
            colormap: self.colormap(request, &self.defaults.numeric_colormap)?,
            legend_caption: caption(request, || format!("{} classification", column)),
        })
    }

    fn continuous(
        &self,
        schema: &ColumnSchema,
        request: &VisualizationRequest,
    ) -> Result<RenderParameters, ValidationError> {
        // Missing bounds come from the column's cached range.
        let (data_min, data_max) = schema
            .stats
            .map(|s| (s.min, s.max))
            .unwrap_or((0.0, 0.0));
        let min = request.min.unwrap_or(data_min);
        let max = request.max.unwrap_or(data_max);

        // Rule 5; NaN bounds never order.
        if !(min <= max) {
            return Err(ValidationError::InvalidBounds { min, max });
        }

        let column = schema.name.as_str();
        Ok(RenderParameters::ChoroplethContinuous {
            column: column.to_string(),
            min,
            max,
            colormap: self.colormap(request, &self.defaults.numeric_colormap)?,
            legend_caption: caption(request, || column.to_string()),
        })
    }

    fn categorical(
        &self,
        column: &str,
        request: &VisualizationRequest,
    ) -> Result<RenderParameters, ValidationError> {
        let categories = request
            .categories
            .as_ref()
            .filter(|c| !c.is_empty())
            .cloned();

        Ok(RenderParameters::Categorical {
            column: column.to_string(),
            colormap: self.colormap(request, &self.defaults.categorical_colormap)?,
            categories,
            legend_caption: caption(request, || format!("{} Categories", column)),
        })
    }

    /// Canonical colormap name, or the given default when the request has none.
    fn colormap(
        &self,
        request: &VisualizationRequest,
        default: &str,
    ) -> Result<String, ValidationError> {
        let name = request
            .colormap
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(default);
        colormap::lookup(name)
            .map(|c| c.name)
            .ok_or_else(|| ValidationError::UnknownColormap(name.to_string()))
    }
}

fn caption(request: &VisualizationRequest, default: impl FnOnce() -> String) -> String {
    request
        .legend_caption
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(default)
}

/// Validate `request` against `dataset` with the built-in defaults.
pub fn build_render_parameters(
    dataset: &Dataset,
    request: &VisualizationRequest,
) -> Result<RenderParameters, ValidationError> {
    Selector::default().build(dataset, request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{polygon_dataset, sample_dataset};
    use crate::types::ColumnType;
    use proptest::prelude::*;

    #[test]
    fn test_classified_population() {
        let dataset = sample_dataset();
        let request = VisualizationRequest::new(VizMode::ChoroplethClassified)
            .column("population")
            .scheme("quantiles")
            .classes(5);

        let params = build_render_parameters(&dataset, &request).unwrap();
        assert_eq!(
            params,
            RenderParameters::ChoroplethClassified {
                column: "population".to_string(),
                scheme: Scheme::Quantiles,
                classes: 5,
                colormap: "YlOrRd".to_string(),
                legend_caption: "population classification".to_string(),
            }
        );
    }

    #[test]
    fn test_continuous_inverted_bounds() {
        let dataset = sample_dataset();
        let request = VisualizationRequest::new(VizMode::ChoroplethContinuous)
            .column("population")
            .bounds(100.0, 50.0);

        let err = build_render_parameters(&dataset, &request).unwrap_err();
        assert_eq!(err, ValidationError::InvalidBounds { min: 100.0, max: 50.0 });
        assert_eq!(err.to_string(), "invalid bounds: min 100 is greater than max 50");
        assert_eq!(err.field(), "bounds");
    }

    #[test]
    fn test_categorical_unknown_column() {
        let dataset = sample_dataset();
        let request = VisualizationRequest::new(VizMode::Categorical).column("undefined_col");

        let err = build_render_parameters(&dataset, &request).unwrap_err();
        assert_eq!(err, ValidationError::UnknownColumn("undefined_col".to_string()));
        assert!(err.to_string().starts_with("unknown column"));
    }

    #[test]
    fn test_column_required() {
        let dataset = sample_dataset();
        for mode in [
            VizMode::ChoroplethClassified,
            VizMode::ChoroplethContinuous,
            VizMode::Categorical,
        ] {
            let err = build_render_parameters(&dataset, &VisualizationRequest::new(mode)).unwrap_err();
            assert_eq!(err, ValidationError::ColumnRequired);
            assert_eq!(err.to_string(), "column required");

            let blank = VisualizationRequest::new(mode).column("  ");
            assert_eq!(
                build_render_parameters(&dataset, &blank).unwrap_err(),
                ValidationError::ColumnRequired
            );
        }
    }

    #[test]
    fn test_rules_apply_in_order() {
        let dataset = sample_dataset();

        // Missing column beats an invalid class count
        let request = VisualizationRequest::new(VizMode::ChoroplethClassified).classes(0);
        assert_eq!(
            build_render_parameters(&dataset, &request).unwrap_err(),
            ValidationError::ColumnRequired
        );

        // Unknown column beats inverted bounds
        let request = VisualizationRequest::new(VizMode::ChoroplethContinuous)
            .column("nope")
            .bounds(10.0, 1.0);
        assert_eq!(
            build_render_parameters(&dataset, &request).unwrap_err(),
            ValidationError::UnknownColumn("nope".to_string())
        );

        // Non-numeric column beats an invalid class count
        let request = VisualizationRequest::new(VizMode::ChoroplethClassified)
            .column("kind")
            .classes(-3);
        assert_eq!(
            build_render_parameters(&dataset, &request).unwrap_err(),
            ValidationError::ColumnNotNumeric {
                column: "kind".to_string(),
                found: ColumnType::Categorical,
            }
        );

        // Class count beats an unknown scheme and colormap
        let request = VisualizationRequest::new(VizMode::ChoroplethClassified)
            .column("population")
            .classes(0)
            .scheme("nonsense")
            .colormap("nonsense");
        assert_eq!(
            build_render_parameters(&dataset, &request).unwrap_err(),
            ValidationError::InvalidClassCount(0)
        );

        // Scheme is checked before colormap
        let request = VisualizationRequest::new(VizMode::ChoroplethClassified)
            .column("population")
            .scheme("nonsense")
            .colormap("nonsense");
        assert_eq!(
            build_render_parameters(&dataset, &request).unwrap_err(),
            ValidationError::UnknownScheme("nonsense".to_string())
        );
    }

    #[test]
    fn test_boolean_column_is_not_numeric() {
        let dataset = sample_dataset();
        let request = VisualizationRequest::new(VizMode::ChoroplethContinuous).column("capital");
        let err = build_render_parameters(&dataset, &request).unwrap_err();
        assert_eq!(err.to_string(), "column must be numeric: 'capital' is boolean");
        assert_eq!(err.field(), "column");
    }

    #[test]
    fn test_numeric_column_allowed_for_categorical() {
        let dataset = sample_dataset();
        let request = VisualizationRequest::new(VizMode::Categorical).column("population");
        let params = build_render_parameters(&dataset, &request).unwrap();
        assert_eq!(params.mode(), VizMode::Categorical);
        assert_eq!(params.column(), Some("population"));
    }

    #[test]
    fn test_continuous_defaults_to_column_range() {
        let dataset = sample_dataset();
        let request = VisualizationRequest::new(VizMode::ChoroplethContinuous).column("population");
        match build_render_parameters(&dataset, &request).unwrap() {
            RenderParameters::ChoroplethContinuous { min, max, legend_caption, .. } => {
                assert_eq!(min, 10.0);
                assert_eq!(max, 5000.0);
                assert_eq!(legend_caption, "population");
            }
            other => panic!("unexpected parameters: {:?}", other),
        }

        // Only min given, above the column maximum
        let mut request = VisualizationRequest::new(VizMode::ChoroplethContinuous).column("population");
        request.min = Some(6000.0);
        assert_eq!(
            build_render_parameters(&dataset, &request).unwrap_err(),
            ValidationError::InvalidBounds { min: 6000.0, max: 5000.0 }
        );
    }

    #[test]
    fn test_equal_bounds_are_valid() {
        let dataset = sample_dataset();
        let request = VisualizationRequest::new(VizMode::ChoroplethContinuous)
            .column("population")
            .bounds(42.0, 42.0);
        assert!(build_render_parameters(&dataset, &request).is_ok());
    }

    #[test]
    fn test_nan_bounds_are_invalid() {
        let dataset = sample_dataset();
        let request = VisualizationRequest::new(VizMode::ChoroplethContinuous)
            .column("population")
            .bounds(f64::NAN, 10.0);
        assert!(matches!(
            build_render_parameters(&dataset, &request),
            Err(ValidationError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_categorical_parameters() {
        let dataset = sample_dataset();
        let request = VisualizationRequest::new(VizMode::Categorical)
            .column("kind")
            .colormap("set1")
            .categories(["urban", "town"])
            .legend_caption("Settlement");

        assert_eq!(
            build_render_parameters(&dataset, &request).unwrap(),
            RenderParameters::Categorical {
                column: "kind".to_string(),
                colormap: "Set1".to_string(),
                categories: Some(vec!["urban".to_string(), "town".to_string()]),
                legend_caption: "Settlement".to_string(),
            }
        );

        let all = VisualizationRequest::new(VizMode::Categorical)
            .column("kind")
            .categories(Vec::<String>::new());
        match build_render_parameters(&dataset, &all).unwrap() {
            RenderParameters::Categorical { categories, colormap, legend_caption, .. } => {
                assert_eq!(categories, None);
                assert_eq!(colormap, "Set3");
                assert_eq!(legend_caption, "kind Categories");
            }
            other => panic!("unexpected parameters: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_colormap() {
        let dataset = sample_dataset();
        let request = VisualizationRequest::new(VizMode::Categorical)
            .column("kind")
            .colormap("rainbow-unicorn");
        let err = build_render_parameters(&dataset, &request).unwrap_err();
        assert_eq!(err, ValidationError::UnknownColormap("rainbow-unicorn".to_string()));
        assert_eq!(err.field(), "colormap");
    }

    #[test]
    fn test_reversed_colormap_is_canonicalized() {
        let dataset = sample_dataset();
        let request = VisualizationRequest::new(VizMode::ChoroplethContinuous)
            .column("population")
            .colormap("blues_R");
        match build_render_parameters(&dataset, &request).unwrap() {
            RenderParameters::ChoroplethContinuous { colormap, .. } => assert_eq!(colormap, "Blues_r"),
            other => panic!("unexpected parameters: {:?}", other),
        }
    }

    #[test]
    fn test_configured_defaults() {
        let dataset = sample_dataset();
        let selector = Selector::new(DefaultsConfig {
            numeric_colormap: "viridis".to_string(),
            categorical_colormap: "Dark2".to_string(),
            scheme: "FisherJenks".to_string(),
            classes: 3,
        });
        let request = VisualizationRequest::new(VizMode::ChoroplethClassified).column("population");
        match selector.build(&dataset, &request).unwrap() {
            RenderParameters::ChoroplethClassified { scheme, classes, colormap, .. } => {
                assert_eq!(scheme, Scheme::FisherJenks);
                assert_eq!(classes, 3);
                assert_eq!(colormap, "viridis");
            }
            other => panic!("unexpected parameters: {:?}", other),
        }
    }

    #[test]
    fn test_geometry_and_heatmap_ignore_column() {
        let dataset = sample_dataset();
        let request = VisualizationRequest::new(VizMode::Geometry).column("does_not_exist");
        assert_eq!(
            build_render_parameters(&dataset, &request).unwrap(),
            RenderParameters::Geometry
        );
        let request = VisualizationRequest::new(VizMode::Heatmap).colormap("nonsense");
        assert_eq!(
            build_render_parameters(&dataset, &request).unwrap(),
            RenderParameters::Heatmap
        );
    }

    #[test]
    fn test_request_deserializes_from_json() {
        let request: VisualizationRequest = serde_json::from_str(
            r#"{"mode": "choropleth-classified", "column": "population", "scheme": "natural_breaks", "classes": 4}"#,
        )
        .unwrap();
        assert_eq!(request.mode, VizMode::ChoroplethClassified);
        assert_eq!(request.classes, Some(4));

        let params = build_render_parameters(&sample_dataset(), &request).unwrap();
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["mode"], "choropleth-classified");
        assert_eq!(json["scheme"], "NaturalBreaks");
        assert_eq!(json["classes"], 4);
    }

    fn mode_strategy() -> impl Strategy<Value = VizMode> {
        prop::sample::select(VizMode::ALL.to_vec())
    }

    fn request_strategy() -> impl Strategy<Value = VisualizationRequest> {
        (
            mode_strategy(),
            prop::option::of(prop::sample::select(vec![
                "name", "population", "kind", "capital", "zone", "area", "missing",
            ])),
            prop::option::of(prop::sample::select(vec!["quantiles", "FisherJenks", "bogus"])),
            prop::option::of(-5i64..20),
            prop::option::of(-1000.0f64..6000.0),
            prop::option::of(-1000.0f64..6000.0),
            prop::option::of(prop::sample::select(vec!["viridis", "Set3_r", "bogus"])),
        )
            .prop_map(|(mode, column, scheme, classes, min, max, colormap)| VisualizationRequest {
                mode,
                column: column.map(str::to_string),
                scheme: scheme.map(str::to_string),
                classes,
                min,
                max,
                colormap: colormap.map(str::to_string),
                categories: None,
                legend_caption: None,
            })
    }

    proptest! {
        #[test]
        fn prop_non_numeric_column_rejected_by_choropleths(
            column in prop::sample::select(vec!["name", "kind", "capital"]),
            continuous in any::<bool>(),
            classes in prop::option::of(-5i64..20),
            min in prop::option::of(-100.0f64..100.0),
            max in prop::option::of(-100.0f64..100.0),
        ) {
            let dataset = sample_dataset();
            let mode = if continuous { VizMode::ChoroplethContinuous } else { VizMode::ChoroplethClassified };
            let mut request = VisualizationRequest::new(mode).column(column);
            request.classes = classes;
            request.min = min;
            request.max = max;
            let is_not_numeric = matches!(
                build_render_parameters(&dataset, &request),
                Err(ValidationError::ColumnNotNumeric { .. })
            );
            prop_assert!(is_not_numeric);
        }

        #[test]
        fn prop_non_positive_class_count_rejected(
            classes in i64::MIN..=0,
            use_polygons in any::<bool>(),
            scheme in prop::option::of(prop::sample::select(vec!["quantiles", "bogus"])),
        ) {
            let (dataset, column) = if use_polygons {
                ((*polygon_dataset()).clone(), "area")
            } else {
                (sample_dataset(), "population")
            };
            let mut request = VisualizationRequest::new(VizMode::ChoroplethClassified)
                .column(column)
                .classes(classes);
            request.scheme = scheme.map(str::to_string);
            prop_assert_eq!(
                build_render_parameters(&dataset, &request),
                Err(ValidationError::InvalidClassCount(classes))
            );
        }

        #[test]
        fn prop_inverted_bounds_rejected(min in -1e9f64..1e9, gap in 1e-6f64..1e6) {
            let dataset = sample_dataset();
            let max = min - gap;
            prop_assume!(min > max);
            let request = VisualizationRequest::new(VizMode::ChoroplethContinuous)
                .column("population")
                .bounds(min, max);
            prop_assert_eq!(
                build_render_parameters(&dataset, &request),
                Err(ValidationError::InvalidBounds { min, max })
            );
        }

        #[test]
        fn prop_geometry_and_heatmap_never_need_a_column(heatmap in any::<bool>(), request in request_strategy()) {
            let dataset = sample_dataset();
            let mode = if heatmap { VizMode::Heatmap } else { VizMode::Geometry };
            let request = VisualizationRequest { mode, column: None, ..request };
            prop_assert!(build_render_parameters(&dataset, &request).is_ok());
        }

        #[test]
        fn prop_selection_is_deterministic(request in request_strategy()) {
            let dataset = sample_dataset();
            prop_assert_eq!(
                build_render_parameters(&dataset, &request),
                build_render_parameters(&dataset, &request.clone())
            );
        }
    }
}
