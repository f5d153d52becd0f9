//! Shared fixtures for unit tests.

use crate::data::parse_geojson;
use crate::types::Dataset;
use std::sync::Arc;

/// Three polygons and two points around central Germany. `population` spans 10..=5000
/// with one null.
pub fn population_geojson() -> &'static str {
    r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature",
     "geometry": {"type": "Polygon", "coordinates": [[[9,50],[10,50],[10,51],[9,51],[9,50]]]},
     "properties": {"name": "Alpha", "population": 10, "kind": "rural", "capital": false}},
    {"type": "Feature",
     "geometry": {"type": "Polygon", "coordinates": [[[10,50],[11,50],[11,51],[10,51],[10,50]]]},
     "properties": {"name": "Beta", "population": 250, "kind": "town", "capital": false}},
    {"type": "Feature",
     "geometry": {"type": "Polygon", "coordinates": [[[11,50],[12.5,50],[12.5,51],[11,51],[11,50]]]},
     "properties": {"name": "Gamma", "population": 1200, "kind": "urban", "capital": false}},
    {"type": "Feature",
     "geometry": {"type": "Point", "coordinates": [12,52]},
     "properties": {"name": "Delta", "population": 5000, "kind": "urban", "capital": true}},
    {"type": "Feature",
     "geometry": {"type": "Point", "coordinates": [12.5,52.5]},
     "properties": {"name": "Epsilon", "population": null, "kind": "town", "capital": false}}
  ]
}"#
}

/// Polygons only, no points.
pub fn polygons_geojson() -> &'static str {
    r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature",
     "geometry": {"type": "Polygon", "coordinates": [[[0,0],[4,0],[4,4],[0,4],[0,0]],[[1,1],[3,1],[3,3],[1,3],[1,1]]]},
     "properties": {"zone": "ring", "area": 12}},
    {"type": "Feature",
     "geometry": {"type": "LineString", "coordinates": [[5,0],[6,4]]},
     "properties": {"zone": "road", "area": 0}}
  ]
}"#
}

pub fn sample_dataset() -> Dataset {
    parse_geojson("gdf_0", "population.geojson", population_geojson().as_bytes())
        .expect("fixture parses")
}

pub fn shared_sample() -> Arc<Dataset> {
    Arc::new(sample_dataset())
}

pub fn polygon_dataset() -> Arc<Dataset> {
    Arc::new(
        parse_geojson("gdf_1", "polygons.geojson", polygons_geojson().as_bytes())
            .expect("fixture parses"),
    )
}
