use geo::{LineString, Point};
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use serde_json::json;

use super::RoutePlan;
use crate::Error;
use crate::model::CongestionWeightedGraph;

impl RoutePlan {
    /// Converts the route to a `GeoJSON` `FeatureCollection`: the path as a
    /// line plus one point feature for each endpoint.
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        let line = LineString::from(self.coordinates.clone());
        let geometry = Geometry::new(GeoJsonValue::from(&line));

        let route = json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": {
                "role": "route",
                "itime": self.itime,
                "length": self.length,
                "nodes": self.nodes.len(),
            }
        });

        let features = vec![
            Feature::from_json_value(route).map_err(|e| Error::GeoJsonError(e.to_string()))?,
            endpoint_feature(self.source, "source")?,
            endpoint_feature(self.target, "target")?,
        ];

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        })
    }

    pub fn to_geojson_string(&self) -> Result<String, Error> {
        serde_json::to_string(&self.to_geojson()?).map_err(|e| Error::GeoJsonError(e.to_string()))
    }
}

fn endpoint_feature(point: Point<f64>, role: &str) -> Result<Feature, Error> {
    let value = json!({
        "type": "Feature",
        "geometry": Geometry::new(GeoJsonValue::from(&point)),
        "properties": { "role": role }
    });
    Feature::from_json_value(value).map_err(|e| Error::GeoJsonError(e.to_string()))
}

/// Congestion map of a snapshot: every traffic segment as a line coloured by
/// its current state.
pub fn congestion_geojson(graph: &CongestionWeightedGraph) -> Result<FeatureCollection, Error> {
    let congestion = graph.congestion();

    let features = graph
        .segments()
        .iter()
        .map(|segment| {
            let state = congestion.state_of(segment.id);
            let observed_at = congestion
                .get(segment.id)
                .map(|record| record.observed_at.format("%Y-%m-%dT%H:%M:%S").to_string());
            let line = LineString::from(segment.coordinates.clone());

            let value = json!({
                "type": "Feature",
                "geometry": Geometry::new(GeoJsonValue::from(&line)),
                "properties": {
                    "id": segment.id,
                    "description": segment.description,
                    "state": state,
                    "colour": state.colour(),
                    "factor": state.factor(),
                    "observed_at": observed_at,
                }
            });
            Feature::from_json_value(value).map_err(|e| Error::GeoJsonError(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    })
}
