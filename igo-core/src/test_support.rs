//! Small hand-made graphs shared by the unit tests

use chrono::{DateTime, NaiveDate, Utc};
use geo::Point;

use crate::loading::WeightingConfig;
use crate::model::{
    CongestionRecord, CongestionSnapshot, CongestionState, StreetEdge, StreetGraph, StreetNode,
    TrafficSegment,
};
use crate::{SegmentId, Speed};

pub(crate) fn node(id: u64, x: f64, y: f64) -> StreetNode {
    StreetNode {
        id,
        geometry: Point::new(x, y),
    }
}

pub(crate) fn edge(
    source: u64,
    target: u64,
    length: f64,
    maxspeed: Option<Speed>,
) -> (u64, u64, StreetEdge) {
    (source, target, StreetEdge::new(length, maxspeed))
}

/// A(1) -> B(2) -> C(3) -> D(4) along the equator, with a bypass
/// B(2) -> E(5) -> C(3) that is slightly longer than B -> C.
///
/// Edge indices follow insertion order: A->B = 0, B->C = 1, C->D = 2,
/// B->E = 3, E->C = 4, F->G = 5.
/// F(6) -> G(7) is a separate component far away from the rest.
pub(crate) fn corridor_graph() -> StreetGraph {
    StreetGraph::from_parts(
        vec![
            node(1, 0.000, 0.0),
            node(2, 0.001, 0.0),
            node(3, 0.002, 0.0),
            node(4, 0.003, 0.0),
            node(5, 0.0015, 0.0005),
            node(6, 1.000, 1.0),
            node(7, 1.001, 1.0),
        ],
        vec![
            edge(1, 2, 100.0, Some(50.0)),
            edge(2, 3, 200.0, Some(50.0)),
            edge(3, 4, 100.0, Some(50.0)),
            edge(2, 5, 110.0, Some(50.0)),
            edge(5, 3, 110.0, Some(50.0)),
            edge(6, 7, 100.0, None),
        ],
    )
    .unwrap()
}

/// Segment whose polyline runs through the given node ids
pub(crate) fn segment_through(graph: &StreetGraph, id: SegmentId, nodes: &[u64]) -> TrafficSegment {
    let coordinates = nodes
        .iter()
        .map(|osm_id| {
            graph
                .graph
                .node_weights()
                .find(|node| node.id == *osm_id)
                .unwrap()
                .geometry
        })
        .collect();
    TrafficSegment {
        id,
        description: format!("segment {id}"),
        coordinates,
    }
}

pub(crate) fn segment_between(
    graph: &StreetGraph,
    id: SegmentId,
    from: u64,
    to: u64,
) -> TrafficSegment {
    segment_through(graph, id, &[from, to])
}

pub(crate) fn congestion(states: &[(SegmentId, CongestionState)]) -> CongestionSnapshot {
    let observed_at = NaiveDate::from_ymd_opt(2021, 5, 21)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    CongestionSnapshot::from_records(states.iter().map(|&(segment, state)| CongestionRecord {
        segment,
        observed_at,
        state,
    }))
}

pub(crate) fn weighting() -> WeightingConfig {
    WeightingConfig::default()
}

pub(crate) fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_621_591_200 + seconds, 0).unwrap()
}

/// Itime in seconds of an edge with the given length, speed and factor
pub(crate) fn expected_seconds(length: f64, speed_kmh: f64, factor: f64) -> f64 {
    length / (speed_kmh / 3.6 * factor)
}
