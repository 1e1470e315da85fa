//! Edge weighting with the intelligent travel time (itime)
//!
//! `itime = length / (speed * congestion factor)`, with the length in meters
//! and the speed converted from km/h to m/s, giving seconds. Edges without
//! a segment use the fallback factor; cut edges become [`Itime::Impassable`]
//! instead of dividing by zero.

use super::projection::EdgeOwners;
use crate::loading::WeightingConfig;
use crate::model::{CongestionSnapshot, Itime, StreetEdge, StreetGraph};

const KMH_TO_MS: f64 = 1.0 / 3.6;

/// Itime of a single edge for a congestion factor
pub fn itime_for(edge: &StreetEdge, factor: f64, weighting: &WeightingConfig) -> Itime {
    if factor <= 0.0 {
        return Itime::Impassable;
    }
    let speed = edge.effective_speed(weighting.default_speed) * KMH_TO_MS;
    Itime::Seconds(edge.length / (speed * factor))
}

/// Assigns an itime to every edge of the graph, indexed by edge index.
///
/// Touched edges take the state of their last owner (no record means no
/// data). All remaining edges are weighted with the fallback factor.
pub fn annotate(
    graph: &StreetGraph,
    owners: &EdgeOwners,
    congestion: &CongestionSnapshot,
    weighting: &WeightingConfig,
) -> Vec<Option<Itime>> {
    let mut itimes: Vec<Option<Itime>> = vec![None; graph.edge_count()];

    for (&edge, segments) in owners {
        let (Some(&segment), Some(street_edge)) = (segments.last(), graph.edge(edge)) else {
            continue;
        };
        let factor = congestion.state_of(segment).factor();
        itimes[edge.index()] = Some(itime_for(street_edge, factor, weighting));
    }

    for edge in graph.graph.edge_indices() {
        let slot = &mut itimes[edge.index()];
        if slot.is_none() {
            *slot = Some(itime_for(
                &graph.graph[edge],
                weighting.fallback_factor,
                weighting,
            ));
        }
    }

    itimes
}
