//! Projection of traffic segment polylines onto base graph edges
//!
//! Every polyline vertex is snapped to its nearest node and consecutive
//! snapped nodes are stitched together with a length-weighted shortest
//! path on the base topology. Congestion plays no part here: stitching
//! decides which edges a segment owns, weighting happens afterwards.

use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, trace};
use petgraph::algo::astar;
use petgraph::graph::{EdgeIndex, NodeIndex};
use rayon::prelude::*;

use crate::SegmentId;
use crate::model::{StreetGraph, TrafficSegment};

/// Segments touching each edge, in the order they were processed.
///
/// When several segments share an edge the last one wins: annotation only
/// looks at the final entry.
pub type EdgeOwners = HashMap<EdgeIndex, Vec<SegmentId>>;

#[derive(Debug, Default)]
pub struct ProjectionReport {
    pub owners: EdgeOwners,
    /// Segments that touched at least one edge
    pub projected_segments: usize,
    /// Consecutive polyline points that could not be stitched
    pub gaps: usize,
}

impl ProjectionReport {
    /// Number of edges claimed by more than one segment
    pub fn shared_edges(&self) -> usize {
        self.owners.values().filter(|owners| owners.len() > 1).count()
    }
}

/// Edges realizing a single segment
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SegmentProjection {
    pub edges: Vec<EdgeIndex>,
    pub gaps: usize,
}

/// Projects all segments onto the graph.
///
/// Segments are projected in parallel and merged in feed order, so the
/// result does not depend on scheduling.
pub fn project_segments(graph: &StreetGraph, segments: &[TrafficSegment]) -> ProjectionReport {
    let projections: Vec<SegmentProjection> = segments
        .par_iter()
        .map(|segment| project_segment(graph, segment))
        .collect();

    let mut report = ProjectionReport::default();
    for (segment, projection) in segments.iter().zip(projections) {
        report.gaps += projection.gaps;
        if projection.edges.is_empty() {
            trace!("Segment {} touched no edges", segment.id);
            continue;
        }
        report.projected_segments += 1;

        for edge in projection.edges {
            let owners = report.owners.entry(edge).or_default();
            if owners.last() != Some(&segment.id) {
                owners.push(segment.id);
            }
        }
    }

    debug!(
        "Projected {} of {} segments onto {} edges ({} gaps)",
        report.projected_segments,
        segments.len(),
        report.owners.len(),
        report.gaps
    );
    report
}

/// Maps one segment polyline onto an ordered list of edges.
///
/// Pairs of points that snap to the same node are skipped. Pairs without a
/// connecting path (e.g. the segment leaves the covered area) count as gaps
/// and are skipped as well.
pub fn project_segment(graph: &StreetGraph, segment: &TrafficSegment) -> SegmentProjection {
    let snapped: Vec<NodeIndex> = segment
        .coordinates
        .iter()
        .filter_map(|point| graph.nearest_node(point).map(|(node, _)| node))
        .collect();

    let mut projection = SegmentProjection::default();
    for (from, to) in snapped.into_iter().tuple_windows() {
        if from == to {
            continue;
        }

        let Some(path) = stitch(graph, from, to) else {
            trace!(
                "Segment {}: no path between nodes {} and {}",
                segment.id,
                from.index(),
                to.index()
            );
            projection.gaps += 1;
            continue;
        };

        for (a, b) in path.into_iter().tuple_windows() {
            if let Some(edge) = graph.find_edge(a, b) {
                projection.edges.push(edge);
            }
        }
    }

    projection
}

/// Length-weighted shortest path on the base graph
fn stitch(graph: &StreetGraph, from: NodeIndex, to: NodeIndex) -> Option<Vec<NodeIndex>> {
    astar(
        &graph.graph,
        from,
        |node| node == to,
        |edge| edge.weight().length,
        |_| 0.0,
    )
    .map(|(_, path)| path)
}
