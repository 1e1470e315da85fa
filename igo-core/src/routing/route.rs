use geo::Point;
use petgraph::graph::NodeIndex;

use super::dijkstra::dijkstra_path;
use crate::model::{CongestionWeightedGraph, StreetGraph};
use crate::{Error, Meters};

/// Route found over a congestion-weighted snapshot, ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    pub nodes: Vec<NodeIndex>,
    /// Coordinates of `nodes`, in travel order
    pub coordinates: Vec<Point<f64>>,
    /// Total intelligent travel time, seconds
    pub itime: f64,
    pub length: Meters,
    /// Endpoint markers
    pub source: Point<f64>,
    pub target: Point<f64>,
}

/// Shortest path by itime between two nodes of the snapshot.
///
/// # Errors
///
/// [`Error::UnknownLocation`] if a node is not part of the graph,
/// [`Error::PathNotFound`] if the target cannot be reached.
pub fn route(
    graph: &CongestionWeightedGraph,
    source: NodeIndex,
    target: NodeIndex,
) -> Result<RoutePlan, Error> {
    let streets = graph.street_graph();
    let source_point = node_point(streets, source)?;
    let target_point = node_point(streets, target)?;

    let path = dijkstra_path(graph, source, target).ok_or(Error::PathNotFound {
        source_node: source.index(),
        target_node: target.index(),
    })?;

    let coordinates = path
        .nodes
        .iter()
        .map(|&node| node_point(streets, node))
        .collect::<Result<Vec<_>, _>>()?;

    let length: Meters = path
        .nodes
        .windows(2)
        .filter_map(|pair| streets.find_edge(pair[0], pair[1]))
        .filter_map(|edge| streets.edge(edge))
        .map(|edge| edge.length)
        .sum();

    Ok(RoutePlan {
        nodes: path.nodes,
        coordinates,
        itime: path.cost,
        length,
        source: source_point,
        target: target_point,
    })
}

/// Snaps a coordinate to its nearest node.
///
/// # Errors
///
/// [`Error::UnknownLocation`] if the graph is empty, the point is not finite
/// or the nearest node is farther than `max_snap_distance` meters.
pub fn resolve_node(
    graph: &StreetGraph,
    point: &Point<f64>,
    max_snap_distance: Meters,
) -> Result<NodeIndex, Error> {
    let (node, distance) = graph.nearest_node(point).ok_or_else(|| {
        Error::UnknownLocation(format!(
            "({}, {}) cannot be snapped to the street graph",
            point.x(),
            point.y()
        ))
    })?;

    if distance > max_snap_distance {
        return Err(Error::UnknownLocation(format!(
            "({}, {}) is {distance:.0} m away from the nearest street (max {max_snap_distance:.0} m)",
            point.x(),
            point.y()
        )));
    }
    Ok(node)
}

/// Routes between two coordinates. The returned endpoint markers are the
/// requested coordinates, not the snapped nodes.
///
/// # Errors
///
/// Same as [`resolve_node`] and [`route`].
pub fn route_between_points(
    graph: &CongestionWeightedGraph,
    source: Point<f64>,
    target: Point<f64>,
    max_snap_distance: Meters,
) -> Result<RoutePlan, Error> {
    let streets = graph.street_graph();
    let source_node = resolve_node(streets, &source, max_snap_distance)?;
    let target_node = resolve_node(streets, &target, max_snap_distance)?;

    let mut plan = route(graph, source_node, target_node)?;
    plan.source = source;
    plan.target = target;
    Ok(plan)
}

fn node_point(graph: &StreetGraph, node: NodeIndex) -> Result<Point<f64>, Error> {
    graph
        .node(node)
        .map(|node| node.geometry)
        .ok_or_else(|| Error::UnknownLocation(format!("node {} is not in the graph", node.index())))
}
