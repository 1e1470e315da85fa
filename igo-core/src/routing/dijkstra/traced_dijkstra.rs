use std::collections::BinaryHeap;

use fixedbitset::FixedBitSet;
use ordered_float::OrderedFloat;
use petgraph::{graph::NodeIndex, visit::EdgeRef};

use super::state::State;
use crate::model::{CongestionWeightedGraph, Itime};

/// Cheapest path found by [`dijkstra_path`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ShortestPath {
    /// Sum of itimes, seconds
    pub(crate) cost: f64,
    /// Nodes from start to target, both included
    pub(crate) nodes: Vec<NodeIndex>,
}

/// Dijkstra's algorithm over itime weights, stopping at the target.
///
/// Impassable edges are never relaxed, so they cannot appear in a path and
/// never take part in cost arithmetic. Returns `None` if the target is not
/// reachable.
pub(crate) fn dijkstra_path(
    graph: &CongestionWeightedGraph,
    start: NodeIndex,
    target: NodeIndex,
) -> Option<ShortestPath> {
    let streets = graph.street_graph();
    let node_count = streets.node_count();
    if start.index() >= node_count || target.index() >= node_count {
        return None;
    }

    let mut distances: Vec<Option<f64>> = vec![None; node_count];
    let mut predecessors: Vec<Option<NodeIndex>> = vec![None; node_count];
    let mut settled = FixedBitSet::with_capacity(node_count);
    let mut heap = BinaryHeap::new();

    // Start node has distance 0
    distances[start.index()] = Some(0.0);
    heap.push(State {
        cost: OrderedFloat(0.0),
        node: start,
    });

    while let Some(State { cost, node }) = heap.pop() {
        if settled.put(node.index()) {
            continue;
        }
        if node == target {
            break;
        }

        // Examine neighbors
        for edge in streets.edges(node) {
            let Some(Itime::Seconds(itime)) = graph.itime(edge.id()) else {
                continue;
            };
            let next = edge.target();
            if settled.contains(next.index()) {
                continue;
            }

            let next_cost = cost.0 + itime;
            let improves = distances[next.index()].is_none_or(|best| next_cost < best);
            if improves {
                distances[next.index()] = Some(next_cost);
                predecessors[next.index()] = Some(node);
                heap.push(State {
                    cost: OrderedFloat(next_cost),
                    node: next,
                });
            }
        }
    }

    let cost = distances[target.index()]?;

    // Follow predecessors backward from target to start
    let mut nodes = vec![target];
    let mut current = target;
    while current != start {
        current = predecessors[current.index()]?;
        nodes.push(current);
    }
    nodes.reverse(); // Now path is from start to target

    Some(ShortestPath { cost, nodes })
}
