//! Directed street graph with a spatial index over its nodes

use geo::{Distance, Haversine, Point};
use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use petgraph::graph::{DiGraph, EdgeIndex, EdgeReference, NodeIndex};
use rstar::RTree;
use rstar::primitives::GeomWithData;

use super::{StreetEdge, StreetNode};
use crate::{Error, Meters};

/// Node coordinates tagged with their graph index, stored in the R-tree
pub type IndexedPoint = GeomWithData<[f64; 2], NodeIndex>;

/// Base road network. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct StreetGraph {
    pub graph: DiGraph<StreetNode, StreetEdge>,
    rtree: RTree<IndexedPoint>,
}

impl StreetGraph {
    /// Builds a simple directed graph from nodes and `(source id, target id, edge)`
    /// triples.
    ///
    /// Parallel edges running in the same direction are collapsed into the
    /// shortest one. Edges in opposite directions are kept independently.
    ///
    /// # Errors
    ///
    /// Returns an error if a node id is duplicated or an edge refers to an
    /// unknown node.
    pub fn from_parts<I>(nodes: Vec<StreetNode>, edges: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (u64, u64, StreetEdge)>,
    {
        let mut graph = DiGraph::with_capacity(nodes.len(), nodes.len() * 2);
        let mut id_to_index: HashMap<u64, NodeIndex> = HashMap::with_capacity(nodes.len());

        for node in nodes {
            let id = node.id;
            if !(node.geometry.x().is_finite() && node.geometry.y().is_finite()) {
                return Err(Error::InvalidData(format!(
                    "Node {id} has non-finite coordinates"
                )));
            }
            let index = graph.add_node(node);
            if id_to_index.insert(id, index).is_some() {
                return Err(Error::InvalidData(format!("Duplicate node id {id}")));
            }
        }

        let mut pair_to_edge: HashMap<(NodeIndex, NodeIndex), EdgeIndex> = HashMap::new();
        let mut collapsed = 0usize;
        for (source_id, target_id, edge) in edges {
            let (Some(&source), Some(&target)) =
                (id_to_index.get(&source_id), id_to_index.get(&target_id))
            else {
                return Err(Error::InvalidData(format!(
                    "Edge {source_id} -> {target_id} refers to an unknown node"
                )));
            };

            match pair_to_edge.entry((source, target)) {
                Entry::Vacant(entry) => {
                    entry.insert(graph.add_edge(source, target, edge));
                }
                Entry::Occupied(entry) => {
                    collapsed += 1;
                    let existing = &mut graph[*entry.get()];
                    if edge.length < existing.length {
                        *existing = edge;
                    }
                }
            }
        }

        if collapsed > 0 {
            log::debug!("Collapsed {collapsed} parallel edges into their shortest counterpart");
        }

        let rtree = build_rtree(&graph);
        Ok(Self { graph, rtree })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, index: NodeIndex) -> Option<&StreetNode> {
        self.graph.node_weight(index)
    }

    pub fn edge(&self, index: EdgeIndex) -> Option<&StreetEdge> {
        self.graph.edge_weight(index)
    }

    pub fn find_edge(&self, source: NodeIndex, target: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(source, target)
    }

    /// Outgoing edges of a node
    pub fn edges(&self, node: NodeIndex) -> impl Iterator<Item = EdgeReference<'_, StreetEdge>> {
        self.graph.edges(node)
    }

    /// Nearest node to a point and its great-circle distance in meters.
    ///
    /// Nodes at exactly the same distance are resolved to the one with the
    /// smallest OSM id, so the answer only depends on the graph contents.
    /// Returns `None` for an empty graph or a non-finite point.
    pub fn nearest_node(&self, point: &Point<f64>) -> Option<(NodeIndex, Meters)> {
        if !(point.x().is_finite() && point.y().is_finite()) {
            return None;
        }
        let query = [point.x(), point.y()];
        let mut candidates = self.rtree.nearest_neighbor_iter_with_distance_2(&query);
        let (first, best_distance) = candidates.next()?;

        let mut best = first.data;
        for (candidate, distance) in candidates {
            if distance > best_distance {
                break;
            }
            if self.graph[candidate.data].id < self.graph[best].id {
                best = candidate.data;
            }
        }

        let node_point = self.graph[best].geometry;
        Some((best, Haversine.distance(*point, node_point)))
    }
}

fn build_rtree(graph: &DiGraph<StreetNode, StreetEdge>) -> RTree<IndexedPoint> {
    let points = graph
        .node_indices()
        .map(|index| {
            let geometry = graph[index].geometry;
            IndexedPoint::new([geometry.x(), geometry.y()], index)
        })
        .collect();
    RTree::bulk_load(points)
}
