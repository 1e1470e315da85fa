//! Congestion-weighted graph (CWG): the immutable snapshot served to queries

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use petgraph::graph::EdgeIndex;
use serde::Serialize;

use super::{CongestionSnapshot, StreetGraph, TrafficSegment};
use crate::Error;
use crate::algo::annotation::annotate;
use crate::algo::projection::project_segments;
use crate::loading::WeightingConfig;

/// Intelligent travel time of an edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Itime {
    /// Traversal time in seconds, finite and non-negative
    Seconds(f64),
    /// The edge is cut and must never be part of a route
    Impassable,
}

impl Itime {
    pub fn seconds(self) -> Option<f64> {
        match self {
            Itime::Seconds(seconds) => Some(seconds),
            Itime::Impassable => None,
        }
    }

    pub fn is_impassable(self) -> bool {
        matches!(self, Itime::Impassable)
    }
}

/// Counters collected while building a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub segments: usize,
    pub projected_segments: usize,
    pub projection_gaps: usize,
    pub touched_edges: usize,
    pub shared_edges: usize,
    pub impassable_edges: usize,
    pub congestion_records: usize,
}

/// Base graph topology plus an itime for every edge.
///
/// Built entirely off to the side and never mutated afterwards, so it can be
/// shared between concurrent queries behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CongestionWeightedGraph {
    base: Arc<StreetGraph>,
    itimes: Vec<Itime>,
    segments: Arc<Vec<TrafficSegment>>,
    congestion: CongestionSnapshot,
    built_at: DateTime<Utc>,
    stats: BuildStats,
}

impl CongestionWeightedGraph {
    /// Projects the segments onto the base graph and annotates every edge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvariantViolation`] if an edge ends up without a
    /// valid itime. The snapshot is never published in that case.
    pub fn build(
        base: Arc<StreetGraph>,
        segments: Vec<TrafficSegment>,
        congestion: CongestionSnapshot,
        weighting: &WeightingConfig,
        built_at: DateTime<Utc>,
    ) -> Result<Self, Error> {
        info!(
            "Building congestion-weighted graph from {} segments and {} congestion records",
            segments.len(),
            congestion.len()
        );

        let projection = project_segments(&base, &segments);
        let annotated = annotate(&base, &projection.owners, &congestion, weighting);
        let itimes = validate(annotated)?;

        let stats = BuildStats {
            segments: segments.len(),
            projected_segments: projection.projected_segments,
            projection_gaps: projection.gaps,
            touched_edges: projection.owners.len(),
            shared_edges: projection.shared_edges(),
            impassable_edges: itimes.iter().filter(|itime| itime.is_impassable()).count(),
            congestion_records: congestion.len(),
        };
        info!(
            "Annotated {} edges ({} touched by traffic segments, {} impassable)",
            itimes.len(),
            stats.touched_edges,
            stats.impassable_edges
        );

        Ok(Self {
            base,
            itimes,
            segments: Arc::new(segments),
            congestion,
            built_at,
            stats,
        })
    }

    /// Snapshot without any traffic information: every edge gets the
    /// fallback weighting.
    ///
    /// # Errors
    ///
    /// Same as [`CongestionWeightedGraph::build`].
    pub fn uncongested(
        base: Arc<StreetGraph>,
        weighting: &WeightingConfig,
        built_at: DateTime<Utc>,
    ) -> Result<Self, Error> {
        Self::build(
            base,
            Vec::new(),
            CongestionSnapshot::default(),
            weighting,
            built_at,
        )
    }

    pub fn itime(&self, edge: EdgeIndex) -> Option<Itime> {
        self.itimes.get(edge.index()).copied()
    }

    pub fn itimes(&self) -> &[Itime] {
        &self.itimes
    }

    pub fn street_graph(&self) -> &StreetGraph {
        &self.base
    }

    pub fn segments(&self) -> &[TrafficSegment] {
        &self.segments
    }

    pub fn congestion(&self) -> &CongestionSnapshot {
        &self.congestion
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }
}

/// Checks that every edge received a non-negative, non-NaN itime.
fn validate(annotated: Vec<Option<Itime>>) -> Result<Vec<Itime>, Error> {
    annotated
        .into_iter()
        .enumerate()
        .map(|(edge, itime)| match itime {
            Some(Itime::Seconds(seconds)) if seconds.is_finite() && seconds >= 0.0 => {
                Ok(Itime::Seconds(seconds))
            }
            Some(Itime::Impassable) => Ok(Itime::Impassable),
            Some(Itime::Seconds(seconds)) => Err(Error::InvariantViolation(format!(
                "edge {edge} has invalid itime {seconds}"
            ))),
            None => Err(Error::InvariantViolation(format!(
                "edge {edge} was left without itime"
            ))),
        })
        .collect()
}
