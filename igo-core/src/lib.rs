//! Congestion-aware road routing.
//!
//! Traffic segments from a live feed are projected onto a base road graph,
//! every edge gets an "intelligent travel time" (itime) derived from its
//! length, speed limit and current congestion, and shortest paths are
//! answered over that weighting. Snapshots are rebuilt lazily by the
//! [`RefreshScheduler`] when they go stale.

pub mod algo;
pub mod error;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::Error;
pub use loading::{
    BaseGraphProvider, CachedGraphProvider, FeedConfig, GraphSourceConfig, HttpTrafficFeed,
    IgoConfig, TrafficFeed, WeightingConfig,
};
pub use model::{
    BuildStats, CongestionRecord, CongestionSnapshot, CongestionState, CongestionWeightedGraph,
    Itime, StreetGraph, TrafficSegment,
};
pub use routing::{RoutePlan, congestion_geojson, resolve_node, route, route_between_points};
pub use scheduler::RefreshScheduler;

/// Identifier of a traffic segment, shared by the segment and congestion feeds
pub type SegmentId = u32;

/// Speed limit in km/h
pub type Speed = f64;

/// Length in meters
pub type Meters = f64;

/// Speed assumed for edges without a usable speed limit, km/h
pub const DEFAULT_SPEED_KMH: Speed = 20.0;

/// Congestion factor applied to edges no segment was projected onto
pub const FALLBACK_CONGESTION_FACTOR: f64 = 0.8;

/// Snapshots older than this are rebuilt on the next query, seconds
pub const DEFAULT_STALENESS_SECS: u64 = 300;
