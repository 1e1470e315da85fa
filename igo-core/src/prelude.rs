pub use crate::{DEFAULT_SPEED_KMH, FALLBACK_CONGESTION_FACTOR, DEFAULT_STALENESS_SECS};

// Re-export key components
pub use crate::algo::annotation::{annotate, itime_for};
pub use crate::algo::projection::{EdgeOwners, ProjectionReport, project_segments};
pub use crate::loading::{
    BaseGraphProvider, CachedGraphProvider, HttpTrafficFeed, IgoConfig, TrafficFeed,
    parse_congestion, parse_segments,
};
pub use crate::model::{
    CongestionRecord, CongestionSnapshot, CongestionState, CongestionWeightedGraph, Itime,
    StreetGraph, TrafficSegment,
};
pub use crate::routing::{RoutePlan, congestion_geojson, resolve_node, route, route_between_points};
pub use crate::scheduler::RefreshScheduler;

// Core types
pub use crate::Error;
pub use crate::Meters;
pub use crate::SegmentId;
pub use crate::Speed; // km/h
