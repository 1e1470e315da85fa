//! Data model for congestion-aware routing
//!
//! Contains the base street network, the traffic feed records and the
//! congestion-weighted snapshot built from both.

pub mod streets;
pub mod traffic;
pub mod weighted;

// Re-export of the main model structures
pub use streets::network::StreetGraph;
pub use streets::{StreetEdge, StreetNode};
pub use traffic::{CongestionRecord, CongestionSnapshot, CongestionState, TrafficSegment};
pub use weighted::{BuildStats, CongestionWeightedGraph, Itime};
