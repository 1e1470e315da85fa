//! This module is responsible for loading data from external sources
//! (cached street graph, traffic and congestion feeds).

mod config;
pub mod feeds;
pub mod graph_source;

pub use config::{
    FeedConfig, GraphSourceConfig, IgoConfig, RefreshConfig, SnappingConfig, WeightingConfig,
};
pub use feeds::{HttpTrafficFeed, TrafficFeed, parse_congestion, parse_segments};
pub use graph_source::{BaseGraphProvider, CachedGraphProvider, GraphArtifact};
