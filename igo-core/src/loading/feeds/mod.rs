//! Traffic segment and congestion feeds

mod http;
mod parser;
mod raw_types;

use std::sync::Arc;

pub use http::HttpTrafficFeed;
pub use parser::{parse_congestion, parse_segments};
pub use raw_types::{FeedCongestion, FeedSegment};

use crate::Error;
use crate::model::{CongestionRecord, TrafficSegment};

/// Source of fresh traffic data for a snapshot rebuild.
///
/// Implementations must bound every call in time; a failing call makes the
/// scheduler keep serving the previous snapshot.
pub trait TrafficFeed: Send + Sync {
    fn fetch_segments(&self) -> Result<Vec<TrafficSegment>, Error>;

    fn fetch_congestion(&self) -> Result<Vec<CongestionRecord>, Error>;
}

impl<T: TrafficFeed + ?Sized> TrafficFeed for Arc<T> {
    fn fetch_segments(&self) -> Result<Vec<TrafficSegment>, Error> {
        (**self).fetch_segments()
    }

    fn fetch_congestion(&self) -> Result<Vec<CongestionRecord>, Error> {
        (**self).fetch_congestion()
    }
}
