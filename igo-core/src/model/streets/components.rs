//! Street network components - nodes and directed edges

use geo::Point;

use crate::{Meters, Speed};

/// Street graph node
#[derive(Debug, Clone, PartialEq)]
pub struct StreetNode {
    /// OSM ID of the node
    pub id: u64,
    /// Node coordinates (longitude, latitude)
    pub geometry: Point<f64>,
}

/// Directed street graph edge
#[derive(Debug, Clone, PartialEq)]
pub struct StreetEdge {
    /// Length in meters
    pub length: Meters,
    /// Legal speed in km/h, absent when the source had no usable value
    pub maxspeed: Option<Speed>,
}

impl StreetEdge {
    pub fn new(length: Meters, maxspeed: Option<Speed>) -> Self {
        Self {
            length,
            maxspeed: maxspeed.filter(|speed| speed.is_finite() && *speed > 0.0),
        }
    }

    /// Speed used for travel time estimation, km/h
    pub fn effective_speed(&self, default_speed: Speed) -> Speed {
        self.maxspeed.unwrap_or(default_speed)
    }
}
