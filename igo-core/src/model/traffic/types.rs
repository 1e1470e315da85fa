use chrono::NaiveDateTime;
use geo::Point;
use serde::Serialize;

use crate::SegmentId;

/// Named highway stretch, the unit at which congestion is reported
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficSegment {
    pub id: SegmentId,
    pub description: String,
    /// Polyline vertices (longitude, latitude), at least two
    pub coordinates: Vec<Point<f64>>,
}

/// Current congestion state as published by the congestion feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CongestionState {
    NoData,
    VeryFluid,
    Fluid,
    Dense,
    VeryDense,
    Congested,
    Cut,
}

impl CongestionState {
    /// Parses the numeric feed code (`0` = no data ... `6` = cut)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(Self::NoData),
            "1" => Some(Self::VeryFluid),
            "2" => Some(Self::Fluid),
            "3" => Some(Self::Dense),
            "4" => Some(Self::VeryDense),
            "5" => Some(Self::Congested),
            "6" => Some(Self::Cut),
            _ => None,
        }
    }

    /// Multiplier applied to the effective speed of an edge.
    /// Zero only for [`CongestionState::Cut`].
    pub fn factor(self) -> f64 {
        match self {
            Self::VeryFluid => 1.0,
            Self::Fluid | Self::NoData => 0.8,
            Self::Dense => 0.6,
            Self::VeryDense => 0.4,
            Self::Congested => 0.2,
            Self::Cut => 0.0,
        }
    }

    /// Line colour used when drawing the congestion map
    pub fn colour(self) -> &'static str {
        match self {
            Self::NoData => "gray",
            Self::VeryFluid => "cornflowerblue",
            Self::Fluid => "limegreen",
            Self::Dense => "khaki",
            Self::VeryDense => "orangered",
            Self::Congested => "red",
            Self::Cut => "black",
        }
    }
}

/// One row of the congestion feed
#[derive(Debug, Clone, PartialEq)]
pub struct CongestionRecord {
    pub segment: SegmentId,
    pub observed_at: NaiveDateTime,
    pub state: CongestionState,
}
