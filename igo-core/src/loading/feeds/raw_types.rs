use serde::Deserialize;

/// Row of the traffic segment feed, read by column position
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FeedSegment {
    pub id: String,
    pub description: String,
    /// Flat comma separated list: lon, lat, lon, lat, ...
    pub coordinates: String,
}

/// Row of the congestion feed, read by column position
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FeedCongestion {
    pub id: String,
    pub date: String,
    pub current_state: String,
    pub planned_state: String,
}
