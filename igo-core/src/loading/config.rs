use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_SPEED_KMH, DEFAULT_STALENESS_SECS, Error, FALLBACK_CONGESTION_FACTOR, Meters, Speed,
};

const BARCELONA_SEGMENTS_URL: &str = "https://opendata-ajuntament.barcelona.cat/data/dataset/1090983a-1c40-4609-8620-14ad49aae3ab/resource/1d6c814c-70ef-4147-aa16-a49ddb952f72/download/transit_relacio_trams.csv";
const BARCELONA_CONGESTION_URL: &str = "https://opendata-ajuntament.barcelona.cat/data/dataset/8319c2b1-4c21-4962-9acd-6db4c5ff1148/resource/2d456eb5-4ea6-4f68-9794-2f3f1a58a933/download";

/// Top level configuration of the routing core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgoConfig {
    pub graph: GraphSourceConfig,
    pub feeds: FeedConfig,
    pub weighting: WeightingConfig,
    pub refresh: RefreshConfig,
    pub snapping: SnappingConfig,
}

impl IgoConfig {
    /// Rejects values that would make the weighting meaningless.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] naming the offending key.
    pub fn validate(&self) -> Result<(), Error> {
        self.weighting.validate()?;
        if !(self.snapping.max_snap_distance.is_finite() && self.snapping.max_snap_distance >= 0.0) {
            return Err(Error::InvalidData(format!(
                "snapping.max_snap_distance must be a non-negative number, got {}",
                self.snapping.max_snap_distance
            )));
        }
        Ok(())
    }
}

/// Where the base street graph comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSourceConfig {
    /// Name of the covered area, only used for logging
    pub place: String,
    /// Cached graph artifact (JSON)
    pub cache_path: PathBuf,
    /// Where to download the artifact from when the cache is missing
    pub download_url: Option<String>,
    pub download_timeout_secs: u64,
}

impl Default for GraphSourceConfig {
    fn default() -> Self {
        Self {
            place: "Barcelona, Catalonia".to_string(),
            cache_path: PathBuf::from("barcelona.graph.json"),
            download_url: None,
            download_timeout_secs: 120,
        }
    }
}

impl GraphSourceConfig {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Traffic segment and congestion feed endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub segments_url: String,
    pub congestion_url: String,
    /// Upper bound for a single feed request
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            segments_url: BARCELONA_SEGMENTS_URL.to_string(),
            congestion_url: BARCELONA_CONGESTION_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Parameters of the itime formula
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightingConfig {
    /// Speed for edges without a usable speed limit, km/h
    pub default_speed: Speed,
    /// Congestion factor for edges no segment was projected onto
    pub fallback_factor: f64,
}

impl WeightingConfig {
    /// # Errors
    ///
    /// [`Error::InvalidData`] if `default_speed` is not positive or
    /// `fallback_factor` is outside `(0, 1]`.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.default_speed.is_finite() && self.default_speed > 0.0) {
            return Err(Error::InvalidData(format!(
                "weighting.default_speed must be positive, got {}",
                self.default_speed
            )));
        }
        if !(self.fallback_factor > 0.0 && self.fallback_factor <= 1.0) {
            return Err(Error::InvalidData(format!(
                "weighting.fallback_factor must be in (0, 1], got {}",
                self.fallback_factor
            )));
        }
        Ok(())
    }
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self {
            default_speed: DEFAULT_SPEED_KMH,
            fallback_factor: FALLBACK_CONGESTION_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Age in seconds after which the next query triggers a rebuild
    pub staleness_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            staleness_secs: DEFAULT_STALENESS_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnappingConfig {
    /// Locations farther than this from every node cannot be routed
    pub max_snap_distance: Meters,
}

impl Default for SnappingConfig {
    fn default() -> Self {
        Self {
            max_snap_distance: 1000.0,
        }
    }
}
