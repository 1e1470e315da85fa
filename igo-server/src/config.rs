use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use geo::Point;
use igo::{Gazetteer, GeocoderChain, NominatimGeocoder, ServiceError};
use igo_core::IgoConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid config value: {0}")]
    Invalid(#[from] igo_core::Error),
}

/// Contents of the server TOML file. Every section is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub request_timeout_secs: u64,
    pub max_concurrent_requests: usize,
    #[serde(flatten)]
    pub core: IgoConfig,
    pub geocoder: GeocoderConfig,
    /// Place name -> `[longitude, latitude]`
    pub places: BTreeMap<String, [f64; 2]>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
            max_concurrent_requests: 64,
            core: IgoConfig::default(),
            geocoder: GeocoderConfig::default(),
            places: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Appended to free-text queries sent to Nominatim
    pub suffix: String,
    pub nominatim_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            suffix: ", Barcelona".to_string(),
            nominatim_url: None,
            timeout_secs: 5,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.core.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.core.refresh.staleness_secs)
    }

    /// Gazetteer first, then Nominatim when an endpoint is configured
    pub fn geocoder(&self) -> Result<GeocoderChain, ServiceError> {
        let gazetteer = Gazetteer::new(
            self.places
                .iter()
                .map(|(name, [lon, lat])| (name, Point::new(*lon, *lat))),
        );
        let mut chain = GeocoderChain::new().with(gazetteer);

        if let Some(url) = &self.geocoder.nominatim_url {
            chain = chain.with(NominatimGeocoder::new(
                url.clone(),
                self.geocoder.suffix.clone(),
                Duration::from_secs(self.geocoder.timeout_secs),
            )?);
        }
        Ok(chain)
    }
}
