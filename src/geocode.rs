//! Resolution of free-text place names to coordinates

use std::collections::HashMap;
use std::time::Duration;

use geo::Point;
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::ServiceError;

/// Turns a place name into a coordinate.
///
/// `Ok(None)` means the name is unknown; errors are reserved for a lookup
/// that could not be performed at all.
pub trait Geocoder: Send + Sync {
    fn locate(&self, place: &str) -> Result<Option<Point<f64>>, ServiceError>;
}

/// Fixed table of well-known places, matched case-insensitively
#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    places: HashMap<String, Point<f64>>,
}

impl Gazetteer {
    pub fn new<I, S>(places: I) -> Self
    where
        I: IntoIterator<Item = (S, Point<f64>)>,
        S: AsRef<str>,
    {
        let places = places
            .into_iter()
            .map(|(name, point)| (normalize(name.as_ref()), point))
            .collect();
        Self { places }
    }

    pub fn insert(&mut self, name: &str, point: Point<f64>) {
        self.places.insert(normalize(name), point);
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

impl Geocoder for Gazetteer {
    fn locate(&self, place: &str) -> Result<Option<Point<f64>>, ServiceError> {
        Ok(self.places.get(&normalize(place)).copied())
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Geocoder backed by a Nominatim search endpoint.
///
/// The configured suffix (typically the city) is appended to every query
/// so that short names resolve inside the routed area.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
    suffix: String,
}

impl NominatimGeocoder {
    pub fn new(
        endpoint: impl Into<String>,
        suffix: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("igo/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServiceError::Geocoding(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            suffix: suffix.into(),
        })
    }

    fn query(&self, place: &str) -> String {
        format!("{place}{}", self.suffix)
    }
}

impl Geocoder for NominatimGeocoder {
    fn locate(&self, place: &str) -> Result<Option<Point<f64>>, ServiceError> {
        let query = self.query(place);
        debug!("Geocoding '{query}'");

        let places: Vec<NominatimPlace> = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query.as_str()), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .map_err(|e| ServiceError::Geocoding(e.to_string()))?;

        let Some(place) = places.first() else {
            return Ok(None);
        };
        match (place.lon.parse::<f64>(), place.lat.parse::<f64>()) {
            (Ok(lon), Ok(lat)) => Ok(Some(Point::new(lon, lat))),
            _ => {
                warn!("Geocoder returned unparsable coordinates for '{query}'");
                Ok(None)
            }
        }
    }
}

/// Asks each geocoder in turn until one knows the place
#[derive(Default)]
pub struct GeocoderChain {
    geocoders: Vec<Box<dyn Geocoder>>,
}

impl GeocoderChain {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, geocoder: impl Geocoder + 'static) -> Self {
        self.geocoders.push(Box::new(geocoder));
        self
    }
}

impl Geocoder for GeocoderChain {
    fn locate(&self, place: &str) -> Result<Option<Point<f64>>, ServiceError> {
        for geocoder in &self.geocoders {
            if let Some(point) = geocoder.locate(place)? {
                return Ok(Some(point));
            }
        }
        Ok(None)
    }
}
