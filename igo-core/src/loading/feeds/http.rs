use log::{debug, info};
use reqwest::blocking::Client;

use super::{TrafficFeed, parse_congestion, parse_segments};
use crate::Error;
use crate::loading::FeedConfig;
use crate::model::{CongestionRecord, TrafficSegment};

const SEGMENTS_FEED: &str = "traffic segments";
const CONGESTION_FEED: &str = "congestion";

/// Downloads both feeds over HTTP. Every request is bounded by the
/// configured timeout.
#[derive(Debug, Clone)]
pub struct HttpTrafficFeed {
    client: Client,
    segments_url: String,
    congestion_url: String,
}

impl HttpTrafficFeed {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &FeedConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::fetch("http client", e))?;

        Ok(Self {
            client,
            segments_url: config.segments_url.clone(),
            congestion_url: config.congestion_url.clone(),
        })
    }

    fn get_text(&self, feed: &'static str, url: &str) -> Result<String, Error> {
        debug!("Downloading {feed} feed from {url}");
        self.client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text)
            .map_err(|e| Error::fetch(feed, e))
    }
}

impl TrafficFeed for HttpTrafficFeed {
    fn fetch_segments(&self) -> Result<Vec<TrafficSegment>, Error> {
        let body = self.get_text(SEGMENTS_FEED, &self.segments_url)?;
        let segments = parse_segments(body.as_bytes());
        info!("Downloaded {} traffic segments", segments.len());
        require_records(SEGMENTS_FEED, segments)
    }

    fn fetch_congestion(&self) -> Result<Vec<CongestionRecord>, Error> {
        let body = self.get_text(CONGESTION_FEED, &self.congestion_url)?;
        let records = parse_congestion(body.as_bytes());
        info!("Downloaded {} congestion records", records.len());
        require_records(CONGESTION_FEED, records)
    }
}

/// A feed without a single valid row is treated as malformed as a whole
fn require_records<T>(feed: &'static str, records: Vec<T>) -> Result<Vec<T>, Error> {
    if records.is_empty() {
        Err(Error::fetch(feed, "no valid records"))
    } else {
        Ok(records)
    }
}
