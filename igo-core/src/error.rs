use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to fetch {feed}: {reason}")]
    DataFetch { feed: &'static str, reason: String },
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Location cannot be resolved to a graph node: {0}")]
    UnknownLocation(String),
    #[error("No path between node {source_node} and node {target_node}")]
    PathNotFound {
        source_node: usize,
        target_node: usize,
    },
    #[error("Graph invariant violated: {0}")]
    InvariantViolation(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
}

impl Error {
    pub(crate) fn fetch(feed: &'static str, reason: impl std::fmt::Display) -> Self {
        Error::DataFetch {
            feed,
            reason: reason.to_string(),
        }
    }
}
