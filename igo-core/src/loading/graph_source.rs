//! Base street graph provider
//!
//! The graph is read from a cached JSON artifact. When the cache is missing
//! and a download URL is configured the artifact is fetched once and
//! written to the cache before loading.

use std::fs::{self, File};
use std::io::BufReader;

use geo::Point;
use log::info;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::loading::GraphSourceConfig;
use crate::model::{StreetEdge, StreetGraph, StreetNode};
use crate::{Error, Meters, Speed};

/// Supplies the base road graph at startup. Failures are fatal to startup.
pub trait BaseGraphProvider {
    fn load_base_graph(&self) -> Result<StreetGraph, Error>;
}

/// Serialized form of the base graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphArtifact {
    pub nodes: Vec<ArtifactNode>,
    pub edges: Vec<ArtifactEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactNode {
    pub id: u64,
    /// Longitude
    pub x: f64,
    /// Latitude
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEdge {
    pub source: u64,
    pub target: u64,
    pub length: Meters,
    #[serde(default)]
    pub maxspeed: Option<MaxSpeed>,
    /// Inserts the reverse edge as well
    #[serde(default)]
    pub bidirectional: bool,
}

/// OSM `maxspeed` as exported by common tools: a number, a string, or a
/// list of strings when ways with different limits were merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxSpeed {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl MaxSpeed {
    /// Numeric value in km/h. Lists and free text are not usable.
    pub fn km_per_hour(&self) -> Option<Speed> {
        match self {
            MaxSpeed::Number(speed) => Some(*speed),
            MaxSpeed::Text(text) => text.trim().parse().ok(),
            MaxSpeed::List(_) => None,
        }
    }
}

impl TryFrom<GraphArtifact> for StreetGraph {
    type Error = Error;

    fn try_from(artifact: GraphArtifact) -> Result<Self, Self::Error> {
        let nodes = artifact
            .nodes
            .into_iter()
            .map(|node| StreetNode {
                id: node.id,
                geometry: Point::new(node.x, node.y),
            })
            .collect();

        let edges = artifact.edges.into_iter().flat_map(|edge| {
            let street_edge = StreetEdge::new(
                edge.length,
                edge.maxspeed.as_ref().and_then(MaxSpeed::km_per_hour),
            );
            let reverse = edge
                .bidirectional
                .then(|| (edge.target, edge.source, street_edge.clone()));
            std::iter::once((edge.source, edge.target, street_edge)).chain(reverse)
        });

        StreetGraph::from_parts(nodes, edges)
    }
}

/// Loads the graph from the cache, downloading it first if needed
#[derive(Debug, Clone)]
pub struct CachedGraphProvider {
    config: GraphSourceConfig,
}

impl CachedGraphProvider {
    pub fn new(config: GraphSourceConfig) -> Self {
        Self { config }
    }

    fn read_cache(&self) -> Result<GraphArtifact, Error> {
        let file = File::open(&self.config.cache_path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn download(&self, url: &str) -> Result<GraphArtifact, Error> {
        info!("Downloading street graph of {} from {url}", self.config.place);
        let client = Client::builder()
            .timeout(self.config.download_timeout())
            .build()
            .map_err(|e| Error::fetch("street graph", e))?;
        let body = client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::bytes)
            .map_err(|e| Error::fetch("street graph", e))?;

        // Only cache what parses
        let artifact: GraphArtifact = serde_json::from_slice(&body)?;
        if let Some(parent) = self.config.cache_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config.cache_path, &body)?;
        info!("Cached street graph at {}", self.config.cache_path.display());
        Ok(artifact)
    }
}

impl BaseGraphProvider for CachedGraphProvider {
    fn load_base_graph(&self) -> Result<StreetGraph, Error> {
        let artifact = if self.config.cache_path.exists() {
            info!(
                "Loading cached street graph from {}",
                self.config.cache_path.display()
            );
            self.read_cache()?
        } else if let Some(url) = &self.config.download_url {
            self.download(url)?
        } else {
            return Err(Error::InvalidData(format!(
                "Street graph cache {} not found and no download URL configured",
                self.config.cache_path.display()
            )));
        };

        let graph = StreetGraph::try_from(artifact)?;
        info!(
            "Street graph of {} loaded: {} nodes, {} edges",
            self.config.place,
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }
}
