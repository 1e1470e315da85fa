pub(crate) mod dijkstra;
mod route;
mod to_geojson;

pub use route::{RoutePlan, resolve_node, route, route_between_points};
pub use to_geojson::congestion_geojson;
