//! Service layer of the iGo router.
//!
//! Wraps the congestion-weighted routing core with what a chat front end
//! needs: per-user positions, place name lookup and the `/go` flow.

pub mod error;
pub mod geocode;
pub mod registry;
pub mod service;

pub use error::ServiceError;
pub use geocode::{Gazetteer, Geocoder, GeocoderChain, NominatimGeocoder};
pub use registry::{Location, PositionRegistry, UserId};
pub use service::RouteService;
