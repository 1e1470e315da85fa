//! Query facade used by the chat front end

use std::sync::Arc;

use geo::Point;
use geojson::FeatureCollection;
use igo_core::{
    CongestionWeightedGraph, Error, Meters, RefreshScheduler, RoutePlan, congestion_geojson,
    resolve_node, route_between_points,
};
use log::info;

use crate::error::ServiceError;
use crate::geocode::Geocoder;
use crate::registry::{Location, PositionRegistry, UserId};

pub struct RouteService {
    scheduler: Arc<RefreshScheduler>,
    registry: PositionRegistry,
    geocoder: Box<dyn Geocoder>,
    max_snap_distance: Meters,
}

impl RouteService {
    pub fn new(
        scheduler: Arc<RefreshScheduler>,
        geocoder: impl Geocoder + 'static,
        max_snap_distance: Meters,
    ) -> Self {
        Self {
            scheduler,
            registry: PositionRegistry::new(),
            geocoder: Box::new(geocoder),
            max_snap_distance,
        }
    }

    /// Stores the user's position after checking that it resolves to a
    /// street. Returns the resolved coordinate.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownLocation`] if the place is unknown or too far from
    /// every street; the stored position is left untouched.
    pub fn set_position(
        &self,
        user: UserId,
        location: Location,
    ) -> Result<Point<f64>, ServiceError> {
        let point = self.locate(&location)?;
        resolve_node(self.scheduler.base_graph(), &point, self.max_snap_distance)?;

        self.registry.set(user, location);
        info!("Stored position of user {user}");
        Ok(point)
    }

    pub fn position(&self, user: UserId) -> Option<Location> {
        self.registry.get(user)
    }

    /// Drops the user's stored position, returning it if there was one
    pub fn forget(&self, user: UserId) -> Option<Location> {
        let removed = self.registry.remove(user);
        if removed.is_some() {
            info!("Forgot position of user {user}");
        }
        removed
    }

    /// Route from the user's stored position to `target`
    ///
    /// # Errors
    ///
    /// [`ServiceError::NoPosition`] if the user never set a position,
    /// otherwise the same as [`RouteService::route`].
    pub fn go(&self, user: UserId, target: &Location) -> Result<RoutePlan, ServiceError> {
        let source = self
            .registry
            .get(user)
            .ok_or(ServiceError::NoPosition(user))?;
        self.route(&source, target)
    }

    /// Fastest route between two locations on the current snapshot
    ///
    /// # Errors
    ///
    /// Geocoding failures, [`Error::UnknownLocation`] and
    /// [`Error::PathNotFound`].
    pub fn route(&self, source: &Location, target: &Location) -> Result<RoutePlan, ServiceError> {
        let source = self.locate(source)?;
        let target = self.locate(target)?;
        let snapshot = self.scheduler.snapshot();
        Ok(route_between_points(
            &snapshot,
            source,
            target,
            self.max_snap_distance,
        )?)
    }

    /// Congestion overlay of the current snapshot
    pub fn congestion_map(&self) -> Result<FeatureCollection, ServiceError> {
        Ok(congestion_geojson(&self.scheduler.snapshot())?)
    }

    /// Snapshot being served, without triggering a refresh
    pub fn current_snapshot(&self) -> Arc<CongestionWeightedGraph> {
        self.scheduler.current()
    }

    fn locate(&self, location: &Location) -> Result<Point<f64>, ServiceError> {
        match location {
            Location::Coordinates(point) => Ok(*point),
            Location::Place(name) => self
                .geocoder
                .locate(name)?
                .ok_or_else(|| Error::UnknownLocation(format!("place '{name}' not found")).into()),
        }
    }
}
