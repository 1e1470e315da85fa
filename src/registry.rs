use dashmap::DashMap;
use geo::Point;

/// Identifier of a chat user
pub type UserId = i64;

/// Where a user says they are
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// Shared GPS location (longitude, latitude)
    Coordinates(Point<f64>),
    /// Free-text place name, resolved through a geocoder when used
    Place(String),
}

/// Last known location of every user.
///
/// Entries are keyed by user, so updates from different users never
/// contend on the same entry.
#[derive(Debug, Default)]
pub struct PositionRegistry {
    positions: DashMap<UserId, Location>,
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the location, returning the one it replaces
    pub fn set(&self, user: UserId, location: Location) -> Option<Location> {
        self.positions.insert(user, location)
    }

    pub fn get(&self, user: UserId) -> Option<Location> {
        self.positions.get(&user).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, user: UserId) -> Option<Location> {
        self.positions.remove(&user).map(|(_, location)| location)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
