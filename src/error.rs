use thiserror::Error;

use crate::registry::UserId;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("User {0} has no stored position")]
    NoPosition(UserId),
    #[error("Geocoding failed: {0}")]
    Geocoding(String),
    #[error(transparent)]
    Core(#[from] igo_core::Error),
}
