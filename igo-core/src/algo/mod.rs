//! Snapshot construction: projecting traffic segments onto the street
//! graph and weighting its edges

pub mod annotation;
pub mod projection;
