use serde::{Deserialize, Serialize};

/// A geographic point in decimal degrees.
///
/// Coordinates are pre-resolved by an external geocoding collaborator before
/// they enter the core; no component in this workspace performs lookups.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A postal address with optionally resolved coordinates.
///
/// Absent coordinates mean "location unknown", never "at the origin". Code
/// that ranks or prices by distance must gate on presence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub coordinates: Option<Coordinates>,
}

impl Location {
    pub fn new(address: impl Into<String>, coordinates: Option<Coordinates>) -> Self {
        Self {
            address: address.into(),
            coordinates,
        }
    }
}
