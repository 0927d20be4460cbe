//! Great-circle distance between resolved cities

use haversine::{Location as HaversineLocation, Units, distance};

use crate::models::City;
use crate::{CarbonTripError, Result};

/// Mean Earth radius used by the haversine formula, in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two `(latitude, longitude)`
/// pairs given in degrees.
#[must_use]
pub fn great_circle_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let from = HaversineLocation {
        latitude: from.0,
        longitude: from.1,
    };
    let to = HaversineLocation {
        latitude: to.0,
        longitude: to.1,
    };
    distance(from, to, Units::Kilometers)
}

/// Reject coordinates that are not finite or outside the latitude and
/// longitude ranges
pub fn validate_coordinates(city: &City) -> Result<()> {
    let (latitude, longitude) = city.coordinates();
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(CarbonTripError::validation(format!(
            "Coordinates of {} must be finite numbers",
            city.name
        )));
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(CarbonTripError::validation(format!(
            "Latitude of {} must be between -90 and 90, got {latitude}",
            city.name
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(CarbonTripError::validation(format!(
            "Longitude of {} must be between -180 and 180, got {longitude}",
            city.name
        )));
    }
    Ok(())
}

/// Distance between two cities in kilometres
#[must_use]
pub fn between(origin: &City, destination: &City) -> f64 {
    great_circle_km(origin.coordinates(), destination.coordinates())
}
