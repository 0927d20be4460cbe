//! Confirmed trip segment

use serde::Serialize;

use crate::emissions::{PassengerCount, is_carpool};
use crate::models::{City, TransportOption};
use crate::{CarbonTripError, Result};

/// One origin to destination leg with its chosen transport.
///
/// Built only when the user confirms a transport choice and never mutated
/// afterwards, so the fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripSegment {
    origin: City,
    destination: City,
    distance_km: f64,
    transport: TransportOption,
    emissions_kg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    passengers: Option<PassengerCount>,
}

impl TripSegment {
    /// Validate and build a segment.
    ///
    /// `passengers` must be present exactly when `transport` is a carpool
    /// variant.
    pub fn new(
        origin: City,
        destination: City,
        distance_km: f64,
        transport: TransportOption,
        emissions_kg: f64,
        passengers: Option<PassengerCount>,
    ) -> Result<Self> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(CarbonTripError::validation(format!(
                "Segment distance must be a non-negative number, got {distance_km}"
            )));
        }
        if !emissions_kg.is_finite() || emissions_kg < 0.0 {
            return Err(CarbonTripError::validation(format!(
                "Segment emissions must be a non-negative number, got {emissions_kg}"
            )));
        }
        match (is_carpool(&transport), passengers) {
            (true, None) => {
                return Err(CarbonTripError::validation(format!(
                    "Carpool option '{}' needs a passenger count",
                    transport.name
                )));
            }
            (false, Some(_)) => {
                return Err(CarbonTripError::validation(format!(
                    "Passenger count only applies to carpool options, not '{}'",
                    transport.name
                )));
            }
            _ => {}
        }

        Ok(Self {
            origin,
            destination,
            distance_km,
            transport,
            emissions_kg,
            passengers,
        })
    }

    pub fn origin(&self) -> &City {
        &self.origin
    }

    pub fn destination(&self) -> &City {
        &self.destination
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn transport(&self) -> &TransportOption {
        &self.transport
    }

    pub fn emissions_kg(&self) -> f64 {
        self.emissions_kg
    }

    pub fn passengers(&self) -> Option<PassengerCount> {
        self.passengers
    }
}
