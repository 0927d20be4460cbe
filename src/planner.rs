//! Planning cursor for one user session
//!
//! Tracks the origin and destination being planned, the transport
//! candidates shown for that pair and the passenger count chosen for each
//! carpool candidate. Confirming a candidate appends a segment to the trip
//! and moves the cursor on to the next leg.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::availability::{TransportAvailabilityPolicy, TransportMode, filter_by_availability};
use crate::clients::TransportFactorService;
use crate::distance;
use crate::emissions::{EmissionEstimate, EmissionEstimator, PassengerCount, is_carpool};
use crate::models::{City, TransportOption, TripSegment};
use crate::trip::{Trip, TripState};
use crate::{CarbonTripError, Result};

/// Remote collaborators used while planning
#[derive(Clone)]
pub struct PlanningServices {
    pub transports: Arc<dyn TransportFactorService>,
    pub availability: Arc<dyn TransportAvailabilityPolicy>,
}

/// Distance and candidates for the selected origin and destination
#[derive(Debug, Clone, Default)]
pub struct PendingLeg {
    pub distance_km: f64,
    pub modes: Vec<TransportMode>,
    pub options: Vec<TransportOption>,
    passengers: HashMap<String, PassengerCount>,
}

impl PendingLeg {
    fn option(&self, option_id: &str) -> Result<&TransportOption> {
        self.options
            .iter()
            .find(|option| option.id == option_id)
            .ok_or_else(|| {
                CarbonTripError::not_found(format!("Transport option '{option_id}' is not available"))
            })
    }

    fn passengers_for(&self, option_id: &str) -> PassengerCount {
        self.passengers.get(option_id).copied().unwrap_or_default()
    }
}

/// One transport choice with its emission figures
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub option: TransportOption,
    pub estimate: EmissionEstimate,
    pub can_decrease_passengers: bool,
    pub can_increase_passengers: bool,
}

/// Serializable view of the planner
#[derive(Debug, Clone, Serialize)]
pub struct PlannerSnapshot {
    pub state: TripState,
    pub origin: Option<City>,
    pub origin_locked: bool,
    pub destination: Option<City>,
    pub distance_km: Option<f64>,
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub segments: Vec<TripSegment>,
    pub total_distance_km: f64,
    pub total_emissions_kg: f64,
}

pub const NO_OPTIONS_NOTICE: &str = "No transport options available";

#[derive(Debug, Clone, Default)]
pub struct TripPlanner {
    estimator: EmissionEstimator,
    trip: Trip,
    origin: Option<City>,
    destination: Option<City>,
    pending: Option<PendingLeg>,
}

impl TripPlanner {
    #[must_use]
    pub fn new(estimator: EmissionEstimator) -> Self {
        Self {
            estimator,
            ..Self::default()
        }
    }

    pub fn trip(&self) -> &Trip {
        &self.trip
    }

    pub fn origin(&self) -> Option<&City> {
        self.origin.as_ref()
    }

    pub fn destination(&self) -> Option<&City> {
        self.destination.as_ref()
    }

    pub fn pending(&self) -> Option<&PendingLeg> {
        self.pending.as_ref()
    }

    /// The origin can no longer be chosen freely once the trip has segments
    pub fn origin_locked(&self) -> bool {
        !self.trip.is_empty()
    }

    /// Select or clear the origin. Shown candidates are discarded.
    pub fn select_origin(&mut self, city: Option<City>) -> Result<()> {
        if let Some(city) = &city {
            distance::validate_coordinates(city)?;
        }
        if let Some(expected) = self.trip.next_origin()
            && city.as_ref() != Some(expected)
        {
            return Err(CarbonTripError::validation(format!(
                "Origin is fixed to {} once the trip has segments",
                expected.display_label()
            )));
        }
        self.origin = city;
        self.pending = None;
        Ok(())
    }

    /// Select or clear the destination. Shown candidates are discarded.
    pub fn select_destination(&mut self, city: Option<City>) -> Result<()> {
        if let Some(city) = &city {
            distance::validate_coordinates(city)?;
        }
        if city.is_some() && self.origin.is_none() {
            return Err(CarbonTripError::validation("Select an origin first"));
        }
        self.destination = city;
        self.pending = None;
        Ok(())
    }

    /// Compute the distance for the selected pair and load the transport
    /// candidates that are available for it.
    #[instrument(skip(self, services), fields(policy = services.availability.name()))]
    pub async fn calculate_route(&mut self, services: &PlanningServices) -> Result<&PendingLeg> {
        let (origin, destination) = match (&self.origin, &self.destination) {
            (Some(origin), Some(destination)) => (origin, destination),
            _ => {
                return Err(CarbonTripError::validation(
                    "Select both an origin and a destination",
                ));
            }
        };

        let distance_km = distance::between(origin, destination);
        let modes = services
            .availability
            .available_modes(origin, destination, distance_km)
            .await;

        let options = match services.transports.transport_options(distance_km).await {
            Ok(options) => filter_by_availability(options, &modes),
            Err(e) => {
                warn!("Transport options unavailable: {}", e);
                Vec::new()
            }
        };

        info!(
            "{} -> {}: {:.1} km, {} candidates",
            origin.name,
            destination.name,
            distance_km,
            options.len()
        );

        Ok(self.pending.insert(PendingLeg {
            distance_km,
            modes: modes.into_iter().collect(),
            options,
            passengers: HashMap::new(),
        }))
    }

    fn pending_carpool(&mut self, option_id: &str) -> Result<&mut PendingLeg> {
        let pending = self
            .pending
            .as_mut()
            .ok_or_else(|| CarbonTripError::validation("Calculate the route first"))?;
        let option = pending.option(option_id)?;
        if !is_carpool(option) {
            return Err(CarbonTripError::validation(format!(
                "Passengers can only be set for carpool options, not '{}'",
                option.name
            )));
        }
        Ok(pending)
    }

    /// Change the passenger count of a carpool candidate by `change`
    pub fn adjust_passengers(&mut self, option_id: &str, change: i64) -> Result<PassengerCount> {
        let pending = self.pending_carpool(option_id)?;
        let count = pending.passengers_for(option_id).adjust(change);
        pending.passengers.insert(option_id.to_string(), count);
        Ok(count)
    }

    /// Set the passenger count of a carpool candidate, clamped to the bounds
    pub fn set_passengers(&mut self, option_id: &str, requested: i64) -> Result<PassengerCount> {
        let pending = self.pending_carpool(option_id)?;
        let count = PassengerCount::new(requested);
        pending.passengers.insert(option_id.to_string(), count);
        Ok(count)
    }

    /// Candidates with emission figures for the current passenger choices
    pub fn candidates(&self) -> Vec<Candidate> {
        let Some(pending) = &self.pending else {
            return Vec::new();
        };
        pending
            .options
            .iter()
            .map(|option| {
                let passengers = pending.passengers_for(&option.id);
                let carpool = is_carpool(option);
                Candidate {
                    option: option.clone(),
                    estimate: self.estimator.estimate(option, pending.distance_km, passengers),
                    can_decrease_passengers: carpool && passengers.can_decrease(),
                    can_increase_passengers: carpool && passengers.can_increase(),
                }
            })
            .collect()
    }

    /// Confirm a candidate: append the segment, continue from its
    /// destination and reset the pending selection.
    #[instrument(skip(self))]
    pub fn confirm(&mut self, option_id: &str) -> Result<&TripSegment> {
        let (origin, destination, pending) = match (&self.origin, &self.destination, &self.pending) {
            (Some(origin), Some(destination), Some(pending)) => (origin, destination, pending),
            _ => return Err(CarbonTripError::validation("Calculate the route first")),
        };

        let option = pending.option(option_id)?;
        let estimate = self
            .estimator
            .estimate(option, pending.distance_km, pending.passengers_for(option_id));
        let segment = TripSegment::new(
            origin.clone(),
            destination.clone(),
            pending.distance_km,
            option.clone(),
            estimate.emissions_kg,
            estimate.passengers,
        )?;

        self.trip.add_segment(segment)?;
        self.origin = self.destination.take();
        self.pending = None;

        self.trip
            .segments()
            .last()
            .ok_or_else(|| CarbonTripError::general("Segment was not recorded"))
    }

    pub fn snapshot(&self) -> PlannerSnapshot {
        let candidates = self.candidates();
        let notice = self
            .pending
            .as_ref()
            .filter(|pending| pending.options.is_empty())
            .map(|_| NO_OPTIONS_NOTICE.to_string());
        PlannerSnapshot {
            state: self.trip.state(),
            origin: self.origin.clone(),
            origin_locked: self.origin_locked(),
            destination: self.destination.clone(),
            distance_km: self.pending.as_ref().map(|pending| pending.distance_km),
            candidates,
            notice,
            segments: self.trip.segments().to_vec(),
            total_distance_km: self.trip.total_distance_km(),
            total_emissions_kg: self.trip.total_emissions_kg(),
        }
    }
}
