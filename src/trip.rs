//! Trip accumulation
//!
//! A trip is the ordered list of confirmed segments plus totals that are
//! recomputed from scratch after every change.

use serde::Serialize;
use tracing::{debug, info};

use crate::models::{City, TripSegment};
use crate::{CarbonTripError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TripState {
    Empty,
    Building,
}

/// Session-scoped multi-segment trip
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trip {
    segments: Vec<TripSegment>,
    total_distance_km: f64,
    total_emissions_kg: f64,
}

impl Trip {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> TripState {
        if self.segments.is_empty() {
            TripState::Empty
        } else {
            TripState::Building
        }
    }

    pub fn segments(&self) -> &[TripSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    pub fn total_emissions_kg(&self) -> f64 {
        self.total_emissions_kg
    }

    /// Origin the next segment has to start from
    pub fn next_origin(&self) -> Option<&City> {
        self.segments.last().map(TripSegment::destination)
    }

    /// Append a segment that continues from the previous destination.
    ///
    /// The trip is left untouched when the segment is rejected.
    pub fn add_segment(&mut self, segment: TripSegment) -> Result<&TripSegment> {
        if let Some(expected) = self.next_origin()
            && expected != segment.origin()
        {
            return Err(CarbonTripError::validation(format!(
                "Segment must start at {}, not {}",
                expected.display_label(),
                segment.origin().display_label()
            )));
        }

        debug!(
            "Adding segment {} -> {} by {}",
            segment.origin().name,
            segment.destination().name,
            segment.transport().name
        );
        self.segments.push(segment);
        self.recompute_totals();
        info!(
            "Trip has {} segments, {:.1} km, {:.2} kg CO2e",
            self.segments.len(),
            self.total_distance_km,
            self.total_emissions_kg
        );

        Ok(&self.segments[self.segments.len() - 1])
    }

    /// Drop every segment
    pub fn clear(&mut self) {
        self.segments.clear();
        self.recompute_totals();
    }

    fn recompute_totals(&mut self) {
        self.total_distance_km = self.segments.iter().map(TripSegment::distance_km).sum();
        self.total_emissions_kg = self.segments.iter().map(TripSegment::emissions_kg).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emissions::PassengerCount;
    use crate::models::TransportOption;

    fn city(name: &str, lat: f64, lon: f64) -> City {
        City::new(name, "France", lat, lon)
    }

    fn segment(from: &City, to: &City, km: f64, kg: f64) -> TripSegment {
        TripSegment::new(
            from.clone(),
            to.clone(),
            km,
            TransportOption::new("2", "Train", kg),
            kg,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_trip() {
        let trip = Trip::new();
        assert_eq!(trip.state(), TripState::Empty);
        assert_eq!(trip.total_distance_km(), 0.0);
        assert_eq!(trip.total_emissions_kg(), 0.0);
        assert!(trip.next_origin().is_none());
    }

    #[test]
    fn test_totals_follow_segments() {
        let paris = city("Paris", 48.8566, 2.3522);
        let lyon = city("Lyon", 45.764, 4.8357);
        let marseille = city("Marseille", 43.2965, 5.3698);
        let nice = city("Nice", 43.7102, 7.262);

        let mut trip = Trip::new();
        let legs = [
            segment(&paris, &lyon, 392.2, 5.0),
            segment(&lyon, &marseille, 277.5, 2.5),
            segment(&marseille, &nice, 158.0, 1.25),
        ];
        for leg in legs {
            trip.add_segment(leg).unwrap();
            let distance: f64 = trip.segments().iter().map(TripSegment::distance_km).sum();
            let emissions: f64 = trip.segments().iter().map(TripSegment::emissions_kg).sum();
            assert_eq!(trip.total_distance_km(), distance);
            assert_eq!(trip.total_emissions_kg(), emissions);
        }

        assert_eq!(trip.state(), TripState::Building);
        assert_eq!(trip.len(), 3);
        assert_eq!(trip.total_emissions_kg(), 8.75);
        assert_eq!(trip.next_origin(), Some(&nice));
    }

    #[test]
    fn test_rejects_discontinuous_segment() {
        let paris = city("Paris", 48.8566, 2.3522);
        let lyon = city("Lyon", 45.764, 4.8357);
        let nice = city("Nice", 43.7102, 7.262);

        let mut trip = Trip::new();
        trip.add_segment(segment(&paris, &lyon, 392.0, 5.0)).unwrap();
        let before = trip.clone();

        let err = trip.add_segment(segment(&paris, &nice, 686.0, 80.0)).unwrap_err();
        assert_eq!(err.user_message(), "Segment must start at Lyon, France, not Paris, France");
        assert_eq!(trip, before);
    }

    #[test]
    fn test_carpool_segment_adds_per_passenger_value() {
        let paris = city("Paris", 48.8566, 2.3522);
        let lyon = city("Lyon", 45.764, 4.8357);
        let carpool = TransportOption::new("carpool-combustion", "Carpool Combustion", 40.0);

        let mut trip = Trip::new();
        let segment =
            TripSegment::new(paris, lyon, 392.0, carpool, 10.0, Some(PassengerCount::new(4))).unwrap();
        trip.add_segment(segment).unwrap();
        assert_eq!(trip.total_emissions_kg(), 10.0);
    }

    #[test]
    fn test_clear_resets_totals() {
        let paris = city("Paris", 48.8566, 2.3522);
        let lyon = city("Lyon", 45.764, 4.8357);
        let mut trip = Trip::new();
        trip.add_segment(segment(&paris, &lyon, 392.0, 5.0)).unwrap();
        trip.clear();
        assert_eq!(trip.state(), TripState::Empty);
        assert_eq!(trip.total_distance_km(), 0.0);
    }
}
