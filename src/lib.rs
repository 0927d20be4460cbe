//! `CarbonTrip` - multi-segment trip planning with transport carbon estimates
//!
//! The planning core (distance, transport availability, emission estimation
//! and trip accumulation) is exposed over a small JSON API for the frontend.

pub mod api;
pub mod availability;
pub mod clients;
pub mod config;
pub mod debounce;
pub mod distance;
pub mod emissions;
pub mod error;
pub mod map;
pub mod models;
pub mod planner;
pub mod search_box;
pub mod session;
pub mod summary;
pub mod telemetry;
pub mod trip;
pub mod web;

// Re-export core types for public API
pub use availability::{DistanceHeuristic, RouteProbePolicy, TransportAvailabilityPolicy, TransportMode};
pub use config::CarbonTripConfig;
pub use emissions::{EmissionEstimate, EmissionEstimator, PassengerCount};
pub use error::CarbonTripError;
pub use models::{City, FootprintEntry, TransportOption, TripSegment};
pub use planner::{PlanningServices, TripPlanner};
pub use trip::{Trip, TripState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, CarbonTripError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
