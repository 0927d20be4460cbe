//! Data models for the CarbonTrip service
//!
//! Value objects resolved from remote services or created by the planner:
//! - City: a resolved place with coordinates
//! - Transport: transport options and their footprint breakdown entries
//! - Segment: one confirmed origin to destination leg

pub mod city;
pub mod segment;
pub mod transport;

pub use city::City;
pub use segment::TripSegment;
pub use transport::{FootprintEntry, TransportOption};
