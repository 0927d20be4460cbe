//! Transport availability policies
//!
//! A policy decides which transport categories are plausible between two
//! cities. The candidate option list is then narrowed to options whose name
//! mentions one of those categories.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::clients::{RouteProbe, RoutingProfile};
use crate::models::{City, TransportOption};

/// Walking is offered up to this distance
pub const WALK_MAX_KM: f64 = 15.0;
/// Cycling is offered up to this distance
pub const BIKE_MAX_KM: f64 = 50.0;
pub const TRAIN_MIN_KM: f64 = 20.0;
pub const TRAIN_MAX_KM: f64 = 1000.0;
/// Flying is always offered above this distance
pub const PLANE_MIN_KM: f64 = 500.0;
/// Flying is offered above this distance when no ground route exists
pub const PLANE_FALLBACK_MIN_KM: f64 = 100.0;

/// Transport category label matched against option names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Walk,
    Bike,
    Car,
    Bus,
    Train,
    Plane,
}

impl TransportMode {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Walk => "walk",
            Self::Bike => "bike",
            Self::Car => "car",
            Self::Bus => "bus",
            Self::Train => "train",
            Self::Plane => "plane",
        }
    }

    /// Ground modes served by a routing profile
    #[must_use]
    pub fn for_profile(profile: RoutingProfile) -> &'static [TransportMode] {
        match profile {
            RoutingProfile::DrivingCar => &[Self::Car, Self::Bus],
            RoutingProfile::FootWalking => &[Self::Walk],
            RoutingProfile::CyclingRegular => &[Self::Bike],
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decides which transport categories apply to a pair of cities
#[async_trait]
pub trait TransportAvailabilityPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Best-effort set of available modes; never fails
    async fn available_modes(
        &self,
        origin: &City,
        destination: &City,
        distance_km: f64,
    ) -> BTreeSet<TransportMode>;
}

/// Static thresholds on the great-circle distance
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceHeuristic;

impl DistanceHeuristic {
    #[must_use]
    pub fn modes_for(distance_km: f64) -> BTreeSet<TransportMode> {
        let mut modes = BTreeSet::from([TransportMode::Car, TransportMode::Bus]);
        if distance_km <= WALK_MAX_KM {
            modes.insert(TransportMode::Walk);
        }
        if distance_km <= BIKE_MAX_KM {
            modes.insert(TransportMode::Bike);
        }
        if (TRAIN_MIN_KM..=TRAIN_MAX_KM).contains(&distance_km) {
            modes.insert(TransportMode::Train);
        }
        if distance_km > PLANE_MIN_KM {
            modes.insert(TransportMode::Plane);
        }
        modes
    }
}

#[async_trait]
impl TransportAvailabilityPolicy for DistanceHeuristic {
    fn name(&self) -> &'static str {
        "distance"
    }

    async fn available_modes(
        &self,
        _origin: &City,
        _destination: &City,
        distance_km: f64,
    ) -> BTreeSet<TransportMode> {
        Self::modes_for(distance_km)
    }
}

/// Asks a routing service which ground profiles can reach the destination
pub struct RouteProbePolicy {
    probe: Arc<dyn RouteProbe>,
}

impl RouteProbePolicy {
    pub fn new(probe: Arc<dyn RouteProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl TransportAvailabilityPolicy for RouteProbePolicy {
    fn name(&self) -> &'static str {
        "route-probe"
    }

    #[instrument(skip(self, origin, destination), fields(origin = %origin.name, destination = %destination.name))]
    async fn available_modes(
        &self,
        origin: &City,
        destination: &City,
        distance_km: f64,
    ) -> BTreeSet<TransportMode> {
        let probes = RoutingProfile::ALL.map(|profile| async move {
            (profile, self.probe.probe(origin, destination, profile).await)
        });

        let mut modes = BTreeSet::new();
        for (profile, result) in join_all(probes).await {
            match result {
                Ok(Some(_)) => modes.extend(TransportMode::for_profile(profile)),
                Ok(None) => debug!("No {} route found", profile),
                Err(e) => warn!("Route probe for {} failed: {}", profile, e),
            }
        }

        if distance_km > PLANE_MIN_KM || (modes.is_empty() && distance_km > PLANE_FALLBACK_MIN_KM) {
            modes.insert(TransportMode::Plane);
        }
        debug!("Available modes: {:?}", modes);
        modes
    }
}

/// Named policy selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AvailabilityPolicyKind {
    RouteProbe,
    #[default]
    Distance,
}

/// Keep options whose name contains one of the mode labels, case-insensitively
#[must_use]
pub fn filter_by_availability(
    options: Vec<TransportOption>,
    modes: &BTreeSet<TransportMode>,
) -> Vec<TransportOption> {
    options
        .into_iter()
        .filter(|option| {
            let name = option.normalized_name();
            modes.iter().any(|mode| name.contains(mode.label()))
        })
        .collect()
}
