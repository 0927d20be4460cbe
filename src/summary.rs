//! Collapsible trip summary panel

use serde::Serialize;

use crate::trip::Trip;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentLine {
    pub number: usize,
    pub cities: String,
    pub distance: String,
    pub transport: String,
    pub emissions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub visible: bool,
    pub expanded: bool,
    pub total_distance: String,
    pub total_emissions: String,
    /// Empty while collapsed
    pub segments: Vec<SegmentLine>,
}

/// Round to two decimals for display
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn kilometres(value: f64) -> String {
    format!("{} km", value.round())
}

fn kilograms(value: f64) -> String {
    format!("{} kg CO₂e", round2(value))
}

/// Panel state; the panel starts collapsed
#[derive(Debug, Clone, Copy, Default)]
pub struct TripSummary {
    expanded: bool,
}

impl TripSummary {
    pub fn toggle(&mut self) -> bool {
        self.expanded = !self.expanded;
        self.expanded
    }

    pub fn view(&self, trip: &Trip) -> SummaryView {
        let segments = if self.expanded {
            trip.segments()
                .iter()
                .enumerate()
                .map(|(index, segment)| SegmentLine {
                    number: index + 1,
                    cities: format!("{} → {}", segment.origin().name, segment.destination().name),
                    distance: kilometres(segment.distance_km()),
                    transport: segment.transport().name.clone(),
                    emissions: kilograms(segment.emissions_kg()),
                })
                .collect()
        } else {
            Vec::new()
        };

        SummaryView {
            visible: !trip.is_empty(),
            expanded: self.expanded,
            total_distance: format!("Total Distance: {}", kilometres(trip.total_distance_km())),
            total_emissions: format!("Total Emissions: {}", kilograms(trip.total_emissions_kg())),
            segments,
        }
    }
}
