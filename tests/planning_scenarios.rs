//! End-to-end planning scenarios against the library API

mod common;

use rstest::rstest;

use carbontrip::emissions::{breakdown, consolidate_carpools};
use carbontrip::{
    City, EmissionEstimator, FootprintEntry, PassengerCount, TransportOption, Trip, TripPlanner,
    TripSegment, distance,
};
use common::{lyon, marseille, paris, planning_services, raw_options};

#[test]
fn test_paris_lyon_distance() {
    let km = distance::between(&paris(), &lyon());
    assert!((km - 392.0).abs() <= 5.0, "distance was {km}");
    assert_eq!(km, distance::between(&lyon(), &paris()));
    assert_eq!(distance::between(&paris(), &paris()), 0.0);
}

#[rstest]
#[case("Train", 5.0, 1, 5.0)]
#[case("Train", 5.0, 4, 5.0)]
#[case("Carpool Combustion", 40.0, 4, 10.0)]
#[case("Carpool Combustion", 40.0, 2, 20.0)]
#[case("Carpool Combustion", 40.0, 9, 10.0)]
fn test_emission_per_option(
    #[case] name: &str,
    #[case] baseline: f64,
    #[case] passengers: i64,
    #[case] expected: f64,
) {
    let option = TransportOption::new("x", name, baseline);
    let km = distance::between(&paris(), &lyon());
    let estimate = EmissionEstimator::default().estimate(&option, km, PassengerCount::new(passengers));
    assert_eq!(estimate.emissions_kg, expected);
}

#[test]
fn test_consolidation_keeps_non_carpools() {
    let raw = raw_options();
    let non_carpool = raw
        .iter()
        .filter(|o| !o.name.to_lowercase().contains("carpool"))
        .count();

    let consolidated = consolidate_carpools(raw);
    assert_eq!(consolidated.len(), non_carpool + 2);

    let names: Vec<&str> = consolidated.iter().map(|o| o.name.as_str()).collect();
    assert!(names.contains(&"Carpool Combustion"));
    assert!(names.contains(&"Carpool Electric"));
}

#[test]
fn test_breakdown_at_one_km_matches_factor_sum() {
    let entries = vec![
        FootprintEntry { id: 4, value: 0.5 },
        FootprintEntry { id: 5, value: 0.25 },
        FootprintEntry { id: 6, value: 0.125 },
        FootprintEntry { id: 9, value: 1.0 },
    ];
    let sum: f64 = entries.iter().map(|e| e.value).sum();
    let total = breakdown(&entries, 1.0).total;
    assert!((total - sum).abs() < 1e-12);
}

#[test]
fn test_trip_rejects_mismatched_origin() {
    let train = TransportOption::new("2", "Train", 5.0);
    let mut trip = Trip::new();
    trip.add_segment(TripSegment::new(paris(), lyon(), 392.0, train.clone(), 5.0, None).unwrap())
        .unwrap();

    let detour = TripSegment::new(paris(), marseille(), 660.0, train, 7.0, None).unwrap();
    assert!(trip.add_segment(detour).is_err());
    assert_eq!(trip.len(), 1);
    assert_eq!(trip.total_emissions_kg(), 5.0);
}

#[tokio::test]
async fn test_two_leg_trip_totals() {
    let services = planning_services(false);
    let mut planner = TripPlanner::new(EmissionEstimator::default());

    planner.select_origin(Some(paris())).unwrap();
    planner.select_destination(Some(lyon())).unwrap();
    planner.calculate_route(&services).await.unwrap();
    planner.set_passengers("carpool-combustion", 4).unwrap();
    planner.confirm("carpool-combustion").unwrap();

    assert_eq!(planner.origin(), Some(&lyon()));
    assert!(planner.select_origin(Some(paris())).is_err());

    planner.select_destination(Some(marseille())).unwrap();
    planner.calculate_route(&services).await.unwrap();
    planner.confirm("2").unwrap();

    let trip = planner.trip();
    let distance: f64 = trip.segments().iter().map(TripSegment::distance_km).sum();
    assert_eq!(trip.len(), 2);
    assert_eq!(trip.total_distance_km(), distance);
    assert_eq!(trip.total_emissions_kg(), 15.0);
    assert_eq!(trip.segments()[1].origin(), &lyon());
    assert_eq!(trip.segments()[1].destination(), &marseille());
}

#[test]
fn test_city_coordinates() {
    let city = City::new("Paris", "France", 48.8566, 2.3522);
    assert_eq!(city.coordinates(), (48.8566, 2.3522));
}
