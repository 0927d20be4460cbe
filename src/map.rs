//! Map view model for the trip
//!
//! Produces markers, polylines and bounds for a Leaflet-style map. Colours
//! follow visiting order on a red to green hue ramp.

use std::str::FromStr;

use serde::Serialize;

use crate::models::{City, TripSegment};
use crate::{CarbonTripError, Result};

pub const DEFAULT_CENTER: (f64, f64) = (48.8566, 2.3522);
pub const DEFAULT_ZOOM: u8 = 5;
/// Padding in pixels applied when fitting the view to the bounds
pub const FIT_PADDING: u32 = 50;

const POLYLINE_WEIGHT: u32 = 3;
const POLYLINE_OPACITY: f64 = 0.7;
const PENDING_DASH: &str = "5, 10";

const OSM_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";
const CARTO_ATTRIBUTION: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MapTheme {
    #[default]
    Default,
    Dark,
    Satellite,
    Terrain,
    Light,
}

/// Tile source for a theme
#[derive(Debug, Clone, Serialize)]
pub struct TileLayer {
    pub theme: MapTheme,
    pub name: &'static str,
    pub url: &'static str,
    pub attribution: &'static str,
}

impl MapTheme {
    pub const ALL: [MapTheme; 5] = [
        MapTheme::Default,
        MapTheme::Dark,
        MapTheme::Satellite,
        MapTheme::Terrain,
        MapTheme::Light,
    ];

    #[must_use]
    pub fn tile_layer(self) -> TileLayer {
        let (name, url, attribution) = match self {
            Self::Default => (
                "OpenStreetMap Default",
                "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
                OSM_ATTRIBUTION,
            ),
            Self::Dark => (
                "Dark Theme",
                "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
                CARTO_ATTRIBUTION,
            ),
            Self::Satellite => (
                "Satellite",
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
                "Tiles &copy; Esri &mdash; Source: Esri, i-cubed, USDA, USGS, AEX, GeoEye, Getmapping, Aerogrid, IGN, IGP, UPR-EGP, and the GIS User Community",
            ),
            Self::Terrain => (
                "Terrain",
                "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
                "Map data: &copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors, <a href=\"http://viewfinderpanoramas.org\">SRTM</a> | Map style: &copy; <a href=\"https://opentopomap.org\">OpenTopoMap</a>",
            ),
            Self::Light => (
                "Light Theme",
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
                CARTO_ATTRIBUTION,
            ),
        };
        TileLayer {
            theme: self,
            name,
            url,
            attribution,
        }
    }
}

impl FromStr for MapTheme {
    type Err = CarbonTripError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(Self::Default),
            "dark" => Ok(Self::Dark),
            "satellite" => Ok(Self::Satellite),
            "terrain" => Ok(Self::Terrain),
            "light" => Ok(Self::Light),
            other => Err(CarbonTripError::validation(format!("Unknown map theme '{other}'"))),
        }
    }
}

/// Marker colour for position `index` out of `total`
#[must_use]
pub fn sequence_color(index: usize, total: usize) -> String {
    if total <= 1 {
        return "blue".to_string();
    }
    let hue = index as f64 / (total - 1) as f64 * 120.0;
    format!("hsl({hue}, 100%, 50%)")
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    /// 1-based visiting order
    pub order: usize,
    pub position: [f64; 2],
    pub color: String,
    pub title: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Polyline {
    pub positions: [[f64; 2]; 2],
    pub color: String,
    pub weight: u32,
    pub opacity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash_array: Option<&'static str>,
}

impl Polyline {
    fn between(from: &City, to: &City, color: String) -> Self {
        Self {
            positions: [position(from), position(to)],
            color,
            weight: POLYLINE_WEIGHT,
            opacity: POLYLINE_OPACITY,
            dash_array: None,
        }
    }
}

/// South-west and north-east corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south_west: [f64; 2],
    pub north_east: [f64; 2],
}

impl Bounds {
    fn covering(points: &[[f64; 2]]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Bounds {
            south_west: *first,
            north_east: *first,
        };
        for [lat, lon] in rest {
            bounds.south_west[0] = bounds.south_west[0].min(*lat);
            bounds.south_west[1] = bounds.south_west[1].min(*lon);
            bounds.north_east[0] = bounds.north_east[0].max(*lat);
            bounds.north_east[1] = bounds.north_east[1].max(*lon);
        }
        Some(bounds)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: TileLayer,
    pub markers: Vec<Marker>,
    pub polylines: Vec<Polyline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    pub fit_padding: u32,
}

fn position(city: &City) -> [f64; 2] {
    [city.latitude, city.longitude]
}

/// Cities in visiting order: the first origin, every destination, then the
/// pending destination when it differs from the last stop.
#[must_use]
pub fn ordered_cities<'a>(
    segments: &'a [TripSegment],
    origin: Option<&'a City>,
    destination: Option<&'a City>,
) -> Vec<&'a City> {
    let mut cities = Vec::new();
    let Some(first) = segments.first() else {
        if let Some(origin) = origin {
            cities.push(origin);
            cities.extend(destination);
        }
        return cities;
    };

    cities.push(first.origin());
    cities.extend(segments.iter().map(TripSegment::destination));
    if let Some(destination) = destination
        && cities.last().map(|city| &city.name) != Some(&destination.name)
    {
        cities.push(destination);
    }
    cities
}

/// Build the map view for a trip and the pair currently being planned
#[must_use]
pub fn build_map_view(
    segments: &[TripSegment],
    origin: Option<&City>,
    destination: Option<&City>,
    theme: MapTheme,
) -> MapView {
    let cities = ordered_cities(segments, origin, destination);
    let markers = cities
        .iter()
        .enumerate()
        .map(|(index, city)| Marker {
            order: index + 1,
            position: position(city),
            color: sequence_color(index, cities.len()),
            title: format!("{}. {}", index + 1, city.name),
            subtitle: match &city.state {
                Some(state) => format!("{}, {}", city.country, state),
                None => city.country.clone(),
            },
        })
        .collect();

    let mut polylines: Vec<Polyline> = segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            Polyline::between(
                segment.origin(),
                segment.destination(),
                sequence_color(index, segments.len()),
            )
        })
        .collect();
    if let (Some(origin), Some(destination)) = (origin, destination) {
        let mut pending = Polyline::between(
            origin,
            destination,
            sequence_color(segments.len(), segments.len() + 1),
        );
        pending.dash_array = Some(PENDING_DASH);
        polylines.push(pending);
    }

    let mut points: Vec<[f64; 2]> = segments
        .iter()
        .flat_map(|segment| [position(segment.origin()), position(segment.destination())])
        .collect();
    points.extend(origin.map(position));
    points.extend(destination.map(position));
    let bounds = if segments.is_empty() && (origin.is_none() || destination.is_none()) {
        None
    } else {
        Bounds::covering(&points)
    };

    MapView {
        center: [DEFAULT_CENTER.0, DEFAULT_CENTER.1],
        zoom: DEFAULT_ZOOM,
        tiles: theme.tile_layer(),
        markers,
        polylines,
        bounds,
        fit_padding: FIT_PADDING,
    }
}
