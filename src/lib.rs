//! GPX track analysis: parse a GPX document into a flat point sequence and
//! derive activity statistics (distance, duration, speeds, elevation gain).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub mod elevation;
mod error;
pub mod gpxxml;
mod summary;
pub mod units;

pub use elevation::{SmoothingConfig, compute_elevation_gain, naive_elevation_gain};
pub use error::GpxError;
pub use gpxxml::parse_gpx;
pub use summary::{ActivitySummary, analyze, parse_and_analyze};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    /// Meters. Points without an `<ele>` element carry 0.0.
    pub elevation: f64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub time: Option<OffsetDateTime>,
}

impl TrackPoint {
    pub fn new(lat: f64, lon: f64, elevation: f64, time: Option<OffsetDateTime>) -> Self {
        Self {
            lat,
            lon,
            elevation,
            time,
        }
    }
}

/// All track points of a GPX file in document order, segments and tracks
/// concatenated. The point sequence cannot be modified once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    name: String,
    points: Vec<TrackPoint>,
}

impl Track {
    pub fn new(name: impl Into<String>, points: Vec<TrackPoint>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Endpoints and elevation extremes, or `None` for a track without points.
    pub fn stats(&self) -> Option<TrackStats> {
        let first = self.points.first()?;
        let last = self.points.last()?;

        let (min_elevation, max_elevation) = self.points.iter().fold(
            (first.elevation, first.elevation),
            |(lo, hi), p| (lo.min(p.elevation), hi.max(p.elevation)),
        );

        Some(TrackStats {
            start_lat: first.lat,
            start_lon: first.lon,
            end_lat: last.lat,
            end_lon: last.lon,
            total_points: self.points.len(),
            min_elevation,
            max_elevation,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackStats {
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    pub total_points: usize,
    pub min_elevation: f64,
    pub max_elevation: f64,
}

/// Great-circle distance in meters between two coordinates on a spherical
/// Earth of radius 6 371 km (haversine formula, no ellipsoidal correction).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    // a = sin²(Δφ/2) + cos φ1 ⋅ cos φ2 ⋅ sin²(Δλ/2)
    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);

    // c = 2 ⋅ atan2(√a, √(1−a))
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

pub fn point_distance(p1: &TrackPoint, p2: &TrackPoint) -> f64 {
    haversine_distance(p1.lat, p1.lon, p2.lat, p2.lon)
}

/// Speed in km/h between two consecutive points.
///
/// Returns `None` when either point lacks a timestamp or when the time delta
/// is not strictly positive; such pairs still count towards distance.
pub fn pairwise_speed_kmh(p1: &TrackPoint, p2: &TrackPoint) -> Option<f64> {
    let (t1, t2) = (p1.time?, p2.time?);
    let seconds = (t2 - t1).as_seconds_f64();

    if seconds > 0.0 {
        Some(point_distance(p1, p2) / seconds * 3.6)
    } else {
        None
    }
}
