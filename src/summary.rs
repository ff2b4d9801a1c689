use crate::elevation::{SmoothingConfig, compute_elevation_gain};
use crate::{GpxError, Track, pairwise_speed_kmh, parse_gpx, point_distance};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub name: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub duration_secs: i64,
    pub distance_m: f64,
    pub elevation_gain_m: f64,
    pub max_speed_kmh: f64,
    /// Mean of the pairwise speeds, not distance over duration.
    pub avg_speed_kmh: f64,
    pub total_points: usize,
}

/// Derives the activity statistics of a parsed track.
///
/// Distance sums the haversine length of every consecutive pair. Speeds are
/// only taken between timed pairs moving forward in time. The time span runs
/// from the earliest to the latest timestamp anywhere in the track, so
/// out-of-order points still yield the full span.
pub fn analyze(track: &Track, config: &SmoothingConfig) -> ActivitySummary {
    let points = track.points();

    let mut distance_m = 0.0;
    let mut speeds = Vec::new();

    for pair in points.windows(2) {
        distance_m += point_distance(&pair[0], &pair[1]);
        if let Some(speed) = pairwise_speed_kmh(&pair[0], &pair[1]) {
            speeds.push(speed);
        }
    }

    let times = points.iter().filter_map(|p| p.time);
    let start_time = times.clone().min();
    let end_time = times.max();

    let duration_secs = match (start_time, end_time) {
        (Some(start), Some(end)) => (end - start).whole_seconds(),
        _ => 0,
    };

    let max_speed_kmh = speeds.iter().copied().fold(0.0, f64::max);
    let avg_speed_kmh = if speeds.is_empty() {
        0.0
    } else {
        speeds.iter().sum::<f64>() / speeds.len() as f64
    };

    let elevation_gain_m = compute_elevation_gain(points, config);

    debug!(
        points = points.len(),
        speed_samples = speeds.len(),
        distance_m,
        elevation_gain_m,
        "analyzed track"
    );

    ActivitySummary {
        name: track.name().to_string(),
        start_time,
        end_time,
        duration_secs,
        distance_m,
        elevation_gain_m,
        max_speed_kmh,
        avg_speed_kmh,
        total_points: points.len(),
    }
}

/// Parses `input` and analyzes it in one call. `None` uses
/// [`SmoothingConfig::default`].
pub fn parse_and_analyze(
    input: &[u8],
    config: Option<&SmoothingConfig>,
) -> Result<(Track, ActivitySummary), GpxError> {
    let track = parse_gpx(input)?;
    let summary = analyze(&track, &config.copied().unwrap_or_default());
    Ok((track, summary))
}
