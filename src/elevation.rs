//! Elevation gain, raw and smoothed.
//!
//! Raw GPS and barometric altitudes are noisy, so summing every positive
//! step overcounts climbing. The smoothed method runs a centered moving
//! average over the elevations and then only counts steps that rise by more
//! than a fixed threshold.

use crate::TrackPoint;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Window used when the configured one is smaller than a single point.
pub const MIN_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    pub enabled: bool,
    /// Moving-average width in points. Values below 1 fall back to [`MIN_WINDOW`].
    pub window: i64,
    /// Smoothed steps must rise by strictly more than this to count, in meters.
    pub min_gain_m: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 5,
            min_gain_m: 1.0,
        }
    }
}

impl SmoothingConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn effective_window(&self) -> usize {
        if self.window < 1 {
            debug!(window = self.window, "smoothing window below 1, using {}", MIN_WINDOW);
            MIN_WINDOW
        } else {
            usize::try_from(self.window).unwrap_or(usize::MAX)
        }
    }
}

/// Total elevation gain in meters.
///
/// Falls back to [`naive_elevation_gain`] when smoothing is disabled or the
/// track has fewer than two points.
pub fn compute_elevation_gain(points: &[TrackPoint], config: &SmoothingConfig) -> f64 {
    if !config.enabled || points.len() < 2 {
        debug!(points = points.len(), "using naive elevation gain");
        return naive_elevation_gain(points);
    }

    let window = config.effective_window();
    debug!(
        points = points.len(),
        window,
        min_gain_m = config.min_gain_m,
        "using smoothed elevation gain"
    );

    let elevations: Vec<f64> = points.iter().map(|p| p.elevation).collect();
    let smoothed = smooth_elevations(&elevations, window);
    threshold_gain(&smoothed, config.min_gain_m)
}

/// Sum of every positive step between consecutive raw elevations.
pub fn naive_elevation_gain(points: &[TrackPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[1].elevation - pair[0].elevation)
        .filter(|delta| *delta > 0.0)
        .sum()
}

/// Centered moving average over `elevations`.
///
/// Point `i` averages the indices `i - window/2 ..= i + window/2`, truncated
/// at both ends of the sequence. The result has the same length as the input.
pub fn smooth_elevations(elevations: &[f64], window: usize) -> Vec<f64> {
    let half = window.max(1) / 2;
    let last = elevations.len().saturating_sub(1);

    (0..elevations.len())
        .map(|i| {
            let span = &elevations[i.saturating_sub(half)..=i.saturating_add(half).min(last)];
            span.iter().sum::<f64>() / span.len() as f64
        })
        .collect()
}

/// Sums each consecutive rise strictly above `min_gain_m`, counting the full
/// step. Steps are judged independently; there is no run tracking.
pub fn threshold_gain(elevations: &[f64], min_gain_m: f64) -> f64 {
    elevations
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|delta| *delta > min_gain_m)
        .sum()
}
