use crate::OutputFormat;
use crate::commands::input::{input_path, read_input};
use gpxstats::{Track, TrackPoint, TrackStats, parse_gpx};
use serde::Serialize;
use std::error::Error;
use std::io::{self, Write};
use std::path::Path;

#[derive(Serialize)]
struct TrackReport<'a> {
    name: &'a str,
    stats: Option<TrackStats>,
    points: &'a [TrackPoint],
}

pub fn track_command(file: Option<&Path>, format: OutputFormat) -> Result<(), Box<dyn Error>> {
    let input = read_input(file.and_then(input_path))?;
    let track = parse_gpx(&input)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Json => {
            let report = TrackReport {
                name: track.name(),
                stats: track.stats(),
                points: track.points(),
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
        OutputFormat::Text => write!(out, "{}", render_text(&track))?,
    }

    Ok(())
}

fn render_text(track: &Track) -> String {
    let mut text = format!("Name:      {}\n", track.name());

    match track.stats() {
        Some(stats) => {
            text.push_str(&format!("Points:    {}\n", stats.total_points));
            text.push_str(&format!(
                "Start:     {:.6}, {:.6}\n",
                stats.start_lat, stats.start_lon
            ));
            text.push_str(&format!("End:       {:.6}, {:.6}\n", stats.end_lat, stats.end_lon));
            text.push_str(&format!(
                "Elevation: {:.0} m to {:.0} m\n",
                stats.min_elevation, stats.max_elevation
            ));
        }
        None => text.push_str("Points:    0\n"),
    }

    text
}
