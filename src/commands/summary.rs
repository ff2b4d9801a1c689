use crate::OutputFormat;
use crate::commands::input::{display_name, input_path, read_input};
use gpxstats::units::{UnitSystem, format_duration};
use gpxstats::{ActivitySummary, SmoothingConfig, parse_and_analyze};
use serde::Serialize;
use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

#[derive(Serialize)]
struct FileSummary {
    file: String,
    #[serde(flatten)]
    summary: ActivitySummary,
}

pub fn summary_command(
    files: &[PathBuf],
    config: &SmoothingConfig,
    format: OutputFormat,
    units: UnitSystem,
) -> Result<(), Box<dyn Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if files.len() <= 1 {
        let path = files.first().and_then(|p| input_path(p));
        let summary = summarize(path, config)?;
        match format {
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?,
            OutputFormat::Text => write!(out, "{}", render_text(&summary, units)?)?,
        }
        return Ok(());
    }

    let mut reports = Vec::new();
    let mut errors = 0;

    for path in files {
        let path = input_path(path);
        let file = display_name(path);
        match summarize(path, config) {
            Ok(summary) => reports.push(FileSummary { file, summary }),
            Err(e) => {
                warn!(file = %file, error = %e, "skipping file");
                errors += 1;
            }
        }
    }

    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&reports)?)?,
        OutputFormat::Text => {
            for (i, report) in reports.iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                writeln!(out, "== {} ==", report.file)?;
                write!(out, "{}", render_text(&report.summary, units)?)?;
            }
        }
    }

    info!(analyzed = reports.len(), errors, "batch finished");
    eprintln!("Analyzed {} file(s), {} error(s)", reports.len(), errors);

    if reports.is_empty() {
        return Err("none of the input files could be analyzed".into());
    }

    Ok(())
}

fn summarize(path: Option<&Path>, config: &SmoothingConfig) -> Result<ActivitySummary, Box<dyn Error>> {
    let input = read_input(path)?;
    let (_, summary) = parse_and_analyze(&input, Some(config))?;
    Ok(summary)
}

fn render_text(summary: &ActivitySummary, units: UnitSystem) -> Result<String, Box<dyn Error>> {
    let (distance, distance_unit) = units.distance(summary.distance_m);
    let (gain, gain_unit) = units.elevation(summary.elevation_gain_m);
    let (max_speed, speed_unit) = units.speed(summary.max_speed_kmh);
    let (avg_speed, _) = units.speed(summary.avg_speed_kmh);

    let name = if summary.name.is_empty() {
        "(unnamed)"
    } else {
        summary.name.as_str()
    };

    let mut text = String::new();
    text.push_str(&format!("Name:           {name}\n"));
    text.push_str(&format!("Start:          {}\n", format_time(summary.start_time)?));
    text.push_str(&format!("End:            {}\n", format_time(summary.end_time)?));
    text.push_str(&format!("Duration:       {}\n", format_duration(summary.duration_secs)));
    text.push_str(&format!("Distance:       {distance:.2} {distance_unit}\n"));
    text.push_str(&format!("Elevation gain: {gain:.1} {gain_unit}\n"));
    text.push_str(&format!("Max speed:      {max_speed:.1} {speed_unit}\n"));
    text.push_str(&format!("Avg speed:      {avg_speed:.1} {speed_unit}\n"));
    text.push_str(&format!("Points:         {}\n", summary.total_points));
    Ok(text)
}

fn format_time(time: Option<OffsetDateTime>) -> Result<String, Box<dyn Error>> {
    match time {
        Some(t) => Ok(t.format(&Rfc3339)?),
        None => Ok("-".to_string()),
    }
}
