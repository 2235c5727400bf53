//! Rendering of results as a terminal table, CSV, or JSON.
//!
//! CSV and JSON are meant for downstream charting; the table is for
//! reading in a terminal.

use std::io::Write;

use clap::ValueEnum;
use heatmap_density_models::{DensityObservation, TileSet, VariationSeries, WeekdayBaseline};
use serde::Serialize;

/// Output encoding selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns for the terminal.
    Table,
    /// Comma-separated values with a header row.
    Csv,
    /// Pretty-printed JSON.
    Json,
}

#[derive(Serialize)]
struct BaselineRow<'a> {
    weekday: u32,
    name: &'a str,
    samples: usize,
    expected: f64,
}

fn baseline_rows(baseline: &WeekdayBaseline) -> Vec<BaselineRow<'static>> {
    baseline
        .iter()
        .map(|(weekday, stat)| BaselineRow {
            weekday: weekday.num_days_from_monday(),
            name: weekday_name(weekday),
            samples: stat.samples,
            expected: stat.expected,
        })
        .collect()
}

const fn weekday_name(weekday: chrono::Weekday) -> &'static str {
    match weekday {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}

fn write_csv<W: Write, T: Serialize>(
    out: W,
    rows: impl IntoIterator<Item = T>,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes a variation series.
///
/// # Errors
///
/// Returns an error if writing or serialization fails.
pub fn write_series<W: Write>(
    mut out: W,
    series: &VariationSeries,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Table => {
            writeln!(out, "{:<12} {:>14} {:>14} {:>10}", "DATE", "OBSERVED", "EXPECTED", "VAR %")?;
            writeln!(out, "{}", "-".repeat(53))?;
            for point in series {
                writeln!(
                    out,
                    "{:<12} {:>14.2} {:>14.2} {:>+10.1}",
                    point.date.to_string(),
                    point.observed,
                    point.expected,
                    point.variation
                )?;
            }
        }
        OutputFormat::Csv => write_csv(out, series.iter())?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, series)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Writes a weekday baseline.
///
/// # Errors
///
/// Returns an error if writing or serialization fails.
pub fn write_baseline<W: Write>(
    mut out: W,
    baseline: &WeekdayBaseline,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let rows = baseline_rows(baseline);
    match format {
        OutputFormat::Table => {
            writeln!(out, "{:<10} {:>8} {:>14}", "WEEKDAY", "SAMPLES", "MEDIAN")?;
            writeln!(out, "{}", "-".repeat(34))?;
            for row in &rows {
                writeln!(out, "{:<10} {:>8} {:>14.2}", row.name, row.samples, row.expected)?;
            }
        }
        OutputFormat::Csv => write_csv(out, &rows)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &rows)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Writes an hourly density series.
///
/// # Errors
///
/// Returns an error if writing or serialization fails.
pub fn write_observations<W: Write>(
    mut out: W,
    observations: &[DensityObservation],
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Table => {
            writeln!(out, "{:<20} {:>14}", "TIME", "DENSITY")?;
            writeln!(out, "{}", "-".repeat(35))?;
            for obs in observations {
                writeln!(out, "{:<20} {:>14.2}", obs.at.to_string(), obs.density)?;
            }
        }
        OutputFormat::Csv => write_csv(out, observations)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, observations)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Writes the sampled tile ids.
///
/// # Errors
///
/// Returns an error if writing or serialization fails.
pub fn write_tiles<W: Write>(
    mut out: W,
    tiles: &TileSet,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Table | OutputFormat::Csv => {
            if format == OutputFormat::Csv {
                writeln!(out, "tileId")?;
            }
            for id in tiles {
                writeln!(out, "{id}")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, tiles)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
