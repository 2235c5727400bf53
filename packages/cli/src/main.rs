#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the heatmap density tool.
//!
//! Resolves a tile set for a postal code, computes its weekday baseline
//! over a historical window, and reports the daily percentage variation
//! over a target range. Output is a table, CSV or JSON for charting
//! elsewhere.

mod output;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use heatmap_analytics::baseline::compute_baseline;
use heatmap_analytics::fetch::FetchPlan;
use heatmap_analytics::hourly::compute_hourly_density;
use heatmap_analytics::pipeline::density_variation;
use heatmap_cli_utils::PhaseProgress;
use heatmap_density_models::{DateRange, TileSet};
use heatmap_source::DensitySource;
use heatmap_source::TileSampling;
use heatmap_source::client::HeatmapClient;
use heatmap_source::config::{HeatmapConfig, QueryConfig};
use heatmap_source::query::TileListStyle;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "heatmap_cli",
    about = "Heatmap density baseline and variation tool"
)]
struct Cli {
    /// TOML config file (defaults to `heatmap.toml`, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    query: QueryArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Overrides for the `[query]` and `[api]` config tables.
#[derive(Args)]
struct QueryArgs {
    /// Postal code whose tiles are sampled
    #[arg(long, global = true)]
    postal_code: Option<String>,
    /// Maximum number of tiles per density request
    #[arg(long, global = true)]
    max_tiles: Option<usize>,
    /// Seed for reproducible tile sampling
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Density requests in flight at once (1 = sequential)
    #[arg(long, global = true)]
    concurrency: Option<usize>,
    /// How tile ids are encoded in density queries (`repeated` or `comma`)
    #[arg(long, global = true, value_parser = parse_tile_list_style)]
    tile_list_style: Option<TileListStyle>,
}

/// Where and how to write results.
#[derive(Args)]
struct OutputArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
    /// Write to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample and print the tile ids covering the postal code
    Tiles {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Compute the per-weekday median density over the baseline window
    Baseline {
        /// First day of the baseline window (overrides `baseline.start`)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Length of the baseline window in days (overrides `baseline.days`)
        #[arg(long)]
        days: Option<u32>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Compute the daily variation from the weekday baseline (default)
    Variation {
        /// First day of the baseline window (overrides `baseline.start`)
        #[arg(long)]
        baseline_start: Option<NaiveDate>,
        /// Length of the baseline window in days (overrides `baseline.days`)
        #[arg(long)]
        baseline_days: Option<u32>,
        /// First day of the target range (overrides `target.start`)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Length of the target range in days (overrides `target.days`)
        #[arg(long)]
        days: Option<u32>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Observe the density hour by hour
    Hourly {
        /// First hour, e.g. `2020-01-27T00:00:00`
        #[arg(long)]
        start: NaiveDateTime,
        /// Number of hours
        #[arg(long, default_value = "24")]
        hours: u32,
        #[command(flatten)]
        output: OutputArgs,
    },
}

impl QueryArgs {
    fn apply(self, config: &mut HeatmapConfig) {
        if let Some(postal_code) = self.postal_code {
            config.query.postal_code = postal_code;
        }
        if let Some(max_tiles) = self.max_tiles {
            config.query.max_tiles = max_tiles;
        }
        if let Some(seed) = self.seed {
            config.query.seed = Some(seed);
        }
        if let Some(concurrency) = self.concurrency {
            config.query.concurrency = concurrency;
        }
        if let Some(style) = self.tile_list_style {
            config.api.tile_list_style = style;
        }
    }
}

/// Seed used by `hourly` when none is configured, so that repeated hourly
/// runs for a postal code observe the same tiles.
const HOURLY_DEFAULT_SEED: u64 = 0;

fn hourly_sampling(query: &QueryConfig) -> TileSampling {
    TileSampling {
        seed: query.seed.or(Some(HOURLY_DEFAULT_SEED)),
        ..query.sampling()
    }
}

fn parse_tile_list_style(value: &str) -> Result<TileListStyle, String> {
    value
        .parse()
        .map_err(|_| format!("unknown tile list style `{value}` (expected `repeated` or `comma`)"))
}

fn override_range(range: &mut DateRange, start: Option<NaiveDate>, days: Option<u32>) {
    if let Some(start) = start {
        range.start = start;
    }
    if let Some(days) = days {
        range.days = days;
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, std::io::Error> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    })
}

async fn resolve_tiles(
    client: &HeatmapClient,
    config: &HeatmapConfig,
    sampling: TileSampling,
) -> Result<TileSet, Box<dyn std::error::Error>> {
    Ok(client
        .resolve_tiles_for_postal_code(&config.query.postal_code, sampling)
        .await?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = heatmap_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = HeatmapConfig::load(cli.config.as_deref())?;
    cli.query.apply(&mut config);

    let command = cli.command.unwrap_or(Commands::Variation {
        baseline_start: None,
        baseline_days: None,
        start: None,
        days: None,
        output: OutputArgs {
            format: OutputFormat::Table,
            output: None,
        },
    });

    match &command {
        Commands::Baseline { start, days, .. } => {
            override_range(&mut config.baseline, *start, *days);
        }
        Commands::Variation {
            baseline_start,
            baseline_days,
            start,
            days,
            ..
        } => {
            override_range(&mut config.baseline, *baseline_start, *baseline_days);
            override_range(&mut config.target, *start, *days);
        }
        Commands::Tiles { .. } | Commands::Hourly { .. } => {}
    }
    config.validate()?;

    let credentials = config.api.credentials()?;
    let client = HeatmapClient::connect(&config.api, credentials).await?;

    let plan = FetchPlan::sequential()
        .with_concurrency(config.query.concurrency)
        .with_progress(PhaseProgress::new(&multi));

    match command {
        Commands::Tiles { output } => {
            let tiles = resolve_tiles(&client, &config, config.query.sampling()).await?;
            let out = open_output(output.output.as_deref())?;
            output::write_tiles(out, &tiles, output.format)?;
        }
        Commands::Baseline { output, .. } => {
            let tiles = resolve_tiles(&client, &config, config.query.sampling()).await?;
            let baseline = compute_baseline(&client, &tiles, config.baseline, &plan).await?;
            let out = open_output(output.output.as_deref())?;
            output::write_baseline(out, &baseline, output.format)?;
        }
        Commands::Variation { output, .. } => {
            let report = density_variation(
                &client,
                &config.query.postal_code,
                config.query.sampling(),
                config.baseline,
                config.target,
                &plan,
            )
            .await?;
            let out = open_output(output.output.as_deref())?;
            output::write_series(out, &report.series, output.format)?;
            if let Some(path) = &output.output {
                log::info!("Wrote {} days to {}", report.series.len(), path.display());
            }
        }
        Commands::Hourly {
            start,
            hours,
            output,
        } => {
            let tiles = resolve_tiles(&client, &config, hourly_sampling(&config.query)).await?;
            let observations =
                compute_hourly_density(&client, &tiles, start, hours, &plan).await?;
            let out = open_output(output.output.as_deref())?;
            output::write_observations(out, &observations, output.format)?;
        }
    }

    Ok(())
}
