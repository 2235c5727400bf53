//! Weekday baseline estimation.
//!
//! The expected density for a weekday is the median of every observation
//! on that weekday within a historical window. The median keeps a single
//! holiday or a glitchy API day from skewing the baseline.

use std::collections::HashMap;

use chrono::Weekday;
use heatmap_density_models::{
    DateRange, DensityObservation, TileSet, TimeBucket, WeekdayBaseline, WeekdayStat,
};
use heatmap_source::DensitySource;

use crate::AnalyticsError;
use crate::fetch::{FetchPlan, observe_all};
use crate::range_dates;
use crate::stats::median;

/// Reduces observations to a per-weekday median.
///
/// Only weekdays that occur in `observations` get an entry; nothing is
/// interpolated for the others.
#[must_use]
pub fn baseline_from_observations(observations: &[DensityObservation]) -> WeekdayBaseline {
    let mut by_weekday: HashMap<Weekday, Vec<f64>> = HashMap::new();
    for observation in observations {
        by_weekday
            .entry(observation.at.weekday())
            .or_default()
            .push(observation.density);
    }

    WeekdayBaseline::new(by_weekday.into_iter().filter_map(|(weekday, mut values)| {
        let samples = values.len();
        median(&mut values).map(|expected| (weekday, WeekdayStat { expected, samples }))
    }))
}

/// Computes the weekday baseline of `tiles` over `window`.
///
/// Issues one daily density request per day of the window. Any failed
/// request fails the whole computation; days are never skipped, since a
/// missing sample would bias the median.
///
/// # Errors
///
/// * [`AnalyticsError::InvalidWindow`] if the window is empty or runs
///   past the last representable date.
/// * [`AnalyticsError::Source`] if any density request fails.
pub async fn compute_baseline<S>(
    source: &S,
    tiles: &TileSet,
    window: DateRange,
    plan: &FetchPlan,
) -> Result<WeekdayBaseline, AnalyticsError>
where
    S: DensitySource + ?Sized,
{
    if window.days == 0 {
        return Err(AnalyticsError::InvalidWindow {
            message: format!("baseline window starting {} has no days", window.start),
        });
    }
    if window.days < 7 {
        log::warn!(
            "Baseline window {window} is shorter than a week; some weekdays will have no baseline"
        );
    }

    log::info!("Computing baseline over {window} for {} tiles", tiles.len());
    plan.progress.set_message("Baseline".to_string());

    let buckets: Vec<TimeBucket> = range_dates(window)?
        .into_iter()
        .map(TimeBucket::Day)
        .collect();
    let observations = observe_all(source, tiles, buckets, plan).await?;
    let baseline = baseline_from_observations(&observations);

    for (weekday, stat) in baseline.iter() {
        log::debug!(
            "Baseline {weekday}: median {} over {} samples",
            stat.expected,
            stat.samples
        );
    }

    Ok(baseline)
}
