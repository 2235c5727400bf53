//! Percentage deviation of observed density from the weekday baseline.
//!
//! Positive values mean the day was busier than a typical day of the same
//! weekday, negative values quieter.

use chrono::{Datelike as _, NaiveDate};
use heatmap_density_models::{
    DateRange, TileSet, TimeBucket, VariationPoint, VariationSeries, WeekdayBaseline,
};
use heatmap_source::DensitySource;

use crate::AnalyticsError;
use crate::fetch::{FetchPlan, observe_all};
use crate::range_dates;

/// Looks up the non-zero expected density for `date`'s weekday.
///
/// # Errors
///
/// * [`AnalyticsError::MissingWeekday`] if the weekday was never sampled.
/// * [`AnalyticsError::ZeroBaseline`] if its baseline is zero.
#[allow(clippy::float_cmp)]
pub fn expected_for(baseline: &WeekdayBaseline, date: NaiveDate) -> Result<f64, AnalyticsError> {
    let weekday = date.weekday();
    let expected = baseline
        .expected(weekday)
        .ok_or(AnalyticsError::MissingWeekday { date, weekday })?;

    if expected == 0.0 {
        return Err(AnalyticsError::ZeroBaseline { date, weekday });
    }
    Ok(expected)
}

/// Builds the variation point for `date` from an observed density.
///
/// `variation = 100 * (observed - expected) / expected`.
///
/// # Errors
///
/// See [`expected_for`].
pub fn variation_point(
    baseline: &WeekdayBaseline,
    date: NaiveDate,
    observed: f64,
) -> Result<VariationPoint, AnalyticsError> {
    let expected = expected_for(baseline, date)?;
    Ok(VariationPoint {
        date,
        observed,
        expected,
        variation: 100.0 * (observed - expected) / expected,
    })
}

/// Computes the variation of `tiles` on `date` against `baseline`.
///
/// # Errors
///
/// * [`AnalyticsError::Source`] if the density request fails.
/// * [`AnalyticsError::MissingWeekday`] / [`AnalyticsError::ZeroBaseline`]
///   if the baseline has no usable value for the date's weekday.
pub async fn compute_variation<S>(
    source: &S,
    tiles: &TileSet,
    baseline: &WeekdayBaseline,
    date: NaiveDate,
) -> Result<VariationPoint, AnalyticsError>
where
    S: DensitySource + ?Sized,
{
    let observed = source.observe_density(tiles, TimeBucket::Day(date)).await?;
    variation_point(baseline, date, observed)
}

/// Computes the variation for every day of `range`, in date order.
///
/// The baseline is checked for every weekday in the range before any
/// request is issued, so a baseline that cannot serve the range fails
/// without network traffic. Each day is then fetched once.
///
/// # Errors
///
/// * [`AnalyticsError::InvalidWindow`] if `range` runs past the last
///   representable date.
/// * [`AnalyticsError::MissingWeekday`] / [`AnalyticsError::ZeroBaseline`]
///   for the first day the baseline cannot serve.
/// * [`AnalyticsError::Source`] if any density request fails.
pub async fn compute_variation_series<S>(
    source: &S,
    tiles: &TileSet,
    baseline: &WeekdayBaseline,
    range: DateRange,
    plan: &FetchPlan,
) -> Result<VariationSeries, AnalyticsError>
where
    S: DensitySource + ?Sized,
{
    let dates = range_dates(range)?;
    for date in &dates {
        expected_for(baseline, *date)?;
    }

    log::info!("Computing variation over {range} for {} tiles", tiles.len());
    plan.progress.set_message("Variation".to_string());

    let buckets: Vec<TimeBucket> = dates.into_iter().map(TimeBucket::Day).collect();
    let observations = observe_all(source, tiles, buckets, plan).await?;

    let points = observations
        .into_iter()
        .map(|obs| variation_point(baseline, obs.at.date(), obs.density))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(VariationSeries::new(points))
}
