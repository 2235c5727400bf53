//! End-to-end variation computation for a postal code.

use heatmap_density_models::{DateRange, TileSet, VariationSeries, WeekdayBaseline};
use heatmap_source::{DensitySource, TileSampling};
use serde::Serialize;

use crate::AnalyticsError;
use crate::baseline::compute_baseline;
use crate::fetch::FetchPlan;
use crate::variation::compute_variation_series;

/// Everything produced by one [`density_variation`] run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationReport {
    /// Postal code the tiles were sampled from.
    pub postal_code: String,
    /// The tile set every request of the run used.
    pub tiles: TileSet,
    /// Historical window of the baseline.
    pub baseline_window: DateRange,
    /// Per-weekday expected density.
    pub baseline: WeekdayBaseline,
    /// Range the variation was computed for.
    pub target: DateRange,
    /// Daily variation over `target`.
    pub series: VariationSeries,
}

/// Resolves the tiles of `postal_code` once, computes their weekday
/// baseline over `baseline_window`, then the variation series over
/// `target`.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if tile resolution, the baseline, or any
/// variation step fails.
pub async fn density_variation<S>(
    source: &S,
    postal_code: &str,
    sampling: TileSampling,
    baseline_window: DateRange,
    target: DateRange,
    plan: &FetchPlan,
) -> Result<VariationReport, AnalyticsError>
where
    S: DensitySource + ?Sized,
{
    let tiles = source
        .resolve_tiles_for_postal_code(postal_code, sampling)
        .await?;

    let baseline = compute_baseline(source, &tiles, baseline_window, plan).await?;
    let series = compute_variation_series(source, &tiles, &baseline, target, plan).await?;

    if let Some((lo, hi)) = series.range() {
        log::info!(
            "Postal code {postal_code}: variation over {target} ranges from {lo:.1}% to {hi:.1}%"
        );
    }

    Ok(VariationReport {
        postal_code: postal_code.to_string(),
        tiles,
        baseline_window,
        baseline,
        target,
        series,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike as _, NaiveDate, Weekday};
    use heatmap_density_models::TimeBucket;

    use super::*;
    use crate::test_support::FakeSource;

    #[tokio::test]
    async fn weekend_drop_shows_as_negative_variation() {
        // Weekdays 100, weekends 40 during the baseline; from February on
        // every day reads 80.
        let switch = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
        let source = FakeSource::new(move |at: TimeBucket| {
            let date = at.date();
            if date >= switch {
                Ok(80.0)
            } else if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                Ok(40.0)
            } else {
                Ok(100.0)
            }
        });

        let report = density_variation(
            &source,
            "1215",
            TileSampling {
                max_count: 100,
                seed: Some(5),
            },
            DateRange::new(NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(), 29),
            DateRange::new(switch, 14),
            &FetchPlan::sequential(),
        )
        .await
        .unwrap();

        assert_eq!(report.tiles.len(), 100);
        assert_eq!(report.baseline.expected(Weekday::Sat), Some(40.0));
        assert_eq!(report.baseline.expected(Weekday::Wed), Some(100.0));
        assert_eq!(report.series.len(), 14);
        assert_eq!(source.calls(), 29 + 14);

        for point in &report.series {
            let expected = if matches!(point.date.weekday(), Weekday::Sat | Weekday::Sun) {
                100.0
            } else {
                -20.0
            };
            assert!((point.variation - expected).abs() < 1e-9, "{}", point.date);
        }
    }

    #[tokio::test]
    async fn short_baseline_fails_with_lookup_error() {
        let source = FakeSource::new(|_| Ok(10.0));
        let result = density_variation(
            &source,
            "1003",
            TileSampling {
                max_count: 10,
                seed: None,
            },
            DateRange::new(NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(), 5),
            DateRange::new(NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(), 7),
            &FetchPlan::sequential(),
        )
        .await;

        assert!(matches!(result, Err(AnalyticsError::MissingWeekday { .. })));
        assert_eq!(source.calls(), 5);
    }
}
