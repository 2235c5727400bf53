//! Hourly density series.

use chrono::{NaiveDateTime, TimeDelta, Timelike as _};
use heatmap_density_models::{DensityObservation, TileSet, TimeBucket};
use heatmap_source::DensitySource;

use crate::AnalyticsError;
use crate::fetch::{FetchPlan, observe_all};

/// Observes the density of `tiles` for `hours` consecutive hours starting
/// at `start`, in chronological order.
///
/// `start` is truncated to the full hour.
///
/// # Errors
///
/// * [`AnalyticsError::InvalidWindow`] if `start` cannot be truncated or
///   the range overflows the calendar.
/// * [`AnalyticsError::Source`] if any density request fails.
pub async fn compute_hourly_density<S>(
    source: &S,
    tiles: &TileSet,
    start: NaiveDateTime,
    hours: u32,
    plan: &FetchPlan,
) -> Result<Vec<DensityObservation>, AnalyticsError>
where
    S: DensitySource + ?Sized,
{
    let start = start
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .ok_or_else(|| AnalyticsError::InvalidWindow {
            message: format!("cannot truncate {start} to the hour"),
        })?;

    let buckets = (0..i64::from(hours))
        .map(|offset| {
            start
                .checked_add_signed(TimeDelta::hours(offset))
                .map(TimeBucket::Hour)
                .ok_or_else(|| AnalyticsError::InvalidWindow {
                    message: format!("{hours} hours after {start} is out of range"),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::info!(
        "Observing hourly density from {start} for {hours} hours over {} tiles",
        tiles.len()
    );
    plan.progress.set_message("Hourly density".to_string());

    Ok(observe_all(source, tiles, buckets, plan).await?)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Timelike as _};

    use super::*;
    use crate::test_support::{FakeSource, tiles};

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn one_observation_per_hour() {
        let source = FakeSource::new(|bucket| match bucket {
            TimeBucket::Hour(t) => Ok(f64::from(t.hour())),
            TimeBucket::Day(_) => Ok(-1.0),
        });
        let plan = FetchPlan::sequential();
        let series = compute_hourly_density(&source, &tiles(), at(27, 0, 0), 24, &plan)
            .await
            .unwrap();

        assert_eq!(series.len(), 24);
        for (hour, obs) in (0u32..).zip(&series) {
            assert_eq!(obs.at, TimeBucket::Hour(at(27, hour, 0)));
            assert!((obs.density - f64::from(hour)).abs() < f64::EPSILON);
        }
    }

    #[tokio::test]
    async fn crosses_midnight_and_truncates_start() {
        let source = FakeSource::new(|_| Ok(1.0));
        let plan = FetchPlan::sequential();
        let series = compute_hourly_density(&source, &tiles(), at(27, 22, 45), 4, &plan)
            .await
            .unwrap();

        let buckets: Vec<TimeBucket> = series.iter().map(|o| o.at).collect();
        assert_eq!(
            buckets,
            vec![
                TimeBucket::Hour(at(27, 22, 0)),
                TimeBucket::Hour(at(27, 23, 0)),
                TimeBucket::Hour(at(28, 0, 0)),
                TimeBucket::Hour(at(28, 1, 0)),
            ]
        );
    }
}
