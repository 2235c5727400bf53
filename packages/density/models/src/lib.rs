#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data types for the heatmap density toolchain.
//!
//! A [`TileSet`] fixes the geographic sampling unit for one run. Every
//! density fetch against it yields a [`DensityObservation`]; historical
//! observations are reduced into a [`WeekdayBaseline`], and observations in
//! a target range are compared against it to build a [`VariationSeries`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Opaque identifier of a heatmap grid tile.
///
/// The provider returns numeric ids, but nothing downstream relies on
/// that, so string ids are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TileId {
    /// Integer tile id (the common case).
    Numeric(i64),
    /// Any other textual tile id.
    Text(String),
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for TileId {
    fn from(id: i64) -> Self {
        Self::Numeric(id)
    }
}

impl From<&str> for TileId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// An ordered, immutable collection of tile ids queried together.
///
/// Baselines and variations are only comparable when computed against the
/// same `TileSet`, so a run resolves it once and shares it read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileSet {
    ids: Vec<TileId>,
}

impl TileSet {
    /// Creates a tile set from ids in query order.
    #[must_use]
    pub const fn new(ids: Vec<TileId>) -> Self {
        Self { ids }
    }

    /// The tile ids, in query order.
    #[must_use]
    pub fn ids(&self) -> &[TileId] {
        &self.ids
    }

    /// Number of tiles in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set contains no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterates over the tile ids.
    pub fn iter(&self) -> std::slice::Iter<'_, TileId> {
        self.ids.iter()
    }
}

impl FromIterator<TileId> for TileSet {
    fn from_iter<I: IntoIterator<Item = TileId>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TileSet {
    type Item = &'a TileId;
    type IntoIter = std::slice::Iter<'a, TileId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

/// Time resolution of a density query.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Granularity {
    /// One value per calendar day.
    Daily,
    /// One value per hour.
    Hourly,
}

/// The time bucket a density value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeBucket {
    /// A whole calendar day.
    Day(NaiveDate),
    /// A single hour starting at the given timestamp.
    Hour(NaiveDateTime),
}

impl TimeBucket {
    /// Granularity of this bucket.
    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        match self {
            Self::Day(_) => Granularity::Daily,
            Self::Hour(_) => Granularity::Hourly,
        }
    }

    /// Calendar date the bucket falls on.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Day(date) => *date,
            Self::Hour(at) => at.date(),
        }
    }

    /// Day of the week the bucket falls on.
    #[must_use]
    pub fn weekday(&self) -> Weekday {
        self.date().weekday()
    }

    /// ISO 8601 timestamp as used in API paths (`2020-01-06` or
    /// `2020-01-27T13:00:00`).
    #[must_use]
    pub fn to_iso_string(&self) -> String {
        match self {
            Self::Day(date) => date.format("%Y-%m-%d").to_string(),
            Self::Hour(at) => at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

impl From<NaiveDate> for TimeBucket {
    fn from(date: NaiveDate) -> Self {
        Self::Day(date)
    }
}

impl From<NaiveDateTime> for TimeBucket {
    fn from(at: NaiveDateTime) -> Self {
        Self::Hour(at)
    }
}

/// A run of consecutive calendar days starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range.
    pub start: NaiveDate,
    /// Number of days, including `start`.
    pub days: u32,
}

impl DateRange {
    /// Creates a range of `days` days beginning at `start`.
    #[must_use]
    pub const fn new(start: NaiveDate, days: u32) -> Self {
        Self { start, days }
    }

    /// Every day in the range, in ascending order.
    ///
    /// Returns `None` if the range runs past the last representable date,
    /// so a returned list always holds exactly `days` entries.
    #[must_use]
    pub fn checked_dates(&self) -> Option<Vec<NaiveDate>> {
        (0..u64::from(self.days))
            .map(|offset| self.start.checked_add_days(Days::new(offset)))
            .collect()
    }

    /// Last day of the range. `None` when the range is empty or runs past
    /// the last representable date.
    #[must_use]
    pub fn end(&self) -> Option<NaiveDate> {
        let last = self.days.checked_sub(1)?;
        self.start.checked_add_days(Days::new(u64::from(last)))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) => write!(f, "{} .. {} ({} days)", self.start, end, self.days),
            None if self.days == 0 => write!(f, "{} (empty)", self.start),
            None => write!(f, "{} + {} days (out of range)", self.start, self.days),
        }
    }
}

/// Aggregate density of a [`TileSet`] for one time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityObservation {
    /// When the density was observed.
    pub at: TimeBucket,
    /// Sum of the per-tile scores.
    pub density: f64,
}

/// Expected density for one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayStat {
    /// Median of the sampled densities.
    pub expected: f64,
    /// How many days of the historical window fell on this weekday.
    pub samples: usize,
}

/// Weekday index (0 = Monday .. 6 = Sunday) to expected density.
///
/// Only weekdays that were actually sampled are present. Built once per
/// tile set and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekdayBaseline {
    stats: BTreeMap<u8, WeekdayStat>,
}

impl WeekdayBaseline {
    /// Builds a baseline from per-weekday statistics.
    #[must_use]
    pub fn new(stats: impl IntoIterator<Item = (Weekday, WeekdayStat)>) -> Self {
        Self {
            stats: stats
                .into_iter()
                .map(|(weekday, stat)| (weekday_index(weekday), stat))
                .collect(),
        }
    }

    /// Statistics for `weekday`, if it was sampled.
    #[must_use]
    pub fn get(&self, weekday: Weekday) -> Option<&WeekdayStat> {
        self.stats.get(&weekday_index(weekday))
    }

    /// Expected density for `weekday`, if it was sampled.
    #[must_use]
    pub fn expected(&self, weekday: Weekday) -> Option<f64> {
        self.get(weekday).map(|stat| stat.expected)
    }

    /// Iterates the sampled weekdays from Monday to Sunday.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &WeekdayStat)> {
        self.stats
            .iter()
            .filter_map(|(idx, stat)| Weekday::try_from(*idx).ok().map(|w| (w, stat)))
    }

    /// Number of weekdays present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Whether no weekday was sampled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Whether all seven weekdays have an expected value.
    #[must_use]
    pub fn covers_all_weekdays(&self) -> bool {
        self.stats.len() == 7
    }
}

/// Zero-based weekday index with Monday as 0.
#[must_use]
pub fn weekday_index(weekday: Weekday) -> u8 {
    // num_days_from_monday() is always in 0..7
    u8::try_from(weekday.num_days_from_monday()).unwrap_or_default()
}

/// Deviation of one day from its weekday baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationPoint {
    /// Day the variation refers to.
    pub date: NaiveDate,
    /// Observed density on that day.
    pub observed: f64,
    /// Baseline density for the day's weekday.
    pub expected: f64,
    /// `100 * (observed - expected) / expected`.
    pub variation: f64,
}

/// Date-ordered variation points for a contiguous target range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariationSeries {
    points: Vec<VariationPoint>,
}

impl VariationSeries {
    /// Creates a series, ordering the points by date.
    #[must_use]
    pub fn new(mut points: Vec<VariationPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self { points }
    }

    /// The points in date order.
    #[must_use]
    pub fn points(&self) -> &[VariationPoint] {
        &self.points
    }

    /// Number of days in the series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates the points in date order.
    pub fn iter(&self) -> std::slice::Iter<'_, VariationPoint> {
        self.points.iter()
    }

    /// Smallest and largest variation, or `None` for an empty series.
    #[must_use]
    pub fn range(&self) -> Option<(f64, f64)> {
        self.points.iter().map(|p| p.variation).fold(None, |acc, v| {
            Some(acc.map_or((v, v), |(lo, hi): (f64, f64)| (lo.min(v), hi.max(v))))
        })
    }
}

impl<'a> IntoIterator for &'a VariationSeries {
    type Item = &'a VariationPoint;
    type IntoIter = std::slice::Iter<'a, VariationPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn tile_ids_deserialize_numeric_and_text() {
        let ids: Vec<TileId> = serde_json::from_value(serde_json::json!([42, "abc"])).unwrap();
        assert_eq!(ids, vec![TileId::Numeric(42), TileId::Text("abc".to_string())]);
        assert_eq!(ids[0].to_string(), "42");
        assert_eq!(ids[1].to_string(), "abc");
    }

    #[test]
    fn time_bucket_iso_strings() {
        let day = TimeBucket::Day(date(2020, 1, 6));
        assert_eq!(day.to_iso_string(), "2020-01-06");
        assert_eq!(day.granularity(), Granularity::Daily);

        let hour = TimeBucket::Hour(date(2020, 1, 27).and_hms_opt(13, 0, 0).unwrap());
        assert_eq!(hour.to_iso_string(), "2020-01-27T13:00:00");
        assert_eq!(hour.granularity(), Granularity::Hourly);
        assert_eq!(hour.weekday(), Weekday::Mon);
    }

    #[test]
    fn time_bucket_deserializes_both_forms() {
        let day: TimeBucket = serde_json::from_value(serde_json::json!("2020-01-06")).unwrap();
        assert_eq!(day, TimeBucket::Day(date(2020, 1, 6)));
        let hour: TimeBucket =
            serde_json::from_value(serde_json::json!("2020-01-27T05:00:00")).unwrap();
        assert_eq!(
            hour,
            TimeBucket::Hour(date(2020, 1, 27).and_hms_opt(5, 0, 0).unwrap())
        );
    }

    #[test]
    fn date_range_is_contiguous() {
        let range = DateRange::new(date(2020, 2, 27), 4);
        assert_eq!(
            range.checked_dates(),
            Some(vec![
                date(2020, 2, 27),
                date(2020, 2, 28),
                date(2020, 2, 29),
                date(2020, 3, 1),
            ])
        );
        assert_eq!(range.end(), Some(date(2020, 3, 1)));

        let empty = DateRange::new(date(2020, 1, 1), 0);
        assert_eq!(empty.checked_dates(), Some(vec![]));
        assert_eq!(empty.end(), None);
    }

    #[test]
    fn date_range_past_the_calendar_end_is_rejected() {
        let start = NaiveDate::MAX.checked_sub_days(Days::new(2)).unwrap();
        let range = DateRange::new(start, 5);
        assert_eq!(range.checked_dates(), None);
        assert_eq!(range.end(), None);
        assert!(range.to_string().contains("out of range"));

        let exact = DateRange::new(start, 3);
        assert_eq!(exact.checked_dates().map(|d| d.len()), Some(3));
        assert_eq!(exact.end(), Some(NaiveDate::MAX));
    }

    fn stat(expected: f64, samples: usize) -> WeekdayStat {
        WeekdayStat { expected, samples }
    }

    #[test]
    fn granularity_path_segment() {
        assert_eq!(Granularity::Daily.as_ref(), "daily");
        assert_eq!(Granularity::Hourly.to_string(), "hourly");
    }

    #[test]
    fn baseline_lookup_by_weekday() {
        let baseline = WeekdayBaseline::new([
            (Weekday::Mon, stat(100.0, 5)),
            (Weekday::Sun, stat(40.0, 4)),
        ]);
        assert_eq!(baseline.expected(Weekday::Mon), Some(100.0));
        assert_eq!(baseline.expected(Weekday::Sun), Some(40.0));
        assert_eq!(baseline.expected(Weekday::Wed), None);
        assert!(!baseline.covers_all_weekdays());

        let order: Vec<Weekday> = baseline.iter().map(|(w, _)| w).collect();
        assert_eq!(order, vec![Weekday::Mon, Weekday::Sun]);
    }

    #[test]
    fn baseline_serializes_with_index_keys() {
        let baseline = WeekdayBaseline::new([(Weekday::Tue, stat(3.5, 4))]);
        let json = serde_json::to_value(&baseline).unwrap();
        assert_eq!(json, serde_json::json!({ "1": { "expected": 3.5, "samples": 4 } }));
    }

    #[test]
    fn series_is_sorted_by_date() {
        let point = |d: u32, v: f64| VariationPoint {
            date: date(2020, 2, d),
            observed: 0.0,
            expected: 1.0,
            variation: v,
        };
        let series = VariationSeries::new(vec![point(3, 10.0), point(1, -20.0), point(2, 5.0)]);
        let dates: Vec<u32> = series.iter().map(|p| p.date.day()).collect();
        assert_eq!(dates, vec![1, 2, 3]);
        assert_eq!(series.range(), Some((-20.0, 10.0)));
        assert_eq!(VariationSeries::default().range(), None);
    }
}
