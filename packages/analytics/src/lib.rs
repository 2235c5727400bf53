#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Weekday baselines and density variation for heatmap tile sets.
//!
//! The computation runs in two steps against one fixed [`TileSet`]:
//!
//! 1. [`baseline::compute_baseline`] samples a historical window and reduces
//!    it to the median density per weekday.
//! 2. [`variation::compute_variation_series`] fetches each day of a target
//!    range and reports its percentage deviation from that weekday's
//!    baseline.
//!
//! [`pipeline::density_variation`] chains both after resolving the tile set
//! for a postal code. All functions are generic over
//! [`heatmap_source::DensitySource`] and abort on the first failed fetch.
//!
//! [`TileSet`]: heatmap_density_models::TileSet

pub mod baseline;
pub mod fetch;
pub mod hourly;
pub mod pipeline;
pub mod stats;
pub mod variation;

#[cfg(test)]
mod test_support;

use chrono::{NaiveDate, Weekday};
use heatmap_density_models::DateRange;
use heatmap_source::SourceError;
use thiserror::Error;

/// Errors that can occur during baseline or variation computation.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A density fetch failed; the whole computation is abandoned.
    #[error("Density fetch failed: {0}")]
    Source(#[from] SourceError),

    /// The requested window cannot produce a result.
    #[error("Invalid window: {message}")]
    InvalidWindow {
        /// Description of what went wrong.
        message: String,
    },

    /// The baseline has no value for the weekday of a requested date.
    #[error(
        "No baseline for {weekday} (requested for {date}); \
         the historical window never sampled that weekday"
    )]
    MissingWeekday {
        /// Date whose variation was requested.
        date: NaiveDate,
        /// Its weekday.
        weekday: Weekday,
    },

    /// The baseline for a weekday is zero, so relative variation is
    /// undefined.
    #[error("Baseline for {weekday} is zero (requested for {date}); variation is undefined")]
    ZeroBaseline {
        /// Date whose variation was requested.
        date: NaiveDate,
        /// Its weekday.
        weekday: Weekday,
    },
}

/// Every day of `range`, or [`AnalyticsError::InvalidWindow`] if the
/// range runs past the last representable date.
pub(crate) fn range_dates(range: DateRange) -> Result<Vec<NaiveDate>, AnalyticsError> {
    range
        .checked_dates()
        .ok_or_else(|| AnalyticsError::InvalidWindow {
            message: format!("{range} extends past the last representable date"),
        })
}
