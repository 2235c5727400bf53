//! Request building and response parsing for the heatmap API.
//!
//! Endpoints (relative to the configured base URL):
//!
//! * `heatmaps/dwell-density/daily/{date}?tiles=..`
//! * `heatmaps/dwell-density/hourly/{datetime}?tiles=..`
//! * `grids/postal-code-areas/{postal_code}`
//!
//! Both density endpoints answer with
//! `{"tiles": [{"tileId": .., "score": ..}, ..]}`.

use heatmap_density_models::{TileId, TileSet, TimeBucket};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::SourceError;

/// How the tile list is encoded in the density query string.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TileListStyle {
    /// One `tiles` parameter per id: `?tiles=1&tiles=2`.
    #[default]
    Repeated,
    /// A single comma-separated parameter: `?tiles=1,2`.
    Comma,
}

/// Appends `segments` to the path of `base_url`, percent-encoding each
/// one so that `/`, `?` or `#` inside a segment cannot alter the request.
fn endpoint<'a>(
    base_url: &str,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url, SourceError> {
    let mut url = Url::parse(base_url).map_err(|e| SourceError::Config {
        message: format!("invalid API URL {base_url}: {e}"),
    })?;

    url.path_segments_mut()
        .map_err(|()| SourceError::Config {
            message: format!("API URL {base_url} cannot have a path"),
        })?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

/// Builds the density query URL for `tiles` at `at`.
///
/// The granularity segment (`daily` / `hourly`) follows from the bucket
/// variant.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if `base_url` is not a valid URL.
pub fn density_url(
    base_url: &str,
    at: &TimeBucket,
    tiles: &TileSet,
    style: TileListStyle,
) -> Result<Url, SourceError> {
    let granularity = at.granularity();
    let bucket = at.to_iso_string();
    let mut url = endpoint(
        base_url,
        [
            "heatmaps",
            "dwell-density",
            granularity.as_ref(),
            bucket.as_str(),
        ],
    )?;

    {
        let mut pairs = url.query_pairs_mut();
        match style {
            TileListStyle::Repeated => {
                for id in tiles {
                    pairs.append_pair("tiles", &id.to_string());
                }
            }
            TileListStyle::Comma => {
                let joined = tiles
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                pairs.append_pair("tiles", &joined);
            }
        }
    }

    Ok(url)
}

/// Builds the postal-code grid lookup URL.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if `base_url` is not a valid URL.
pub fn postal_code_url(base_url: &str, postal_code: &str) -> Result<Url, SourceError> {
    endpoint(base_url, ["grids", "postal-code-areas", postal_code.trim()])
}

fn tiles_array(body: &serde_json::Value) -> Result<&Vec<serde_json::Value>, SourceError> {
    body.get("tiles")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| SourceError::Parse {
            message: "response has no `tiles` array".to_string(),
        })
}

/// Sums the `score` of every tile in a density response.
///
/// An empty `tiles` array sums to zero.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] if the `tiles` array is missing or a
/// tile has no numeric `score`.
pub fn parse_density_response(body: &serde_json::Value) -> Result<f64, SourceError> {
    tiles_array(body)?
        .iter()
        .map(|tile| {
            tile.get("score")
                .and_then(serde_json::Value::as_f64)
                .ok_or_else(|| SourceError::Parse {
                    message: format!("tile without numeric score: {tile}"),
                })
        })
        .sum()
}

/// Extracts the `tileId` of every tile in a postal-code lookup response,
/// in response order.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] if the `tiles` array is missing or a
/// tile has no usable `tileId`.
pub fn parse_tile_ids(body: &serde_json::Value) -> Result<Vec<TileId>, SourceError> {
    tiles_array(body)?
        .iter()
        .map(|tile| {
            let raw = tile.get("tileId").ok_or_else(|| SourceError::Parse {
                message: format!("tile without tileId: {tile}"),
            })?;
            serde_json::from_value(raw.clone()).map_err(|_| SourceError::Parse {
                message: format!("unsupported tileId: {raw}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const BASE: &str = "https://api.example.com/layer/heatmaps/standard";

    fn tiles() -> TileSet {
        TileSet::new(vec![TileId::Numeric(101), TileId::Numeric(202)])
    }

    fn day() -> TimeBucket {
        TimeBucket::Day(NaiveDate::from_ymd_opt(2020, 1, 6).unwrap())
    }

    #[test]
    fn builds_daily_url_with_repeated_tiles() {
        let url = density_url(BASE, &day(), &tiles(), TileListStyle::Repeated).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/layer/heatmaps/standard/heatmaps/dwell-density/daily/2020-01-06?tiles=101&tiles=202"
        );
    }

    #[test]
    fn builds_hourly_url_with_comma_tiles() {
        let at = TimeBucket::Hour(
            NaiveDate::from_ymd_opt(2020, 1, 27)
                .unwrap()
                .and_hms_opt(13, 0, 0)
                .unwrap(),
        );
        let url =
            density_url(&format!("{BASE}/"), &at, &tiles(), TileListStyle::Comma).unwrap();
        assert_eq!(
            url.path(),
            "/layer/heatmaps/standard/heatmaps/dwell-density/hourly/2020-01-27T13:00:00"
        );
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("tiles".to_string(), "101,202".to_string())]);
    }

    #[test]
    fn builds_postal_code_url() {
        let url = postal_code_url(BASE, " 1215 ").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/layer/heatmaps/standard/grids/postal-code-areas/1215"
        );
    }

    #[test]
    fn postal_code_stays_a_single_path_segment() {
        let url = postal_code_url(BASE, "12/15?tiles=9#x").unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert_eq!(
            url.path(),
            "/layer/heatmaps/standard/grids/postal-code-areas/12%2F15%3Ftiles=9%23x"
        );
    }

    #[test]
    fn rejects_base_url_without_path() {
        assert!(matches!(
            postal_code_url("mailto:ops@example.com", "1215"),
            Err(SourceError::Config { .. })
        ));
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            postal_code_url("not a url", "1215"),
            Err(SourceError::Config { .. })
        ));
    }

    #[test]
    fn sums_tile_scores() {
        let body = serde_json::json!({
            "tiles": [
                { "tileId": 101, "score": 1.5 },
                { "tileId": 202, "score": 2 },
                { "tileId": 303, "score": 0.25 }
            ]
        });
        assert!((parse_density_response(&body).unwrap() - 3.75).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_tiles_sum_to_zero() {
        let body = serde_json::json!({ "tiles": [] });
        assert!(parse_density_response(&body).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn missing_score_is_a_parse_error() {
        let body = serde_json::json!({ "tiles": [{ "tileId": 1 }] });
        assert!(matches!(
            parse_density_response(&body),
            Err(SourceError::Parse { .. })
        ));
        let body = serde_json::json!({ "status": "oops" });
        assert!(matches!(
            parse_density_response(&body),
            Err(SourceError::Parse { .. })
        ));
    }

    #[test]
    fn parses_tile_ids() {
        let body = serde_json::json!({
            "tiles": [
                { "tileId": 26_544_000 },
                { "tileId": "x-17" }
            ]
        });
        assert_eq!(
            parse_tile_ids(&body).unwrap(),
            vec![TileId::Numeric(26_544_000), TileId::Text("x-17".to_string())]
        );
    }

    #[test]
    fn tile_without_id_is_a_parse_error() {
        let body = serde_json::json!({ "tiles": [{ "score": 3 }] });
        assert!(matches!(
            parse_tile_ids(&body),
            Err(SourceError::Parse { .. })
        ));
    }
}
