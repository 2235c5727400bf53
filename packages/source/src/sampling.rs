//! Random tile sampling.
//!
//! A postal code can span far more tiles than the API accepts in one
//! density query, so a uniform sample without replacement is taken.

use std::collections::BTreeSet;

use heatmap_density_models::{TileId, TileSet};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Picks at most `max_count` distinct ids from `ids`, uniformly at random.
///
/// Duplicate ids are dropped before sampling. The sample keeps the
/// relative order of `ids` so query URLs are stable for a given seed.
/// When no more than `max_count` distinct ids are available, all of them
/// are returned.
#[must_use]
pub fn sample_tiles(ids: Vec<TileId>, max_count: usize, seed: Option<u64>) -> TileSet {
    let mut seen = BTreeSet::new();
    let distinct: Vec<TileId> = ids
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect();

    if distinct.len() <= max_count {
        if distinct.len() < max_count {
            log::warn!(
                "Only {} distinct tiles available, fewer than the requested {max_count}",
                distinct.len()
            );
        }
        return TileSet::new(distinct);
    }

    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let mut picked = rand::seq::index::sample(&mut rng, distinct.len(), max_count).into_vec();
    picked.sort_unstable();

    let mut slots: Vec<Option<TileId>> = distinct.into_iter().map(Some).collect();
    picked
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect()
}
