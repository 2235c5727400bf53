use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use heatmap_density_models::{TileId, TileSet, TimeBucket};
use heatmap_source::sampling::sample_tiles;
use heatmap_source::{DensitySource, SourceError, TileSampling};

type DensityFn = dyn Fn(TimeBucket) -> Result<f64, SourceError> + Send + Sync;

/// In-memory [`DensitySource`] answering from a closure and counting calls.
pub struct FakeSource {
    density: Box<DensityFn>,
    postal_tiles: Vec<TileId>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(
        density: impl Fn(TimeBucket) -> Result<f64, SourceError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            density: Box::new(density),
            postal_tiles: (1..=250).map(TileId::Numeric).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DensitySource for FakeSource {
    async fn observe_density(&self, _tiles: &TileSet, at: TimeBucket) -> Result<f64, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.density)(at)
    }

    async fn resolve_tiles_for_postal_code(
        &self,
        _postal_code: &str,
        sampling: TileSampling,
    ) -> Result<TileSet, SourceError> {
        Ok(sample_tiles(
            self.postal_tiles.clone(),
            sampling.max_count,
            sampling.seed,
        ))
    }
}

pub fn tiles() -> TileSet {
    TileSet::new(vec![TileId::Numeric(1), TileId::Numeric(2)])
}
