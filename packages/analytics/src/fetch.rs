//! Fetching density for many time buckets.

use std::sync::Arc;

use futures::{StreamExt as _, TryStreamExt as _};
use heatmap_density_models::{DensityObservation, TileSet, TimeBucket};
use heatmap_source::progress::{ProgressCallback, null_progress};
use heatmap_source::{DensitySource, SourceError};

/// How a multi-bucket fetch is executed.
#[derive(Clone)]
pub struct FetchPlan {
    /// Requests in flight at once. `1` fetches strictly one after another.
    pub concurrency: usize,
    /// Receives one increment per completed request.
    pub progress: Arc<dyn ProgressCallback>,
}

impl FetchPlan {
    /// Sequential fetching without progress output.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            concurrency: 1,
            progress: null_progress(),
        }
    }

    /// Fetches up to `concurrency` buckets at a time.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Reports progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }
}

impl Default for FetchPlan {
    fn default() -> Self {
        Self::sequential()
    }
}

impl std::fmt::Debug for FetchPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPlan")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

/// Observes the density of `tiles` for every bucket, returning the
/// observations in the order of `buckets`.
///
/// Requests are independent; with `plan.concurrency > 1` several run at
/// once but results keep their input order. The first failure aborts the
/// remaining requests.
///
/// # Errors
///
/// Returns the first [`SourceError`] encountered.
pub async fn observe_all<S>(
    source: &S,
    tiles: &TileSet,
    buckets: Vec<TimeBucket>,
    plan: &FetchPlan,
) -> Result<Vec<DensityObservation>, SourceError>
where
    S: DensitySource + ?Sized,
{
    plan.progress.set_total(buckets.len() as u64);

    let observations = futures::stream::iter(buckets)
        .map(|at| async move {
            let density = source.observe_density(tiles, at).await?;
            plan.progress.inc(1);
            Ok::<_, SourceError>(DensityObservation { at, density })
        })
        .buffered(plan.concurrency.max(1))
        .try_collect::<Vec<_>>()
        .await;

    match &observations {
        Ok(found) => plan.progress.finish(format!("{} requests done", found.len())),
        Err(_) => plan.progress.finish_and_clear(),
    }

    observations
}
