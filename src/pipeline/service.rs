//! Filter pipeline service.
//!
//! The pipeline runs each job on its own spawned task. If the client goes
//! away mid-request the task still finishes, and any artifact it wrote is
//! still scheduled for deletion.

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::artifact::{ArtifactPath, ArtifactStore};
use crate::error::{PipelineError, StoreError};
use crate::fetch::{ImageFetcher, ImageSource};
use crate::transform::ImageTransformer;

use super::job::{ImageJob, JobState};
use super::validate::validate_image_url;

// =============================================================================
// Filtered Image
// =============================================================================

/// Result of a successful pipeline run.
#[derive(Debug)]
pub struct FilteredImage {
    /// Identifier of the job that produced the artifact
    pub job_id: Uuid,

    /// Where the artifact lives until it is deleted
    pub artifact: ArtifactPath,

    /// The encoded JPEG, read back from the artifact
    pub data: Bytes,

    /// Completes once the artifact has been deleted
    pub deletion: JoinHandle<()>,
}

// =============================================================================
// Filter Pipeline
// =============================================================================

/// Composes fetch → transform → persist → serve → deferred delete.
///
/// # Type Parameters
///
/// * `S` - Where source images are fetched from (HTTP in production)
///
/// # Example
///
/// ```ignore
/// use image_filter_server::{ArtifactStore, FilterPipeline, HttpImageSource};
///
/// let store = ArtifactStore::open("/tmp/filtered", Duration::from_secs(60)).await?;
/// let pipeline = FilterPipeline::new(HttpImageSource::with_defaults()?, store);
///
/// let image = pipeline.filter_image("https://example.com/cat.jpg").await?;
/// println!("{} bytes at {}", image.data.len(), image.artifact.path().display());
/// ```
pub struct FilterPipeline<S: ImageSource> {
    fetcher: ImageFetcher<S>,
    transformer: ImageTransformer,
    store: ArtifactStore,
}

impl<S: ImageSource> Clone for FilterPipeline<S> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            transformer: self.transformer.clone(),
            store: self.store.clone(),
        }
    }
}

impl<S: ImageSource + 'static> FilterPipeline<S> {
    /// Create a pipeline with the standard transformer.
    pub fn new(source: S, store: ArtifactStore) -> Self {
        Self {
            fetcher: ImageFetcher::new(source),
            transformer: ImageTransformer::new(),
            store,
        }
    }

    /// The artifact store backing this pipeline.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// The image source backing this pipeline.
    pub fn source(&self) -> &S {
        self.fetcher.source()
    }

    /// Validate, fetch, transform and persist `image_url`.
    ///
    /// The returned artifact has already been scheduled for deletion after the
    /// store's delete delay.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidImageUrl`] if the URL is rejected (no fetch is made)
    /// - [`PipelineError::Fetch`], [`PipelineError::Transform`] or
    ///   [`PipelineError::Store`] if a stage fails; no artifact is left behind
    pub async fn filter_image(&self, image_url: &str) -> Result<FilteredImage, PipelineError> {
        validate_image_url(image_url)?;

        let pipeline = self.clone();
        let url = image_url.to_string();

        tokio::spawn(async move { pipeline.run(url).await })
            .await
            .map_err(|e| PipelineError::Store(StoreError::Task(e.to_string())))?
    }

    async fn run(&self, url: String) -> Result<FilteredImage, PipelineError> {
        let mut job = ImageJob::new(url, self.store.allocate());
        debug!(job = %job.id(), url = job.source_url(), "Starting filter job");

        let fetched = self.fetcher.fetch(job.source_url()).await;
        let decoded = match fetched {
            Ok(decoded) => decoded,
            Err(e) => return Err(job.fail(e)),
        };
        job.advance(JobState::Transforming);

        let encoded = match self.transformer.transform_blocking(decoded).await {
            Ok(encoded) => encoded,
            Err(e) => return Err(job.fail(e)),
        };

        let written = self.store.write(job.artifact(), &encoded).await;
        if let Err(e) = written {
            return Err(job.fail(e));
        }
        job.advance(JobState::Persisted);

        let read_back = self.store.read(job.artifact()).await;
        let data = match read_back {
            Ok(data) => data,
            Err(e) => {
                self.store.delete(job.artifact()).await;
                return Err(job.fail(e));
            }
        };
        job.advance(JobState::Served);

        info!(
            job = %job.id(),
            url = job.source_url(),
            bytes = data.len(),
            "Filtered image ready"
        );

        let job_id = job.id();
        let artifact = job.artifact().clone();
        let deletion = self.schedule_cleanup(job);

        Ok(FilteredImage {
            job_id,
            artifact,
            data,
            deletion,
        })
    }

    /// Schedule the artifact's deletion and close out the job when it runs.
    fn schedule_cleanup(&self, mut job: ImageJob) -> JoinHandle<()> {
        let deletion = self.store.schedule_delete(job.artifact().clone());
        tokio::spawn(async move {
            if deletion.await.is_ok() {
                job.advance(JobState::Deleted);
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
