use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StoreError;

/// File name prefix of every artifact.
pub const ARTIFACT_PREFIX: &str = "filtered.";

/// File name suffix of every artifact.
pub const ARTIFACT_EXTENSION: &str = ".jpg";

/// Suffix of in-progress writes.
pub const TEMP_EXTENSION: &str = ".tmp";

/// Default delay between serving an artifact and deleting it.
pub const DEFAULT_DELETE_DELAY_SECS: u64 = 60;

// =============================================================================
// Artifact Path
// =============================================================================

/// A unique location for one job's artifact.
///
/// The identifier is a random v4 UUID, so concurrently active jobs never
/// share a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactPath {
    id: Uuid,
    path: PathBuf,
}

impl ArtifactPath {
    fn new(root: &Path, id: Uuid) -> Self {
        let path = root.join(format!("{}{}{}", ARTIFACT_PREFIX, id, ARTIFACT_EXTENSION));
        Self { id, path }
    }

    /// The artifact identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Absolute location of the artifact file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path used while the artifact is being written.
    fn temp_path(&self) -> PathBuf {
        self.path.with_file_name(format!(".{}{}", self.id, TEMP_EXTENSION))
    }
}

// =============================================================================
// Artifact Store
// =============================================================================

struct StoreInner {
    root: PathBuf,
    delete_delay: Duration,
    pending_deletions: AtomicUsize,
}

/// Scratch-directory store for transformed images.
///
/// Cloning is cheap; clones share the same directory and pending-deletion
/// counter.
#[derive(Clone)]
pub struct ArtifactStore {
    inner: Arc<StoreInner>,
}

impl ArtifactStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>, delete_delay: Duration) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::io(&root, e))?;

        Ok(Self {
            inner: Arc::new(StoreInner {
                root,
                delete_delay,
                pending_deletions: AtomicUsize::new(0),
            }),
        })
    }

    /// Scratch directory holding the artifacts.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Delay applied by [`schedule_delete`](Self::schedule_delete).
    pub fn delete_delay(&self) -> Duration {
        self.inner.delete_delay
    }

    /// Number of deletions scheduled but not yet executed.
    pub fn pending_deletions(&self) -> usize {
        self.inner.pending_deletions.load(Ordering::SeqCst)
    }

    /// Reserve a fresh, collision-free artifact path.
    pub fn allocate(&self) -> ArtifactPath {
        ArtifactPath::new(&self.inner.root, Uuid::new_v4())
    }

    /// Persist encoded JPEG data at `artifact`.
    ///
    /// The data is written to a temporary sibling and renamed into place, so
    /// the artifact path only ever holds a complete file. On failure the
    /// temporary file is removed.
    pub async fn write(&self, artifact: &ArtifactPath, data: &[u8]) -> Result<(), StoreError> {
        let temp = artifact.temp_path();

        if let Err(e) = tokio::fs::write(&temp, data).await {
            discard(&temp).await;
            return Err(StoreError::io(&temp, e));
        }

        if let Err(e) = tokio::fs::rename(&temp, artifact.path()).await {
            discard(&temp).await;
            return Err(StoreError::io(artifact.path(), e));
        }

        debug!(artifact = %artifact.id(), bytes = data.len(), "Persisted artifact");
        Ok(())
    }

    /// Read an artifact back for serving.
    pub async fn read(&self, artifact: &ArtifactPath) -> Result<Bytes, StoreError> {
        tokio::fs::read(artifact.path())
            .await
            .map(Bytes::from)
            .map_err(|e| StoreError::io(artifact.path(), e))
    }

    /// Delete an artifact now.
    ///
    /// Returns `true` if a file was removed and `false` if it was already gone.
    /// Other failures are logged and reported as `false`; they are never fatal.
    pub async fn delete(&self, artifact: &ArtifactPath) -> bool {
        match tokio::fs::remove_file(artifact.path()).await {
            Ok(()) => {
                debug!(artifact = %artifact.id(), "Deleted artifact");
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(artifact = %artifact.id(), "Artifact already removed");
                false
            }
            Err(e) => {
                warn!(
                    artifact = %artifact.id(),
                    path = %artifact.path().display(),
                    "Failed to delete artifact: {}",
                    e
                );
                false
            }
        }
    }

    /// Delete `artifact` once the store's delete delay has elapsed.
    ///
    /// The deletion runs on its own task and needs no further requests to
    /// fire.
    pub fn schedule_delete(&self, artifact: ArtifactPath) -> JoinHandle<()> {
        let store = self.clone();
        let delay = self.inner.delete_delay;
        self.inner.pending_deletions.fetch_add(1, Ordering::SeqCst);

        debug!(
            artifact = %artifact.id(),
            delay_secs = delay.as_secs_f64(),
            "Scheduled artifact deletion"
        );

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.delete(&artifact).await;
            store.inner.pending_deletions.fetch_sub(1, Ordering::SeqCst);
        })
    }

    /// Remove artifacts and abandoned temporary files older than `max_age`.
    ///
    /// Returns the number of files removed. Files that are not ours are left
    /// untouched.
    pub async fn sweep_stale(&self, max_age: Duration) -> Result<usize, StoreError> {
        let root = &self.inner.root;
        let mut entries = tokio::fs::read_dir(root)
            .await
            .map_err(|e| StoreError::io(root, e))?;

        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(root, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_store_file(name) {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(file = name, "Cannot stat artifact during sweep: {}", e);
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or_default();
            if age < max_age {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(file = name, "Failed to sweep stale artifact: {}", e),
            }
        }

        if removed > 0 {
            info!(removed = removed, dir = %root.display(), "Swept stale artifacts");
        }
        Ok(removed)
    }
}

/// Whether a file name was produced by this store.
fn is_store_file(name: &str) -> bool {
    let artifact = name.starts_with(ARTIFACT_PREFIX) && name.ends_with(ARTIFACT_EXTENSION);
    let temp = name.starts_with('.') && name.ends_with(TEMP_EXTENSION);
    artifact || temp
}

/// Best-effort removal of a partial write.
async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), "Failed to remove partial artifact: {}", e);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
