//! Ephemeral artifact storage.
//!
//! Transformed images are written under a scratch directory with a
//! collision-free name, served once, and removed after a fixed delay.
//!
//! ```text
//!   allocate ──► write (tmp + rename) ──► read ──► schedule_delete
//!                                                     │
//!                                         sleep(delete_delay)
//!                                                     │
//!                                                     ▼
//!                                              remove_file (NotFound = ok)
//! ```
//!
//! On startup [`ArtifactStore::sweep_stale`] removes artifacts left behind by
//! a previous process whose deletion timers never fired.

mod store;

pub use store::{
    ArtifactPath, ArtifactStore, ARTIFACT_EXTENSION, ARTIFACT_PREFIX, DEFAULT_DELETE_DELAY_SECS,
    TEMP_EXTENSION,
};
