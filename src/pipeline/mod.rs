//! Filter pipeline orchestration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        FilterPipeline                           │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                   filter_image()                        │    │
//! │  │  1. Validate URL      4. Persist artifact               │    │
//! │  │  2. Fetch + decode    5. Read back for serving          │    │
//! │  │  3. Transform         6. Schedule deletion              │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌──────────────┐   ┌──────────────────┐  ┌───────────────┐   │
//! │    │ ImageFetcher │   │ ImageTransformer │  │ ArtifactStore │   │
//! │    └──────────────┘   └──────────────────┘  └───────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each request becomes an [`ImageJob`] that moves through
//! `Fetching → Transforming → Persisted → Served → Deleted`, or to `Failed`.

mod job;
mod service;
mod validate;

pub use job::{ImageJob, JobState};
pub use service::{FilterPipeline, FilteredImage};
pub use validate::{validate_image_url, ALLOWED_EXTENSIONS};
