//! The indexer reconciles one media file with the catalog.
//!
//! The driver walks the originals tree and calls
//! [`Indexer::media_file`] once per file, possibly from several workers in
//! parallel. All heavy lifting (classification, geocoding, color analysis)
//! happens here; the result reports what happened to the file row.

mod labels;
mod location;
mod media_file;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::Catalog;
use crate::classify::{Classifier, NsfwDetector};
use crate::config::Config;
use crate::events::EventBus;
use crate::geo::{Geocoder, PlacesClient, Resolver};

/// Per-call switches. An unset update flag means "only when the file content
/// changed".
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    pub skip_unchanged: bool,
    pub update_exif: bool,
    pub update_camera: bool,
    pub update_colors: bool,
    pub update_size: bool,
    pub update_keywords: bool,
    pub update_labels: bool,
    pub update_title: bool,
    pub update_location: bool,
}

impl IndexOptions {
    /// Re-run every analysis regardless of file changes.
    pub fn all() -> Self {
        Self {
            skip_unchanged: false,
            update_exif: true,
            update_camera: true,
            update_colors: true,
            update_size: true,
            update_keywords: true,
            update_labels: true,
            update_title: true,
            update_location: true,
        }
    }

    /// Analyze only changed files, skip unchanged ones entirely.
    pub fn changed_only() -> Self {
        Self {
            skip_unchanged: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexStatus {
    Updated,
    Added,
    Skipped,
    #[default]
    Failed,
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexStatus::Updated => "updated",
            IndexStatus::Added => "added",
            IndexStatus::Skipped => "skipped",
            IndexStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
pub struct IndexResult {
    pub status: IndexStatus,
    pub error: Option<anyhow::Error>,
    pub file_id: i64,
    pub file_uuid: String,
    pub photo_id: i64,
    pub photo_uuid: String,
}

impl IndexResult {
    pub fn failed(error: anyhow::Error) -> Self {
        Self {
            status: IndexStatus::Failed,
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none() && self.file_id > 0
    }
}

pub struct Indexer {
    catalog: Arc<Catalog>,
    bus: Arc<EventBus>,
    resolver: Resolver,
    classifier: Option<Arc<dyn Classifier>>,
    nsfw_detector: Option<Arc<dyn NsfwDetector>>,
    originals_path: PathBuf,
    thumbnails_path: PathBuf,
    classify_enabled: bool,
    detect_nsfw: bool,
}

impl Indexer {
    pub fn new(catalog: Arc<Catalog>, bus: Arc<EventBus>, config: &Config) -> Self {
        let geocoder = config.geocode.endpoint.as_ref().map(|endpoint| {
            Arc::new(PlacesClient::new(
                endpoint,
                Duration::from_secs(config.geocode.timeout_secs),
            )) as Arc<dyn Geocoder>
        });

        Self {
            catalog,
            bus,
            resolver: Resolver::new(geocoder),
            classifier: None,
            nsfw_detector: None,
            originals_path: config.originals_path.clone(),
            thumbnails_path: config.thumbnails.path.clone(),
            classify_enabled: config.classify.enabled,
            detect_nsfw: config.classify.detect_nsfw,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_nsfw_detector(mut self, detector: Arc<dyn NsfwDetector>) -> Self {
        self.nsfw_detector = Some(detector);
        self
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.resolver = Resolver::new(Some(geocoder));
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}
