//! Classification bridge and label attachment.

use serde_json::json;
use std::time::Instant;
use tracing::{debug, error, warn};

use super::Indexer;
use crate::entity::PhotoLabel;
use crate::media::thumb::{self, ThumbKind};
use crate::media::MediaFile;
use crate::txt;

impl Indexer {
    /// Run the classifier over up to three 224px crops and keep the labels
    /// whose confidence holds up against the best one.
    pub(super) fn classify_image(&self, m: &MediaFile) -> crate::classify::Labels {
        let classifier = match &self.classifier {
            Some(classifier) => classifier,
            None => return crate::classify::Labels::new(),
        };

        let start = Instant::now();

        let kinds: &[ThumbKind] = if m.aspect_ratio() == 1.0 {
            &[ThumbKind::Tile224]
        } else {
            &[ThumbKind::Tile224, ThumbKind::Left224, ThumbKind::Right224]
        };

        let mut labels = crate::classify::Labels::new();

        for kind in kinds {
            let filename = match thumb::thumbnail(m.path(), &self.thumbnails_path, *kind) {
                Ok(filename) => filename,
                Err(err) => {
                    error!("index: {err}");
                    continue;
                }
            };

            match classifier.file(&filename) {
                Ok(image_labels) => labels.0.extend(image_labels),
                Err(err) => {
                    error!("index: {err}");
                }
            }
        }

        labels.sort();

        // Confidence gate: everything below a third of the best label's
        // confidence is noise.
        let mut results = crate::classify::Labels::new();
        let mut confidence = 0;

        for label in labels.iter() {
            if confidence == 0 {
                confidence = 100 - label.uncertainty;
            }

            if (100 - label.uncertainty) > confidence / 3 {
                results.push(label.clone());
            }
        }

        debug!("index: image classification took {:?}", start.elapsed());

        results
    }

    pub(super) fn is_nsfw(&self, m: &MediaFile) -> bool {
        if !self.detect_nsfw {
            return false;
        }

        let detector = match &self.nsfw_detector {
            Some(detector) => detector,
            None => return false,
        };

        let filename = match thumb::thumbnail(m.path(), &self.thumbnails_path, ThumbKind::Fit720) {
            Ok(filename) => filename,
            Err(err) => {
                error!("index: {err}");
                return false;
            }
        };

        match detector.file(&filename) {
            Ok(true) => {
                warn!("index: \"{}\" might contain offensive content", m.file_name());
                true
            }
            Ok(false) => false,
            Err(err) => {
                error!("index: {err}");
                false
            }
        }
    }

    /// Intern labels and attach them to a photo. The best confidence seen
    /// for an edge wins; category edges are appended idempotently.
    pub(super) fn add_labels(&self, photo_id: i64, labels: &crate::classify::Labels) {
        for label in labels.iter() {
            let (mut stored, is_new) = match self
                .catalog
                .first_or_create_label(&txt::title(&label.name), label.priority)
            {
                Ok(result) => result,
                Err(err) => {
                    error!("index: {err}");
                    continue;
                }
            };

            if is_new {
                self.bus.entities_created(
                    "labels",
                    json!({"labelUUID": stored.label_uuid, "labelName": stored.label_name}),
                );

                if label.priority >= 0 {
                    self.bus.publish("count.labels", json!({"count": 1}));
                }
            }

            if stored.label_priority != label.priority {
                stored.label_priority = label.priority;
                if let Err(err) = self.catalog.save_label(&stored) {
                    error!("index: {err}");
                }
            }

            let (photo_label, _) = match self.catalog.first_or_create_photo_label(
                photo_id,
                stored.id,
                label.uncertainty,
                &label.source,
            ) {
                Ok(result) => result,
                Err(err) => {
                    error!("index: {err}");
                    continue;
                }
            };

            for category in &label.categories {
                match self.catalog.first_or_create_label(&txt::title(category), -3) {
                    Ok((category_label, _)) => {
                        if let Err(err) = self.catalog.link_category(stored.id, category_label.id) {
                            error!("index: {err}");
                        }
                    }
                    Err(err) => {
                        error!("index: {err}");
                    }
                }
            }

            if photo_label.label_uncertainty > label.uncertainty {
                let updated = PhotoLabel {
                    photo_id,
                    label_id: stored.id,
                    label_uncertainty: label.uncertainty,
                    label_source: label.source.clone(),
                };
                if let Err(err) = self.catalog.save_photo_label(&updated) {
                    error!("index: {err}");
                }
            }
        }
    }
}
