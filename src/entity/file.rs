use chrono::{DateTime, Utc};

/// One file row under the originals tree. `file_name` is the path relative
/// to the originals root and unique across the catalog; `file_hash` keys the
/// content for move/rename dedup.
#[derive(Debug, Clone, Default)]
pub struct File {
    pub id: i64,
    pub photo_id: i64,
    pub photo_uuid: String,
    pub file_uuid: String,
    pub file_name: String,
    pub original_name: String,
    pub file_hash: String,
    pub file_size: i64,
    pub file_modified: Option<DateTime<Utc>>,
    pub file_type: String,
    pub file_mime: String,
    pub file_primary: bool,
    pub file_sidecar: bool,
    pub file_video: bool,
    pub file_missing: bool,
    pub file_orientation: i32,

    pub file_width: i32,
    pub file_height: i32,
    pub file_aspect_ratio: f64,
    pub file_portrait: bool,

    pub file_main_color: String,
    pub file_colors: String,
    pub file_luminance: String,
    pub file_diff: i32,
    pub file_chroma: i32,

    /// Elapsed indexing time in nanoseconds, split by create vs. update.
    pub created_in: i64,
    pub updated_in: i64,
}

impl File {
    /// True if size or modification time differ from the stored values.
    /// Timestamps are compared at second precision to stay stable across
    /// filesystems.
    pub fn changed(&self, size: i64, modified: DateTime<Utc>) -> bool {
        if self.file_size != size {
            return true;
        }
        match self.file_modified {
            Some(stored) => stored.timestamp() != modified.timestamp(),
            None => true,
        }
    }
}
