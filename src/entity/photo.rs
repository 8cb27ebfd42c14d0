use chrono::{DateTime, Datelike, NaiveDateTime, Utc};

use super::UNKNOWN_PLACE_ID;

/// One photo in the catalog. A photo owns one or more files; the canonical
/// renderable JPEG among them is the primary file.
///
/// The `modified_*` flags mark fields the user has edited; the indexer never
/// overwrites a field whose flag is set.
#[derive(Debug, Clone, Default)]
pub struct Photo {
    pub id: i64,
    pub photo_uuid: String,
    pub photo_path: String,
    pub photo_name: String,
    pub photo_title: String,
    pub photo_favorite: bool,
    pub photo_nsfw: bool,

    pub taken_at: Option<DateTime<Utc>>,
    pub taken_at_local: Option<NaiveDateTime>,
    pub time_zone: String,
    pub photo_year: i32,
    pub photo_month: i32,

    pub photo_lat: f64,
    pub photo_lng: f64,
    pub photo_altitude: i32,
    pub photo_country: String,
    pub location_id: Option<String>,
    pub place_id: Option<String>,
    pub location_estimated: bool,

    pub camera_id: Option<i64>,
    pub lens_id: Option<i64>,
    pub camera_serial: String,
    pub photo_focal_length: i32,
    pub photo_f_number: f64,
    pub photo_iso: i32,
    pub photo_exposure: String,

    pub modified_title: bool,
    pub modified_date: bool,
    pub modified_location: bool,
    pub modified_camera: bool,
}

impl Photo {
    pub fn no_title(&self) -> bool {
        self.photo_title.trim().is_empty()
    }

    pub fn no_location(&self) -> bool {
        self.location_id.as_deref().unwrap_or("").is_empty()
    }

    pub fn no_camera_serial(&self) -> bool {
        self.camera_serial.trim().is_empty()
    }

    /// True if the photo points at a real, known place.
    pub fn has_place(&self) -> bool {
        matches!(self.place_id.as_deref(), Some(id) if !id.is_empty() && id != UNKNOWN_PLACE_ID)
    }

    /// Derive year and month from the taken-at timestamp. Must run after
    /// every write that may touch `taken_at`.
    pub fn update_date_fields(&mut self) {
        if let Some(taken_at) = self.taken_at {
            self.photo_year = taken_at.year();
            self.photo_month = taken_at.month() as i32;
        }
    }
}
