//! Typed read/write surface over the SQLite catalog.
//!
//! Lookups used for dedup ignore soft-deleted rows on purpose: re-indexing a
//! previously deleted file revives it. `first_or_create_*` methods operate by
//! natural key (label slug, camera slug, country code, place id) and return
//! the entity together with an `is_new` flag.

mod schema;

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::entity::{
    Camera, Country, Description, File, Label, Lens, Location, Photo, PhotoLabel, Place,
};
use crate::txt;

pub use schema::SCHEMA;

const PHOTO_COLS: &str = "id, photo_uuid, photo_path, photo_name, photo_title, photo_favorite, \
    photo_nsfw, taken_at, taken_at_local, time_zone, photo_year, photo_month, photo_lat, \
    photo_lng, photo_altitude, photo_country, location_id, place_id, location_estimated, \
    camera_id, lens_id, camera_serial, photo_focal_length, photo_f_number, photo_iso, \
    photo_exposure, modified_title, modified_date, modified_location, modified_camera";

const FILE_COLS: &str = "id, photo_id, photo_uuid, file_uuid, file_name, original_name, \
    file_hash, file_size, file_modified, file_type, file_mime, file_primary, file_sidecar, \
    file_video, file_missing, file_orientation, file_width, file_height, file_aspect_ratio, \
    file_portrait, file_main_color, file_colors, file_luminance, file_diff, file_chroma, \
    created_in, updated_in";

/// Timestamps are stored as `YYYY-MM-DD HH:MM:SS` in UTC so SQLite date
/// functions work on them directly.
const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn to_db_time(dt: &DateTime<Utc>) -> String {
    dt.format(DB_TIME_FORMAT).to_string()
}

fn from_db_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, DB_TIME_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

fn to_db_naive(dt: &NaiveDateTime) -> String {
    dt.format(DB_TIME_FORMAT).to_string()
}

fn from_db_naive(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DB_TIME_FORMAT).ok()
}

fn new_uuid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub struct Catalog {
    conn: Mutex<Connection>,
}

impl Catalog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    pub fn initialize(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(SCHEMA)?;

        // Seed the well-known placeholder rows.
        conn.execute(
            "INSERT OR IGNORE INTO places (id, place_label, place_country) VALUES ('zz', 'Unknown', 'zz')",
            [],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO countries (id, country_name, country_slug) VALUES ('zz', 'Unknown', 'unknown')",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ------------------------------------------------------------------
    // Photos
    // ------------------------------------------------------------------

    pub fn photo_by_id(&self, id: i64) -> Result<Option<Photo>> {
        let conn = self.lock();
        let result = conn
            .query_row(
                &format!("SELECT {PHOTO_COLS} FROM photos WHERE id = ?1"),
                params![id],
                photo_from_row,
            )
            .optional()?;
        Ok(result)
    }

    pub fn photo_by_path_name(&self, path: &str, name: &str) -> Result<Option<Photo>> {
        let conn = self.lock();
        let result = conn
            .query_row(
                &format!("SELECT {PHOTO_COLS} FROM photos WHERE photo_path = ?1 AND photo_name = ?2"),
                params![path, name],
                photo_from_row,
            )
            .optional()?;
        Ok(result)
    }

    /// Exact spatio-temporal match used as the last dedup resort. Values are
    /// compared as stored, so callers must pass coordinates produced by this
    /// crate's own metadata decoding.
    pub fn photo_by_coordinates(
        &self,
        lat: f64,
        lng: f64,
        taken_at: DateTime<Utc>,
    ) -> Result<Option<Photo>> {
        let conn = self.lock();
        let result = conn
            .query_row(
                &format!(
                    "SELECT {PHOTO_COLS} FROM photos \
                     WHERE photo_lat = ?1 AND photo_lng = ?2 AND taken_at = ?3"
                ),
                params![lat, lng, to_db_time(&taken_at)],
                photo_from_row,
            )
            .optional()?;
        Ok(result)
    }

    /// The photo taken closest to `taken_at` in absolute day difference,
    /// excluding `exclude_id`. Drives location estimation.
    pub fn closest_photo_by_taken_at(
        &self,
        taken_at: DateTime<Utc>,
        exclude_id: i64,
    ) -> Result<Option<Photo>> {
        let conn = self.lock();
        let result = conn
            .query_row(
                &format!(
                    "SELECT {PHOTO_COLS} FROM photos \
                     WHERE id <> ?1 AND taken_at IS NOT NULL \
                     ORDER BY ABS(julianday(taken_at) - julianday(?2)) ASC LIMIT 1"
                ),
                params![exclude_id, to_db_time(&taken_at)],
                photo_from_row,
            )
            .optional()?;
        Ok(result)
    }

    pub fn create_photo(&self, photo: &mut Photo) -> Result<()> {
        if photo.photo_uuid.is_empty() {
            photo.photo_uuid = new_uuid();
        }

        let now = to_db_time(&Utc::now());
        let conn = self.lock();
        conn.execute(
            "INSERT INTO photos (photo_uuid, photo_path, photo_name, photo_title, \
             photo_favorite, photo_nsfw, taken_at, taken_at_local, time_zone, photo_year, \
             photo_month, photo_lat, photo_lng, photo_altitude, photo_country, location_id, \
             place_id, location_estimated, camera_id, lens_id, camera_serial, \
             photo_focal_length, photo_f_number, photo_iso, photo_exposure, modified_title, \
             modified_date, modified_location, modified_camera, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
             ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?30)",
            params![
                photo.photo_uuid,
                photo.photo_path,
                photo.photo_name,
                photo.photo_title,
                photo.photo_favorite,
                photo.photo_nsfw,
                photo.taken_at.as_ref().map(to_db_time),
                photo.taken_at_local.as_ref().map(to_db_naive),
                photo.time_zone,
                photo.photo_year,
                photo.photo_month,
                photo.photo_lat,
                photo.photo_lng,
                photo.photo_altitude,
                photo.photo_country,
                photo.location_id,
                photo.place_id,
                photo.location_estimated,
                photo.camera_id,
                photo.lens_id,
                photo.camera_serial,
                photo.photo_focal_length,
                photo.photo_f_number,
                photo.photo_iso,
                photo.photo_exposure,
                photo.modified_title,
                photo.modified_date,
                photo.modified_location,
                photo.modified_camera,
                now,
            ],
        )?;
        photo.id = conn.last_insert_rowid();
        Ok(())
    }

    /// Update an existing photo row in place; soft-deleted rows are written
    /// like any other.
    pub fn save_photo(&self, photo: &Photo) -> Result<()> {
        let now = to_db_time(&Utc::now());
        let conn = self.lock();
        conn.execute(
            "UPDATE photos SET photo_uuid = ?1, photo_path = ?2, photo_name = ?3, \
             photo_title = ?4, photo_favorite = ?5, photo_nsfw = ?6, taken_at = ?7, \
             taken_at_local = ?8, time_zone = ?9, photo_year = ?10, photo_month = ?11, \
             photo_lat = ?12, photo_lng = ?13, photo_altitude = ?14, photo_country = ?15, \
             location_id = ?16, place_id = ?17, location_estimated = ?18, camera_id = ?19, \
             lens_id = ?20, camera_serial = ?21, photo_focal_length = ?22, \
             photo_f_number = ?23, photo_iso = ?24, photo_exposure = ?25, \
             modified_title = ?26, modified_date = ?27, modified_location = ?28, \
             modified_camera = ?29, updated_at = ?30 WHERE id = ?31",
            params![
                photo.photo_uuid,
                photo.photo_path,
                photo.photo_name,
                photo.photo_title,
                photo.photo_favorite,
                photo.photo_nsfw,
                photo.taken_at.as_ref().map(to_db_time),
                photo.taken_at_local.as_ref().map(to_db_naive),
                photo.time_zone,
                photo.photo_year,
                photo.photo_month,
                photo.photo_lat,
                photo.photo_lng,
                photo.photo_altitude,
                photo.photo_country,
                photo.location_id,
                photo.place_id,
                photo.location_estimated,
                photo.camera_id,
                photo.lens_id,
                photo.camera_serial,
                photo.photo_focal_length,
                photo.photo_f_number,
                photo.photo_iso,
                photo.photo_exposure,
                photo.modified_title,
                photo.modified_date,
                photo.modified_location,
                photo.modified_camera,
                now,
                photo.id,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Descriptions
    // ------------------------------------------------------------------

    /// The description row for a photo; a default record when none exists
    /// yet.
    pub fn description(&self, photo_id: i64) -> Result<Description> {
        let conn = self.lock();
        let result = conn
            .query_row(
                "SELECT photo_id, description, notes, keywords, subject, artist, copyright \
                 FROM descriptions WHERE photo_id = ?1",
                params![photo_id],
                |row| {
                    Ok(Description {
                        photo_id: row.get(0)?,
                        description: row.get(1)?,
                        notes: row.get(2)?,
                        keywords: row.get(3)?,
                        subject: row.get(4)?,
                        artist: row.get(5)?,
                        copyright: row.get(6)?,
                    })
                },
            )
            .optional()?;

        Ok(result.unwrap_or(Description {
            photo_id,
            ..Default::default()
        }))
    }

    pub fn save_description(&self, description: &Description) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO descriptions (photo_id, description, notes, keywords, subject, \
             artist, copyright) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT(photo_id) DO UPDATE SET description = ?2, notes = ?3, \
             keywords = ?4, subject = ?5, artist = ?6, copyright = ?7",
            params![
                description.photo_id,
                description.description,
                description.notes,
                description.keywords,
                description.subject,
                description.artist,
                description.copyright,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    pub fn file_by_name(&self, name: &str) -> Result<Option<File>> {
        let conn = self.lock();
        let result = conn
            .query_row(
                &format!("SELECT {FILE_COLS} FROM files WHERE file_name = ?1"),
                params![name],
                file_from_row,
            )
            .optional()?;
        Ok(result)
    }

    pub fn file_by_hash(&self, hash: &str) -> Result<Option<File>> {
        let conn = self.lock();
        let result = conn
            .query_row(
                &format!("SELECT {FILE_COLS} FROM files WHERE file_hash = ?1"),
                params![hash],
                file_from_row,
            )
            .optional()?;
        Ok(result)
    }

    /// The current primary JPEG of a photo, if any.
    pub fn primary_jpeg(&self, photo_id: i64) -> Result<Option<File>> {
        let conn = self.lock();
        let result = conn
            .query_row(
                &format!(
                    "SELECT {FILE_COLS} FROM files \
                     WHERE file_type = 'jpg' AND file_primary = 1 AND photo_id = ?1"
                ),
                params![photo_id],
                file_from_row,
            )
            .optional()?;
        Ok(result)
    }

    pub fn files_by_photo(&self, photo_id: i64) -> Result<Vec<File>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare(&format!("SELECT {FILE_COLS} FROM files WHERE photo_id = ?1"))?;
        let files = stmt
            .query_map(params![photo_id], file_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    pub fn create_file(&self, file: &mut File) -> Result<()> {
        if file.file_uuid.is_empty() {
            file.file_uuid = new_uuid();
        }

        let now = to_db_time(&Utc::now());
        let conn = self.lock();
        conn.execute(
            "INSERT INTO files (photo_id, photo_uuid, file_uuid, file_name, original_name, \
             file_hash, file_size, file_modified, file_type, file_mime, file_primary, \
             file_sidecar, file_video, file_missing, file_orientation, file_width, \
             file_height, file_aspect_ratio, file_portrait, file_main_color, file_colors, \
             file_luminance, file_diff, file_chroma, created_in, updated_in, created_at, \
             updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, \
             ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?27)",
            params![
                file.photo_id,
                file.photo_uuid,
                file.file_uuid,
                file.file_name,
                file.original_name,
                file.file_hash,
                file.file_size,
                file.file_modified.as_ref().map(to_db_time),
                file.file_type,
                file.file_mime,
                file.file_primary,
                file.file_sidecar,
                file.file_video,
                file.file_missing,
                file.file_orientation,
                file.file_width,
                file.file_height,
                file.file_aspect_ratio,
                file.file_portrait,
                file.file_main_color,
                file.file_colors,
                file.file_luminance,
                file.file_diff,
                file.file_chroma,
                file.created_in,
                file.updated_in,
                now,
            ],
        )?;
        file.id = conn.last_insert_rowid();
        Ok(())
    }

    /// Update an existing file row; clears any soft-delete mark so a
    /// re-indexed file comes back to life.
    pub fn save_file(&self, file: &File) -> Result<()> {
        let now = to_db_time(&Utc::now());
        let conn = self.lock();
        conn.execute(
            "UPDATE files SET photo_id = ?1, photo_uuid = ?2, file_uuid = ?3, \
             file_name = ?4, original_name = ?5, file_hash = ?6, file_size = ?7, \
             file_modified = ?8, file_type = ?9, file_mime = ?10, file_primary = ?11, \
             file_sidecar = ?12, file_video = ?13, file_missing = ?14, \
             file_orientation = ?15, file_width = ?16, file_height = ?17, \
             file_aspect_ratio = ?18, file_portrait = ?19, file_main_color = ?20, \
             file_colors = ?21, file_luminance = ?22, file_diff = ?23, file_chroma = ?24, \
             created_in = ?25, updated_in = ?26, updated_at = ?27, deleted_at = NULL \
             WHERE id = ?28",
            params![
                file.photo_id,
                file.photo_uuid,
                file.file_uuid,
                file.file_name,
                file.original_name,
                file.file_hash,
                file.file_size,
                file.file_modified.as_ref().map(to_db_time),
                file.file_type,
                file.file_mime,
                file.file_primary,
                file.file_sidecar,
                file.file_video,
                file.file_missing,
                file.file_orientation,
                file.file_width,
                file.file_height,
                file.file_aspect_ratio,
                file.file_portrait,
                file.file_main_color,
                file.file_colors,
                file.file_luminance,
                file.file_diff,
                file.file_chroma,
                file.created_in,
                file.updated_in,
                now,
                file.id,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Labels
    // ------------------------------------------------------------------

    pub fn first_or_create_label(&self, name: &str, priority: i32) -> Result<(Label, bool)> {
        let slug = txt::slug(name);
        let conn = self.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO labels (label_uuid, label_slug, label_name, label_priority) \
             VALUES (?1, ?2, ?3, ?4)",
            params![new_uuid(), slug, name, priority],
        )?;

        let label = conn.query_row(
            "SELECT id, label_uuid, label_slug, label_name, label_priority, label_favorite \
             FROM labels WHERE label_slug = ?1",
            params![slug],
            label_from_row,
        )?;

        Ok((label, inserted > 0))
    }

    pub fn save_label(&self, label: &Label) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE labels SET label_name = ?1, label_priority = ?2, label_favorite = ?3 \
             WHERE id = ?4",
            params![
                label.label_name,
                label.label_priority,
                label.label_favorite,
                label.id
            ],
        )?;
        Ok(())
    }

    pub fn first_or_create_photo_label(
        &self,
        photo_id: i64,
        label_id: i64,
        uncertainty: i32,
        source: &str,
    ) -> Result<(PhotoLabel, bool)> {
        let conn = self.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO photos_labels (photo_id, label_id, label_uncertainty, \
             label_source) VALUES (?1, ?2, ?3, ?4)",
            params![photo_id, label_id, uncertainty, source],
        )?;

        let photo_label = conn.query_row(
            "SELECT photo_id, label_id, label_uncertainty, label_source FROM photos_labels \
             WHERE photo_id = ?1 AND label_id = ?2",
            params![photo_id, label_id],
            |row| {
                Ok(PhotoLabel {
                    photo_id: row.get(0)?,
                    label_id: row.get(1)?,
                    label_uncertainty: row.get(2)?,
                    label_source: row.get(3)?,
                })
            },
        )?;

        Ok((photo_label, inserted > 0))
    }

    pub fn photo_labels(&self, photo_id: i64) -> Result<Vec<(PhotoLabel, Label)>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT pl.photo_id, pl.label_id, pl.label_uncertainty, pl.label_source, \
             l.id, l.label_uuid, l.label_slug, l.label_name, l.label_priority, l.label_favorite \
             FROM photos_labels pl JOIN labels l ON l.id = pl.label_id \
             WHERE pl.photo_id = ?1 ORDER BY l.label_slug",
        )?;
        let rows = stmt
            .query_map(params![photo_id], |row| {
                Ok((
                    PhotoLabel {
                        photo_id: row.get(0)?,
                        label_id: row.get(1)?,
                        label_uncertainty: row.get(2)?,
                        label_source: row.get(3)?,
                    },
                    Label {
                        id: row.get(4)?,
                        label_uuid: row.get(5)?,
                        label_slug: row.get(6)?,
                        label_name: row.get(7)?,
                        label_priority: row.get(8)?,
                        label_favorite: row.get(9)?,
                    },
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn save_photo_label(&self, photo_label: &PhotoLabel) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE photos_labels SET label_uncertainty = ?1, label_source = ?2 \
             WHERE photo_id = ?3 AND label_id = ?4",
            params![
                photo_label.label_uncertainty,
                photo_label.label_source,
                photo_label.photo_id,
                photo_label.label_id,
            ],
        )?;
        Ok(())
    }

    /// Append a category edge between two labels. The composite primary key
    /// makes repeated appends idempotent.
    pub fn link_category(&self, label_id: i64, category_id: i64) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR IGNORE INTO label_categories (label_id, category_id) VALUES (?1, ?2)",
            params![label_id, category_id],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Places, countries, locations
    // ------------------------------------------------------------------

    pub fn place(&self, id: &str) -> Result<Option<Place>> {
        let conn = self.lock();
        let result = conn
            .query_row(
                "SELECT id, place_label, place_city, place_state, place_country, \
                 place_keywords, place_favorite FROM places WHERE id = ?1",
                params![id],
                place_from_row,
            )
            .optional()?;
        Ok(result)
    }

    pub fn first_or_create_place(&self, place: &Place) -> Result<(Place, bool)> {
        let conn = self.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO places (id, place_label, place_city, place_state, \
             place_country, place_keywords, place_favorite) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                place.id,
                place.place_label,
                place.place_city,
                place.place_state,
                place.place_country,
                place.place_keywords,
                place.place_favorite,
            ],
        )?;

        let stored = conn.query_row(
            "SELECT id, place_label, place_city, place_state, place_country, place_keywords, \
             place_favorite FROM places WHERE id = ?1",
            params![place.id],
            place_from_row,
        )?;

        Ok((stored, inserted > 0))
    }

    pub fn first_or_create_country(&self, code: &str, name: &str) -> Result<(Country, bool)> {
        let code = if code.is_empty() { "zz" } else { code };
        let conn = self.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO countries (id, country_name, country_slug) VALUES (?1, ?2, ?3)",
            params![code, name, txt::slug(name)],
        )?;

        let country = conn.query_row(
            "SELECT id, country_name, country_slug FROM countries WHERE id = ?1",
            params![code],
            |row| {
                Ok(Country {
                    id: row.get(0)?,
                    country_name: row.get(1)?,
                    country_slug: row.get(2)?,
                })
            },
        )?;

        Ok((country, inserted > 0))
    }

    pub fn location(&self, id: &str) -> Result<Option<Location>> {
        let conn = self.lock();
        let result = conn
            .query_row(
                "SELECT id, loc_lat, loc_lng, loc_name, loc_category, loc_keywords, place_id \
                 FROM locations WHERE id = ?1",
                params![id],
                location_from_row,
            )
            .optional()?;
        Ok(result)
    }

    pub fn create_location(&self, location: &Location) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR IGNORE INTO locations (id, loc_lat, loc_lng, loc_name, loc_category, \
             loc_keywords, place_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                location.id,
                location.loc_lat,
                location.loc_lng,
                location.loc_name,
                location.loc_category,
                location.loc_keywords,
                location.place_id,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cameras and lenses
    // ------------------------------------------------------------------

    pub fn first_or_create_camera(&self, model: &str, make: &str) -> Result<(Camera, bool)> {
        let slug = dimension_slug(model, make);
        let conn = self.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO cameras (camera_slug, camera_model, camera_make) \
             VALUES (?1, ?2, ?3)",
            params![slug, model, make],
        )?;

        let camera = conn.query_row(
            "SELECT id, camera_slug, camera_model, camera_make FROM cameras WHERE camera_slug = ?1",
            params![slug],
            |row| {
                Ok(Camera {
                    id: row.get(0)?,
                    camera_slug: row.get(1)?,
                    camera_model: row.get(2)?,
                    camera_make: row.get(3)?,
                })
            },
        )?;

        Ok((camera, inserted > 0))
    }

    pub fn first_or_create_lens(&self, model: &str, make: &str) -> Result<(Lens, bool)> {
        let slug = dimension_slug(model, make);
        let conn = self.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO lenses (lens_slug, lens_model, lens_make) VALUES (?1, ?2, ?3)",
            params![slug, model, make],
        )?;

        let lens = conn.query_row(
            "SELECT id, lens_slug, lens_model, lens_make FROM lenses WHERE lens_slug = ?1",
            params![slug],
            |row| {
                Ok(Lens {
                    id: row.get(0)?,
                    lens_slug: row.get(1)?,
                    lens_model: row.get(2)?,
                    lens_make: row.get(3)?,
                })
            },
        )?;

        Ok((lens, inserted > 0))
    }

    // ------------------------------------------------------------------
    // Keywords, downloads, sync
    // ------------------------------------------------------------------

    /// Maintain the per-photo keyword index used by search.
    pub fn index_keywords(&self, photo_id: i64, keywords: &[String]) -> Result<()> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("INSERT OR IGNORE INTO keywords (photo_id, keyword) VALUES (?1, ?2)")?;
        for keyword in keywords {
            stmt.execute(params![photo_id, keyword])?;
        }
        Ok(())
    }

    /// Tie a download/import record to the file row it produced.
    pub fn set_download_file_id(&self, file_name: &str, file_id: i64) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE downloads SET file_id = ?1 WHERE file_name = ?2 AND file_id = 0",
            params![file_id, file_name],
        )?;
        Ok(())
    }

    /// Files still missing from a remote account, ordered by name. Raw files
    /// are excluded unless the account syncs raw.
    pub fn account_uploads(
        &self,
        account_id: i64,
        sync_raw: bool,
        limit: i64,
    ) -> Result<Vec<File>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILE_COLS} FROM files \
             WHERE file_missing = 0 \
             AND id NOT IN (SELECT file_id FROM files_sync WHERE file_id > 0 AND account_id = ?1) \
             AND (?2 OR file_type <> 'raw') \
             ORDER BY file_name ASC LIMIT ?3"
        ))?;
        let files = stmt
            .query_map(
                params![account_id, sync_raw, if limit > 0 { limit } else { -1 }],
                file_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }
}

fn dimension_slug(model: &str, make: &str) -> String {
    let slug = txt::slug(&format!("{make} {model}"));
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}

fn photo_from_row(row: &Row) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        photo_uuid: row.get(1)?,
        photo_path: row.get(2)?,
        photo_name: row.get(3)?,
        photo_title: row.get(4)?,
        photo_favorite: row.get(5)?,
        photo_nsfw: row.get(6)?,
        taken_at: row
            .get::<_, Option<String>>(7)?
            .as_deref()
            .and_then(from_db_time),
        taken_at_local: row
            .get::<_, Option<String>>(8)?
            .as_deref()
            .and_then(from_db_naive),
        time_zone: row.get(9)?,
        photo_year: row.get(10)?,
        photo_month: row.get(11)?,
        photo_lat: row.get(12)?,
        photo_lng: row.get(13)?,
        photo_altitude: row.get(14)?,
        photo_country: row.get(15)?,
        location_id: row.get(16)?,
        place_id: row.get(17)?,
        location_estimated: row.get(18)?,
        camera_id: row.get(19)?,
        lens_id: row.get(20)?,
        camera_serial: row.get(21)?,
        photo_focal_length: row.get(22)?,
        photo_f_number: row.get(23)?,
        photo_iso: row.get(24)?,
        photo_exposure: row.get(25)?,
        modified_title: row.get(26)?,
        modified_date: row.get(27)?,
        modified_location: row.get(28)?,
        modified_camera: row.get(29)?,
    })
}

fn file_from_row(row: &Row) -> rusqlite::Result<File> {
    Ok(File {
        id: row.get(0)?,
        photo_id: row.get(1)?,
        photo_uuid: row.get(2)?,
        file_uuid: row.get(3)?,
        file_name: row.get(4)?,
        original_name: row.get(5)?,
        file_hash: row.get(6)?,
        file_size: row.get(7)?,
        file_modified: row
            .get::<_, Option<String>>(8)?
            .as_deref()
            .and_then(from_db_time),
        file_type: row.get(9)?,
        file_mime: row.get(10)?,
        file_primary: row.get(11)?,
        file_sidecar: row.get(12)?,
        file_video: row.get(13)?,
        file_missing: row.get(14)?,
        file_orientation: row.get(15)?,
        file_width: row.get(16)?,
        file_height: row.get(17)?,
        file_aspect_ratio: row.get(18)?,
        file_portrait: row.get(19)?,
        file_main_color: row.get(20)?,
        file_colors: row.get(21)?,
        file_luminance: row.get(22)?,
        file_diff: row.get(23)?,
        file_chroma: row.get(24)?,
        created_in: row.get(25)?,
        updated_in: row.get(26)?,
    })
}

fn label_from_row(row: &Row) -> rusqlite::Result<Label> {
    Ok(Label {
        id: row.get(0)?,
        label_uuid: row.get(1)?,
        label_slug: row.get(2)?,
        label_name: row.get(3)?,
        label_priority: row.get(4)?,
        label_favorite: row.get(5)?,
    })
}

fn place_from_row(row: &Row) -> rusqlite::Result<Place> {
    Ok(Place {
        id: row.get(0)?,
        place_label: row.get(1)?,
        place_city: row.get(2)?,
        place_state: row.get(3)?,
        place_country: row.get(4)?,
        place_keywords: row.get(5)?,
        place_favorite: row.get(6)?,
    })
}

fn location_from_row(row: &Row) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        loc_lat: row.get(1)?,
        loc_lng: row.get(2)?,
        loc_name: row.get(3)?,
        loc_category: row.get(4)?,
        loc_keywords: row.get(5)?,
        place_id: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_catalog() -> Catalog {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.initialize().unwrap();
        catalog
    }

    #[test]
    fn test_photo_create_and_lookup() {
        let catalog = test_catalog();
        let taken = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap();

        let mut photo = Photo {
            photo_path: "2021/06".to_string(),
            photo_name: "a".to_string(),
            photo_lat: 48.137,
            photo_lng: 11.575,
            taken_at: Some(taken),
            ..Default::default()
        };
        catalog.create_photo(&mut photo).unwrap();
        assert!(photo.id > 0);
        assert!(!photo.photo_uuid.is_empty());

        let by_path = catalog.photo_by_path_name("2021/06", "a").unwrap().unwrap();
        assert_eq!(by_path.id, photo.id);
        assert_eq!(by_path.taken_at, Some(taken));

        let by_coords = catalog
            .photo_by_coordinates(48.137, 11.575, taken)
            .unwrap()
            .unwrap();
        assert_eq!(by_coords.photo_uuid, photo.photo_uuid);
    }

    #[test]
    fn test_file_create_save_and_lookup() {
        let catalog = test_catalog();
        let mut file = File {
            photo_id: 1,
            file_name: "2021/06/a.jpg".to_string(),
            file_hash: "abc123".to_string(),
            file_type: "jpg".to_string(),
            file_primary: true,
            ..Default::default()
        };
        catalog.create_file(&mut file).unwrap();
        assert!(file.id > 0);

        assert!(catalog.file_by_name("2021/06/a.jpg").unwrap().is_some());
        assert!(catalog.file_by_hash("abc123").unwrap().is_some());
        assert!(catalog.file_by_hash("missing").unwrap().is_none());

        let primary = catalog.primary_jpeg(1).unwrap().unwrap();
        assert_eq!(primary.id, file.id);

        file.file_main_color = "blue".to_string();
        catalog.save_file(&file).unwrap();
        let reloaded = catalog.file_by_name("2021/06/a.jpg").unwrap().unwrap();
        assert_eq!(reloaded.file_main_color, "blue");
    }

    #[test]
    fn test_first_or_create_label_is_idempotent() {
        let catalog = test_catalog();

        let (label, is_new) = catalog.first_or_create_label("Dog", 0).unwrap();
        assert!(is_new);
        assert_eq!(label.label_slug, "dog");

        let (again, is_new) = catalog.first_or_create_label("Dog", 0).unwrap();
        assert!(!is_new);
        assert_eq!(again.id, label.id);
    }

    #[test]
    fn test_photo_label_keeps_best_uncertainty_on_conflict() {
        let catalog = test_catalog();
        let (label, _) = catalog.first_or_create_label("Cat", 0).unwrap();

        let (first, is_new) = catalog
            .first_or_create_photo_label(1, label.id, 20, "image")
            .unwrap();
        assert!(is_new);
        assert_eq!(first.label_uncertainty, 20);

        // Second insert is ignored; the stored edge is returned unchanged.
        let (second, is_new) = catalog
            .first_or_create_photo_label(1, label.id, 50, "image")
            .unwrap();
        assert!(!is_new);
        assert_eq!(second.label_uncertainty, 20);
    }

    #[test]
    fn test_first_or_create_camera() {
        let catalog = test_catalog();
        let (camera, is_new) = catalog.first_or_create_camera("iPhone SE", "Apple").unwrap();
        assert!(is_new);
        assert!(camera.id >= 1);

        let (again, is_new) = catalog.first_or_create_camera("iPhone SE", "Apple").unwrap();
        assert!(!is_new);
        assert_eq!(again.id, camera.id);
    }

    #[test]
    fn test_closest_photo_by_taken_at() {
        let catalog = test_catalog();

        let mut near = Photo {
            photo_name: "near".to_string(),
            taken_at: Some(Utc.with_ymd_and_hms(2021, 6, 2, 8, 0, 0).unwrap()),
            place_id: Some("de:munich".to_string()),
            ..Default::default()
        };
        catalog.create_photo(&mut near).unwrap();

        let mut far = Photo {
            photo_name: "far".to_string(),
            taken_at: Some(Utc.with_ymd_and_hms(2019, 1, 1, 8, 0, 0).unwrap()),
            ..Default::default()
        };
        catalog.create_photo(&mut far).unwrap();

        let target = Utc.with_ymd_and_hms(2021, 6, 3, 10, 0, 0).unwrap();
        let closest = catalog
            .closest_photo_by_taken_at(target, 99)
            .unwrap()
            .unwrap();
        assert_eq!(closest.photo_name, "near");

        // The photo being estimated must not match itself.
        let closest = catalog
            .closest_photo_by_taken_at(target, near.id)
            .unwrap()
            .unwrap();
        assert_eq!(closest.photo_name, "far");
    }

    #[test]
    fn test_account_uploads_skips_synced_and_raw() {
        let catalog = test_catalog();

        let mut jpg = File {
            file_name: "a.jpg".to_string(),
            file_type: "jpg".to_string(),
            ..Default::default()
        };
        catalog.create_file(&mut jpg).unwrap();

        let mut raw = File {
            file_name: "b.raw".to_string(),
            file_type: "raw".to_string(),
            ..Default::default()
        };
        catalog.create_file(&mut raw).unwrap();

        let mut synced = File {
            file_name: "c.jpg".to_string(),
            file_type: "jpg".to_string(),
            ..Default::default()
        };
        catalog.create_file(&mut synced).unwrap();
        catalog
            .lock()
            .execute(
                "INSERT INTO files_sync (file_id, account_id, status) VALUES (?1, 1, 'synced')",
                params![synced.id],
            )
            .unwrap();

        let uploads = catalog.account_uploads(1, false, 10).unwrap();
        let names: Vec<_> = uploads.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg"]);

        let uploads = catalog.account_uploads(1, true, 10).unwrap();
        assert_eq!(uploads.len(), 2);
    }

    #[test]
    fn test_unknown_place_is_seeded() {
        let catalog = test_catalog();
        let place = catalog.place("zz").unwrap().unwrap();
        assert!(place.is_unknown());
        assert_eq!(place.place_label, "Unknown");
    }
}
