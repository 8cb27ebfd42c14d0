pub const SCHEMA: &str = r#"
-- Photos: one row per logical photo; files reference their photo by id.
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    photo_uuid TEXT NOT NULL UNIQUE,
    photo_path TEXT NOT NULL DEFAULT '',
    photo_name TEXT NOT NULL DEFAULT '',
    photo_title TEXT NOT NULL DEFAULT '',
    photo_favorite INTEGER NOT NULL DEFAULT 0,
    photo_nsfw INTEGER NOT NULL DEFAULT 0,

    taken_at TEXT,
    taken_at_local TEXT,
    time_zone TEXT NOT NULL DEFAULT '',
    photo_year INTEGER NOT NULL DEFAULT 0,
    photo_month INTEGER NOT NULL DEFAULT 0,

    photo_lat REAL NOT NULL DEFAULT 0,
    photo_lng REAL NOT NULL DEFAULT 0,
    photo_altitude INTEGER NOT NULL DEFAULT 0,
    photo_country TEXT NOT NULL DEFAULT 'zz',
    location_id TEXT,
    place_id TEXT,
    location_estimated INTEGER NOT NULL DEFAULT 0,

    camera_id INTEGER,
    lens_id INTEGER,
    camera_serial TEXT NOT NULL DEFAULT '',
    photo_focal_length INTEGER NOT NULL DEFAULT 0,
    photo_f_number REAL NOT NULL DEFAULT 0,
    photo_iso INTEGER NOT NULL DEFAULT 0,
    photo_exposure TEXT NOT NULL DEFAULT '',

    modified_title INTEGER NOT NULL DEFAULT 0,
    modified_date INTEGER NOT NULL DEFAULT 0,
    modified_location INTEGER NOT NULL DEFAULT 0,
    modified_camera INTEGER NOT NULL DEFAULT 0,

    created_at TEXT,
    updated_at TEXT,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_photos_path_name ON photos(photo_path, photo_name);
CREATE INDEX IF NOT EXISTS idx_photos_coords ON photos(photo_lat, photo_lng, taken_at);
CREATE INDEX IF NOT EXISTS idx_photos_taken_at ON photos(taken_at);

-- Free-text fields, one row per photo.
CREATE TABLE IF NOT EXISTS descriptions (
    photo_id INTEGER PRIMARY KEY,
    description TEXT NOT NULL DEFAULT '',
    notes TEXT NOT NULL DEFAULT '',
    keywords TEXT NOT NULL DEFAULT '',
    subject TEXT NOT NULL DEFAULT '',
    artist TEXT NOT NULL DEFAULT '',
    copyright TEXT NOT NULL DEFAULT ''
);

-- Files: physical files under the originals tree.
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    photo_id INTEGER NOT NULL DEFAULT 0,
    photo_uuid TEXT NOT NULL DEFAULT '',
    file_uuid TEXT NOT NULL DEFAULT '',
    file_name TEXT NOT NULL UNIQUE,
    original_name TEXT NOT NULL DEFAULT '',
    file_hash TEXT NOT NULL DEFAULT '',
    file_size INTEGER NOT NULL DEFAULT 0,
    file_modified TEXT,
    file_type TEXT NOT NULL DEFAULT '',
    file_mime TEXT NOT NULL DEFAULT '',
    file_primary INTEGER NOT NULL DEFAULT 0,
    file_sidecar INTEGER NOT NULL DEFAULT 0,
    file_video INTEGER NOT NULL DEFAULT 0,
    file_missing INTEGER NOT NULL DEFAULT 0,
    file_orientation INTEGER NOT NULL DEFAULT 0,

    file_width INTEGER NOT NULL DEFAULT 0,
    file_height INTEGER NOT NULL DEFAULT 0,
    file_aspect_ratio REAL NOT NULL DEFAULT 0,
    file_portrait INTEGER NOT NULL DEFAULT 0,

    file_main_color TEXT NOT NULL DEFAULT '',
    file_colors TEXT NOT NULL DEFAULT '',
    file_luminance TEXT NOT NULL DEFAULT '',
    file_diff INTEGER NOT NULL DEFAULT 0,
    file_chroma INTEGER NOT NULL DEFAULT 0,

    created_in INTEGER NOT NULL DEFAULT 0,
    updated_in INTEGER NOT NULL DEFAULT 0,
    created_at TEXT,
    updated_at TEXT,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_files_hash ON files(file_hash);
CREATE INDEX IF NOT EXISTS idx_files_photo ON files(photo_id);
CREATE INDEX IF NOT EXISTS idx_files_primary ON files(photo_id, file_primary);

-- Labels, interned by slug.
CREATE TABLE IF NOT EXISTS labels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    label_uuid TEXT NOT NULL DEFAULT '',
    label_slug TEXT NOT NULL UNIQUE,
    label_name TEXT NOT NULL DEFAULT '',
    label_priority INTEGER NOT NULL DEFAULT 0,
    label_favorite INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS photos_labels (
    photo_id INTEGER NOT NULL,
    label_id INTEGER NOT NULL,
    label_uncertainty INTEGER NOT NULL DEFAULT 100,
    label_source TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (photo_id, label_id)
);

-- Category edges between labels (label -> category label).
CREATE TABLE IF NOT EXISTS label_categories (
    label_id INTEGER NOT NULL,
    category_id INTEGER NOT NULL,
    PRIMARY KEY (label_id, category_id)
);

-- Reverse-geocoded dimension rows.
CREATE TABLE IF NOT EXISTS places (
    id TEXT PRIMARY KEY,
    place_label TEXT NOT NULL DEFAULT '',
    place_city TEXT NOT NULL DEFAULT '',
    place_state TEXT NOT NULL DEFAULT '',
    place_country TEXT NOT NULL DEFAULT 'zz',
    place_keywords TEXT NOT NULL DEFAULT '',
    place_favorite INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS countries (
    id TEXT PRIMARY KEY,
    country_name TEXT NOT NULL DEFAULT '',
    country_slug TEXT NOT NULL DEFAULT ''
);

-- Locations memoize geocode results per geographic cell.
CREATE TABLE IF NOT EXISTS locations (
    id TEXT PRIMARY KEY,
    loc_lat REAL NOT NULL DEFAULT 0,
    loc_lng REAL NOT NULL DEFAULT 0,
    loc_name TEXT NOT NULL DEFAULT '',
    loc_category TEXT NOT NULL DEFAULT '',
    loc_keywords TEXT NOT NULL DEFAULT '',
    place_id TEXT NOT NULL DEFAULT 'zz'
);

CREATE TABLE IF NOT EXISTS cameras (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    camera_slug TEXT NOT NULL UNIQUE,
    camera_model TEXT NOT NULL DEFAULT '',
    camera_make TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS lenses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lens_slug TEXT NOT NULL UNIQUE,
    lens_model TEXT NOT NULL DEFAULT '',
    lens_make TEXT NOT NULL DEFAULT ''
);

-- Per-photo keyword index used by search.
CREATE TABLE IF NOT EXISTS keywords (
    photo_id INTEGER NOT NULL,
    keyword TEXT NOT NULL,
    PRIMARY KEY (photo_id, keyword)
);

-- Remote account sync state per file.
CREATE TABLE IF NOT EXISTS files_sync (
    file_id INTEGER NOT NULL,
    account_id INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (file_id, account_id)
);

-- Tracks downloaded/imported names until they are tied to a file row.
CREATE TABLE IF NOT EXISTS downloads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name TEXT NOT NULL,
    file_id INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_downloads_name ON downloads(file_name);
"#;
