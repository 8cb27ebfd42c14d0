//! Media file descriptor: lazy accessors over one file in the originals
//! tree. Hash, dimensions, and metadata are computed on first use and
//! cached for the lifetime of the descriptor.

pub mod colors;
pub mod meta;
pub mod thumb;
pub mod xmp;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::warn;

pub use meta::MetaData;

/// Media types the indexer understands. The string form is part of the
/// catalog contract (`file_type` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Png,
    Gif,
    Tiff,
    Bitmap,
    Heif,
    Raw,
    Mp4,
    Mov,
    Avi,
    Xmp,
    Other,
}

impl MediaType {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" => MediaType::Jpeg,
            "png" => MediaType::Png,
            "gif" => MediaType::Gif,
            "tif" | "tiff" => MediaType::Tiff,
            "bmp" => MediaType::Bitmap,
            "heic" | "heif" => MediaType::Heif,
            "raw" | "cr2" | "nef" | "arw" | "dng" => MediaType::Raw,
            "mp4" => MediaType::Mp4,
            "mov" => MediaType::Mov,
            "avi" => MediaType::Avi,
            "xmp" => MediaType::Xmp,
            _ => MediaType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "jpg",
            MediaType::Png => "png",
            MediaType::Gif => "gif",
            MediaType::Tiff => "tiff",
            MediaType::Bitmap => "bmp",
            MediaType::Heif => "heif",
            MediaType::Raw => "raw",
            MediaType::Mp4 => "mp4",
            MediaType::Mov => "mov",
            MediaType::Avi => "avi",
            MediaType::Xmp => "xmp",
            MediaType::Other => "",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Gif => "image/gif",
            MediaType::Tiff => "image/tiff",
            MediaType::Bitmap => "image/bmp",
            MediaType::Heif => "image/heif",
            MediaType::Raw => "image/x-raw",
            MediaType::Mp4 => "video/mp4",
            MediaType::Mov => "video/quicktime",
            MediaType::Avi => "video/x-msvideo",
            MediaType::Xmp => "application/rdf+xml",
            MediaType::Other => "application/octet-stream",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, MediaType::Mp4 | MediaType::Mov | MediaType::Avi)
    }

    pub fn is_sidecar(&self) -> bool {
        matches!(self, MediaType::Xmp)
    }
}

pub struct MediaFile {
    path: PathBuf,
    media_type: MediaType,
    hash: OnceLock<String>,
    dimensions: OnceLock<(u32, u32)>,
    metadata: OnceLock<Option<MetaData>>,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(anyhow!("media: file not found: {}", path.display()));
        }
        let media_type = MediaType::from_path(&path);
        Ok(Self {
            path,
            media_type,
            hash: OnceLock::new(),
            dimensions: OnceLock::new(),
            metadata: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute file name as a string.
    pub fn file_name(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    /// File stem without directory and extension.
    pub fn base(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Directory part relative to `root`, empty if the file sits directly in
    /// the root.
    pub fn relative_path(&self, root: &Path) -> String {
        let parent = self.path.parent().unwrap_or(Path::new(""));
        parent
            .strip_prefix(root)
            .unwrap_or(parent)
            .to_string_lossy()
            .to_string()
    }

    /// Path relative to `root` including the file name.
    pub fn relative_name(&self, root: &Path) -> String {
        self.path
            .strip_prefix(root)
            .unwrap_or(&self.path)
            .to_string_lossy()
            .to_string()
    }

    /// SHA-256 over the file content, lowercase hex. Empty on read failure.
    pub fn hash(&self) -> &str {
        self.hash.get_or_init(|| match hash_file(&self.path) {
            Ok(hash) => hash,
            Err(err) => {
                warn!("media: could not hash {}: {err}", self.path.display());
                String::new()
            }
        })
    }

    /// File size in bytes and modification time.
    pub fn stat(&self) -> Result<(i64, DateTime<Utc>)> {
        let metadata = std::fs::metadata(&self.path)?;
        let modified: DateTime<Utc> = metadata.modified()?.into();
        Ok((metadata.len() as i64, modified))
    }

    /// Normalized metadata from EXIF, `None` when the file has none.
    /// Sidecar files are never parsed for EXIF.
    pub fn meta_data(&self) -> Option<&MetaData> {
        self.metadata
            .get_or_init(|| {
                if self.is_sidecar() {
                    return None;
                }
                match meta::extract(&self.path) {
                    Ok(data) => Some(data),
                    Err(err) => {
                        warn!("media: no metadata for {}: {err}", self.path.display());
                        None
                    }
                }
            })
            .as_ref()
    }

    /// True if metadata carries both a capture time and GPS coordinates.
    pub fn has_time_and_place(&self) -> bool {
        match self.meta_data() {
            Some(meta) => meta.taken_at.is_some() && meta.lat != 0.0 && meta.lng != 0.0,
            None => false,
        }
    }

    /// Best known creation time: capture time from metadata, else the
    /// filesystem modification time.
    pub fn date_created(&self) -> DateTime<Utc> {
        if let Some(taken_at) = self.meta_data().and_then(|meta| meta.taken_at) {
            return taken_at;
        }
        self.stat().map(|(_, modified)| modified).unwrap_or_else(|_| Utc::now())
    }

    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    pub fn aspect_ratio(&self) -> f64 {
        let (width, height) = self.dimensions();
        if height == 0 {
            return 0.0;
        }
        // Two decimal places is enough to tell square from cropped formats.
        (width as f64 / height as f64 * 100.0).round() / 100.0
    }

    fn dimensions(&self) -> (u32, u32) {
        *self.dimensions.get_or_init(|| {
            image::ImageReader::open(&self.path)
                .ok()
                .and_then(|reader| reader.into_dimensions().ok())
                .unwrap_or((0, 0))
        })
    }

    pub fn orientation(&self) -> i32 {
        self.meta_data().map(|meta| meta.orientation).unwrap_or(0)
    }

    pub fn file_type(&self) -> MediaType {
        self.media_type
    }

    pub fn mime_type(&self) -> &'static str {
        self.media_type.mime()
    }

    pub fn is_jpeg(&self) -> bool {
        self.media_type == MediaType::Jpeg
    }

    pub fn is_xmp(&self) -> bool {
        self.media_type == MediaType::Xmp
    }

    pub fn is_sidecar(&self) -> bool {
        self.media_type.is_sidecar()
    }

    pub fn is_video(&self) -> bool {
        self.media_type.is_video()
    }

    pub fn camera_model(&self) -> &str {
        self.meta_data().map(|meta| meta.camera_model.as_str()).unwrap_or("")
    }

    pub fn camera_make(&self) -> &str {
        self.meta_data().map(|meta| meta.camera_make.as_str()).unwrap_or("")
    }

    pub fn lens_model(&self) -> &str {
        self.meta_data().map(|meta| meta.lens_model.as_str()).unwrap_or("")
    }

    pub fn lens_make(&self) -> &str {
        self.meta_data().map(|meta| meta.lens_make.as_str()).unwrap_or("")
    }

    pub fn focal_length(&self) -> i32 {
        self.meta_data().map(|meta| meta.focal_length).unwrap_or(0)
    }

    pub fn f_number(&self) -> f64 {
        self.meta_data().map(|meta| meta.f_number).unwrap_or(0.0)
    }

    pub fn iso(&self) -> i32 {
        self.meta_data().map(|meta| meta.iso).unwrap_or(0)
    }

    pub fn exposure(&self) -> &str {
        self.meta_data().map(|meta| meta.exposure.as_str()).unwrap_or("")
    }

    /// GPS coordinates when present.
    pub fn location(&self) -> Option<(f64, f64)> {
        let meta = self.meta_data()?;
        if meta.lat == 0.0 && meta.lng == 0.0 {
            None
        } else {
            Some((meta.lat, meta.lng))
        }
    }
}

fn hash_file(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();

    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_media_type_from_path() {
        assert_eq!(MediaType::from_path(Path::new("a.JPG")), MediaType::Jpeg);
        assert_eq!(MediaType::from_path(Path::new("a.xmp")), MediaType::Xmp);
        assert_eq!(MediaType::from_path(Path::new("a.mov")), MediaType::Mov);
        assert_eq!(MediaType::from_path(Path::new("a")), MediaType::Other);
        assert!(MediaType::Mp4.is_video());
        assert!(MediaType::Xmp.is_sidecar());
        assert_eq!(MediaType::Jpeg.as_str(), "jpg");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(MediaFile::new("/nonexistent/file.jpg").is_err());
    }

    #[test]
    fn test_relative_names_and_hash() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("2021").join("06");
        std::fs::create_dir_all(&sub).unwrap();
        let path = sub.join("beach.jpg");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"not a real jpeg").unwrap();

        let m = MediaFile::new(&path).unwrap();
        assert_eq!(m.base(), "beach");
        assert_eq!(m.relative_path(dir.path()), format!("2021{}06", std::path::MAIN_SEPARATOR));
        assert!(m.relative_name(dir.path()).ends_with("beach.jpg"));

        let hash = m.hash().to_string();
        assert_eq!(hash.len(), 64);
        // Cached value is stable.
        assert_eq!(m.hash(), hash);

        let (size, _) = m.stat().unwrap();
        assert_eq!(size, 15);
    }
}
