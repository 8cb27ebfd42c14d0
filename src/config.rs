use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the originals tree that gets indexed.
    #[serde(default = "default_originals_path")]
    pub originals_path: PathBuf,

    /// Staging directory for imports; files are copied or moved from here
    /// into the originals tree.
    #[serde(default = "default_import_path")]
    pub import_path: PathBuf,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub thumbnails: ThumbnailConfig,

    #[serde(default)]
    pub classify: ClassifyConfig,

    #[serde(default)]
    pub geocode: GeocodeConfig,

    /// Size of the indexing worker pool.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    #[serde(default = "default_thumb_cache_path")]
    pub path: PathBuf,

    /// Edge length of the render-sized thumbnail used for color analysis.
    #[serde(default = "default_render_size")]
    pub render_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Disables label classification entirely when false.
    #[serde(default = "default_classify_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub detect_nsfw: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeocodeConfig {
    /// Reverse-geocoding API endpoint. Location resolution is skipped when
    /// unset.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_geocode_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_originals_path() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("originals")
}

fn default_import_path() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("import")
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photocat")
        .join("photocat.db")
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8))
        .unwrap_or(2)
}

fn default_image_extensions() -> Vec<String> {
    vec![
        "jpg".to_string(),
        "jpeg".to_string(),
        "png".to_string(),
        "gif".to_string(),
        "tif".to_string(),
        "tiff".to_string(),
        "bmp".to_string(),
        "heic".to_string(),
        "raw".to_string(),
        "cr2".to_string(),
        "nef".to_string(),
        "arw".to_string(),
        "dng".to_string(),
        "mp4".to_string(),
        "mov".to_string(),
        "avi".to_string(),
        "xmp".to_string(),
    ]
}

fn default_thumb_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("photocat")
        .join("thumbnails")
}

fn default_render_size() -> u32 {
    720
}

fn default_classify_enabled() -> bool {
    true
}

fn default_geocode_timeout_secs() -> u64 {
    10
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            path: default_thumb_cache_path(),
            render_size: default_render_size(),
        }
    }
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            enabled: default_classify_enabled(),
            detect_nsfw: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            originals_path: default_originals_path(),
            import_path: default_import_path(),
            db_path: default_db_path(),
            scanner: ScannerConfig::default(),
            thumbnails: ThumbnailConfig::default(),
            classify: ClassifyConfig::default(),
            geocode: GeocodeConfig::default(),
            workers: default_workers(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("photocat")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Shallow map of client-visible settings, published as
    /// `config.updated` after a batch.
    pub fn client_values(&self) -> serde_json::Value {
        serde_json::json!({
            "originalsPath": self.originals_path,
            "importPath": self.import_path,
            "classify": self.classify.enabled,
            "detectNSFW": self.classify.detect_nsfw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();

        assert_eq!(parsed.workers, config.workers);
        assert_eq!(parsed.scanner.image_extensions, config.scanner.image_extensions);
        assert_eq!(parsed.thumbnails.render_size, 720);
        assert!(parsed.geocode.endpoint.is_none());
    }

    #[test]
    fn test_partial_config_uses_field_defaults() {
        let parsed: Config = toml::from_str("workers = 1\n").unwrap();
        assert_eq!(parsed.workers, 1);
        assert!(parsed.classify.enabled);
        assert_eq!(parsed.geocode.timeout_secs, 10);
    }
}
