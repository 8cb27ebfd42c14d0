//! Thumbnail generation and caching.
//!
//! Thumbnails are keyed by a hash of the source path plus the thumbnail
//! kind and rendered once; subsequent requests return the cached file.

use anyhow::Result;
use image::imageops::FilterType;
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};

/// Thumbnail variants used by the indexer. The 224px crops feed the
/// classifier, `fit_720` feeds NSFW detection and color analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbKind {
    Tile224,
    Left224,
    Right224,
    Fit720,
}

impl ThumbKind {
    pub fn name(&self) -> &'static str {
        match self {
            ThumbKind::Tile224 => "tile_224",
            ThumbKind::Left224 => "left_224",
            ThumbKind::Right224 => "right_224",
            ThumbKind::Fit720 => "fit_720",
        }
    }
}

/// Render (or fetch from cache) a thumbnail for `original`.
pub fn thumbnail(original: &Path, cache_dir: &Path, kind: ThumbKind) -> Result<PathBuf> {
    fs::create_dir_all(cache_dir)?;

    let cache_path = cache_path(original, cache_dir, kind);
    if cache_path.exists() {
        return Ok(cache_path);
    }

    let img = image::open(original)?;
    let thumb = match kind {
        ThumbKind::Fit720 => img.thumbnail(720, 720),
        ThumbKind::Tile224 => square_crop(img, Anchor::Center).resize_exact(224, 224, FilterType::Triangle),
        ThumbKind::Left224 => square_crop(img, Anchor::Leading).resize_exact(224, 224, FilterType::Triangle),
        ThumbKind::Right224 => square_crop(img, Anchor::Trailing).resize_exact(224, 224, FilterType::Triangle),
    };

    // JPEG output cannot carry an alpha channel.
    DynamicImage::ImageRgb8(thumb.to_rgb8()).save(&cache_path)?;

    Ok(cache_path)
}

enum Anchor {
    Leading,
    Center,
    Trailing,
}

fn square_crop(img: DynamicImage, anchor: Anchor) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if width == height {
        return img;
    }

    let side = width.min(height);
    let span = width.max(height) - side;
    let offset = match anchor {
        Anchor::Leading => 0,
        Anchor::Center => span / 2,
        Anchor::Trailing => span,
    };

    if width > height {
        img.crop_imm(offset, 0, side, side)
    } else {
        img.crop_imm(0, offset, side, side)
    }
}

fn cache_path(original: &Path, cache_dir: &Path, kind: ThumbKind) -> PathBuf {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    original.to_string_lossy().hash(&mut hasher);
    let hash = hasher.finish();

    cache_dir.join(format!("{:016x}_{}.jpg", hash, kind.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::tempdir;

    #[test]
    fn test_tile_thumbnail_is_square_and_cached() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache");

        let source = dir.path().join("wide.png");
        RgbImage::new(100, 50).save(&source).unwrap();

        let thumb = thumbnail(&source, &cache, ThumbKind::Tile224).unwrap();
        let (w, h) = image::ImageReader::open(&thumb)
            .unwrap()
            .into_dimensions()
            .unwrap();
        assert_eq!((w, h), (224, 224));

        let modified = std::fs::metadata(&thumb).unwrap().modified().unwrap();
        let again = thumbnail(&source, &cache, ThumbKind::Tile224).unwrap();
        assert_eq!(again, thumb);
        assert_eq!(std::fs::metadata(&again).unwrap().modified().unwrap(), modified);
    }

    #[test]
    fn test_fit_keeps_aspect() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache");

        let source = dir.path().join("tall.png");
        RgbImage::new(360, 1440).save(&source).unwrap();

        let thumb = thumbnail(&source, &cache, ThumbKind::Fit720).unwrap();
        let (w, h) = image::ImageReader::open(&thumb)
            .unwrap()
            .into_dimensions()
            .unwrap();
        assert_eq!(h, 720);
        assert_eq!(w, 180);
    }
}
