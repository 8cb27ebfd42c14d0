//! Color analysis for JPEG files.
//!
//! The image is reduced to a 3x3 zone grid; every zone snaps to the nearest
//! of sixteen well-known colors. The zone strings (color indexes and
//! luminance, one hex digit each) are stored on the file row and power
//! color search and duplicate hints.

use anyhow::Result;
use image::imageops::FilterType;
use std::path::Path;

/// Named colors, index order is part of the stored format.
const COLORS: &[(&str, [u8; 3])] = &[
    ("purple", [128, 0, 128]),
    ("magenta", [255, 0, 255]),
    ("pink", [255, 192, 203]),
    ("red", [255, 0, 0]),
    ("orange", [255, 165, 0]),
    ("gold", [255, 215, 0]),
    ("yellow", [255, 255, 0]),
    ("lime", [0, 255, 0]),
    ("green", [0, 128, 0]),
    ("teal", [0, 128, 128]),
    ("cyan", [0, 255, 255]),
    ("blue", [0, 0, 255]),
    ("brown", [139, 69, 19]),
    ("white", [255, 255, 255]),
    ("grey", [128, 128, 128]),
    ("black", [0, 0, 0]),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Palette {
    /// Name of the most frequent zone color.
    pub main_color: String,
    /// One hex digit per zone: index into the named color table.
    pub colors: String,
    /// One hex digit per zone: perceived luminance, 0 (dark) to f (bright).
    pub luminance: String,
    /// Accumulated luminance contrast between neighboring zones.
    pub diff: i32,
    /// Average saturation, 0-100.
    pub chroma: i32,
}

pub fn analyze(path: &Path) -> Result<Palette> {
    let img = image::open(path)?;
    let zones = img.resize_exact(3, 3, FilterType::Triangle).to_rgb8();

    let mut counts = [0u32; COLORS.len()];
    let mut colors = String::with_capacity(9);
    let mut luminance_digits = Vec::with_capacity(9);
    let mut saturation_total = 0u32;

    for pixel in zones.pixels() {
        let [r, g, b] = pixel.0;

        let index = nearest_color(r, g, b);
        counts[index] += 1;
        colors.push(char::from_digit(index as u32, 16).unwrap_or('0'));

        luminance_digits.push(luminance_digit(r, g, b));
        saturation_total += saturation(r, g, b);
    }

    let luminance: String = luminance_digits
        .iter()
        .map(|l| char::from_digit(*l as u32, 16).unwrap_or('0'))
        .collect();

    let diff = luminance_digits
        .windows(2)
        .map(|pair| (pair[0] as i32 - pair[1] as i32).abs())
        .sum();

    let main_index = counts
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
        .map(|(index, _)| index)
        .unwrap_or(0);

    Ok(Palette {
        main_color: COLORS[main_index].0.to_string(),
        colors,
        luminance,
        diff,
        chroma: (saturation_total / 9) as i32,
    })
}

fn nearest_color(r: u8, g: u8, b: u8) -> usize {
    let mut best = 0;
    let mut best_distance = u32::MAX;

    for (index, (_, [cr, cg, cb])) in COLORS.iter().enumerate() {
        let dr = r as i32 - *cr as i32;
        let dg = g as i32 - *cg as i32;
        let db = b as i32 - *cb as i32;
        let distance = (dr * dr + dg * dg + db * db) as u32;

        if distance < best_distance {
            best_distance = distance;
            best = index;
        }
    }

    best
}

fn luminance_digit(r: u8, g: u8, b: u8) -> u8 {
    let lum = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
    (lum / 16.0).min(15.0) as u8
}

fn saturation(r: u8, g: u8, b: u8) -> u32 {
    let max = r.max(g).max(b) as u32;
    let min = r.min(g).min(b) as u32;
    if max == 0 {
        return 0;
    }
    (max - min) * 100 / max
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::tempdir;

    fn solid_image(dir: &Path, name: &str, rgb: [u8; 3]) -> std::path::PathBuf {
        let mut img = RgbImage::new(12, 12);
        for pixel in img.pixels_mut() {
            pixel.0 = rgb;
        }
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_solid_blue() {
        let dir = tempdir().unwrap();
        let path = solid_image(dir.path(), "blue.png", [0, 0, 255]);

        let palette = analyze(&path).unwrap();
        assert_eq!(palette.main_color, "blue");
        assert_eq!(palette.colors, "bbbbbbbbb");
        assert_eq!(palette.diff, 0);
        assert_eq!(palette.chroma, 100);
    }

    #[test]
    fn test_solid_black_has_no_chroma() {
        let dir = tempdir().unwrap();
        let path = solid_image(dir.path(), "black.png", [0, 0, 0]);

        let palette = analyze(&path).unwrap();
        assert_eq!(palette.main_color, "black");
        assert_eq!(palette.luminance, "000000000");
        assert_eq!(palette.chroma, 0);
    }
}
