//! Normalized metadata extracted from EXIF.

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{Context, Exif, In, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// Windows XP tags in IFD0; not covered by the standard tag constants.
// Their payload is UTF-16LE text stored as a byte array.
const TAG_XP_TITLE: Tag = Tag(Context::Tiff, 0x9c9b);
const TAG_XP_KEYWORDS: Tag = Tag(Context::Tiff, 0x9c9e);
const TAG_XP_SUBJECT: Tag = Tag(Context::Tiff, 0x9c9f);

/// Normalized metadata record. String fields are empty when the source had
/// nothing to offer; coordinates are zero when no GPS data exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaData {
    pub unique_id: String,
    pub title: String,
    pub description: String,
    pub comment: String,
    pub subject: String,
    pub keywords: String,
    pub artist: String,
    pub camera_owner: String,
    pub copyright: String,

    pub camera_make: String,
    pub camera_model: String,
    pub camera_serial: String,
    pub lens_make: String,
    pub lens_model: String,
    pub focal_length: i32,
    pub f_number: f64,
    pub iso: i32,
    pub exposure: String,
    pub orientation: i32,

    pub taken_at: Option<DateTime<Utc>>,
    pub taken_at_local: Option<NaiveDateTime>,
    pub time_zone: String,

    pub lat: f64,
    pub lng: f64,
    pub altitude: i32,
}

/// Read and normalize EXIF data from an image file.
pub fn extract(path: &Path) -> Result<MetaData> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader)?;

    let mut data = MetaData {
        title: xp_text(&exif, TAG_XP_TITLE),
        subject: xp_text(&exif, TAG_XP_SUBJECT),
        keywords: xp_text(&exif, TAG_XP_KEYWORDS),
        camera_make: ascii(&exif, Tag::Make),
        camera_model: ascii(&exif, Tag::Model),
        camera_serial: ascii(&exif, Tag::BodySerialNumber),
        camera_owner: ascii(&exif, Tag::CameraOwnerName),
        lens_make: ascii(&exif, Tag::LensMake),
        lens_model: ascii(&exif, Tag::LensModel),
        description: ascii(&exif, Tag::ImageDescription),
        artist: ascii(&exif, Tag::Artist),
        copyright: ascii(&exif, Tag::Copyright),
        unique_id: ascii(&exif, Tag::ImageUniqueID),
        comment: user_comment(&exif),
        ..Default::default()
    };

    if let Some(focal) = rational(&exif, Tag::FocalLength) {
        data.focal_length = focal.round() as i32;
    }

    if let Some(f_number) = rational(&exif, Tag::FNumber) {
        data.f_number = f_number;
    }

    if let Some(iso) = uint(&exif, Tag::PhotographicSensitivity) {
        data.iso = iso as i32;
    }

    if let Some(field) = exif.get_field(Tag::ExposureTime, In::PRIMARY) {
        data.exposure = field.display_value().to_string();
    }

    if let Some(orientation) = uint(&exif, Tag::Orientation) {
        data.orientation = orientation as i32;
    }

    if let Some(local) = datetime(&exif, Tag::DateTimeOriginal).or_else(|| datetime(&exif, Tag::DateTime)) {
        let offset = ascii(&exif, Tag::OffsetTimeOriginal);
        data.taken_at_local = Some(local);
        data.time_zone = offset.clone();
        data.taken_at = Some(match parse_offset(&offset) {
            Some(seconds) => (local - chrono::Duration::seconds(seconds)).and_utc(),
            None => local.and_utc(),
        });
    }

    if let Some((lat, lng)) = gps_coordinates(&exif) {
        data.lat = lat;
        data.lng = lng;
    }

    if let Some(altitude) = rational(&exif, Tag::GPSAltitude) {
        let below_sea = uint(&exif, Tag::GPSAltitudeRef) == Some(1);
        let altitude = altitude.round() as i32;
        data.altitude = if below_sea { -altitude } else { altitude };
    }

    Ok(data)
}

fn ascii(exif: &Exif, tag: Tag) -> String {
    exif.get_field(tag, In::PRIMARY)
        .map(|field| {
            field
                .display_value()
                .to_string()
                .trim_matches('"')
                .trim()
                .to_string()
        })
        .unwrap_or_default()
}

fn user_comment(exif: &Exif) -> String {
    let field = match exif.get_field(Tag::UserComment, In::PRIMARY) {
        Some(field) => field,
        None => return String::new(),
    };

    match &field.value {
        // Byte layout: an 8-byte character-set prefix, then the comment.
        Value::Undefined(bytes, _) if bytes.len() > 8 && bytes.starts_with(b"ASCII") => {
            String::from_utf8_lossy(&bytes[8..]).trim().to_string()
        }
        Value::Ascii(_) => field
            .display_value()
            .to_string()
            .trim_matches('"')
            .trim()
            .to_string(),
        _ => String::new(),
    }
}

fn xp_text(exif: &Exif, tag: Tag) -> String {
    let field = match exif.get_field(tag, In::PRIMARY) {
        Some(field) => field,
        None => return String::new(),
    };

    match &field.value {
        Value::Byte(bytes) => utf16le_to_string(bytes),
        Value::Undefined(bytes, _) => utf16le_to_string(bytes),
        _ => String::new(),
    }
}

fn utf16le_to_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16_lossy(&units)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

fn rational(exif: &Exif, tag: Tag) -> Option<f64> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(values) => values.first().map(|r| r.to_f64()),
        _ => None,
    }
}

fn uint(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
}

fn datetime(exif: &Exif, tag: Tag) -> Option<NaiveDateTime> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let text = field
        .display_value()
        .to_string()
        .trim_matches('"')
        .trim()
        .to_string();
    parse_exif_datetime(&text)
}

/// EXIF stores timestamps as `YYYY:MM:DD HH:MM:SS`.
fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim_end_matches('\0').trim(), "%Y:%m:%d %H:%M:%S").ok()
}

/// Parse a `+HH:MM` / `-HH:MM` UTC offset into seconds.
fn parse_offset(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.len() != 6 {
        return None;
    }

    let sign = match &s[..1] {
        "+" => 1,
        "-" => -1,
        _ => return None,
    };

    let hours: i64 = s[1..3].parse().ok()?;
    let minutes: i64 = s[4..6].parse().ok()?;
    if &s[3..4] != ":" || hours > 14 || minutes > 59 {
        return None;
    }

    Some(sign * (hours * 3600 + minutes * 60))
}

fn gps_coordinates(exif: &Exif) -> Option<(f64, f64)> {
    let lat_field = exif.get_field(Tag::GPSLatitude, In::PRIMARY)?;
    let lat_ref = exif.get_field(Tag::GPSLatitudeRef, In::PRIMARY)?;
    let lng_field = exif.get_field(Tag::GPSLongitude, In::PRIMARY)?;
    let lng_ref = exif.get_field(Tag::GPSLongitudeRef, In::PRIMARY)?;

    let (lat_values, lng_values) = match (&lat_field.value, &lng_field.value) {
        (Value::Rational(lat), Value::Rational(lng)) if lat.len() >= 3 && lng.len() >= 3 => {
            (lat, lng)
        }
        _ => return None,
    };

    let lat = dms_to_decimal(
        lat_values[0].to_f64(),
        lat_values[1].to_f64(),
        lat_values[2].to_f64(),
    );
    let lng = dms_to_decimal(
        lng_values[0].to_f64(),
        lng_values[1].to_f64(),
        lng_values[2].to_f64(),
    );

    let lat = if lat_ref.display_value().to_string().contains('S') {
        -lat
    } else {
        lat
    };
    let lng = if lng_ref.display_value().to_string().contains('W') {
        -lng
    } else {
        lng
    };

    Some((lat, lng))
}

fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dms_to_decimal() {
        let lat = dms_to_decimal(48.0, 8.0, 13.2);
        assert!((lat - 48.137).abs() < 1e-9);
    }

    #[test]
    fn test_parse_exif_datetime() {
        let dt = parse_exif_datetime("2021:06:01 12:00:00").unwrap();
        assert_eq!(dt.to_string(), "2021-06-01 12:00:00");
        assert!(parse_exif_datetime("junk").is_none());
        assert!(parse_exif_datetime("2021:06:01 12:00:00\0").is_some());
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("+02:00"), Some(7200));
        assert_eq!(parse_offset("-05:30"), Some(-19800));
        assert_eq!(parse_offset(""), None);
        assert_eq!(parse_offset("02:00"), None);
    }

    #[test]
    fn test_utf16le_to_string() {
        let bytes: Vec<u8> = "Beach; Sunset\0"
            .encode_utf16()
            .flat_map(|unit| unit.to_le_bytes())
            .collect();
        assert_eq!(utf16le_to_string(&bytes), "Beach; Sunset");

        assert_eq!(utf16le_to_string(&[]), "");
        // A trailing odd byte is ignored.
        assert_eq!(utf16le_to_string(&[0x41, 0x00, 0x42]), "A");
    }

    #[test]
    fn test_extract_fails_without_exif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        std::fs::write(&path, b"no exif here").unwrap();
        assert!(extract(&path).is_err());
    }
}
