//! Reconciliation of one media file with the catalog.

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::{IndexOptions, IndexResult, IndexStatus, Indexer};
use crate::classify::Labels;
use crate::entity::{Description, File, Photo};
use crate::media::{xmp, MediaFile};
use crate::txt;

impl Indexer {
    /// Index one media file: identify the file and photo it belongs to, run
    /// the analyses the options ask for, merge metadata without clobbering
    /// user edits, and write the result back.
    pub fn media_file(&self, m: &MediaFile, opt: &IndexOptions, original_name: &str) -> IndexResult {
        match self.index_media_file(m, opt, original_name) {
            Ok(result) => result,
            Err(err) => {
                error!("index: {err:#}");
                IndexResult::failed(err)
            }
        }
    }

    fn index_media_file(
        &self,
        m: &MediaFile,
        opt: &IndexOptions,
        original_name: &str,
    ) -> Result<IndexResult> {
        let mut result = IndexResult::default();
        let start = Instant::now();

        let file_base = m.base();
        let file_path = m.relative_path(&self.originals_path);
        let file_name = m.relative_name(&self.originals_path);
        let (file_size, file_modified) = m
            .stat()
            .with_context(|| format!("index: could not stat {file_name}"))?;

        self.bus.publish(
            "index.indexing",
            json!({
                "fileHash": "",
                "fileSize": file_size,
                "fileName": file_name,
                "baseName": Path::new(&file_name)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| file_name.clone()),
            }),
        );

        // Identification: by name first, then by content hash (catches moves
        // and renames), then by photo path/name, then by the exact
        // spatio-temporal triple.
        let mut file_hash = String::new();
        let mut file = File::default();
        let mut file_exists = false;

        if let Some(existing) = self.catalog.file_by_name(&file_name)? {
            file = existing;
            file_exists = true;
        }

        if !file_exists && !m.is_sidecar() {
            file_hash = m.hash().to_string();
            if !file_hash.is_empty() {
                if let Some(existing) = self.catalog.file_by_hash(&file_hash)? {
                    file = existing;
                    file_exists = true;
                }
            }
        }

        let mut photo = Photo::default();
        let mut photo_exists = false;
        let mut file_changed = true;

        if file_exists {
            if let Some(existing) = self.catalog.photo_by_id(file.photo_id)? {
                photo = existing;
                photo_exists = true;
            }

            file_changed = file.changed(file_size, file_modified);

            if file_changed {
                debug!(
                    "index: file was modified (new size {file_size}, old size {}, new date {file_modified}, old date {:?})",
                    file.file_size, file.file_modified
                );
            }
        } else {
            if let Some(existing) = self.catalog.photo_by_path_name(&file_path, &file_base)? {
                photo = existing;
                photo_exists = true;
            }

            if !photo_exists && m.has_time_and_place() {
                if let Some(meta) = m.meta_data() {
                    if let Some(taken_at) = meta.taken_at {
                        if let Some(existing) =
                            self.catalog.photo_by_coordinates(meta.lat, meta.lng, taken_at)?
                        {
                            photo = existing;
                            photo_exists = true;
                        }
                    }
                }
            }
        }

        if !file_changed && photo_exists && opt.skip_unchanged {
            result.status = IndexStatus::Skipped;
            return Ok(result);
        }

        let mut description = if photo_exists {
            self.catalog.description(photo.id)?
        } else {
            Description::default()
        };

        if file_hash.is_empty() {
            file_hash = m.hash().to_string();
        }

        photo.photo_path = file_path.clone();
        photo.photo_name = file_base.clone();

        // Primary election: the first JPEG of a photo becomes its canonical
        // renderable file; a benign race may demote a later candidate.
        if !file.file_primary {
            if photo_exists {
                if self.catalog.primary_jpeg(photo.id)?.is_none() {
                    file.file_primary = m.is_jpeg();
                }
            } else {
                file.file_primary = m.is_jpeg();
            }
        }

        let mut labels = Labels::new();
        let mut loc_keywords: Vec<String> = Vec::new();

        if file.file_primary {
            if self.classify_enabled
                && (file_changed || opt.update_keywords || opt.update_labels || opt.update_title)
            {
                labels = self.classify_image(m);
                photo.photo_nsfw = self.is_nsfw(m);
            }

            if file_changed || opt.update_exif {
                if let Some(meta) = m.meta_data() {
                    if !photo.modified_location {
                        photo.photo_lat = meta.lat;
                        photo.photo_lng = meta.lng;
                        photo.photo_altitude = meta.altitude;
                    }

                    if !photo.modified_date {
                        photo.taken_at = meta.taken_at;
                        photo.taken_at_local = meta.taken_at_local;
                        photo.time_zone = meta.time_zone.clone();
                    }

                    if photo.no_title() {
                        photo.photo_title = meta.title.clone();
                    }

                    if description.no_description() {
                        description.description = meta.description.clone();
                    }

                    if description.no_notes() {
                        description.notes = meta.comment.clone();
                    }

                    if description.no_subject() {
                        description.subject = meta.subject.clone();
                    }

                    if description.no_keywords() {
                        description.keywords = meta.keywords.clone();
                    }

                    if description.no_artist() && !meta.artist.is_empty() {
                        description.artist = meta.artist.clone();
                    }

                    if description.no_artist() && !meta.camera_owner.is_empty() {
                        description.artist = meta.camera_owner.clone();
                    }

                    if photo.no_camera_serial() {
                        photo.camera_serial = meta.camera_serial.clone();
                    }

                    if meta.unique_id.len() > 15 {
                        debug!("index: file uuid \"{}\"", meta.unique_id);
                        file.file_uuid = meta.unique_id.clone();
                    }
                }
            }

            if !photo.modified_camera && (file_changed || opt.update_camera) {
                let (camera, _) = self
                    .catalog
                    .first_or_create_camera(m.camera_model(), m.camera_make())?;
                let (lens, _) = self
                    .catalog
                    .first_or_create_lens(m.lens_model(), m.lens_make())?;

                photo.camera_id = Some(camera.id);
                photo.lens_id = Some(lens.id);
                photo.photo_focal_length = m.focal_length();
                photo.photo_f_number = m.f_number();
                photo.photo_iso = m.iso();
                photo.photo_exposure = m.exposure().to_string();
            }

            if file_changed || opt.update_keywords || opt.update_location || opt.update_title {
                loc_keywords = self.index_location(m, &mut photo, &mut labels, file_changed, opt);
            }

            if photo.no_title()
                || (file_changed || opt.update_title) && !photo.modified_title && photo.no_location()
            {
                photo.photo_title = match labels.first() {
                    Some(label)
                        if label.priority >= -1
                            && label.uncertainty <= 85
                            && !label.name.is_empty() =>
                    {
                        format!("{} / {}", txt::title(&label.name), m.date_created().format("%Y"))
                    }
                    _ => match photo.taken_at_local {
                        Some(local) => {
                            use chrono::Timelike;
                            // Only the early evening maps to a word so far.
                            let daytime = match local.hour() {
                                17..=19 => "Sunset",
                                _ => "Unknown",
                            };
                            format!("{} / {}", daytime, local.format("%Y"))
                        }
                        None => "Unknown".to_string(),
                    },
                };

                info!("index: changed empty photo title to \"{}\"", photo.photo_title);
            }

            if photo.taken_at.is_none() || photo.taken_at_local.is_none() {
                let created = m.date_created();
                photo.taken_at = Some(created);
                photo.taken_at_local = Some(created.naive_utc());
            }
        } else if m.is_xmp() {
            let data = xmp::parse(m.path())
                .with_context(|| format!("index: could not parse sidecar {file_name}"))?;

            if !data.title.is_empty() && !photo.modified_title {
                photo.photo_title = data.title;
            }

            if description.no_copyright() && !data.copyright.is_empty() {
                description.copyright = data.copyright;
            }

            if description.no_artist() && !data.artist.is_empty() {
                description.artist = data.artist;
            }

            if description.no_description() && !data.description.is_empty() {
                description.description = data.description;
            }

            if description.no_notes() && !data.notes.is_empty() {
                description.notes = data.notes;
            }
        }

        photo.update_date_fields();

        if !original_name.is_empty() {
            file.original_name = original_name.to_string();
        }

        file.file_sidecar = m.is_sidecar();
        file.file_video = m.is_video();
        file.file_missing = false;
        file.file_name = file_name.clone();
        file.file_hash = file_hash;
        file.file_size = file_size;
        file.file_modified = Some(file_modified);
        file.file_type = m.file_type().as_str().to_string();
        file.file_mime = m.mime_type().to_string();
        file.file_orientation = m.orientation();

        if m.is_jpeg() && (file_changed || opt.update_colors) {
            match self.file_colors(m) {
                Ok(palette) => {
                    file.file_main_color = palette.main_color;
                    file.file_colors = palette.colors;
                    file.file_luminance = palette.luminance;
                    file.file_diff = palette.diff;
                    file.file_chroma = palette.chroma;
                }
                Err(err) => {
                    error!("index: {err}");
                }
            }
        }

        if m.is_jpeg() && (file_changed || opt.update_size) && m.width() > 0 && m.height() > 0 {
            file.file_width = m.width() as i32;
            file.file_height = m.height() as i32;
            file.file_aspect_ratio = m.aspect_ratio();
            file.file_portrait = m.width() < m.height();
        }

        if file.file_primary && (file_changed || opt.update_keywords) {
            let mut words = txt::keywords(&description.keywords);

            if txt::non_canonical(&file_base) {
                words.extend(txt::keywords(&file_path));
                words.extend(txt::keywords(&file_base));
            }

            words.extend(loc_keywords);
            words.extend(txt::keywords(&file.original_name));
            words.push(file.file_main_color.clone());
            words.extend(labels.keywords());

            description.keywords = txt::unique_words(words).join(", ");

            if description.keywords.is_empty() {
                debug!("index: no photo keywords");
            } else {
                debug!("index: updated photo keywords ({})", description.keywords);
            }
        }

        if photo_exists {
            if opt.update_location && photo.no_location() {
                if let Err(err) = crate::geo::estimate_location(&self.catalog, &mut photo) {
                    error!("index: {err}");
                }
            }

            self.catalog
                .save_photo(&photo)
                .context("index: could not save photo")?;
        } else {
            photo.photo_favorite = false;

            self.catalog
                .create_photo(&mut photo)
                .context("index: could not create photo")?;

            self.bus.publish("count.photos", json!({"count": 1}));
            self.bus
                .entities_created("photos", json!({"photoUUID": photo.photo_uuid}));
        }

        description.photo_id = photo.id;
        self.catalog
            .save_description(&description)
            .context("index: could not save description")?;

        if !labels.is_empty() {
            info!("index: adding {} labels", labels.len());
            self.add_labels(photo.id, &labels);
        }

        file.photo_id = photo.id;
        result.photo_id = photo.id;

        file.photo_uuid = photo.photo_uuid.clone();
        result.photo_uuid = photo.photo_uuid.clone();

        if file.file_primary && (file_changed || opt.update_keywords) {
            let keyword_list = txt::keywords(&description.keywords);
            if let Err(err) = self.catalog.index_keywords(photo.id, &keyword_list) {
                error!("index: {err}");
            }
        }

        result.status = IndexStatus::Updated;

        if file_exists {
            file.updated_in = start.elapsed().as_nanos() as i64;
            self.catalog
                .save_file(&file)
                .context("index: could not save file")?;
        } else {
            file.created_in = start.elapsed().as_nanos() as i64;
            self.catalog
                .create_file(&mut file)
                .context("index: could not create file")?;
            result.status = IndexStatus::Added;
        }

        result.file_id = file.id;
        result.file_uuid = file.file_uuid.clone();

        let downloaded_as = if original_name.is_empty() {
            file_name
        } else {
            original_name.to_string()
        };

        if let Err(err) = self.catalog.set_download_file_id(&downloaded_as, file.id) {
            warn!("index: {err}");
        }

        Ok(result)
    }

    /// Palette extraction over the render-sized thumbnail.
    fn file_colors(&self, m: &MediaFile) -> Result<crate::media::colors::Palette> {
        let thumb = crate::media::thumb::thumbnail(
            m.path(),
            &self.thumbnails_path,
            crate::media::thumb::ThumbKind::Fit720,
        )?;
        crate::media::colors::analyze(&thumb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::classify::{Classifier, Label};
    use crate::config::Config;
    use crate::events::EventBus;
    use crate::geo::{Geocoder, PlaceInfo};
    use anyhow::Result;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::tempdir;

    struct StubClassifier(Vec<Label>);

    impl Classifier for StubClassifier {
        fn file(&self, _path: &Path) -> Result<Vec<Label>> {
            Ok(self.0.clone())
        }
    }

    struct MunichGeocoder;

    impl Geocoder for MunichGeocoder {
        fn lookup(&self, _lat: f64, _lng: f64) -> Result<PlaceInfo> {
            Ok(PlaceInfo {
                name: "Marienplatz".to_string(),
                city: "Munich".to_string(),
                country_code: "de".to_string(),
                country_name: "Germany".to_string(),
                category: "square".to_string(),
                ..Default::default()
            })
        }
    }

    fn test_setup(dir: &Path) -> (Config, Arc<Catalog>, Arc<EventBus>) {
        let mut config = Config::default();
        config.originals_path = dir.join("originals");
        config.thumbnails.path = dir.join("cache");
        config.classify.enabled = true;
        config.geocode.endpoint = None;
        std::fs::create_dir_all(&config.originals_path).unwrap();

        let catalog = Arc::new(Catalog::open_in_memory().unwrap());
        catalog.initialize().unwrap();

        (config, catalog, Arc::new(EventBus::new()))
    }

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            pixel.0 = [0, 0, 200];
        }
        img.save(path).unwrap();
    }

    /// A decodable JPEG with an EXIF block carrying GPS 48.137/11.575 and
    /// DateTimeOriginal 2021-06-01 12:00:00.
    fn write_jpeg_with_exif(path: &Path, width: u32, height: u32) {
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            pixel.0 = [0, 0, 200];
        }

        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        let tiff = exif_block();
        let mut app1 = Vec::new();
        app1.extend_from_slice(&[0xFF, 0xE1]);
        app1.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        app1.extend_from_slice(b"Exif\0\0");
        app1.extend_from_slice(&tiff);

        // Splice the APP1 segment right after the SOI marker.
        let mut out = Vec::with_capacity(jpeg.len() + app1.len());
        out.extend_from_slice(&jpeg[..2]);
        out.extend_from_slice(&app1);
        out.extend_from_slice(&jpeg[2..]);
        std::fs::write(path, out).unwrap();
    }

    fn ifd_entry(tag: u16, kind: u16, count: u32, value: [u8; 4]) -> Vec<u8> {
        let mut entry = Vec::with_capacity(12);
        entry.extend_from_slice(&tag.to_le_bytes());
        entry.extend_from_slice(&kind.to_le_bytes());
        entry.extend_from_slice(&count.to_le_bytes());
        entry.extend_from_slice(&value);
        entry
    }

    fn exif_block() -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II");
        tiff.extend_from_slice(&42u16.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes());

        // IFD0: pointers to the Exif and GPS sub-IFDs.
        tiff.extend_from_slice(&2u16.to_le_bytes());
        tiff.extend(ifd_entry(0x8769, 4, 1, 38u32.to_le_bytes()));
        tiff.extend(ifd_entry(0x8825, 4, 1, 56u32.to_le_bytes()));
        tiff.extend_from_slice(&0u32.to_le_bytes());

        // Exif IFD: DateTimeOriginal.
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend(ifd_entry(0x9003, 2, 20, 110u32.to_le_bytes()));
        tiff.extend_from_slice(&0u32.to_le_bytes());

        // GPS IFD: latitude 48°8'13.2"N, longitude 11°34'30"E.
        tiff.extend_from_slice(&4u16.to_le_bytes());
        tiff.extend(ifd_entry(0x0001, 2, 2, *b"N\0\0\0"));
        tiff.extend(ifd_entry(0x0002, 5, 3, 130u32.to_le_bytes()));
        tiff.extend(ifd_entry(0x0003, 2, 2, *b"E\0\0\0"));
        tiff.extend(ifd_entry(0x0004, 5, 3, 154u32.to_le_bytes()));
        tiff.extend_from_slice(&0u32.to_le_bytes());

        assert_eq!(tiff.len(), 110);
        tiff.extend_from_slice(b"2021:06:01 12:00:00\0");

        for (num, denom) in [(48u32, 1u32), (8, 1), (132, 10)] {
            tiff.extend_from_slice(&num.to_le_bytes());
            tiff.extend_from_slice(&denom.to_le_bytes());
        }
        for (num, denom) in [(11u32, 1u32), (34, 1), (30, 1)] {
            tiff.extend_from_slice(&num.to_le_bytes());
            tiff.extend_from_slice(&denom.to_le_bytes());
        }

        tiff
    }

    #[test]
    fn test_new_photo_gets_location_title_and_keywords() {
        let dir = tempdir().unwrap();
        let (config, catalog, bus) = test_setup(dir.path());

        let path = config.originals_path.join("a.jpg");
        write_jpeg_with_exif(&path, 64, 64);

        let indexer = Indexer::new(catalog.clone(), bus, &config)
            .with_classifier(Arc::new(StubClassifier(vec![Label::new("dog", "image", 10, 0)])))
            .with_geocoder(Arc::new(MunichGeocoder));

        let m = MediaFile::new(&path).unwrap();
        let result = indexer.media_file(&m, &IndexOptions::default(), "");

        assert_eq!(result.status, IndexStatus::Added);
        assert!(result.success());
        assert!(result.photo_id > 0);

        let photo = catalog.photo_by_id(result.photo_id).unwrap().unwrap();
        assert_eq!(photo.photo_title, "Marienplatz / Munich / 2021");
        assert_eq!(photo.photo_country, "de");
        assert_eq!(photo.photo_year, 2021);
        assert_eq!(photo.photo_month, 6);
        assert!((photo.photo_lat - 48.137).abs() < 1e-9);
        assert!((photo.photo_lng - 11.575).abs() < 1e-9);

        let description = catalog.description(photo.id).unwrap();
        assert!(description.keywords.contains("dog"), "{}", description.keywords);
        assert!(description.keywords.contains("munich"), "{}", description.keywords);

        let labels = catalog.photo_labels(photo.id).unwrap();
        assert!(labels.iter().any(|(_, label)| label.label_name == "Dog"));
    }

    #[test]
    fn test_unchanged_file_is_skipped() {
        let dir = tempdir().unwrap();
        let (config, catalog, bus) = test_setup(dir.path());

        let path = config.originals_path.join("a.jpg");
        write_jpeg_with_exif(&path, 64, 64);

        let indexer = Indexer::new(catalog.clone(), bus.clone(), &config);

        let m = MediaFile::new(&path).unwrap();
        let first = indexer.media_file(&m, &IndexOptions::default(), "");
        assert_eq!(first.status, IndexStatus::Added);

        let photo_before = catalog.photo_by_id(first.photo_id).unwrap().unwrap();

        let events = bus.subscribe("");
        let m = MediaFile::new(&path).unwrap();
        let second = indexer.media_file(&m, &IndexOptions::changed_only(), "");
        assert_eq!(second.status, IndexStatus::Skipped);

        // Only the indexing notification fires on a skip.
        assert_eq!(events.recv().unwrap().topic, "index.indexing");
        assert!(events.try_recv().is_err());

        // Catalog state is untouched.
        let photo_after = catalog.photo_by_id(first.photo_id).unwrap().unwrap();
        assert_eq!(photo_after.photo_uuid, photo_before.photo_uuid);
        assert_eq!(photo_after.photo_title, photo_before.photo_title);
    }

    #[test]
    fn test_user_edited_title_is_never_overwritten() {
        let dir = tempdir().unwrap();
        let (config, catalog, bus) = test_setup(dir.path());

        let path = config.originals_path.join("IMG_1234.jpg");
        write_jpeg(&path, 64, 64);

        let indexer = Indexer::new(catalog.clone(), bus, &config)
            .with_classifier(Arc::new(StubClassifier(vec![Label::new("dog", "image", 10, 0)])));

        let m = MediaFile::new(&path).unwrap();
        let result = indexer.media_file(&m, &IndexOptions::default(), "");
        assert_eq!(result.status, IndexStatus::Added);

        let mut photo = catalog.photo_by_id(result.photo_id).unwrap().unwrap();
        photo.photo_title = "My Dog".to_string();
        photo.modified_title = true;
        catalog.save_photo(&photo).unwrap();

        let opt = IndexOptions {
            update_title: true,
            update_exif: true,
            ..Default::default()
        };
        let m = MediaFile::new(&path).unwrap();
        let result = indexer.media_file(&m, &opt, "");
        assert_eq!(result.status, IndexStatus::Updated);

        let photo = catalog.photo_by_id(result.photo_id).unwrap().unwrap();
        assert_eq!(photo.photo_title, "My Dog");
    }

    #[test]
    fn test_xmp_sidecar_sets_title_without_primary() {
        let dir = tempdir().unwrap();
        let (config, catalog, bus) = test_setup(dir.path());

        let path = config.originals_path.join("a.xmp");
        std::fs::write(
            &path,
            r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description xmlns:dc="http://purl.org/dc/elements/1.1/">
   <dc:title><rdf:Alt><rdf:li xml:lang="x-default">Beach</rdf:li></rdf:Alt></dc:title>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>"#,
        )
        .unwrap();

        let indexer = Indexer::new(catalog.clone(), bus, &config);

        let m = MediaFile::new(&path).unwrap();
        let result = indexer.media_file(&m, &IndexOptions::default(), "");

        assert_eq!(result.status, IndexStatus::Added);

        let photo = catalog.photo_by_id(result.photo_id).unwrap().unwrap();
        assert_eq!(photo.photo_title, "Beach");

        let file = catalog.file_by_name("a.xmp").unwrap().unwrap();
        assert!(file.file_sidecar);
        assert!(!file.file_primary);
        assert_eq!(file.file_type, "xmp");
    }

    #[test]
    fn test_location_is_estimated_from_closest_photo() {
        let dir = tempdir().unwrap();
        let (config, catalog, bus) = test_setup(dir.path());

        // Anchor photo with real coordinates, resolved to Munich.
        let anchor = config.originals_path.join("a.jpg");
        write_jpeg_with_exif(&anchor, 64, 64);

        let indexer = Indexer::new(catalog.clone(), bus, &config)
            .with_geocoder(Arc::new(MunichGeocoder));

        let m = MediaFile::new(&anchor).unwrap();
        assert_eq!(indexer.media_file(&m, &IndexOptions::default(), "").status, IndexStatus::Added);

        // A photo without GPS ends up at the unknown place first.
        let path = config.originals_path.join("b.jpg");
        write_jpeg(&path, 64, 64);

        let m = MediaFile::new(&path).unwrap();
        let first = indexer.media_file(&m, &IndexOptions::default(), "");
        assert_eq!(first.status, IndexStatus::Added);

        let photo = catalog.photo_by_id(first.photo_id).unwrap().unwrap();
        assert!(!photo.location_estimated);
        assert!(photo.no_location());

        // Forcing a location update estimates from the nearest photo by date.
        let opt = IndexOptions {
            update_location: true,
            ..Default::default()
        };
        let m = MediaFile::new(&path).unwrap();
        let second = indexer.media_file(&m, &opt, "");
        assert_eq!(second.status, IndexStatus::Updated);

        let photo = catalog.photo_by_id(first.photo_id).unwrap().unwrap();
        assert!(photo.location_estimated);
        assert_eq!(photo.photo_country, "de");
        assert_eq!(photo.place_id.as_deref(), Some("de:marienplatz-munich"));
    }

    #[test]
    fn test_low_confidence_labels_are_filtered() {
        let dir = tempdir().unwrap();
        let (config, catalog, bus) = test_setup(dir.path());

        let path = config.originals_path.join("a.jpg");
        write_jpeg(&path, 64, 64);

        // Best label has confidence 80; everything at or below 80/3 is noise.
        let indexer = Indexer::new(catalog.clone(), bus, &config).with_classifier(Arc::new(
            StubClassifier(vec![
                Label::new("cat", "image", 20, 0),
                Label::new("dog", "image", 90, 0),
            ]),
        ));

        let m = MediaFile::new(&path).unwrap();
        let result = indexer.media_file(&m, &IndexOptions::default(), "");
        assert_eq!(result.status, IndexStatus::Added);

        let labels = catalog.photo_labels(result.photo_id).unwrap();
        let names: Vec<_> = labels.iter().map(|(_, label)| label.label_name.as_str()).collect();
        assert_eq!(names, vec!["Cat"]);
    }

    #[test]
    fn test_moved_file_keeps_its_photo() {
        let dir = tempdir().unwrap();
        let (config, catalog, bus) = test_setup(dir.path());

        let path = config.originals_path.join("a.jpg");
        write_jpeg_with_exif(&path, 64, 64);

        let indexer = Indexer::new(catalog.clone(), bus, &config);

        let m = MediaFile::new(&path).unwrap();
        let first = indexer.media_file(&m, &IndexOptions::default(), "");
        assert_eq!(first.status, IndexStatus::Added);

        let new_dir = config.originals_path.join("2021");
        std::fs::create_dir_all(&new_dir).unwrap();
        let new_path = new_dir.join("renamed.jpg");
        std::fs::rename(&path, &new_path).unwrap();

        let m = MediaFile::new(&new_path).unwrap();
        let second = indexer.media_file(&m, &IndexOptions::default(), "");

        assert_eq!(second.status, IndexStatus::Updated);
        assert_eq!(second.photo_uuid, first.photo_uuid);
        assert_eq!(second.file_id, first.file_id);

        let file = catalog
            .file_by_name(&format!("2021{}renamed.jpg", std::path::MAIN_SEPARATOR))
            .unwrap()
            .unwrap();
        assert_eq!(file.id, first.file_id);
    }

    #[test]
    fn test_same_moment_and_place_dedups_to_one_photo() {
        let dir = tempdir().unwrap();
        let (config, catalog, bus) = test_setup(dir.path());

        let first_path = config.originals_path.join("a.jpg");
        write_jpeg_with_exif(&first_path, 64, 64);

        let indexer = Indexer::new(catalog.clone(), bus, &config);

        let m = MediaFile::new(&first_path).unwrap();
        let first = indexer.media_file(&m, &IndexOptions::default(), "");

        // Different bytes, same coordinates and capture time.
        let second_path = config.originals_path.join("b2.jpg");
        write_jpeg_with_exif(&second_path, 65, 64);

        let m = MediaFile::new(&second_path).unwrap();
        let second = indexer.media_file(&m, &IndexOptions::default(), "");

        assert_eq!(second.status, IndexStatus::Added);
        assert_eq!(second.photo_uuid, first.photo_uuid);
        assert_ne!(second.file_id, first.file_id);
    }

    #[test]
    fn test_exactly_one_primary_jpeg_per_photo() {
        let dir = tempdir().unwrap();
        let (config, catalog, bus) = test_setup(dir.path());

        let first_path = config.originals_path.join("a.jpg");
        write_jpeg(&first_path, 64, 64);

        // Same photo name, different content, also a JPEG.
        let second_path = config.originals_path.join("a.jpeg");
        write_jpeg(&second_path, 66, 64);

        let indexer = Indexer::new(catalog.clone(), bus, &config);

        let m = MediaFile::new(&first_path).unwrap();
        let first = indexer.media_file(&m, &IndexOptions::default(), "");
        let m = MediaFile::new(&second_path).unwrap();
        let second = indexer.media_file(&m, &IndexOptions::default(), "");

        assert_eq!(first.photo_uuid, second.photo_uuid);

        let files = catalog.files_by_photo(first.photo_id).unwrap();
        assert_eq!(files.len(), 2);
        let primaries: Vec<_> = files.iter().filter(|f| f.file_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].file_type, "jpg");
    }

    #[test]
    fn test_label_uncertainty_never_increases() {
        let dir = tempdir().unwrap();
        let (config, catalog, bus) = test_setup(dir.path());

        let path = config.originals_path.join("a.jpg");
        write_jpeg(&path, 64, 64);

        let confident = Indexer::new(catalog.clone(), bus.clone(), &config)
            .with_classifier(Arc::new(StubClassifier(vec![Label::new("dog", "image", 30, 0)])));
        let m = MediaFile::new(&path).unwrap();
        let result = confident.media_file(&m, &IndexOptions::default(), "");

        let uncertainty = |catalog: &Catalog| {
            catalog.photo_labels(result.photo_id).unwrap()[0].0.label_uncertainty
        };
        assert_eq!(uncertainty(&catalog), 30);

        // A worse detection never degrades the stored edge.
        let worse = Indexer::new(catalog.clone(), bus.clone(), &config)
            .with_classifier(Arc::new(StubClassifier(vec![Label::new("dog", "image", 50, 0)])));
        let m = MediaFile::new(&path).unwrap();
        worse.media_file(&m, &IndexOptions::all(), "");
        assert_eq!(uncertainty(&catalog), 30);

        // A better one wins.
        let better = Indexer::new(catalog.clone(), bus, &config)
            .with_classifier(Arc::new(StubClassifier(vec![Label::new("dog", "image", 10, 0)])));
        let m = MediaFile::new(&path).unwrap();
        better.media_file(&m, &IndexOptions::all(), "");
        assert_eq!(uncertainty(&catalog), 10);
    }

    #[test]
    fn test_reindex_never_rewrites_uuids() {
        let dir = tempdir().unwrap();
        let (config, catalog, bus) = test_setup(dir.path());

        let path = config.originals_path.join("a.jpg");
        write_jpeg_with_exif(&path, 64, 64);

        let indexer = Indexer::new(catalog.clone(), bus, &config);

        let m = MediaFile::new(&path).unwrap();
        let first = indexer.media_file(&m, &IndexOptions::default(), "");
        assert!(!first.photo_uuid.is_empty());
        assert!(!first.file_uuid.is_empty());

        let m = MediaFile::new(&path).unwrap();
        let second = indexer.media_file(&m, &IndexOptions::all(), "");

        assert_eq!(second.status, IndexStatus::Updated);
        assert_eq!(second.photo_uuid, first.photo_uuid);
        assert_eq!(second.file_uuid, first.file_uuid);
    }
}
