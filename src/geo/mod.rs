//! Location resolution: geographic cells, cached reverse geocoding, and
//! temporal estimation.
//!
//! Coordinates quantize to a coarse cell id. Each cell resolves at most
//! once: a process-local cache sits in front of the `locations` table, and
//! a per-cell mutex serializes concurrent lookups of the same cell so the
//! external API is only asked once and only one place row gets inserted.

mod client;

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::catalog::Catalog;
use crate::entity::{Location, Photo, Place};
use crate::txt;

pub use client::PlacesClient;

/// Quantize coordinates into a cell of roughly 200 m edge length.
pub fn cell_id(lat: f64, lng: f64) -> String {
    let lat_cell = (lat * 500.0).round() as i64;
    let lng_cell = (lng * 500.0).round() as i64;
    format!("{lat_cell}:{lng_cell}")
}

/// Result of a reverse-geocoding lookup.
#[derive(Debug, Clone, Default)]
pub struct PlaceInfo {
    pub id: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub country_code: String,
    pub country_name: String,
    pub category: String,
    pub keywords: Vec<String>,
}

/// Reverse-geocoding service, keyed by coordinates.
pub trait Geocoder: Send + Sync {
    fn lookup(&self, lat: f64, lng: f64) -> Result<PlaceInfo>;
}

/// A fully resolved location: the memoized cell plus its place.
#[derive(Debug, Clone)]
pub struct ResolvedLocation {
    pub location: Location,
    pub place: Place,
    /// Country name as reported by the geocoder; empty on cache hits.
    pub country_name: String,
    /// True if this resolution inserted a new place row.
    pub place_created: bool,
}

impl ResolvedLocation {
    pub fn name(&self) -> &str {
        &self.location.loc_name
    }

    pub fn category(&self) -> &str {
        &self.location.loc_category
    }

    pub fn city(&self) -> &str {
        &self.place.place_city
    }

    pub fn country_code(&self) -> &str {
        &self.place.place_country
    }

    pub fn keywords(&self) -> Vec<String> {
        txt::keywords(&self.location.loc_keywords)
    }

    pub fn no_city(&self) -> bool {
        self.place.place_city.is_empty()
    }

    pub fn long_city(&self) -> bool {
        self.place.place_city.len() > 16
    }

    pub fn city_contains(&self, text: &str) -> bool {
        !self.place.place_city.is_empty()
            && text.to_lowercase().contains(&self.place.place_city.to_lowercase())
    }
}

pub struct Resolver {
    geocoder: Option<Arc<dyn Geocoder>>,
    cache: Mutex<HashMap<String, (Location, Place)>>,
    cell_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Resolver {
    pub fn new(geocoder: Option<Arc<dyn Geocoder>>) -> Self {
        Self {
            geocoder,
            cache: Mutex::new(HashMap::new()),
            cell_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve coordinates to a location and place, creating catalog rows on
    /// first sight of the cell.
    pub fn find(&self, catalog: &Catalog, lat: f64, lng: f64) -> Result<ResolvedLocation> {
        let cell = cell_id(lat, lng);

        let cell_lock = self.cell_lock(&cell);
        let _guard = cell_lock.lock().unwrap();

        if let Some((location, place)) = self.cache.lock().unwrap().get(&cell).cloned() {
            return Ok(ResolvedLocation {
                location,
                place,
                country_name: String::new(),
                place_created: false,
            });
        }

        if let Some(location) = catalog.location(&cell)? {
            let place = catalog
                .place(&location.place_id)?
                .unwrap_or_else(Place::unknown);
            self.remember(&cell, &location, &place);
            return Ok(ResolvedLocation {
                location,
                place,
                country_name: String::new(),
                place_created: false,
            });
        }

        let geocoder = self
            .geocoder
            .as_ref()
            .ok_or_else(|| anyhow!("geo: no geocoding api configured"))?;

        let info = geocoder.lookup(lat, lng)?;

        let place_id = if info.id.is_empty() {
            derived_place_id(&info)
        } else {
            info.id.clone()
        };

        let (place, place_created) = catalog.first_or_create_place(&Place {
            id: place_id,
            place_label: place_label(&info),
            place_city: info.city.clone(),
            place_state: info.state.clone(),
            place_country: if info.country_code.is_empty() {
                "zz".to_string()
            } else {
                info.country_code.clone()
            },
            place_keywords: info.keywords.join(", "),
            place_favorite: false,
        })?;

        let location = Location {
            id: cell.clone(),
            loc_lat: lat,
            loc_lng: lng,
            loc_name: info.name.clone(),
            loc_category: info.category.clone(),
            loc_keywords: location_keywords(&info),
            place_id: place.id.clone(),
        };
        catalog.create_location(&location)?;

        self.remember(&cell, &location, &place);

        Ok(ResolvedLocation {
            location,
            place,
            country_name: info.country_name,
            place_created,
        })
    }

    fn cell_lock(&self, cell: &str) -> Arc<Mutex<()>> {
        let mut locks = self.cell_locks.lock().unwrap();
        locks
            .entry(cell.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn remember(&self, cell: &str, location: &Location, place: &Place) {
        self.cache
            .lock()
            .unwrap()
            .insert(cell.to_string(), (location.clone(), place.clone()));
    }
}

/// Copy place and country from the photo taken closest in time. Used when a
/// photo has no coordinates of its own.
pub fn estimate_location(catalog: &Catalog, photo: &mut Photo) -> Result<()> {
    let taken_at = match photo.taken_at {
        Some(taken_at) => taken_at,
        None => return Ok(()),
    };

    if let Some(recent) = catalog.closest_photo_by_taken_at(taken_at, photo.id)? {
        if recent.has_place() {
            if let Some(place) = catalog.place(recent.place_id.as_deref().unwrap_or(""))? {
                photo.photo_country = place.place_country.clone();
                photo.place_id = Some(place.id);
                photo.location_estimated = true;
            }
        }
    }

    Ok(())
}

fn derived_place_id(info: &PlaceInfo) -> String {
    let slug = txt::slug(&format!("{} {}", info.name, info.city));
    let country = if info.country_code.is_empty() {
        "zz"
    } else {
        &info.country_code
    };

    if slug.is_empty() {
        country.to_string()
    } else {
        format!("{country}:{slug}")
    }
}

fn place_label(info: &PlaceInfo) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in [info.name.as_str(), info.city.as_str(), info.state.as_str()] {
        if !part.is_empty() && !parts.contains(&part) {
            parts.push(part);
        }
    }
    parts.join(", ")
}

fn location_keywords(info: &PlaceInfo) -> String {
    let mut words = txt::keywords(&info.name);
    words.extend(txt::keywords(&info.city));
    words.extend(info.keywords.iter().flat_map(|k| txt::keywords(k)));
    txt::unique_words(words).join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGeocoder {
        calls: AtomicUsize,
    }

    impl Geocoder for CountingGeocoder {
        fn lookup(&self, _lat: f64, _lng: f64) -> Result<PlaceInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
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

    fn test_catalog() -> Catalog {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.initialize().unwrap();
        catalog
    }

    #[test]
    fn test_cell_id_quantizes() {
        assert_eq!(cell_id(48.137, 11.575), cell_id(48.1372, 11.5749));
        assert_ne!(cell_id(48.137, 11.575), cell_id(48.2, 11.575));
    }

    #[test]
    fn test_find_hits_cache_on_second_lookup() {
        let catalog = test_catalog();
        let geocoder = Arc::new(CountingGeocoder {
            calls: AtomicUsize::new(0),
        });
        let resolver = Resolver::new(Some(geocoder.clone()));

        let first = resolver.find(&catalog, 48.137, 11.575).unwrap();
        assert!(first.place_created);
        assert_eq!(first.name(), "Marienplatz");
        assert_eq!(first.city(), "Munich");
        assert_eq!(first.country_code(), "de");

        let second = resolver.find(&catalog, 48.137, 11.575).unwrap();
        assert!(!second.place_created);
        assert_eq!(second.place.id, first.place.id);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);

        // The location row was persisted for future processes.
        assert!(catalog.location(&cell_id(48.137, 11.575)).unwrap().is_some());
    }

    #[test]
    fn test_find_without_geocoder_is_an_error() {
        let catalog = test_catalog();
        let resolver = Resolver::new(None);
        assert!(resolver.find(&catalog, 48.0, 11.0).is_err());
    }

    #[test]
    fn test_estimate_location_copies_nearest_place() {
        use chrono::TimeZone;
        let catalog = test_catalog();

        catalog
            .first_or_create_place(&Place {
                id: "de:munich".to_string(),
                place_city: "Munich".to_string(),
                place_country: "de".to_string(),
                ..Default::default()
            })
            .unwrap();

        let mut anchor = Photo {
            photo_name: "anchor".to_string(),
            taken_at: Some(chrono::Utc.with_ymd_and_hms(2021, 6, 2, 8, 0, 0).unwrap()),
            place_id: Some("de:munich".to_string()),
            ..Default::default()
        };
        catalog.create_photo(&mut anchor).unwrap();

        let mut photo = Photo {
            photo_name: "no-gps".to_string(),
            taken_at: Some(chrono::Utc.with_ymd_and_hms(2021, 6, 3, 9, 0, 0).unwrap()),
            ..Default::default()
        };
        catalog.create_photo(&mut photo).unwrap();

        estimate_location(&catalog, &mut photo).unwrap();
        assert!(photo.location_estimated);
        assert_eq!(photo.photo_country, "de");
        assert_eq!(photo.place_id.as_deref(), Some("de:munich"));
    }
}
