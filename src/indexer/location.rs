//! Location resolution and location-based title synthesis.

use anyhow::anyhow;
use serde_json::json;
use tracing::{error, info, warn};

use super::{IndexOptions, Indexer};
use crate::classify::{Label, Labels};
use crate::entity::{Photo, UNKNOWN_PLACE_ID};
use crate::media::MediaFile;
use crate::txt;

impl Indexer {
    /// Resolve the photo's coordinates to a place, attach a location label,
    /// and synthesize a location-based title. Returns the location keyword
    /// candidates.
    pub(super) fn index_location(
        &self,
        m: &MediaFile,
        photo: &mut Photo,
        labels: &mut Labels,
        file_changed: bool,
        opt: &IndexOptions,
    ) -> Vec<String> {
        let mut keywords = Vec::new();

        let resolved = match m.location() {
            Some((lat, lng)) => self.resolver.find(&self.catalog, lat, lng),
            None => Err(anyhow!("geo: no coordinates")),
        };

        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!("index: {err}");
                photo.place_id = Some(UNKNOWN_PLACE_ID.to_string());
                photo.photo_country = UNKNOWN_PLACE_ID.to_string();
                return keywords;
            }
        };

        if resolved.place_created {
            self.bus.publish("count.places", json!({"count": 1}));
        }

        photo.location_id = Some(resolved.location.id.clone());
        photo.place_id = Some(resolved.place.id.clone());
        photo.location_estimated = false;

        let country_name = match self
            .catalog
            .first_or_create_country(resolved.country_code(), &resolved.country_name)
        {
            Ok((country, is_new)) => {
                if is_new {
                    self.bus.publish("count.countries", json!({"count": 1}));
                }
                if country.country_name.is_empty() {
                    country.id.to_uppercase()
                } else {
                    country.country_name
                }
            }
            Err(err) => {
                error!("index: {err}");
                resolved.country_code().to_uppercase()
            }
        };

        keywords.extend(resolved.keywords());

        // The reverse lookup contributes a de-emphasized category label.
        let category = resolved.category();
        if !category.is_empty() {
            labels.push(Label::location(category, 0, -1));
        }

        if (file_changed || opt.update_title) && !photo.modified_title {
            let year = photo
                .taken_at
                .unwrap_or_else(|| m.date_created())
                .format("%Y")
                .to_string();
            let name = resolved.name();
            let city = resolved.city();

            let title = labels.best_title(name);
            if !title.is_empty() {
                info!("index: using \"{title}\" to create photo title");
                if resolved.no_city() || resolved.long_city() || resolved.city_contains(title) {
                    photo.photo_title = format!("{} / {} / {}", txt::title(title), country_name, year);
                } else {
                    photo.photo_title = format!("{} / {} / {}", txt::title(title), city, year);
                }
            } else if !name.is_empty() && !city.is_empty() {
                // Avoid redundant titles for long or self-describing names.
                if name.len() > 45 {
                    photo.photo_title = txt::title(name);
                } else if name.len() > 20 || city.len() > 16 || name.contains(city) {
                    photo.photo_title = format!("{name} / {year}");
                } else {
                    photo.photo_title = format!("{name} / {city} / {year}");
                }
            } else if !city.is_empty() && !country_name.is_empty() {
                if city.len() > 20 {
                    photo.photo_title = format!("{city} / {year}");
                } else {
                    photo.photo_title = format!("{city} / {country_name} / {year}");
                }
            }

            if photo.no_title() {
                warn!(
                    "index: could not set photo title based on location or labels for \"{}\"",
                    m.base()
                );
            } else {
                info!("index: new photo title is \"{}\"", photo.photo_title);
            }
        }

        photo.photo_country = resolved.country_code().to_string();

        keywords
    }
}
