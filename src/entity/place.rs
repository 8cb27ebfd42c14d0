/// Well-known id of the placeholder place used when reverse geocoding
/// fails or no coordinates exist.
pub const UNKNOWN_PLACE_ID: &str = "zz";

/// A reverse-geocoded place. The id is the token returned by the geocoding
/// API and doubles as the natural key.
#[derive(Debug, Clone, Default)]
pub struct Place {
    pub id: String,
    pub place_label: String,
    pub place_city: String,
    pub place_state: String,
    pub place_country: String,
    pub place_keywords: String,
    pub place_favorite: bool,
}

impl Place {
    pub fn unknown() -> Self {
        Self {
            id: UNKNOWN_PLACE_ID.to_string(),
            place_label: "Unknown".to_string(),
            place_country: UNKNOWN_PLACE_ID.to_string(),
            ..Default::default()
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.id == UNKNOWN_PLACE_ID
    }
}

/// Country dimension row, keyed by ISO code.
#[derive(Debug, Clone, Default)]
pub struct Country {
    pub id: String,
    pub country_name: String,
    pub country_slug: String,
}
