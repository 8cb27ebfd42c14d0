/// A resolved location keyed by its geographic cell id. Memoizes the
/// reverse-geocode result for every photo taken in the same cell.
#[derive(Debug, Clone, Default)]
pub struct Location {
    pub id: String,
    pub loc_lat: f64,
    pub loc_lng: f64,
    pub loc_name: String,
    pub loc_category: String,
    pub loc_keywords: String,
    pub place_id: String,
}
