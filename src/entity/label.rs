/// A label interned by slug. Priority ranks salience: zero and above are
/// visible, negative values are de-emphasized, -3 marks categories.
#[derive(Debug, Clone, Default)]
pub struct Label {
    pub id: i64,
    pub label_uuid: String,
    pub label_slug: String,
    pub label_name: String,
    pub label_priority: i32,
    pub label_favorite: bool,
}

/// Edge between a photo and a label. Uncertainty is 0–100, lower is more
/// confident; upserts keep the smallest uncertainty seen.
#[derive(Debug, Clone, Default)]
pub struct PhotoLabel {
    pub photo_id: i64,
    pub label_id: i64,
    pub label_uncertainty: i32,
    pub label_source: String,
}
