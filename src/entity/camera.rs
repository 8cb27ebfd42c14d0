/// Camera dimension row, interned by (model, make).
#[derive(Debug, Clone, Default)]
pub struct Camera {
    pub id: i64,
    pub camera_slug: String,
    pub camera_model: String,
    pub camera_make: String,
}

/// Lens dimension row, interned by (model, make).
#[derive(Debug, Clone, Default)]
pub struct Lens {
    pub id: i64,
    pub lens_slug: String,
    pub lens_model: String,
    pub lens_make: String,
}
