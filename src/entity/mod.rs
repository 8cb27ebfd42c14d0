//! Catalog entities: plain records mirroring the relational schema.
//!
//! Cyclic references are expressed by owning ids (a `File` points at its
//! `Photo` by id, never the other way around); related rows are loaded
//! explicitly through the catalog.

mod camera;
mod description;
mod file;
mod label;
mod location;
mod photo;
mod place;

pub use camera::{Camera, Lens};
pub use description::Description;
pub use file::File;
pub use label::{Label, PhotoLabel};
pub use location::Location;
pub use photo::Photo;
pub use place::{Country, Place, UNKNOWN_PLACE_ID};
