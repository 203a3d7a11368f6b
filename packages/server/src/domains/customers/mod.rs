pub mod models;

pub use models::{Customer, CustomerLocation, Equipment, GeocodingStatus};
