//! Shared building blocks: typed ids, error taxonomy, tenant scoping, geo.

pub mod entity_ids;
pub mod errors;
pub mod geo;
pub mod id;
pub mod scope;

pub use entity_ids::*;
pub use errors::AppError;
pub use geo::LatLng;
pub use scope::{AuthUser, Role};
