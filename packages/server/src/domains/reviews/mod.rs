pub mod models;

pub use models::{ReviewChannel, ReviewRequest, ReviewStatus};
