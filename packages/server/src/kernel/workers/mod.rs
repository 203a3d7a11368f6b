//! Background workers cooperating through the database as a queue.

pub mod geocoding;
pub mod recurring;
pub mod renewals;
pub mod reviews;

pub use geocoding::{GeocodingWorker, GeocodingWorkerConfig};
