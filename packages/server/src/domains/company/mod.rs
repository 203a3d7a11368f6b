pub mod after_hours;
pub mod models;
