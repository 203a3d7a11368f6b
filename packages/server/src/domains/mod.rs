//! Domain modules: models and actions, one directory per bounded area.

pub mod agreements;
pub mod auth;
pub mod company;
pub mod customers;
pub mod dispatch;
pub mod employees;
pub mod escalations;
pub mod jobs;
pub mod reviews;
pub mod schedules;
