// Summit Field Service Platform - Dispatch & Operational Core
//
// Multi-tenant backend for HVAC field-service companies: job dispatch with
// drive-time-aware candidate scoring, job lifecycle tracking, time-on-task
// ledger, after-hours routing, escalations, and database-polling workers.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
