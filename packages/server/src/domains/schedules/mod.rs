pub mod models;

pub use models::{RecurrenceFrequency, RecurringJobSchedule};
