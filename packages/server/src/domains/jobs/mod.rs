pub mod close;
pub mod models;
pub mod status;
pub mod transitions;

pub use models::Job;
pub use status::{JobPriority, JobStatus};
