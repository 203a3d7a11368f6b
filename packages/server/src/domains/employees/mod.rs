pub mod models;

pub use models::Employee;
