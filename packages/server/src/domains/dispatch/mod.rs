pub mod batch;
pub mod eta;
pub mod scorer;
