pub mod actions;
pub mod jwt;
pub mod models;

pub use jwt::JwtService;
