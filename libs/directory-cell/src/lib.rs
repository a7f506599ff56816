pub mod models;
pub mod services;

pub use models::*;
