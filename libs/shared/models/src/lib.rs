pub mod auth;
pub mod base;
pub mod error;
