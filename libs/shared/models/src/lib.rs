pub mod appointment;
pub mod auth;
pub mod dates;
pub mod error;
