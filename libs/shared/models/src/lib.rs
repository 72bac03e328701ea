pub mod appointment;
pub mod auth;
pub mod billing;
pub mod error;
pub mod inventory;
pub mod schedule;
pub mod time;
