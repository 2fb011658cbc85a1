//! In-memory wish store and the small HTTP API around it.

pub mod config;
pub mod error;
pub mod report;
pub mod server;
pub mod store;
