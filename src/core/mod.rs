//! Infrastructure the gateway runs on.
//!
//! Errors, configuration, logging, and the Document Store capability with its
//! SQLite and in-memory backends.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod memory;
pub mod pool;
pub mod schemas;
pub mod sqlite;
pub mod store;
pub mod time;
