//! db-gatekeeper - A guarded SQL gateway.
//!
//! Validates incoming SQL statements against a fixed safety policy, executes
//! admissible statements through a pooled MySQL client, and returns a
//! normalized result envelope for success and failure alike.

pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod query;
pub mod safety;
