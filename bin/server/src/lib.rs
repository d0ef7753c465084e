//! nodeflow HTTP server.
//!
//! Exposes the workflow engine over a JSON API, streams node events to
//! browsers, and persists workflows and execution records in PostgreSQL.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
