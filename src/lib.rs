//! Contact list ingestion and even distribution across an agent roster.
//!
//! Uploaded CSV/XLSX/XLS files are parsed into candidate records, filtered to
//! rows with a first name and phone, split into contiguous shares across the
//! active agents, and stored as a single list that can be read back later.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
