//! Domain models for contact dispatch.
//!
//! # Core Concepts
//!
//! ## Directory
//!
//! - [`Agent`]: A person who receives contacts. Only active agents take part
//!   in new distributions.
//!
//! ## Ingestion
//!
//! - [`CandidateRecord`]: A raw parsed row, before filtering.
//! - [`ValidRecord`]: A contact with a non-empty first name and phone.
//! - [`Distribution`]: One agent's contiguous slice of an upload.
//!
//! ## Persisted Aggregate
//!
//! - [`ContactList`]: One upload with its file name, totals, and every
//!   distribution. Written once, atomically, and read back as a
//!   [`ListSummary`] or [`ListDetail`].

mod agent;
mod list;
mod record;

pub use agent::*;
pub use list::*;
pub use record::*;
