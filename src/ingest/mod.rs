//! Ingestion and distribution pipeline.
//!
//! An upload flows through [`parser::parse`] → [`filter::filter`] →
//! [`distributor::distribute`] and is then handed to a [`ListStore`] that
//! commits the whole list atomically. Any failure before the store is reached
//! leaves the store untouched.

pub mod distributor;
pub mod filter;
pub mod parser;

use std::sync::Arc;

use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::{Agent, ContactList, ListDetail, ListSummary, NewList};

pub use distributor::distribute;
pub use filter::filter;
pub use parser::{parse, SourceFormat};

/// Source of the agent roster considered for each upload.
pub trait AgentDirectory: Send + Sync {
    /// Active agents in a stable order, at most `limit` of them.
    fn find_active_agents(&self, limit: usize) -> anyhow::Result<Vec<Agent>>;
}

/// Durable storage for distributed lists.
pub trait ListStore: Send + Sync {
    /// Stores the list and all of its distributions, or nothing at all.
    fn create_list(&self, list: NewList) -> anyhow::Result<ContactList>;
    /// All lists, newest first, without item payloads.
    fn list_summaries(&self) -> anyhow::Result<Vec<ListSummary>>;
    fn get_list_detail(&self, id: Uuid) -> anyhow::Result<Option<ListDetail>>;
}

/// A single upload to run through the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct IngestRequest<'a> {
    pub payload: &'a [u8],
    pub format: SourceFormat,
    pub file_name: &'a str,
    pub uploaded_by: &'a str,
}

/// Service composing the pipeline stages with the agent directory and list store.
pub struct Dispatcher<S> {
    store: Arc<S>,
    roster_limit: usize,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            roster_limit: self.roster_limit,
        }
    }
}

impl<S> Dispatcher<S>
where
    S: AgentDirectory + ListStore + 'static,
{
    pub fn new(store: Arc<S>, roster_limit: usize) -> Self {
        Self {
            store,
            roster_limit,
        }
    }

    /// Parse, filter, distribute, and persist one upload.
    ///
    /// Returns the stored list as the detail view, with agents hydrated.
    pub fn ingest(&self, request: IngestRequest<'_>) -> Result<ListDetail, DispatchError> {
        let candidates = parse(request.payload, request.format)?;
        let records = filter(candidates);
        if records.is_empty() {
            return Err(DispatchError::NoValidRecords);
        }

        let roster = self.store.find_active_agents(self.roster_limit)?;
        let record_count = records.len();
        let distributions = distribute(records, &roster)?;

        let list = self.store.create_list(NewList {
            file_name: request.file_name.to_string(),
            uploaded_by: request.uploaded_by.to_string(),
            distributions,
        })?;

        tracing::info!(
            list_id = %list.id,
            file_name = %list.file_name,
            format = request.format.as_str(),
            records = record_count,
            agents = roster.len(),
            "Distributed uploaded list"
        );

        self.get_detail(list.id)
    }

    pub fn list_summaries(&self) -> Result<Vec<ListSummary>, DispatchError> {
        Ok(self.store.list_summaries()?)
    }

    pub fn get_detail(&self, id: Uuid) -> Result<ListDetail, DispatchError> {
        self.store
            .get_list_detail(id)?
            .ok_or(DispatchError::NotFound(id))
    }
}
