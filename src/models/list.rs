use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::AgentRef;
use super::record::ValidRecord;

/// One agent's contiguous share of an uploaded list.
///
/// The item count is always derived from `items`, so the two can never drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub agent_id: Uuid,
    pub items: Vec<ValidRecord>,
}

impl Distribution {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// A distributed upload ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewList {
    pub file_name: String,
    /// Opaque identity of whoever uploaded the file.
    pub uploaded_by: String,
    /// One entry per roster agent, in roster order.
    pub distributions: Vec<Distribution>,
}

impl NewList {
    pub fn total_items(&self) -> usize {
        self.distributions.iter().map(Distribution::item_count).sum()
    }
}

/// A persisted upload with every distribution it was split into.
///
/// Lists are written exactly once and never updated in place.
#[derive(Debug, Clone)]
pub struct ContactList {
    pub id: Uuid,
    pub file_name: String,
    pub total_items: usize,
    pub uploaded_by: String,
    pub distributions: Vec<Distribution>,
    pub created_at: DateTime<Utc>,
}

/// Per-agent share without the contact records, used for list overviews.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DistributionSummary {
    pub agent_id: Uuid,
    /// `None` when the agent has since been deleted.
    pub agent: Option<AgentRef>,
    pub item_count: usize,
}

/// Per-agent share including the contact records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DistributionDetail {
    pub agent_id: Uuid,
    /// `None` when the agent has since been deleted.
    pub agent: Option<AgentRef>,
    pub item_count: usize,
    pub items: Vec<ValidRecord>,
}

/// List overview returned by the "all lists" query. Omits item payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListSummary {
    pub id: Uuid,
    pub file_name: String,
    pub total_items: usize,
    pub uploaded_by: String,
    pub distributions: Vec<DistributionSummary>,
    pub created_at: DateTime<Utc>,
}

/// Full list with hydrated agents and every record, used for detail views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListDetail {
    pub id: Uuid,
    pub file_name: String,
    pub total_items: usize,
    pub uploaded_by: String,
    pub distributions: Vec<DistributionDetail>,
    pub created_at: DateTime<Utc>,
}

impl ListDetail {
    /// Drops item payloads, keeping counts and agent references.
    pub fn summary(&self) -> ListSummary {
        ListSummary {
            id: self.id,
            file_name: self.file_name.clone(),
            total_items: self.total_items,
            uploaded_by: self.uploaded_by.clone(),
            distributions: self
                .distributions
                .iter()
                .map(|d| DistributionSummary {
                    agent_id: d.agent_id,
                    agent: d.agent.clone(),
                    item_count: d.item_count,
                })
                .collect(),
            created_at: self.created_at,
        }
    }
}
