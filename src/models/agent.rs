use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A person who receives a share of every uploaded contact list.
///
/// Only **active** agents are considered when a list is distributed. The
/// distribution engine never mutates an agent; it reads `id` and `is_active`
/// at upload time and `name`/`email` again whenever a list is displayed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile: Mobile,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mobile number split into dialing prefix and subscriber number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mobile {
    /// Dialing prefix, e.g. `+1`.
    pub country_code: String,
    pub number: String,
}

/// Input for registering a new agent. New agents start out active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAgentInput {
    pub name: String,
    pub email: String,
    pub mobile: Mobile,
}

/// Input for updating an existing agent. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAgentInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<Mobile>,
    /// Deactivated agents keep their past distributions but get no new ones.
    pub is_active: Option<bool>,
}

/// Agent display fields attached to a distribution when a list is read back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&Agent> for AgentRef {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            name: agent.name.clone(),
            email: agent.email.clone(),
        }
    }
}
