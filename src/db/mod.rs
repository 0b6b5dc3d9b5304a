mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::ingest::{AgentDirectory, ListStore};
use crate::models::*;

const AGENT_COLUMNS: &str =
    "id, name, email, mobile_country_code, mobile_number, is_active, created_at, updated_at";

/// SQLite-backed store for agents and distributed lists.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    /// `dispatch.db` inside the platform data directory.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "contact-dispatch")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("dispatch.db"))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Agent operations
    // ============================================================

    /// All agents, newest first.
    pub fn get_all_agents(&self) -> Result<Vec<Agent>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents ORDER BY created_at DESC, rowid DESC"
        ))?;

        let agents = stmt
            .query_map([], agent_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(agents)
    }

    pub fn get_agent(&self, id: Uuid) -> Result<Option<Agent>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        fetch_agent(&conn, id)
    }

    pub fn create_agent(&self, input: CreateAgentInput) -> Result<Agent> {
        let name = normalize_name(&input.name)?;
        let email = normalize_email(&input.email)?;
        let mobile = normalize_mobile(input.mobile)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        ensure_email_available(&conn, &email, None)?;

        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO agents (id, name, email, mobile_country_code, mobile_number, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
            (
                id.to_string(),
                &name,
                &email,
                &mobile.country_code,
                &mobile.number,
                timestamp(now),
                timestamp(now),
            ),
        )?;

        tracing::info!(agent_id = %id, email = %email, "Created agent");

        Ok(Agent {
            id,
            name,
            email,
            mobile,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial update. The read and the write happen under one lock.
    pub fn update_agent(&self, id: Uuid, input: UpdateAgentInput) -> Result<Option<Agent>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let Some(existing) = fetch_agent(&conn, id)? else {
            return Ok(None);
        };

        let name = match input.name {
            Some(name) => normalize_name(&name)?,
            None => existing.name,
        };
        let email = match input.email {
            Some(email) => normalize_email(&email)?,
            None => existing.email,
        };
        let mobile = match input.mobile {
            Some(mobile) => normalize_mobile(mobile)?,
            None => existing.mobile,
        };
        let is_active = input.is_active.unwrap_or(existing.is_active);

        ensure_email_available(&conn, &email, Some(id))?;
        let now = Utc::now();

        let rows = conn.execute(
            "UPDATE agents SET name = ?, email = ?, mobile_country_code = ?, mobile_number = ?, is_active = ?, updated_at = ?
             WHERE id = ?",
            (
                &name,
                &email,
                &mobile.country_code,
                &mobile.number,
                is_active,
                timestamp(now),
                id.to_string(),
            ),
        )?;
        if rows == 0 {
            return Ok(None);
        }

        Ok(Some(Agent {
            id,
            name,
            email,
            mobile,
            is_active,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    /// Removes the agent. Distributions that reference it are left in place.
    pub fn delete_agent(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM agents WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    /// Active agents, oldest first, at most `limit` of them.
    pub fn find_active_agents(&self, limit: usize) -> Result<Vec<Agent>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents WHERE is_active = 1
             ORDER BY created_at ASC, rowid ASC LIMIT ?"
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let agents = stmt
            .query_map([limit], agent_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(agents)
    }

    // ============================================================
    // List operations
    // ============================================================

    /// Writes the list row and every distribution in one transaction.
    pub fn create_list(&self, list: NewList) -> Result<ContactList> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let total_items = list.total_items();

        tx.execute(
            "INSERT INTO lists (id, file_name, total_items, uploaded_by, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &list.file_name,
                total_items as i64,
                &list.uploaded_by,
                timestamp(now),
            ),
        )
        .context("Failed to insert list")?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO distributions (id, list_id, position, agent_id, item_count, items)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )?;

            for (position, distribution) in list.distributions.iter().enumerate() {
                stmt.execute((
                    Uuid::new_v4().to_string(),
                    id.to_string(),
                    position as i64,
                    distribution.agent_id.to_string(),
                    distribution.item_count() as i64,
                    serde_json::to_string(&distribution.items)?,
                ))
                .context("Failed to insert distribution")?;
            }
        }

        tx.commit().context("Failed to commit list")?;

        Ok(ContactList {
            id,
            file_name: list.file_name,
            total_items,
            uploaded_by: list.uploaded_by,
            distributions: list.distributions,
            created_at: now,
        })
    }

    /// Every list, newest first, with per-agent counts but no items.
    pub fn list_summaries(&self) -> Result<Vec<ListSummary>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, file_name, total_items, uploaded_by, created_at
             FROM lists ORDER BY created_at DESC, rowid DESC",
        )?;

        let headers = stmt
            .query_map([], list_header_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        headers
            .into_iter()
            .map(|header| {
                let distributions = load_distribution_summaries(&conn, header.id)?;
                Ok::<_, anyhow::Error>(ListSummary {
                    id: header.id,
                    file_name: header.file_name,
                    total_items: header.total_items,
                    uploaded_by: header.uploaded_by,
                    distributions,
                    created_at: header.created_at,
                })
            })
            .collect()
    }

    pub fn get_list_detail(&self, id: Uuid) -> Result<Option<ListDetail>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, file_name, total_items, uploaded_by, created_at
             FROM lists WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let header = list_header_from_row(row)?;
        drop(rows);

        let distributions = load_distribution_details(&conn, id)?;

        Ok(Some(ListDetail {
            id: header.id,
            file_name: header.file_name,
            total_items: header.total_items,
            uploaded_by: header.uploaded_by,
            distributions,
            created_at: header.created_at,
        }))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

impl AgentDirectory for Database {
    fn find_active_agents(&self, limit: usize) -> Result<Vec<Agent>> {
        Database::find_active_agents(self, limit)
    }
}

impl ListStore for Database {
    fn create_list(&self, list: NewList) -> Result<ContactList> {
        Database::create_list(self, list)
    }

    fn list_summaries(&self) -> Result<Vec<ListSummary>> {
        Database::list_summaries(self)
    }

    fn get_list_detail(&self, id: Uuid) -> Result<Option<ListDetail>> {
        Database::get_list_detail(self, id)
    }
}

// ============================================================
// Row mapping
// ============================================================

struct ListHeader {
    id: Uuid,
    file_name: String,
    total_items: usize,
    uploaded_by: String,
    created_at: DateTime<Utc>,
}

fn list_header_from_row(row: &Row<'_>) -> rusqlite::Result<ListHeader> {
    Ok(ListHeader {
        id: parse_uuid(row.get::<_, String>(0)?),
        file_name: row.get(1)?,
        total_items: parse_count(row.get(2)?),
        uploaded_by: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        mobile: Mobile {
            country_code: row.get(3)?,
            number: row.get(4)?,
        },
        is_active: row.get::<_, i32>(5)? != 0,
        created_at: parse_datetime(row.get::<_, String>(6)?),
        updated_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

/// Resolves the agent columns of a `LEFT JOIN agents` into a display ref.
fn fetch_agent(conn: &Connection, id: Uuid) -> Result<Option<Agent>> {
    let mut stmt = conn.prepare(&format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?"))?;

    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        Ok(Some(agent_from_row(row)?))
    } else {
        Ok(None)
    }
}

fn agent_ref(agent_id: Uuid, name: Option<String>, email: Option<String>) -> Option<AgentRef> {
    match (name, email) {
        (Some(name), Some(email)) => Some(AgentRef {
            id: agent_id,
            name,
            email,
        }),
        _ => None,
    }
}

fn load_distribution_summaries(
    conn: &Connection,
    list_id: Uuid,
) -> Result<Vec<DistributionSummary>> {
    let mut stmt = conn.prepare(
        "SELECT d.agent_id, d.item_count, a.name, a.email
         FROM distributions d LEFT JOIN agents a ON a.id = d.agent_id
         WHERE d.list_id = ? ORDER BY d.position",
    )?;

    let summaries = stmt
        .query_map([list_id.to_string()], |row| {
            let agent_id = parse_uuid(row.get::<_, String>(0)?);
            Ok(DistributionSummary {
                agent_id,
                agent: agent_ref(agent_id, row.get(2)?, row.get(3)?),
                item_count: parse_count(row.get(1)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(summaries)
}

fn load_distribution_details(conn: &Connection, list_id: Uuid) -> Result<Vec<DistributionDetail>> {
    let mut stmt = conn.prepare(
        "SELECT d.agent_id, d.item_count, d.items, a.name, a.email
         FROM distributions d LEFT JOIN agents a ON a.id = d.agent_id
         WHERE d.list_id = ? ORDER BY d.position",
    )?;

    let rows = stmt
        .query_map([list_id.to_string()], |row| {
            let agent_id = parse_uuid(row.get::<_, String>(0)?);
            Ok((
                agent_id,
                parse_count(row.get(1)?),
                row.get::<_, String>(2)?,
                agent_ref(agent_id, row.get(3)?, row.get(4)?),
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(agent_id, item_count, items_json, agent)| {
            let items: Vec<ValidRecord> = serde_json::from_str(&items_json)
                .with_context(|| format!("Corrupt items for list {list_id}, agent {agent_id}"))?;
            Ok::<_, anyhow::Error>(DistributionDetail {
                agent_id,
                agent,
                item_count,
                items,
            })
        })
        .collect()
}

// ============================================================
// Agent validation
// ============================================================

fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.chars().count() < 2 {
        anyhow::bail!("Invalid agent name: must be at least 2 characters");
    }
    Ok(name.to_string())
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => anyhow::bail!("Invalid agent email: '{}'", email),
    }
}

fn normalize_mobile(mobile: Mobile) -> Result<Mobile> {
    let country_code = mobile.country_code.trim();
    let number = mobile.number.trim();
    if country_code.is_empty() || number.is_empty() {
        anyhow::bail!("Invalid agent mobile: country code and number are required");
    }
    Ok(Mobile {
        country_code: country_code.to_string(),
        number: number.to_string(),
    })
}

fn ensure_email_available(conn: &Connection, email: &str, except: Option<Uuid>) -> Result<()> {
    let taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM agents WHERE email = ? AND id != ?",
        (email, except.map(|id| id.to_string()).unwrap_or_default()),
        |row| row.get(0),
    )?;

    if taken > 0 {
        anyhow::bail!("Agent with this email already exists");
    }
    Ok(())
}

// ============================================================
// Column helpers
// ============================================================

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Database, Agent) {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        let agent = db
            .create_agent(CreateAgentInput {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                mobile: Mobile {
                    country_code: "+1".to_string(),
                    number: "5550001".to_string(),
                },
            })
            .unwrap();
        (db, agent)
    }

    fn one_record_list(agent_id: Uuid) -> NewList {
        let record = ValidRecord::from_candidate(CandidateRecord::new("Bob", "555", "")).unwrap();
        NewList {
            file_name: "leads.csv".to_string(),
            uploaded_by: "operator".to_string(),
            distributions: vec![Distribution {
                agent_id,
                items: vec![record],
            }],
        }
    }

    fn list_rows(db: &Database) -> i64 {
        let conn = db.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM lists", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn failed_distribution_insert_rolls_back_the_list() {
        let (db, agent) = seeded();
        db.conn
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE distributions")
            .unwrap();

        let result = db.create_list(one_record_list(agent.id));

        assert!(result.is_err());
        assert_eq!(list_rows(&db), 0);
    }

    #[test]
    fn committed_list_is_visible() {
        let (db, agent) = seeded();
        db.create_list(one_record_list(agent.id)).unwrap();
        assert_eq!(list_rows(&db), 1);
    }

    #[test]
    fn update_that_touches_no_row_returns_none() {
        let (db, agent) = seeded();
        db.conn
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER skip_agent_updates BEFORE UPDATE ON agents
                 BEGIN SELECT RAISE(IGNORE); END;",
            )
            .unwrap();

        let result = db
            .update_agent(
                agent.id,
                UpdateAgentInput {
                    name: Some("Ada Lovelace".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(result.is_none());
        assert_eq!(db.get_agent(agent.id).unwrap().unwrap().name, "Ada");
    }

    #[test]
    fn timestamps_sort_as_text() {
        let early = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let later = early + chrono::Duration::milliseconds(500);

        assert!(timestamp(early) < timestamp(later));
        assert_eq!(timestamp(early).len(), timestamp(later).len());
    }

    #[test]
    fn email_requires_local_part_and_domain() {
        assert!(normalize_email("a@b").is_ok());
        assert!(normalize_email("@b").is_err());
        assert!(normalize_email("a@").is_err());
        assert!(normalize_email("plain").is_err());
        assert_eq!(normalize_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
    }
}
