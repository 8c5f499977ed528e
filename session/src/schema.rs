//! Table descriptor and the one-shot initializer that makes sure it exists.
use std::fmt;

use sqlx::AnyPool;
use tracing::{debug, error, info, instrument, warn};

use crate::error::StoreError;
use crate::model::SESSION_ID_MAX_LEN;

pub const DEFAULT_TABLE_NAME: &str = "Sessions";

/// Immutable description of the sessions table.
///
/// Built once per store and shared by every operation. All statement text is
/// rendered at construction, so operations only bind parameters.
#[derive(Debug, Clone)]
pub struct SessionTable {
    name: String,
    create: String,
    probe: String,
    select: String,
    select_record: String,
    update: String,
    insert: String,
    upsert: String,
    delete: String,
    count: String,
}

impl SessionTable {
    /// Descriptor for a custom table name. Only plain identifiers are accepted
    /// because the name is interpolated into statement text.
    pub fn new(name: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(StoreError::InvalidTableName(name));
        }

        Ok(Self::render(name))
    }

    fn render(name: String) -> Self {
        Self {
            create: format!(
                "CREATE TABLE {name} (id CHAR({SESSION_ID_MAX_LEN}) PRIMARY KEY, data TEXT NOT NULL)"
            ),
            probe: format!("SELECT id, data FROM {name} LIMIT 1"),
            select: format!("SELECT data FROM {name} WHERE id = ?"),
            select_record: format!("SELECT id, data FROM {name} WHERE id = ?"),
            update: format!("UPDATE {name} SET data = ? WHERE id = ?"),
            insert: format!("INSERT INTO {name} (id, data) VALUES (?, ?)"),
            upsert: format!(
                "INSERT INTO {name} (id, data) VALUES (?, ?) \
                 ON CONFLICT(id) DO UPDATE SET data = excluded.data"
            ),
            delete: format!("DELETE FROM {name} WHERE id = ?"),
            count: format!("SELECT COUNT(*) AS n FROM {name} WHERE id = ?"),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn create_sql(&self) -> &str {
        &self.create
    }

    pub fn probe_sql(&self) -> &str {
        &self.probe
    }

    /// Binds: id.
    pub fn select_sql(&self) -> &str {
        &self.select
    }

    /// Binds: id.
    pub fn select_record_sql(&self) -> &str {
        &self.select_record
    }

    /// Binds: data, id.
    pub fn update_sql(&self) -> &str {
        &self.update
    }

    /// Binds: id, data.
    pub fn insert_sql(&self) -> &str {
        &self.insert
    }

    /// Binds: id, data.
    pub fn upsert_sql(&self) -> &str {
        &self.upsert
    }

    /// Binds: id.
    pub fn delete_sql(&self) -> &str {
        &self.delete
    }

    /// Binds: id. Yields one `n` column.
    pub fn count_sql(&self) -> &str {
        &self.count
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::render(DEFAULT_TABLE_NAME.to_string())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Outcome of schema initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Initialization has not finished yet.
    Pending,
    /// The table was created by this store.
    Created,
    /// Creation failed but the table answered a probe query.
    Existing,
    /// Creation failed and so did the probe; the table is likely unusable.
    ProbeFailed,
    /// No connection could be acquired.
    Unavailable,
}

impl SchemaStatus {
    pub fn is_terminal(self) -> bool {
        self != SchemaStatus::Pending
    }

    /// True when the table is known to be usable.
    pub fn is_ready(self) -> bool {
        matches!(self, SchemaStatus::Created | SchemaStatus::Existing)
    }
}

impl fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchemaStatus::Pending => "pending",
            SchemaStatus::Created => "created",
            SchemaStatus::Existing => "existing",
            SchemaStatus::ProbeFailed => "probe-failed",
            SchemaStatus::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

/// Make sure the sessions table exists.
///
/// Never fails: every problem is logged and folded into the returned status.
/// A failed `CREATE TABLE` is expected on every start after the first, so it is
/// followed by a cheap probe rather than reported.
#[instrument(skip_all, fields(table = %table.name()), target = "schema")]
pub async fn ensure_table(pool: &AnyPool, table: &SessionTable) -> SchemaStatus {
    let mut conn = match pool.acquire().await {
        Ok(conn) => conn,
        Err(e) => {
            error!(error = %e, "could not acquire a connection for schema setup");
            return SchemaStatus::Unavailable;
        }
    };

    let create_err = match sqlx::query(table.create_sql()).execute(&mut *conn).await {
        Ok(_) => {
            info!("sessions table created");
            return SchemaStatus::Created;
        }
        Err(e) => e,
    };

    debug!(error = %create_err, "create table failed, probing existing table");

    match sqlx::query(table.probe_sql()).fetch_optional(&mut *conn).await {
        Ok(_) => SchemaStatus::Existing,
        Err(probe_err) => {
            warn!(
                create_error = %create_err,
                probe_error = %probe_err,
                "failed to create sessions table"
            );
            SchemaStatus::ProbeFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_renders_statements() {
        let t = SessionTable::default();

        assert_eq!(t.name(), "Sessions");
        assert_eq!(
            t.create_sql(),
            "CREATE TABLE Sessions (id CHAR(36) PRIMARY KEY, data TEXT NOT NULL)"
        );
        assert_eq!(t.update_sql(), "UPDATE Sessions SET data = ? WHERE id = ?");
        assert_eq!(t.insert_sql(), "INSERT INTO Sessions (id, data) VALUES (?, ?)");
        assert_eq!(t.delete_sql(), "DELETE FROM Sessions WHERE id = ?");
        assert!(t.upsert_sql().contains("ON CONFLICT(id) DO UPDATE"));
    }

    #[test]
    fn table_names_must_be_identifiers() {
        assert!(SessionTable::new("web_sessions_2").is_ok());
        assert!(SessionTable::new("_s").is_ok());

        for bad in ["", "1abc", "sessions; DROP TABLE x", "a-b", "a b"] {
            assert!(
                matches!(SessionTable::new(bad), Err(StoreError::InvalidTableName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn only_created_and_existing_are_ready() {
        assert!(SchemaStatus::Created.is_ready());
        assert!(SchemaStatus::Existing.is_ready());
        assert!(!SchemaStatus::ProbeFailed.is_ready());
        assert!(!SchemaStatus::Unavailable.is_ready());
        assert!(!SchemaStatus::Pending.is_terminal());
        assert!(SchemaStatus::Unavailable.is_terminal());
    }
}
