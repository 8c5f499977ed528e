use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

use crate::error::StoreError;
use crate::schema::{DEFAULT_TABLE_NAME, SessionTable};

/// How `save` turns "insert or replace" into statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStrategy {
    /// `UPDATE`, then `INSERT` when nothing matched. Works on any engine, but two
    /// concurrent first writes for one id can race; the loser gets the
    /// primary-key error.
    #[default]
    UpdateThenInsert,
    /// Single `INSERT ... ON CONFLICT(id) DO UPDATE`. Atomic, needs engine support.
    Native,
}

impl fmt::Display for SaveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaveStrategy::UpdateThenInsert => "update-then-insert",
            SaveStrategy::Native => "native",
        };
        f.write_str(s)
    }
}

impl FromStr for SaveStrategy {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "update-then-insert" => Ok(SaveStrategy::UpdateThenInsert),
            "native" => Ok(SaveStrategy::Native),
            other => Err(StoreError::Config(format!(
                "unknown save strategy '{other}' (expected update-then-insert or native)"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Database connection string, any URL the sqlx `Any` driver accepts.
    pub database_url: String,

    /// Name of the sessions table. Must be a plain SQL identifier.
    pub table: String,

    /// Upper bound on pooled connections.
    pub max_connections: u32,

    /// How long an operation waits for a pooled connection before failing
    /// with `StoreError::Unavailable`.
    pub acquire_timeout: Duration,

    pub save_strategy: SaveStrategy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://sessions.db?mode=rwc".to_string(),
            table: DEFAULT_TABLE_NAME.to_string(),
            max_connections: 16,
            acquire_timeout: Duration::from_millis(5_000),
            save_strategy: SaveStrategy::default(),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(url) = lookup("DATABASE_URL") {
            cfg.database_url = url;
        }
        if let Some(table) = lookup("SESSION_TABLE") {
            cfg.table = table;
        }
        if let Some(max) = lookup("SESSION_POOL_MAX_CONNECTIONS") {
            cfg.max_connections = parse_number("SESSION_POOL_MAX_CONNECTIONS", &max)?;
        }
        if let Some(ms) = lookup("SESSION_ACQUIRE_TIMEOUT_MS") {
            cfg.acquire_timeout =
                Duration::from_millis(parse_number("SESSION_ACQUIRE_TIMEOUT_MS", &ms)?);
        }
        if let Some(strategy) = lookup("SESSION_SAVE_STRATEGY") {
            cfg.save_strategy = strategy.parse()?;
        }

        if cfg.max_connections == 0 {
            return Err(StoreError::Config(
                "SESSION_POOL_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        Ok(cfg)
    }

    pub fn session_table(&self) -> Result<SessionTable, StoreError> {
        SessionTable::new(self.table.clone())
    }

    /// Open the connection pool described by this config.
    pub async fn connect_pool(&self) -> Result<AnyPool, StoreError> {
        sqlx::any::install_default_drivers();

        AnyPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.database_url)
            .await
            .map_err(StoreError::Unavailable)
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, StoreError> {
    raw.trim()
        .parse()
        .map_err(|_| StoreError::Config(format!("{key} must be a number, got '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let cfg = StoreConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(cfg.table, "Sessions");
        assert_eq!(cfg.max_connections, 16);
        assert_eq!(cfg.acquire_timeout, Duration::from_secs(5));
        assert_eq!(cfg.save_strategy, SaveStrategy::UpdateThenInsert);
    }

    #[test]
    fn environment_overrides_are_applied() {
        let cfg = StoreConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("SESSION_TABLE", "web_sessions"),
            ("SESSION_POOL_MAX_CONNECTIONS", "4"),
            ("SESSION_ACQUIRE_TIMEOUT_MS", "250"),
            ("SESSION_SAVE_STRATEGY", "native"),
        ]))
        .unwrap();

        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.session_table().unwrap().name(), "web_sessions");
        assert_eq!(cfg.max_connections, 4);
        assert_eq!(cfg.acquire_timeout, Duration::from_millis(250));
        assert_eq!(cfg.save_strategy, SaveStrategy::Native);
    }

    #[test]
    fn malformed_values_are_config_errors() {
        for pairs in [
            [("SESSION_POOL_MAX_CONNECTIONS", "lots")],
            [("SESSION_POOL_MAX_CONNECTIONS", "0")],
            [("SESSION_ACQUIRE_TIMEOUT_MS", "-1")],
            [("SESSION_SAVE_STRATEGY", "merge")],
        ] {
            assert!(
                matches!(StoreConfig::from_lookup(lookup(&pairs)), Err(StoreError::Config(_))),
                "{pairs:?} should be rejected"
            );
        }
    }

    #[test]
    fn invalid_table_name_surfaces_when_building_descriptor() {
        let cfg = StoreConfig::from_lookup(lookup(&[("SESSION_TABLE", "bad name")])).unwrap();
        assert!(matches!(
            cfg.session_table(),
            Err(StoreError::InvalidTableName(_))
        ));
    }
}
