//! SqlSessionStore
//! ---------------
//! `SessionStore` over an sqlx `AnyPool`. Each payload lives in one row of the
//! sessions table as base64 text keyed by the session id.
//!
//!  - construction never blocks; the table is ensured in a background task
//!  - every operation checks out its own connection and returns it on completion
//!  - `save` keeps a single connection for its whole update/insert sequence
//!
//! Statements use `?` placeholders, so the store targets SQLite and MySQL style
//! drivers.
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyConnection, AnyPool, Row};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, instrument, warn};

use super::SessionStore;
use crate::codec;
use crate::config::{SaveStrategy, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::model::{SessionId, SessionRecord};
use crate::schema::{self, SchemaStatus, SessionTable};

#[derive(Clone)]
pub struct SqlSessionStore {
    pool: AnyPool,
    table: Arc<SessionTable>,
    strategy: SaveStrategy,
    schema: watch::Receiver<SchemaStatus>,
}

impl SqlSessionStore {
    /// Create a store and start schema initialization in the background.
    ///
    /// Operations may be issued immediately; use [`SqlSessionStore::ready`] to
    /// wait for the table. Outside a Tokio runtime no initialization runs and
    /// the status is [`SchemaStatus::Unavailable`].
    pub fn new(pool: AnyPool, table: SessionTable) -> Self {
        let table = Arc::new(table);
        let (tx, rx) = watch::channel(SchemaStatus::Pending);

        match Handle::try_current() {
            Ok(handle) => {
                let init_pool = pool.clone();
                let init_table = Arc::clone(&table);
                handle.spawn(
                    async move {
                        let status = schema::ensure_table(&init_pool, &init_table).await;
                        tx.send_replace(status);
                    }
                    .in_current_span(),
                );
            }
            Err(e) => {
                error!(table = %table.name(), error = %e, "no runtime for schema setup");
                tx.send_replace(SchemaStatus::Unavailable);
            }
        }

        Self {
            pool,
            table,
            strategy: SaveStrategy::default(),
            schema: rx,
        }
    }

    pub fn with_strategy(mut self, strategy: SaveStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Open the configured pool and build a store over it.
    pub async fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        let table = config.session_table()?;
        let pool = config.connect_pool().await?;

        Ok(Self::new(pool, table).with_strategy(config.save_strategy))
    }

    /// Like [`SqlSessionStore::from_config`], but waits for schema initialization.
    pub async fn connect_and_init(config: &StoreConfig) -> StoreResult<Self> {
        let store = Self::from_config(config).await?;
        let status = store.ready().await;
        debug!(%status, "session store initialized");
        Ok(store)
    }

    /// Wait until schema initialization has finished and return its outcome.
    pub async fn ready(&self) -> SchemaStatus {
        let mut rx = self.schema.clone();
        match rx.wait_for(|s| s.is_terminal()).await {
            Ok(status) => *status,
            // initializer task ended without reporting
            Err(_) => SchemaStatus::Unavailable,
        }
    }

    /// Current initialization status without waiting.
    pub fn schema_status(&self) -> SchemaStatus {
        *self.schema.borrow()
    }

    pub fn table(&self) -> &SessionTable {
        &self.table
    }

    /// The row for `session_id` exactly as stored, payload still encoded.
    #[instrument(skip_all, fields(session_id = %session_id), target = "store")]
    pub async fn record(&self, session_id: &SessionId) -> StoreResult<Option<SessionRecord>> {
        let mut conn = self.acquire("record").await?;

        let row = sqlx::query(self.table.select_record_sql())
            .bind(session_id.as_str())
            .fetch_optional(&mut *conn)
            .await
            .map_err(StoreError::Statement)?;

        let Some(row) = row else { return Ok(None) };
        let data: Option<String> = row.try_get("data").map_err(StoreError::Statement)?;

        Ok(Some(SessionRecord {
            id: session_id.clone(),
            data,
        }))
    }

    /// Number of rows stored under `session_id`; 0 or 1 while the key holds.
    #[instrument(skip_all, fields(session_id = %session_id), target = "store")]
    pub async fn row_count(&self, session_id: &SessionId) -> StoreResult<i64> {
        let mut conn = self.acquire("row_count").await?;

        let row = sqlx::query(self.table.count_sql())
            .bind(session_id.as_str())
            .fetch_one(&mut *conn)
            .await
            .map_err(StoreError::Statement)?;

        row.try_get::<i64, _>("n").map_err(StoreError::Statement)
    }

    async fn acquire(&self, op: &'static str) -> StoreResult<PoolConnection<Any>> {
        self.pool.acquire().await.map_err(|e| {
            error!(op, error = %e, "could not acquire a connection");
            StoreError::Unavailable(e)
        })
    }

    /// Upsert emulation: update first, insert only when nothing matched.
    ///
    /// The two statements are separate round trips, not a transaction. If another
    /// caller inserts the same id between them, our insert fails on the primary
    /// key and that error is returned as is.
    async fn update_then_insert(
        &self,
        conn: &mut AnyConnection,
        session_id: &SessionId,
        encoded: &str,
    ) -> StoreResult<()> {
        let updated = sqlx::query(self.table.update_sql())
            .bind(encoded)
            .bind(session_id.as_str())
            .execute(&mut *conn)
            .await
            .map_err(StoreError::Statement)?;

        if updated.rows_affected() > 0 {
            debug!("session updated");
            return Ok(());
        }

        sqlx::query(self.table.insert_sql())
            .bind(session_id.as_str())
            .bind(encoded)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                debug!(error = %e, "insert after empty update failed");
                StoreError::Statement(e)
            })?;

        debug!("session inserted");
        Ok(())
    }

    async fn native_upsert(
        &self,
        conn: &mut AnyConnection,
        session_id: &SessionId,
        encoded: &str,
    ) -> StoreResult<()> {
        sqlx::query(self.table.upsert_sql())
            .bind(session_id.as_str())
            .bind(encoded)
            .execute(&mut *conn)
            .await
            .map_err(StoreError::Statement)?;

        debug!("session upserted");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    #[instrument(skip_all, fields(session_id = %session_id), target = "store")]
    async fn load(&self, session_id: &SessionId) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.acquire("load").await?;

        let row = sqlx::query(self.table.select_sql())
            .bind(session_id.as_str())
            .fetch_optional(&mut *conn)
            .await
            .map_err(StoreError::Statement)?;

        let Some(row) = row else {
            debug!("no session found");
            return Ok(None);
        };

        let text: Option<String> = row.try_get("data").map_err(StoreError::Statement)?;
        let Some(text) = text else {
            return Ok(None);
        };

        match codec::decode(&text) {
            Some(bytes) => Ok(Some(bytes)),
            None => {
                warn!("stored session payload is not valid base64, treating as absent");
                Ok(None)
            }
        }
    }

    #[instrument(skip_all, fields(session_id = %session_id, bytes = data.len()), target = "store")]
    async fn save(&self, session_id: &SessionId, data: &[u8]) -> StoreResult<()> {
        let encoded = codec::encode(data);
        let mut conn = self.acquire("save").await?;

        match self.strategy {
            SaveStrategy::UpdateThenInsert => {
                self.update_then_insert(&mut conn, session_id, &encoded).await
            }
            SaveStrategy::Native => self.native_upsert(&mut conn, session_id, &encoded).await,
        }
    }

    async fn touch(&self, _session_id: &SessionId) -> StoreResult<()> {
        Ok(())
    }

    #[instrument(skip_all, fields(session_id = %session_id), target = "store")]
    async fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        let mut conn = self.acquire("delete").await?;

        let result = sqlx::query(self.table.delete_sql())
            .bind(session_id.as_str())
            .execute(&mut *conn)
            .await
            .map_err(StoreError::Statement)?;

        debug!(rows = result.rows_affected(), "session deleted");
        Ok(())
    }
}
