pub mod sql_store;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::model::SessionId;

/// Persistence seam consumed by the session layer.
///
/// Payloads are opaque bytes. Every call resolves exactly once, with either a
/// value or a `StoreError`, including when no connection can be obtained.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stored payload for `session_id`, or `None` if there is none (or it is unreadable).
    async fn load(&self, session_id: &SessionId) -> StoreResult<Option<Vec<u8>>>;

    /// Insert or replace the payload for `session_id`.
    async fn save(&self, session_id: &SessionId, data: &[u8]) -> StoreResult<()>;

    /// Acknowledge activity on a session. Storage is not touched.
    async fn touch(&self, session_id: &SessionId) -> StoreResult<()>;

    /// Remove the session. Removing an unknown id succeeds.
    async fn delete(&self, session_id: &SessionId) -> StoreResult<()>;
}
