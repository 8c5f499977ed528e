use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use session_store::{SessionId, SessionStore, StoreResult};

#[derive(Default)]
pub struct InMemorySessionStore {
    pub map: Arc<Mutex<HashMap<SessionId, Vec<u8>>>>,
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &SessionId) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.map.lock().await.get(session_id).cloned())
    }

    async fn save(&self, session_id: &SessionId, data: &[u8]) -> StoreResult<()> {
        self.map
            .lock()
            .await
            .insert(session_id.clone(), data.to_vec());
        Ok(())
    }

    async fn touch(&self, _session_id: &SessionId) -> StoreResult<()> {
        Ok(())
    }

    async fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        self.map.lock().await.remove(session_id);
        Ok(())
    }
}
