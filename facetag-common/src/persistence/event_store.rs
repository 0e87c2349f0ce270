//! Merge-on-save front end for an [`EventGateway`]

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::EventGateway;
use crate::merge;
use crate::model::{EventState, FaceRecord};
use crate::Result;

/// Reconciling access to the persisted event state
///
/// Every save is load → [`merge::merge`] → save. Within one process the
/// cycle is serialized so two requests cannot interleave their read and
/// write halves; across processes the merge keeps repeated saves converging.
pub struct EventStore {
    gateway: Arc<dyn EventGateway>,
    write_lock: Mutex<()>,
}

impl EventStore {
    pub fn new(gateway: Arc<dyn EventGateway>) -> Self {
        Self {
            gateway,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> Result<EventState> {
        self.gateway.load().await
    }

    /// Merge `faces` into the persisted state and commit
    ///
    /// A missing or blank `image_url` keeps the current photo reference.
    pub async fn save(&self, image_url: Option<&str>, faces: &[FaceRecord]) -> Result<EventState> {
        let _guard = self.write_lock.lock().await;
        let current = self.gateway.load().await?;

        let image_url = match image_url.map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => current.image_url.clone(),
        };

        let merged = EventState {
            image_url,
            faces: merge::merge(&current.faces, faces),
        };
        self.gateway.save(&merged).await?;

        info!(
            incoming = faces.len(),
            before = current.faces.len(),
            after = merged.faces.len(),
            "Event data saved"
        );
        Ok(merged)
    }

    /// Delete records by id and commit, returning the removed count and the
    /// resulting state
    pub async fn remove(&self, ids: &[String]) -> Result<(usize, EventState)> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.gateway.load().await?;
        let removed = merge::remove(&mut state.faces, ids);
        if removed == 0 {
            warn!(?ids, "Delete requested for unknown record ids");
            return Ok((0, state));
        }
        self.gateway.save(&state).await?;
        info!(removed, remaining = state.faces.len(), "Event records deleted");
        Ok((removed, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryEventGateway;

    fn store() -> EventStore {
        EventStore::new(Arc::new(MemoryEventGateway::new("/default.jpg")))
    }

    #[tokio::test]
    async fn test_blank_image_url_keeps_previous() {
        let store = store();
        store.save(Some("/group.jpg"), &[]).await.unwrap();

        let state = store.save(Some("   "), &[]).await.unwrap();
        assert_eq!(state.image_url, "/group.jpg");
        let state = store.save(None, &[]).await.unwrap();
        assert_eq!(state.image_url, "/group.jpg");
    }

    #[tokio::test]
    async fn test_missing_image_url_falls_back_to_default() {
        let state = store().save(None, &[]).await.unwrap();
        assert_eq!(state.image_url, "/default.jpg");
    }

    #[tokio::test]
    async fn test_remove_unknown_id_does_not_write() {
        let store = store();
        store
            .save(None, &[FaceRecord::new("a", 0.1, 0.1, 0.1, 0.1)])
            .await
            .unwrap();
        let (removed, state) = store.remove(&["zzz".to_string()]).await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(state.faces.len(), 1);
    }
}
