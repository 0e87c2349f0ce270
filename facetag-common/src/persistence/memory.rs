//! Process-local gateways
//!
//! Used when no durable backend is configured and in tests. Contents vanish
//! with the process.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{EventGateway, TagListStore};
use crate::model::{EventState, FaceRecord};
use crate::Result;

#[derive(Debug)]
pub struct MemoryEventGateway {
    state: RwLock<Option<EventState>>,
    default_image_url: String,
}

impl MemoryEventGateway {
    pub fn new(default_image_url: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(None),
            default_image_url: default_image_url.into(),
        }
    }
}

#[async_trait]
impl EventGateway for MemoryEventGateway {
    async fn load(&self) -> Result<EventState> {
        Ok(self
            .state
            .read()
            .await
            .clone()
            .unwrap_or_else(|| EventState::empty(self.default_image_url.clone())))
    }

    async fn save(&self, state: &EventState) -> Result<()> {
        *self.state.write().await = Some(state.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryTagStore {
    tags: RwLock<Vec<FaceRecord>>,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TagListStore for MemoryTagStore {
    async fn get(&self) -> Result<Vec<FaceRecord>> {
        Ok(self.tags.read().await.clone())
    }

    async fn replace(&self, tags: Vec<FaceRecord>) -> Result<usize> {
        let count = tags.len();
        *self.tags.write().await = tags;
        Ok(count)
    }

    async fn clear(&self) -> Result<()> {
        self.tags.write().await.clear();
        Ok(())
    }
}
