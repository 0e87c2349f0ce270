//! Persistence gateways
//!
//! Two kinds of shared state are stored, each as a single JSON document:
//!
//! - the **event state** (photo reference + faces), updated through
//!   [`EventStore`], which reconciles every save with [`crate::merge::merge`];
//! - the **tag list** of the self-serve tagging surface, which is replaced
//!   wholesale on every save.
//!
//! Gateways read and write whole documents. They make no promise about
//! concurrent writers beyond never leaving a half-written file behind.

use async_trait::async_trait;

use crate::model::{EventState, FaceRecord};
use crate::Result;

mod event_store;
mod json_file;
mod memory;

pub use event_store::EventStore;
pub use json_file::{read_json, write_json_atomic, JsonFileEventGateway, JsonFileTagStore};
pub use memory::{MemoryEventGateway, MemoryTagStore};

/// Load/save contract for the persisted event state
#[async_trait]
pub trait EventGateway: Send + Sync {
    /// Load the current state
    ///
    /// When nothing has ever been saved this returns an empty state with the
    /// gateway's default image reference, never an error.
    async fn load(&self) -> Result<EventState>;

    /// Overwrite the persisted state
    async fn save(&self, state: &EventState) -> Result<()>;
}

/// Storage for the self-serve tag list
#[async_trait]
pub trait TagListStore: Send + Sync {
    /// All tags, empty when none were saved
    async fn get(&self) -> Result<Vec<FaceRecord>>;

    /// Replace the whole list, returning the stored count
    async fn replace(&self, tags: Vec<FaceRecord>) -> Result<usize>;

    /// Delete every tag
    async fn clear(&self) -> Result<()>;
}
