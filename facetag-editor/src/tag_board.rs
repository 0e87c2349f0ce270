//! Self-serve tag list
//!
//! Attendees drop point tags on the photo and claim them. Unlike the event
//! state, the tag list is saved by replacing the whole list, so the last
//! writer wins.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use facetag_common::store::RecordStore;
use facetag_common::{Error, FacePatch, FaceRecord, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::cache::LocalCache;
use crate::debounce::Debouncer;
use crate::remote::TagListRemote;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedTags {
    pub tags: Vec<FaceRecord>,
    #[serde(default)]
    pub unsynced: bool,
}

struct BoardState {
    tags: RecordStore,
    dirty: bool,
    last_saved: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

struct Inner {
    state: RwLock<BoardState>,
    remote: Arc<dyn TagListRemote>,
    cache: Option<LocalCache<CachedTags>>,
    debouncer: Debouncer,
    save_lock: Mutex<()>,
}

#[derive(Clone)]
pub struct TagBoard {
    inner: Arc<Inner>,
}

impl TagBoard {
    /// Load the list from the server, falling back to the local cache
    ///
    /// Unsynced cached tags win over the server's list and are saved again.
    pub async fn open(
        remote: Arc<dyn TagListRemote>,
        cache: Option<LocalCache<CachedTags>>,
        save_delay: Duration,
    ) -> Self {
        let cached = match &cache {
            Some(cache) => cache.load().await,
            None => None,
        };

        let mut resave = false;
        let state = match (remote.fetch_tags().await, cached) {
            (Ok(_), Some(cached)) if cached.unsynced => {
                resave = true;
                BoardState::new(cached.tags, true, None)
            }
            (Ok(tags), _) => BoardState::new(tags, false, None),
            (Err(e), Some(cached)) => {
                warn!("Could not load tags from server, using local cache: {}", e);
                BoardState::new(cached.tags, cached.unsynced, Some(e.to_string()))
            }
            (Err(e), None) => {
                warn!("Could not load tags from server: {}", e);
                BoardState::new(Vec::new(), false, Some(e.to_string()))
            }
        };

        let board = Self {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                remote,
                cache,
                debouncer: Debouncer::new(save_delay),
                save_lock: Mutex::new(()),
            }),
        };
        board.mirror().await;
        if resave {
            board.schedule_save();
        }
        board
    }

    pub async fn tags(&self) -> Vec<FaceRecord> {
        self.inner.state.read().await.tags.list().to_vec()
    }

    pub async fn is_dirty(&self) -> bool {
        self.inner.state.read().await.dirty
    }

    pub async fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.inner.state.read().await.last_saved
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.state.read().await.last_error.clone()
    }

    /// Drop an unclaimed tag at a normalized click position
    pub async fn add_point_tag(&self, x: f64, y: f64) -> Result<FaceRecord> {
        let tag = FaceRecord::point_tag(x, y)?;
        let added = tag.clone();
        self.edit(move |tags| {
            tags.add(tag);
            Ok(())
        })
        .await?;
        Ok(added)
    }

    /// Put a name (and optionally title and profile link) on a tag
    pub async fn claim(
        &self,
        id: &str,
        name: &str,
        title: Option<String>,
        linkedin_url: Option<String>,
    ) -> Result<FaceRecord> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("Name must not be empty".to_string()));
        }
        let patch = FacePatch::person(name.trim(), title, linkedin_url);
        self.edit(|tags| tags.update_by_id(id, &patch).cloned()).await
    }

    pub async fn remove_tag(&self, id: &str) -> Result<FaceRecord> {
        self.edit(|tags| {
            tags.remove_by_id(id)
                .ok_or_else(|| Error::NotFound(format!("Tag not found: {}", id)))
        })
        .await
    }

    /// Delete every tag, locally and on the server, without waiting
    pub async fn clear(&self) -> Result<()> {
        self.inner.debouncer.cancel();
        let _saving = self.inner.save_lock.lock().await;
        self.inner.remote.clear_tags().await?;
        {
            let mut state = self.inner.state.write().await;
            state.tags.replace_all(Vec::new());
            state.dirty = false;
            state.last_saved = Some(Utc::now());
            state.last_error = None;
        }
        self.mirror().await;
        Ok(())
    }

    /// Save now instead of waiting for the idle delay
    pub async fn flush(&self) -> Result<usize> {
        self.inner.debouncer.cancel();
        self.save_now().await
    }

    async fn edit<R>(&self, change: impl FnOnce(&mut RecordStore) -> Result<R>) -> Result<R> {
        let result = {
            let mut state = self.inner.state.write().await;
            let result = change(&mut state.tags)?;
            state.dirty = true;
            result
        };
        self.mirror().await;
        self.schedule_save();
        Ok(result)
    }

    fn schedule_save(&self) {
        let board = self.clone();
        self.inner.debouncer.schedule(async move {
            let _ = board.save_now().await;
        });
    }

    async fn save_now(&self) -> Result<usize> {
        let _saving = self.inner.save_lock.lock().await;
        let tags = {
            let state = self.inner.state.read().await;
            if !state.dirty {
                return Ok(state.tags.len());
            }
            state.tags.list().to_vec()
        };

        debug!(count = tags.len(), "Saving tag list");
        let outcome = self.inner.remote.replace_tags(&tags).await;
        let result = {
            let mut state = self.inner.state.write().await;
            match outcome {
                Ok(count) => {
                    // Still dirty if edited while the save was in flight.
                    state.dirty = state.tags.list() != tags.as_slice();
                    state.last_saved = Some(Utc::now());
                    state.last_error = None;
                    Ok(count)
                }
                Err(e) => {
                    warn!("Tag save failed, keeping local tags: {}", e);
                    state.last_error = Some(e.to_string());
                    Err(e)
                }
            }
        };
        self.mirror().await;
        result
    }

    async fn mirror(&self) {
        let Some(cache) = &self.inner.cache else {
            return;
        };
        let cached = {
            let state = self.inner.state.read().await;
            CachedTags {
                tags: state.tags.list().to_vec(),
                unsynced: state.dirty,
            }
        };
        if let Err(e) = cache.store(&cached).await {
            warn!(path = %cache.path().display(), "Failed to write tag cache: {}", e);
        }
    }
}

impl BoardState {
    fn new(tags: Vec<FaceRecord>, dirty: bool, last_error: Option<String>) -> Self {
        Self {
            tags: RecordStore::from_records(tags),
            dirty,
            last_saved: None,
            last_error,
        }
    }
}
