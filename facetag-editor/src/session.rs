//! Editor session state
//!
//! One [`EditorSession`] per open editor. It owns the local record store and
//! the active selection, mirrors every edit to a [`LocalCache`], and pushes
//! edits to the server through a debounced merge-on-save. Only records this
//! editor changed since its last save are submitted, so a stale copy of
//! someone else's record is never written back. The photo reference is only
//! sent after this editor changed it. The server's merged answer
//! replaces the local records unless the user kept editing while the save was
//! in flight.
//!
//! Saves never retry on their own. A failed save keeps the local edits (and
//! their cached copy) and surfaces the error through [`SessionStatus`]; the
//! next edit or an explicit [`EditorSession::flush`] tries again.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use facetag_common::api::SaveEventRequest;
use facetag_common::merge::merge;
use facetag_common::store::RecordStore;
use facetag_common::{Error, EventState, FacePatch, FaceRecord, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::LocalCache;
use crate::debounce::Debouncer;
use crate::remote::EventRemote;

/// What the local cache holds between reloads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSession {
    pub image_url: String,
    pub faces: Vec<FaceRecord>,
    #[serde(default)]
    pub pending_deletes: Vec<String>,
    /// Ids of records edited since the last acknowledged save
    #[serde(default)]
    pub touched: Vec<String>,
    /// `image_url` was set here and not yet acknowledged
    #[serde(default)]
    pub image_url_changed: bool,
    /// Edits the server has not acknowledged yet
    #[serde(default)]
    pub unsynced: bool,
}

impl CachedSession {
    /// The cached records this editor changed
    fn touched_faces(&self) -> Vec<FaceRecord> {
        self.faces
            .iter()
            .filter(|f| self.touched.contains(&f.id))
            .cloned()
            .collect()
    }
}

/// Snapshot of the session's sync state
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub face_count: usize,
    pub dirty: bool,
    pub pending_deletes: usize,
    pub last_saved: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

struct SessionState {
    image_url: String,
    store: RecordStore,
    active_face_id: Option<String>,
    pending_deletes: Vec<String>,
    touched: BTreeSet<String>,
    image_url_changed: bool,
    /// Bumped on every local edit
    revision: u64,
    dirty: bool,
    last_saved: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl SessionState {
    fn from_event(state: EventState) -> Self {
        Self {
            image_url: state.image_url,
            store: RecordStore::from_records(state.faces),
            active_face_id: None,
            pending_deletes: Vec::new(),
            touched: BTreeSet::new(),
            image_url_changed: false,
            revision: 0,
            dirty: false,
            last_saved: None,
            last_error: None,
        }
    }

    fn unsynced(&self) -> bool {
        self.dirty || !self.pending_deletes.is_empty()
    }

    fn snapshot(&self) -> EventState {
        EventState {
            image_url: self.image_url.clone(),
            faces: self.store.list().to_vec(),
        }
    }

    fn to_cached(&self) -> CachedSession {
        CachedSession {
            image_url: self.image_url.clone(),
            faces: self.store.list().to_vec(),
            pending_deletes: self.pending_deletes.clone(),
            touched: self.touched.iter().cloned().collect(),
            image_url_changed: self.image_url_changed,
            unsynced: self.unsynced(),
        }
    }

    fn touch(&mut self, id: &str) {
        self.touched.insert(id.to_string());
    }

    /// Records to submit: the touched ones, in store order
    fn outgoing(&self) -> Vec<FaceRecord> {
        self.store
            .list()
            .iter()
            .filter(|f| self.touched.contains(&f.id))
            .cloned()
            .collect()
    }

    /// Photo reference to submit: only one this editor changed
    fn outgoing_image_url(&self) -> Option<String> {
        self.image_url_changed.then(|| self.image_url.clone())
    }

    /// Layer this editor's touched records, deletes and photo change over a
    /// server state
    fn rebase(&mut self, server: EventState) {
        let mut faces = merge(&server.faces, &self.outgoing());
        faces.retain(|f| !self.pending_deletes.contains(&f.id));
        let image_url = match self.outgoing_image_url() {
            Some(local) => local,
            None => server.image_url,
        };
        self.accept(EventState { image_url, faces });
    }

    /// Take the server's merged state, keeping the selection when it survived
    fn accept(&mut self, merged: EventState) {
        self.image_url = merged.image_url;
        self.store.replace_all(merged.faces);
        if let Some(active) = &self.active_face_id {
            if !self.store.contains(active) {
                self.active_face_id = None;
            }
        }
    }
}

struct Shared {
    state: RwLock<SessionState>,
    remote: Arc<dyn EventRemote>,
    cache: Option<LocalCache<CachedSession>>,
    debouncer: Debouncer,
    /// One save in flight at a time
    save_lock: Mutex<()>,
}

/// Application state for one editor
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct EditorSession {
    shared: Arc<Shared>,
}

impl EditorSession {
    /// Open a session, preferring the server's state
    ///
    /// When the server is unreachable the cached copy is used, and failing
    /// that an empty default state. Unsynced cached edits are merged over the
    /// server's state and a save is scheduled for them.
    pub async fn open(
        remote: Arc<dyn EventRemote>,
        cache: Option<LocalCache<CachedSession>>,
        save_delay: Duration,
    ) -> Self {
        let cached = match &cache {
            Some(cache) => cache.load().await,
            None => None,
        };

        let (state, resave) = match remote.fetch().await {
            Ok(server) => match cached {
                Some(cached) if cached.unsynced => {
                    info!(
                        faces = cached.faces.len(),
                        deletes = cached.pending_deletes.len(),
                        "Recovering unsynced edits from local cache"
                    );
                    let mut faces = merge(&server.faces, &cached.touched_faces());
                    faces.retain(|f| !cached.pending_deletes.contains(&f.id));
                    let image_url = if cached.image_url_changed {
                        cached.image_url
                    } else {
                        server.image_url
                    };
                    let mut state = SessionState::from_event(EventState { image_url, faces });
                    state.pending_deletes = cached.pending_deletes;
                    state.touched = cached.touched.into_iter().collect();
                    state.image_url_changed = cached.image_url_changed;
                    state.dirty = true;
                    (state, true)
                }
                _ => (SessionState::from_event(server), false),
            },
            Err(e) => {
                warn!("Could not load event state from server: {}", e);
                let mut state = match cached {
                    Some(cached) => {
                        info!(faces = cached.faces.len(), "Using local cache");
                        let mut state = SessionState::from_event(EventState {
                            image_url: cached.image_url,
                            faces: cached.faces,
                        });
                        state.pending_deletes = cached.pending_deletes;
                        state.touched = cached.touched.into_iter().collect();
                        state.image_url_changed = cached.image_url_changed;
                        state.dirty = cached.unsynced;
                        state
                    }
                    None => SessionState::from_event(EventState::default()),
                };
                state.last_error = Some(e.to_string());
                (state, false)
            }
        };

        let session = Self {
            shared: Arc::new(Shared {
                state: RwLock::new(state),
                remote,
                cache,
                debouncer: Debouncer::new(save_delay),
                save_lock: Mutex::new(()),
            }),
        };
        session.mirror().await;
        if resave {
            session.schedule_save();
        }
        session
    }

    pub async fn faces(&self) -> Vec<FaceRecord> {
        self.shared.state.read().await.store.list().to_vec()
    }

    pub async fn face(&self, id: &str) -> Option<FaceRecord> {
        self.shared.state.read().await.store.get(id).cloned()
    }

    pub async fn image_url(&self) -> String {
        self.shared.state.read().await.image_url.clone()
    }

    /// The whole local state as it would be saved
    pub async fn snapshot(&self) -> EventState {
        self.shared.state.read().await.snapshot()
    }

    pub async fn set_image_url(&self, url: impl Into<String>) -> Result<()> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::InvalidInput("Image URL must not be empty".to_string()));
        }
        self.mutate(move |state| {
            state.image_url = url;
            state.image_url_changed = true;
            Ok(())
        })
        .await
    }

    pub async fn active_face_id(&self) -> Option<String> {
        self.shared.state.read().await.active_face_id.clone()
    }

    pub async fn active_face(&self) -> Option<FaceRecord> {
        let state = self.shared.state.read().await;
        state
            .active_face_id
            .as_deref()
            .and_then(|id| state.store.get(id))
            .cloned()
    }

    /// Select a record for editing, or clear the selection with `None`
    ///
    /// Selection is local to this editor and never saved.
    pub async fn set_active_face(&self, id: Option<&str>) -> Result<()> {
        let mut state = self.shared.state.write().await;
        if let Some(id) = id {
            if !state.store.contains(id) {
                return Err(Error::NotFound(format!("Face not found: {}", id)));
            }
        }
        state.active_face_id = id.map(str::to_string);
        Ok(())
    }

    pub async fn add_face(&self, record: FaceRecord) -> Result<()> {
        record.validate()?;
        self.mutate(move |state| {
            state.touch(&record.id);
            state.store.add(record);
            Ok(())
        })
        .await
    }

    /// Add a manual tag at a normalized click position and select it
    pub async fn add_point_tag(&self, x: f64, y: f64) -> Result<FaceRecord> {
        let record = FaceRecord::point_tag(x, y)?;
        let added = record.clone();
        self.mutate(move |state| {
            state.active_face_id = Some(record.id.clone());
            state.touch(&record.id);
            state.store.add(record);
            Ok(())
        })
        .await?;
        Ok(added)
    }

    /// Add freshly detected records, returning how many were added
    pub async fn add_detected(&self, records: Vec<FaceRecord>) -> Result<usize> {
        for record in &records {
            record.validate()?;
        }
        let count = records.len();
        if count == 0 {
            return Ok(0);
        }
        self.mutate(move |state| {
            for record in records {
                state.touch(&record.id);
                state.store.add(record);
            }
            Ok(())
        })
        .await?;
        Ok(count)
    }

    /// Patch one record; the patched record must still be valid
    pub async fn update_face(&self, id: &str, patch: &FacePatch) -> Result<FaceRecord> {
        self.mutate(|state| {
            let mut candidate = state
                .store
                .get(id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("Face not found: {}", id)))?;
            candidate.apply(patch);
            candidate.validate()?;
            state.touch(id);
            state.store.update_by_id(id, patch).cloned()
        })
        .await
    }

    /// Delete a record locally and queue the delete for the server
    pub async fn remove_face(&self, id: &str) -> Result<FaceRecord> {
        self.mutate(|state| {
            let removed = state
                .store
                .remove_by_id(id)
                .ok_or_else(|| Error::NotFound(format!("Face not found: {}", id)))?;
            if state.active_face_id.as_deref() == Some(id) {
                state.active_face_id = None;
            }
            state.touched.remove(id);
            if !state.pending_deletes.iter().any(|d| d == id) {
                state.pending_deletes.push(id.to_string());
            }
            Ok(removed)
        })
        .await
    }

    /// Save now instead of waiting for the idle delay
    pub async fn flush(&self) -> Result<EventState> {
        self.shared.debouncer.cancel();
        self.save_now().await
    }

    /// Re-read the server's state
    ///
    /// Unsaved local edits are kept on top of what the server returned.
    pub async fn refresh(&self) -> Result<EventState> {
        let server = self.shared.remote.fetch().await?;
        let snapshot = {
            let mut state = self.shared.state.write().await;
            if state.unsynced() {
                state.rebase(server);
            } else {
                state.accept(server);
            }
            state.last_error = None;
            state.snapshot()
        };
        self.mirror().await;
        Ok(snapshot)
    }

    pub async fn status(&self) -> SessionStatus {
        let state = self.shared.state.read().await;
        SessionStatus {
            face_count: state.store.len(),
            dirty: state.dirty,
            pending_deletes: state.pending_deletes.len(),
            last_saved: state.last_saved,
            last_error: state.last_error.clone(),
        }
    }

    /// Apply a local edit, mirror it, and (re)arm the save timer
    async fn mutate<R>(&self, edit: impl FnOnce(&mut SessionState) -> Result<R>) -> Result<R> {
        let result = {
            let mut state = self.shared.state.write().await;
            let result = edit(&mut *state)?;
            state.revision += 1;
            state.dirty = true;
            result
        };
        self.mirror().await;
        self.schedule_save();
        Ok(result)
    }

    fn schedule_save(&self) {
        let session = self.clone();
        self.shared.debouncer.schedule(async move {
            // Failures are recorded in the session status.
            let _ = session.save_now().await;
        });
    }

    async fn save_now(&self) -> Result<EventState> {
        let _saving = self.shared.save_lock.lock().await;

        let (request, deletes, revision) = {
            let state = self.shared.state.read().await;
            if !state.unsynced() {
                return Ok(state.snapshot());
            }
            let request = SaveEventRequest {
                image_url: state.outgoing_image_url(),
                faces: state.outgoing(),
            };
            (request, state.pending_deletes.clone(), state.revision)
        };

        debug!(
            faces = request.faces.len(),
            deletes = deletes.len(),
            "Saving event state"
        );
        let outcome = self.push(&request, &deletes).await;

        let result = {
            let mut state = self.shared.state.write().await;
            match outcome {
                Ok(merged) => {
                    state.pending_deletes.retain(|id| !deletes.contains(id));
                    if state.revision == revision {
                        state.touched.clear();
                        state.image_url_changed = false;
                        state.accept(merged.clone());
                        state.dirty = false;
                    } else {
                        debug!("Edited during save, rebasing local edits");
                        for sent in &request.faces {
                            if state.store.get(&sent.id) == Some(sent) {
                                state.touched.remove(&sent.id);
                            }
                        }
                        if request.image_url.as_ref() == Some(&state.image_url) {
                            state.image_url_changed = false;
                        }
                        state.rebase(merged.clone());
                    }
                    state.last_saved = Some(Utc::now());
                    state.last_error = None;
                    Ok(merged)
                }
                Err(e) => {
                    warn!("Save failed, keeping local edits: {}", e);
                    state.last_error = Some(e.to_string());
                    Err(e)
                }
            }
        };
        self.mirror().await;
        result
    }

    async fn push(&self, request: &SaveEventRequest, deletes: &[String]) -> Result<EventState> {
        for id in deletes {
            self.shared.remote.delete_face(id).await?;
        }
        self.shared.remote.submit(request).await
    }

    async fn mirror(&self) {
        let Some(cache) = &self.shared.cache else {
            return;
        };
        let cached = self.shared.state.read().await.to_cached();
        if let Err(e) = cache.store(&cached).await {
            warn!(path = %cache.path().display(), "Failed to write local cache: {}", e);
        }
    }
}
