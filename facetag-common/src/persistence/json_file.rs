//! JSON-file backed gateways

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{EventGateway, TagListStore};
use crate::model::{EventState, FaceRecord};
use crate::Result;

/// Event state stored as one pretty-printed JSON file
#[derive(Debug)]
pub struct JsonFileEventGateway {
    path: PathBuf,
    default_image_url: String,
}

impl JsonFileEventGateway {
    pub fn new(path: impl Into<PathBuf>, default_image_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_image_url: default_image_url.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventGateway for JsonFileEventGateway {
    async fn load(&self) -> Result<EventState> {
        match read_json::<EventState>(&self.path).await? {
            Some(state) => Ok(state),
            None => {
                debug!(path = %self.path.display(), "No event data yet, using empty state");
                Ok(EventState::empty(self.default_image_url.clone()))
            }
        }
    }

    async fn save(&self, state: &EventState) -> Result<()> {
        write_json_atomic(&self.path, state).await?;
        debug!(
            path = %self.path.display(),
            faces = state.faces.len(),
            "Event data written"
        );
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TagDocument {
    #[serde(default)]
    tags: Vec<FaceRecord>,
}

/// Tag list stored as `{"tags": [...]}` in one JSON file
///
/// Clearing removes the file, so a cleared list and a never-written one look
/// the same.
#[derive(Debug)]
pub struct JsonFileTagStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileTagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl TagListStore for JsonFileTagStore {
    async fn get(&self) -> Result<Vec<FaceRecord>> {
        Ok(read_json::<TagDocument>(&self.path)
            .await?
            .map(|doc| doc.tags)
            .unwrap_or_default())
    }

    async fn replace(&self, tags: Vec<FaceRecord>) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let count = tags.len();
        write_json_atomic(&self.path, &TagDocument { tags }).await?;
        Ok(count)
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Tag list cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Read a JSON document, `None` when the file does not exist
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write a JSON document via a sibling temp file and rename
///
/// Readers see either the old or the new document, never a partial one.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data.json".to_string());
    let tmp = path.with_file_name(format!(
        ".{}.{}.tmp",
        file_name,
        uuid::Uuid::new_v4().simple()
    ));

    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_file_returns_default_state() {
        let dir = TempDir::new().unwrap();
        let gateway = JsonFileEventGateway::new(dir.path().join("event.json"), "/photo.jpg");
        let state = gateway.load().await.unwrap();
        assert_eq!(state, EventState::empty("/photo.jpg"));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let gateway = JsonFileEventGateway::new(dir.path().join("nested/event.json"), "/d.jpg");
        let mut state = EventState::empty("/group.jpg");
        state.faces.push(FaceRecord::new("a", 0.1, 0.1, 0.2, 0.2));

        gateway.save(&state).await.unwrap();
        assert_eq!(gateway.load().await.unwrap(), state);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, b"{not json").unwrap();
        let gateway = JsonFileEventGateway::new(path, "/d.jpg");
        assert!(matches!(gateway.load().await, Err(crate::Error::Json(_))));
    }

    #[tokio::test]
    async fn test_tag_file_replace_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileTagStore::new(dir.path().join("tags.json"));
        assert!(store.get().await.unwrap().is_empty());

        let tags = vec![
            FaceRecord::new("t1", 0.1, 0.1, 0.05, 0.05),
            FaceRecord::new("t2", 0.5, 0.5, 0.05, 0.05),
        ];
        assert_eq!(store.replace(tags.clone()).await.unwrap(), 2);
        assert_eq!(store.get().await.unwrap(), tags);

        store.replace(vec![tags[1].clone()]).await.unwrap();
        assert_eq!(store.get().await.unwrap(), vec![tags[1].clone()]);

        store.clear().await.unwrap();
        assert!(store.get().await.unwrap().is_empty());
        store.clear().await.unwrap();
    }
}
