//! Access to the server's event and tag list endpoints
//!
//! [`HttpRemote`] talks to a running facetag-server. [`DirectRemote`] calls
//! the same stores in-process, for single-process deployments and tests.
//! Calls are fire-and-wait: no retries, failures are returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use facetag_common::api::{
    DeleteFaceResponse, ErrorResponse, SaveEventRequest, SaveEventResponse, SaveTagsRequest,
    SaveTagsResponse, TagListResponse,
};
use facetag_common::persistence::{EventStore, TagListStore};
use facetag_common::{Error, EventState, FaceRecord, Result};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Default timeout for server requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Merge-on-save event endpoint
#[async_trait]
pub trait EventRemote: Send + Sync {
    async fn fetch(&self) -> Result<EventState>;

    /// Submit records for merging; returns the merged state
    async fn submit(&self, request: &SaveEventRequest) -> Result<EventState>;

    /// Delete one record; returns the resulting state
    async fn delete_face(&self, id: &str) -> Result<EventState>;
}

/// Replace-on-save tag list endpoint
#[async_trait]
pub trait TagListRemote: Send + Sync {
    async fn fetch_tags(&self) -> Result<Vec<FaceRecord>>;

    /// Replace the whole list; returns the stored count
    async fn replace_tags(&self, tags: &[FaceRecord]) -> Result<usize>;

    async fn clear_tags(&self) -> Result<()>;
}

/// HTTP client for a facetag-server
#[derive(Debug, Clone)]
pub struct HttpRemote {
    http_client: Client,
    base_url: Url,
}

impl HttpRemote {
    /// Client for the server at `base_url` (e.g. `http://127.0.0.1:5790`)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("Invalid server URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("Invalid server URL '{}'", base_url)));
        }
        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Endpoint URL under the base; each segment is percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Decode a JSON body, turning non-2xx responses into [`Error::Remote`]
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let reason = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        return Err(Error::Remote(format!("server returned {}: {}", status, reason)));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| Error::Remote(format!("invalid response body: {}", e)))
}

fn network(e: reqwest::Error) -> Error {
    Error::Remote(format!("request failed: {}", e))
}

#[async_trait]
impl EventRemote for HttpRemote {
    async fn fetch(&self) -> Result<EventState> {
        let response = self
            .http_client
            .get(self.url(&["api", "event"]))
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }

    async fn submit(&self, request: &SaveEventRequest) -> Result<EventState> {
        debug!(faces = request.faces.len(), "POST /api/event");
        let response = self
            .http_client
            .post(self.url(&["api", "event"]))
            .json(request)
            .send()
            .await
            .map_err(network)?;
        let body: SaveEventResponse = decode(response).await?;
        Ok(body.data)
    }

    async fn delete_face(&self, id: &str) -> Result<EventState> {
        let response = self
            .http_client
            .delete(self.url(&["api", "event", "faces", id]))
            .send()
            .await
            .map_err(network)?;
        let body: DeleteFaceResponse = decode(response).await?;
        Ok(body.data)
    }
}

#[async_trait]
impl TagListRemote for HttpRemote {
    async fn fetch_tags(&self) -> Result<Vec<FaceRecord>> {
        let response = self
            .http_client
            .get(self.url(&["api", "tags"]))
            .send()
            .await
            .map_err(network)?;
        let body: TagListResponse = decode(response).await?;
        Ok(body.tags)
    }

    async fn replace_tags(&self, tags: &[FaceRecord]) -> Result<usize> {
        let request = SaveTagsRequest {
            tags: tags.to_vec(),
        };
        let response = self
            .http_client
            .post(self.url(&["api", "tags"]))
            .json(&request)
            .send()
            .await
            .map_err(network)?;
        let body: SaveTagsResponse = decode(response).await?;
        Ok(body.count)
    }

    async fn clear_tags(&self) -> Result<()> {
        let response = self
            .http_client
            .delete(self.url(&["api", "tags"]))
            .send()
            .await
            .map_err(network)?;
        decode::<serde_json::Value>(response).await.map(|_| ())
    }
}

/// In-process access to the server-side stores
#[derive(Clone)]
pub struct DirectRemote {
    events: Arc<EventStore>,
    tags: Arc<dyn TagListStore>,
}

impl DirectRemote {
    pub fn new(events: Arc<EventStore>, tags: Arc<dyn TagListStore>) -> Self {
        Self { events, tags }
    }
}

#[async_trait]
impl EventRemote for DirectRemote {
    async fn fetch(&self) -> Result<EventState> {
        self.events.load().await
    }

    async fn submit(&self, request: &SaveEventRequest) -> Result<EventState> {
        for face in &request.faces {
            face.validate()?;
        }
        self.events
            .save(request.image_url.as_deref(), &request.faces)
            .await
    }

    async fn delete_face(&self, id: &str) -> Result<EventState> {
        let (_, state) = self.events.remove(&[id.to_string()]).await?;
        Ok(state)
    }
}

#[async_trait]
impl TagListRemote for DirectRemote {
    async fn fetch_tags(&self) -> Result<Vec<FaceRecord>> {
        self.tags.get().await
    }

    async fn replace_tags(&self, tags: &[FaceRecord]) -> Result<usize> {
        for tag in tags {
            tag.validate()?;
        }
        self.tags.replace(tags.to_vec()).await
    }

    async fn clear_tags(&self) -> Result<()> {
        self.tags.clear().await
    }
}
