//! facetag-server library
//!
//! HTTP service holding the shared event photo state and the self-serve tag
//! list, plus a face detection endpoint.

use std::path::Path;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use facetag_common::config::{self, TagBackend, TomlConfig};
use facetag_common::detection::DetectionService;
use facetag_common::persistence::{
    EventStore, JsonFileEventGateway, JsonFileTagStore, MemoryTagStore, TagListStore,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod api;
pub mod detector;

/// Largest accepted upload for detection
pub const MAX_IMAGE_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Merge-on-save access to the event state
    pub events: Arc<EventStore>,
    /// Whole-list tag storage
    pub tags: Arc<dyn TagListStore>,
    pub detection: Arc<DetectionService>,
}

impl AppState {
    pub fn new(
        events: Arc<EventStore>,
        tags: Arc<dyn TagListStore>,
        detection: Arc<DetectionService>,
    ) -> Self {
        Self {
            events,
            tags,
            detection,
        }
    }

    /// Wire the configured backends under `root_folder`
    pub fn from_config(config: &TomlConfig, root_folder: &Path) -> Self {
        let event_path = config::event_data_path(root_folder);
        info!("Event data: {}", event_path.display());
        let events = Arc::new(EventStore::new(Arc::new(JsonFileEventGateway::new(
            event_path,
            config.default_image_url.clone(),
        ))));

        let tags: Arc<dyn TagListStore> = match config.tags.backend {
            TagBackend::Memory => {
                info!("Tag list: in-memory (not persisted across restarts)");
                Arc::new(MemoryTagStore::new())
            }
            TagBackend::File => {
                let tag_path = config::tag_data_path(root_folder);
                info!("Tag list: {}", tag_path.display());
                Arc::new(JsonFileTagStore::new(tag_path))
            }
        };

        let detection = Arc::new(detector::build_detection_service(&config.detection));

        Self::new(events, tags, detection)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, post};

    Router::new()
        .route(
            "/api/event",
            get(api::event::get_event).post(api::event::save_event),
        )
        .route("/api/event/faces/:id", delete(api::event::delete_face))
        .route(
            "/api/tags",
            get(api::tags::get_tags)
                .post(api::tags::save_tags)
                .delete(api::tags::clear_tags),
        )
        .route(
            "/api/detect",
            post(api::detect::detect_faces).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .route("/api/buildinfo", get(api::buildinfo::get_build_info))
        .merge(api::health::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
