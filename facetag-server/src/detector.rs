//! Detection engine selection

use facetag_common::config::DetectionConfig;
use facetag_common::detection::DetectionService;
use tracing::warn;

/// Build the detection service from configuration
///
/// Detection is optional: without a usable engine the service still starts
/// and `/api/detect` answers "model unavailable", leaving manual tagging.
pub fn build_detection_service(config: &DetectionConfig) -> DetectionService {
    let policy = config.policy();

    let Some(model_path) = &config.model_path else {
        warn!("detection.model_path not set, face detection disabled");
        return DetectionService::unavailable(policy);
    };

    #[cfg(feature = "rustface")]
    {
        use std::sync::Arc;

        match facetag_common::detection::RustfaceDetector::from_file(model_path) {
            Ok(detector) => {
                tracing::info!("Face detection model loaded from {}", model_path.display());
                DetectionService::new(Arc::new(detector), policy)
            }
            Err(e) => {
                tracing::error!("{}", e);
                DetectionService::unavailable(policy)
            }
        }
    }

    #[cfg(not(feature = "rustface"))]
    {
        warn!(
            "detection.model_path is {} but this build has no detection engine (enable the `rustface` feature)",
            model_path.display()
        );
        DetectionService::unavailable(policy)
    }
}
