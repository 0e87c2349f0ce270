//! Face detection boundary
//!
//! The engine is an opaque [`FaceDetector`]: grayscale pixels in, pixel-space
//! boxes out. [`DetectionService`] wraps it with the operational policy:
//! decode, cap the input size, one lower-threshold retry when nothing is
//! found, an overall timeout, and normalization into fresh face records.

use std::sync::Arc;
use std::time::Duration;

use image::imageops::FilterType;
use image::GrayImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::DetectionError;
use crate::geometry::{self, FaceBounds};
use crate::model::FaceRecord;

#[cfg(feature = "rustface")]
mod rustface_backend;
#[cfg(feature = "rustface")]
pub use rustface_backend::RustfaceDetector;

/// Per-call engine options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectOptions {
    /// Longest image edge handed to the engine, 0 = unlimited
    pub input_size_hint: u32,
    /// Minimum engine score for a detection to be reported
    pub score_threshold: f64,
}

/// Pluggable face detection engine
///
/// Implementations run on a blocking thread and may take seconds.
pub trait FaceDetector: Send + Sync {
    /// Short engine name for logs
    fn name(&self) -> &'static str;

    /// Detect faces in a grayscale image; boxes are in that image's pixels
    fn detect(
        &self,
        image: &GrayImage,
        options: &DetectOptions,
    ) -> Result<Vec<FaceBounds>, DetectionError>;
}

/// Operational policy around a detection attempt
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionPolicy {
    pub input_size_hint: u32,
    pub score_threshold: f64,
    /// Threshold for the single retry after an empty first pass
    pub retry_score_threshold: f64,
    /// Whole-attempt budget; afterwards the attempt is abandoned
    pub timeout: Duration,
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self {
            input_size_hint: 1024,
            score_threshold: 2.0,
            retry_score_threshold: 1.0,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Successful detection result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionOutcome {
    pub faces: Vec<FaceRecord>,
    pub image_width: u32,
    pub image_height: u32,
    /// True when faces came from the lower-threshold retry
    pub used_retry: bool,
}

/// Detection engine plus its policy
pub struct DetectionService {
    detector: Option<Arc<dyn FaceDetector>>,
    policy: DetectionPolicy,
}

impl DetectionService {
    pub fn new(detector: Arc<dyn FaceDetector>, policy: DetectionPolicy) -> Self {
        Self {
            detector: Some(detector),
            policy,
        }
    }

    /// Service with no engine; every attempt reports the model as unavailable
    pub fn unavailable(policy: DetectionPolicy) -> Self {
        Self {
            detector: None,
            policy,
        }
    }

    pub fn is_available(&self) -> bool {
        self.detector.is_some()
    }

    pub fn policy(&self) -> &DetectionPolicy {
        &self.policy
    }

    /// Decode encoded image bytes (PNG/JPEG) and detect faces in them
    pub async fn detect_bytes(&self, bytes: Vec<u8>) -> Result<DetectionOutcome, DetectionError> {
        let detector = self.detector.clone().ok_or_else(|| {
            DetectionError::ModelUnavailable("no face detection backend configured".to_string())
        })?;
        let policy = self.policy.clone();
        let timeout = policy.timeout;

        let task = tokio::task::spawn_blocking(move || {
            let image = image::load_from_memory(&bytes)
                .map_err(|e| DetectionError::InvalidImage(e.to_string()))?;
            run_detection(detector.as_ref(), &image.to_luma8(), &policy)
        });

        // On timeout the blocking task keeps running but its result is dropped.
        let (boxes, width, height, used_retry) = match tokio::time::timeout(timeout, task).await {
            Ok(joined) => joined.map_err(|e| DetectionError::Engine(format!("task failed: {}", e)))??,
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "Face detection abandoned after timeout");
                return Err(DetectionError::Timeout(timeout.as_secs()));
            }
        };

        let faces = geometry::normalize_detections(&boxes, width, height)?;
        info!(
            faces = faces.len(),
            width,
            height,
            used_retry,
            "Face detection complete"
        );
        Ok(DetectionOutcome {
            faces,
            image_width: width,
            image_height: height,
            used_retry,
        })
    }
}

/// Blocking part of an attempt: scale, detect, retry once, scale back
///
/// Returns the boxes in natural-image pixels plus the natural size.
fn run_detection(
    detector: &dyn FaceDetector,
    gray: &GrayImage,
    policy: &DetectionPolicy,
) -> Result<(Vec<FaceBounds>, u32, u32, bool), DetectionError> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(DetectionError::InvalidImage("image has zero dimensions".to_string()));
    }

    let (input, scale) = downscale_for_hint(gray, policy.input_size_hint);
    let mut options = DetectOptions {
        input_size_hint: policy.input_size_hint,
        score_threshold: policy.score_threshold,
    };

    debug!(
        engine = detector.name(),
        width,
        height,
        scale,
        threshold = options.score_threshold,
        "Running face detection"
    );
    let mut boxes = detector.detect(input.as_ref().unwrap_or(gray), &options)?;
    let mut used_retry = false;

    if boxes.is_empty() {
        options.score_threshold = policy.retry_score_threshold;
        debug!(threshold = options.score_threshold, "No faces found, retrying with lower threshold");
        boxes = detector.detect(input.as_ref().unwrap_or(gray), &options)?;
        used_retry = true;
    }

    if scale != 1.0 {
        for b in &mut boxes {
            b.x /= scale;
            b.y /= scale;
            b.width /= scale;
            b.height /= scale;
        }
    }
    Ok((boxes, width, height, used_retry))
}

/// Shrink `gray` so its longest edge is at most `hint`
///
/// Returns the resized image (None when no resize was needed) and the scale
/// factor applied.
pub fn downscale_for_hint(gray: &GrayImage, hint: u32) -> (Option<GrayImage>, f64) {
    let (width, height) = gray.dimensions();
    let longest = width.max(height);
    if hint == 0 || longest <= hint {
        return (None, 1.0);
    }

    let scale = f64::from(hint) / f64::from(longest);
    let new_w = ((f64::from(width) * scale).round() as u32).max(1);
    let new_h = ((f64::from(height) * scale).round() as u32).max(1);
    let resized = image::imageops::resize(gray, new_w, new_h, FilterType::Triangle);
    // Use the realized scale so boxes map back onto the original grid.
    (Some(resized), f64::from(new_w) / f64::from(width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine stub: fixed boxes above a threshold, nothing below it
    struct ThresholdStub {
        boxes: Vec<FaceBounds>,
        min_threshold: f64,
        calls: AtomicUsize,
    }

    impl FaceDetector for ThresholdStub {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn detect(
            &self,
            _image: &GrayImage,
            options: &DetectOptions,
        ) -> Result<Vec<FaceBounds>, DetectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if options.score_threshold <= self.min_threshold {
                Ok(self.boxes.clone())
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn policy(hint: u32) -> DetectionPolicy {
        DetectionPolicy {
            input_size_hint: hint,
            score_threshold: 0.3,
            retry_score_threshold: 0.1,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_retry_once_at_lower_threshold() {
        let stub = ThresholdStub {
            boxes: vec![FaceBounds::new(10.0, 10.0, 20.0, 20.0)],
            min_threshold: 0.1,
            calls: AtomicUsize::new(0),
        };
        let gray = GrayImage::new(100, 100);
        let (boxes, _, _, used_retry) = run_detection(&stub, &gray, &policy(0)).unwrap();
        assert_eq!(boxes.len(), 1);
        assert!(used_retry);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_no_retry_when_first_pass_finds_faces() {
        let stub = ThresholdStub {
            boxes: vec![FaceBounds::new(10.0, 10.0, 20.0, 20.0)],
            min_threshold: 1.0,
            calls: AtomicUsize::new(0),
        };
        let gray = GrayImage::new(100, 100);
        let (_, _, _, used_retry) = run_detection(&stub, &gray, &policy(0)).unwrap();
        assert!(!used_retry);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_boxes_scaled_back_to_natural_pixels() {
        let stub = ThresholdStub {
            boxes: vec![FaceBounds::new(10.0, 20.0, 30.0, 40.0)],
            min_threshold: 1.0,
            calls: AtomicUsize::new(0),
        };
        let gray = GrayImage::new(400, 200);
        let (boxes, w, h, _) = run_detection(&stub, &gray, &policy(100)).unwrap();
        assert_eq!((w, h), (400, 200));
        assert_eq!(boxes[0], FaceBounds::new(40.0, 80.0, 120.0, 160.0));
    }

    #[test]
    fn test_downscale_only_when_larger_than_hint() {
        let gray = GrayImage::new(300, 150);
        let (none, scale) = downscale_for_hint(&gray, 300);
        assert!(none.is_none());
        assert_eq!(scale, 1.0);

        let (resized, scale) = downscale_for_hint(&gray, 150);
        assert_eq!(resized.unwrap().dimensions(), (150, 75));
        assert_eq!(scale, 0.5);
    }

    #[tokio::test]
    async fn test_unavailable_service_reports_model_unavailable() {
        let service = DetectionService::unavailable(policy(0));
        assert!(!service.is_available());
        let result = service.detect_bytes(vec![1, 2, 3]).await;
        assert!(matches!(result, Err(DetectionError::ModelUnavailable(_))));
    }

    #[tokio::test]
    async fn test_undecodable_bytes_are_invalid_image() {
        let stub = ThresholdStub {
            boxes: Vec::new(),
            min_threshold: 1.0,
            calls: AtomicUsize::new(0),
        };
        let service = DetectionService::new(Arc::new(stub), policy(0));
        let result = service.detect_bytes(b"not an image".to_vec()).await;
        assert!(matches!(result, Err(DetectionError::InvalidImage(_))));
    }
}
