//! SeetaFace detector via the `rustface` crate

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::GrayImage;

use super::{DetectOptions, FaceDetector};
use crate::error::DetectionError;
use crate::geometry::FaceBounds;

/// Smallest face (pixels, after downscaling) the engine looks for
const MIN_FACE_SIZE: u32 = 20;

/// Face detector backed by a SeetaFace frontal model file
pub struct RustfaceDetector {
    model: rustface::Model,
}

impl RustfaceDetector {
    /// Load the model from `path` (e.g. `seeta_fd_frontal_v1.0.bin`)
    pub fn from_file(path: &Path) -> Result<Self, DetectionError> {
        let file = File::open(path).map_err(|e| {
            DetectionError::ModelUnavailable(format!("{}: {}", path.display(), e))
        })?;
        let model = rustface::read_model(BufReader::new(file)).map_err(|e| {
            DetectionError::ModelUnavailable(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self { model })
    }
}

impl FaceDetector for RustfaceDetector {
    fn name(&self) -> &'static str {
        "seetaface"
    }

    fn detect(
        &self,
        image: &GrayImage,
        options: &DetectOptions,
    ) -> Result<Vec<FaceBounds>, DetectionError> {
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(options.score_threshold);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let (width, height) = image.dimensions();
        let faces = detector.detect(&rustface::ImageData::new(image.as_raw(), width, height));

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceBounds {
                    x: bbox.x() as f64,
                    y: bbox.y() as f64,
                    width: bbox.width() as f64,
                    height: bbox.height() as f64,
                    confidence: face.score(),
                }
            })
            .collect())
    }
}
