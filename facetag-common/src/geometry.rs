//! Pixel ↔ normalized coordinate conversion
//!
//! Detection engines report boxes in source-image pixels. Everything past
//! [`normalize_detections`] is expressed as fractions of the image's natural
//! size, and [`project`] maps those fractions back onto any display surface.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DetectionError;
use crate::model::FaceRecord;

/// Detections narrower or shorter than this fraction of the shorter image
/// edge are discarded as spurious
pub const MIN_FACE_FRACTION: f64 = 0.02;

/// Bounding box of a detected face within an image, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBounds {
    /// X coordinate of the top-left corner (pixels)
    pub x: f64,
    /// Y coordinate of the top-left corner (pixels)
    pub y: f64,
    /// Width of the bounding box (pixels)
    pub width: f64,
    /// Height of the bounding box (pixels)
    pub height: f64,
    /// Detection confidence score (engine-specific scale)
    pub confidence: f64,
}

impl FaceBounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence: 1.0,
        }
    }
}

/// Axis-aligned rectangle on a display surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Minimum accepted side length for an image of the given natural size
pub fn min_face_size(natural_width: u32, natural_height: u32) -> f64 {
    MIN_FACE_FRACTION * f64::from(natural_width.min(natural_height))
}

/// Convert pixel detections into fresh, unclaimed face records
///
/// A detection survives only if both sides are strictly larger than
/// [`min_face_size`]. Boxes hanging over the image edge are cropped to it.
/// Each surviving detection gets a new id, so re-running detection on the
/// same photo never adopts earlier ids.
///
/// Returns [`DetectionError::NoFacesFound`] when nothing survives; an empty
/// result is never returned as success.
pub fn normalize_detections(
    detections: &[FaceBounds],
    natural_width: u32,
    natural_height: u32,
) -> Result<Vec<FaceRecord>, DetectionError> {
    if natural_width == 0 || natural_height == 0 {
        return Err(DetectionError::InvalidImage(format!(
            "natural size {}x{} has a zero dimension",
            natural_width, natural_height
        )));
    }

    let min_size = min_face_size(natural_width, natural_height);
    let w = f64::from(natural_width);
    let h = f64::from(natural_height);

    let faces: Vec<FaceRecord> = detections
        .iter()
        .filter(|d| d.width > min_size && d.height > min_size)
        .filter_map(|d| {
            let (x, width) = crop_span(d.x / w, d.width / w)?;
            let (y, height) = crop_span(d.y / h, d.height / h)?;
            Some(FaceRecord::new(crate::ids::face_id(), x, y, width, height))
        })
        .collect();

    debug!(
        raw = detections.len(),
        kept = faces.len(),
        min_size,
        "Normalized detections"
    );

    if faces.is_empty() {
        return Err(DetectionError::NoFacesFound);
    }
    Ok(faces)
}

/// Crop a normalized span to [0, 1]; in-bounds spans pass through untouched
fn crop_span(start: f64, len: f64) -> Option<(f64, f64)> {
    let (mut start, mut len) = (start, len);
    if start < 0.0 {
        len += start;
        start = 0.0;
    }
    if start + len > 1.0 {
        len = 1.0 - start;
    }
    if len > 0.0 && start < 1.0 {
        Some((start, len))
    } else {
        None
    }
}

/// Map a normalized record onto a surface of the given size
pub fn project(face: &FaceRecord, surface_width: f64, surface_height: f64) -> PixelRect {
    PixelRect {
        left: face.x * surface_width,
        top: face.y * surface_height,
        width: face.width * surface_width,
        height: face.height * surface_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_face_size_uses_shorter_edge() {
        assert_eq!(min_face_size(1000, 500), 10.0);
        assert_eq!(min_face_size(400, 800), 8.0);
    }

    #[test]
    fn test_normalizes_by_natural_size() {
        let faces =
            normalize_detections(&[FaceBounds::new(256.0, 128.0, 64.0, 32.0)], 1024, 512).unwrap();
        assert_eq!(faces.len(), 1);
        let f = &faces[0];
        assert_eq!((f.x, f.y, f.width, f.height), (0.25, 0.25, 0.0625, 0.0625));
        assert!(f.id.starts_with("face-"));
        assert!(!f.is_named());
    }

    #[test]
    fn test_round_trip_reproduces_pixel_box() {
        let (w, h) = (2048u32, 1024u32);
        let original = FaceBounds::new(300.0, 200.0, 120.0, 96.0);
        let faces = normalize_detections(&[original], w, h).unwrap();
        let rect = project(&faces[0], f64::from(w), f64::from(h));
        assert_eq!(rect.left, original.x);
        assert_eq!(rect.top, original.y);
        assert_eq!(rect.width, original.width);
        assert_eq!(rect.height, original.height);
    }

    #[test]
    fn test_round_trip_within_tolerance_for_arbitrary_sizes() {
        let (w, h) = (1919u32, 1077u32);
        let original = FaceBounds::new(333.0, 47.0, 91.0, 123.0);
        let faces = normalize_detections(&[original], w, h).unwrap();
        let rect = project(&faces[0], f64::from(w), f64::from(h));
        assert!((rect.left - original.x).abs() < 1e-9);
        assert!((rect.top - original.y).abs() < 1e-9);
        assert!((rect.width - original.width).abs() < 1e-9);
        assert!((rect.height - original.height).abs() < 1e-9);
    }

    #[test]
    fn test_filter_boundary_is_strict() {
        // min size for 1000x500 is exactly 10px
        let at_limit = FaceBounds::new(0.0, 0.0, 10.0, 50.0);
        let above = FaceBounds::new(100.0, 100.0, 11.0, 50.0);
        let short = FaceBounds::new(200.0, 100.0, 50.0, 10.0);

        let faces = normalize_detections(&[at_limit, above, short], 1000, 500).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].x, 0.1);
    }

    #[test]
    fn test_all_filtered_is_no_faces_found() {
        let tiny = FaceBounds::new(0.0, 0.0, 2.0, 2.0);
        assert_eq!(
            normalize_detections(&[tiny], 1000, 1000),
            Err(DetectionError::NoFacesFound)
        );
        assert_eq!(
            normalize_detections(&[], 1000, 1000),
            Err(DetectionError::NoFacesFound)
        );
    }

    #[test]
    fn test_zero_dimension_image_rejected() {
        let result = normalize_detections(&[FaceBounds::new(0.0, 0.0, 5.0, 5.0)], 0, 100);
        assert!(matches!(result, Err(DetectionError::InvalidImage(_))));
    }

    #[test]
    fn test_boxes_over_the_edge_are_cropped() {
        let overhang = FaceBounds::new(-50.0, 900.0, 200.0, 200.0);
        let faces = normalize_detections(&[overhang], 1000, 1000).unwrap();
        let f = &faces[0];
        assert_eq!(f.x, 0.0);
        assert!((f.width - 0.15).abs() < 1e-12);
        assert!((f.y + f.height - 1.0).abs() < 1e-12);
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_rerun_assigns_fresh_ids() {
        let boxes = [FaceBounds::new(10.0, 10.0, 100.0, 100.0)];
        let first = normalize_detections(&boxes, 1000, 1000).unwrap();
        let second = normalize_detections(&boxes, 1000, 1000).unwrap();
        assert_ne!(first[0].id, second[0].id);
    }
}
