//! Face/tag records and the persisted event aggregate
//!
//! All geometry is stored in normalized coordinates: fractions (0–1) of the
//! source image's natural width and height. Overlays are therefore
//! independent of display scale.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Image reference used when no photo has been saved yet
pub const DEFAULT_IMAGE_URL: &str = "/event-photo.jpeg";

/// Side length (normalized) of the box created by manual point tagging
pub const POINT_TAG_SIZE: f64 = 0.05;

/// Slack allowed on `x + width` / `y + height` for float rounding
const EDGE_EPSILON: f64 = 1e-6;

/// A positioned, optionally named annotation on the shared photo
///
/// Called a "face" when produced by detection and a "tag" when placed by
/// hand; the schema is the same. A record without `person_name` is simply
/// unclaimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRecord {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
}

impl FaceRecord {
    /// Create an unclaimed record from a normalized box
    pub fn new(id: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
            person_name: None,
            person_title: None,
            linkedin_url: None,
        }
    }

    /// Create a record for a manual click at normalized point (`x`, `y`)
    ///
    /// The box is [`POINT_TAG_SIZE`] square, centred on the click and shifted
    /// as needed so it stays inside the image. A non-finite click is
    /// rejected.
    pub fn point_tag(x: f64, y: f64) -> Result<Self> {
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::InvalidInput(format!(
                "Tag position ({}, {}) is not a finite point",
                x, y
            )));
        }
        let half = POINT_TAG_SIZE / 2.0;
        let left = (x.clamp(0.0, 1.0) - half).clamp(0.0, 1.0 - POINT_TAG_SIZE);
        let top = (y.clamp(0.0, 1.0) - half).clamp(0.0, 1.0 - POINT_TAG_SIZE);
        Ok(Self::new(crate::ids::tag_id(), left, top, POINT_TAG_SIZE, POINT_TAG_SIZE))
    }

    /// Whether someone has claimed this record
    pub fn is_named(&self) -> bool {
        self.person_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }

    /// Check that the record is usable as a normalized overlay
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidInput("record id must not be empty".to_string()));
        }

        let coords = [self.x, self.y, self.width, self.height];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "record {} has non-finite coordinates",
                self.id
            )));
        }

        if !(0.0..=1.0).contains(&self.x) || !(0.0..=1.0).contains(&self.y) {
            return Err(Error::InvalidInput(format!(
                "record {} position ({}, {}) outside [0, 1]",
                self.id, self.x, self.y
            )));
        }

        if self.width <= 0.0 || self.width > 1.0 || self.height <= 0.0 || self.height > 1.0 {
            return Err(Error::InvalidInput(format!(
                "record {} size {}x{} outside (0, 1]",
                self.id, self.width, self.height
            )));
        }

        if self.x + self.width > 1.0 + EDGE_EPSILON || self.y + self.height > 1.0 + EDGE_EPSILON {
            return Err(Error::InvalidInput(format!(
                "record {} extends past the image edge",
                self.id
            )));
        }

        Ok(())
    }

    /// Apply a partial edit in place
    pub fn apply(&mut self, patch: &FacePatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(name) = &patch.person_name {
            self.person_name = non_blank(name);
        }
        if let Some(title) = &patch.person_title {
            self.person_title = non_blank(title);
        }
        if let Some(url) = &patch.linkedin_url {
            self.linkedin_url = non_blank(url);
        }
    }
}

/// Empty strings clear a metadata field
fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Partial field update for [`FaceRecord::apply`]
///
/// `None` leaves a field untouched. For the text fields, `Some("")` clears
/// the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
}

impl FacePatch {
    /// Patch that only sets the person metadata
    pub fn person(
        name: impl Into<String>,
        title: Option<String>,
        linkedin_url: Option<String>,
    ) -> Self {
        Self {
            person_name: Some(name.into()),
            person_title: title,
            linkedin_url,
            ..Self::default()
        }
    }
}

/// The persisted aggregate: one shared photo and its records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventState {
    pub image_url: String,
    #[serde(default)]
    pub faces: Vec<FaceRecord>,
}

impl EventState {
    /// Empty state pointing at `image_url`
    pub fn empty(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            faces: Vec::new(),
        }
    }

    /// Look up a record by id
    pub fn face(&self, id: &str) -> Option<&FaceRecord> {
        self.faces.iter().find(|f| f.id == id)
    }
}

impl Default for EventState {
    fn default() -> Self {
        Self::empty(DEFAULT_IMAGE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case_and_skips_empty_metadata() {
        let mut face = FaceRecord::new("face-1", 0.1, 0.2, 0.3, 0.4);
        let json = serde_json::to_value(&face).unwrap();
        assert!(json.get("personName").is_none());

        face.person_name = Some("Ada".to_string());
        face.linkedin_url = Some("https://linkedin.com/in/ada".to_string());
        let json = serde_json::to_value(&face).unwrap();
        assert_eq!(json["personName"], "Ada");
        assert_eq!(json["linkedinUrl"], "https://linkedin.com/in/ada");
        assert_eq!(json["width"], 0.3);
    }

    #[test]
    fn test_deserializes_record_without_metadata() {
        let face: FaceRecord =
            serde_json::from_str(r#"{"id":"a","x":0.5,"y":0.5,"width":0.1,"height":0.1}"#).unwrap();
        assert_eq!(face.person_name, None);
        assert!(!face.is_named());
    }

    #[test]
    fn test_validate_accepts_edge_touching_box() {
        let face = FaceRecord::new("a", 0.7, 0.9, 0.3, 0.1);
        assert!(face.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(FaceRecord::new("a", -0.1, 0.0, 0.1, 0.1).validate().is_err());
        assert!(FaceRecord::new("a", 0.0, 0.0, 0.0, 0.1).validate().is_err());
        assert!(FaceRecord::new("a", 0.8, 0.0, 0.3, 0.1).validate().is_err());
        assert!(FaceRecord::new("a", f64::NAN, 0.0, 0.1, 0.1).validate().is_err());
        assert!(FaceRecord::new(" ", 0.0, 0.0, 0.1, 0.1).validate().is_err());
    }

    #[test]
    fn test_point_tag_centres_and_clamps() {
        let tag = FaceRecord::point_tag(0.5, 0.5).unwrap();
        assert!(tag.id.starts_with("tag-"));
        assert!((tag.x - 0.475).abs() < 1e-12);
        assert!((tag.y - 0.475).abs() < 1e-12);
        assert!(tag.validate().is_ok());

        let corner = FaceRecord::point_tag(1.0, 0.0).unwrap();
        assert!((corner.x - (1.0 - POINT_TAG_SIZE)).abs() < 1e-12);
        assert_eq!(corner.y, 0.0);
        assert!(corner.validate().is_ok());
    }

    #[test]
    fn test_point_tag_rejects_non_finite_click() {
        assert!(matches!(
            FaceRecord::point_tag(f64::NAN, 0.5),
            Err(Error::InvalidInput(_))
        ));
        assert!(FaceRecord::point_tag(0.5, f64::INFINITY).is_err());
    }

    #[test]
    fn test_patch_sets_and_clears_metadata() {
        let mut face = FaceRecord::new("a", 0.1, 0.1, 0.1, 0.1);
        face.apply(&FacePatch::person("  Grace ", Some("CTO".to_string()), None));
        assert_eq!(face.person_name.as_deref(), Some("Grace"));
        assert_eq!(face.person_title.as_deref(), Some("CTO"));
        assert_eq!(face.linkedin_url, None);

        face.apply(&FacePatch {
            person_title: Some(String::new()),
            ..FacePatch::default()
        });
        assert_eq!(face.person_title, None);
        assert_eq!(face.person_name.as_deref(), Some("Grace"));
    }

    #[test]
    fn test_default_state_is_empty() {
        let state = EventState::default();
        assert_eq!(state.image_url, DEFAULT_IMAGE_URL);
        assert!(state.faces.is_empty());
    }
}
