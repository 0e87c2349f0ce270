//! Record identifier generation
//!
//! Identifiers are opaque strings of the form `<prefix>-<unix millis>-<uuid>`.
//! The timestamp keeps ids roughly sortable in logs; the UUIDv4 suffix makes
//! them unique across clients.

use uuid::Uuid;

/// Prefix for records created by the detection pipeline
pub const FACE_PREFIX: &str = "face";

/// Prefix for records created by manual point tagging
pub const TAG_PREFIX: &str = "tag";

/// Generate a new record identifier with the given prefix
pub fn generate(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    format!("{}-{}-{}", prefix, millis, Uuid::new_v4().simple())
}

/// Generate an identifier for a detected face
pub fn face_id() -> String {
    generate(FACE_PREFIX)
}

/// Generate an identifier for a manually placed tag
pub fn tag_id() -> String {
    generate(TAG_PREFIX)
}
