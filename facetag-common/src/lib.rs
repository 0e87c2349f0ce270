//! # facetag common library
//!
//! Shared code for the facetag server and editing clients:
//! - Face/tag record model and the persisted event aggregate
//! - Pixel → normalized geometry and detection filtering
//! - Per-client record store
//! - Merge-on-save reconciliation
//! - Persistence gateways (JSON file, in-memory)
//! - Detection engine boundary and policy
//! - Configuration loading
//! - HTTP wire types

pub mod api;
pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod merge;
pub mod model;
pub mod persistence;
pub mod store;

pub use error::{DetectionError, Error, Result};
pub use model::{EventState, FacePatch, FaceRecord};
