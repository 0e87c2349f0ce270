//! HTTP API handlers for facetag-server

pub mod buildinfo;
pub mod detect;
pub mod error;
pub mod event;
pub mod health;
pub mod tags;

pub use error::ApiError;
