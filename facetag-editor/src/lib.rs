//! # facetag editor
//!
//! Client-side editing of the shared event photo:
//! - [`EditorSession`]: the application state object for one editor
//!   (records, active selection, debounced merge-on-save, local fallback
//!   cache)
//! - [`TagBoard`]: the self-serve tag list with whole-list saves
//! - [`remote`]: HTTP and in-process access to the server's endpoints

pub mod cache;
pub mod debounce;
pub mod remote;
pub mod session;
pub mod tag_board;

pub use cache::LocalCache;
pub use debounce::Debouncer;
pub use session::{CachedSession, EditorSession, SessionStatus};
pub use tag_board::{CachedTags, TagBoard};

use std::time::Duration;

/// Idle window before edits are saved
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(1000);
