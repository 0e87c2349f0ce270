//! Local fallback cache
//!
//! Every edit is mirrored into a small JSON file so that unsent changes
//! survive a reload even when the server could not be reached.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use facetag_common::persistence::{read_json, write_json_atomic};
use facetag_common::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// JSON file holding one cached value of type `T`
#[derive(Debug, Clone)]
pub struct LocalCache<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> LocalCache<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached value
    ///
    /// A missing file is `None`. An unreadable one is logged and treated as
    /// missing: the cache is a fallback, never a reason to fail.
    pub async fn load(&self) -> Option<T> {
        match read_json::<T>(&self.path).await {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %self.path.display(), "Ignoring unreadable local cache: {}", e);
                None
            }
        }
    }

    pub async fn store(&self, value: &T) -> Result<()> {
        write_json_atomic(&self.path, value).await
    }
}
