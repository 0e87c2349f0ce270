//! In-memory record store for one editing client
//!
//! Keeps records in insertion order (list UIs number tags by it). Only one
//! writer is expected per store; sharing across tasks is the owner's job.

use tracing::warn;

use crate::model::{FacePatch, FaceRecord};
use crate::{Error, Result};

/// Ordered id → record mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    records: Vec<FaceRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a loaded record list
    ///
    /// Later duplicates of an id replace the earlier record in its slot.
    pub fn from_records(records: impl IntoIterator<Item = FaceRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.add(record);
        }
        store
    }

    /// Insert a record
    ///
    /// An id that is already present is overwritten in place. Generated ids
    /// should never collide, so this is logged.
    pub fn add(&mut self, record: FaceRecord) {
        match self.position(&record.id) {
            Some(index) => {
                warn!(id = %record.id, "Duplicate record id, overwriting existing record");
                self.records[index] = record;
            }
            None => self.records.push(record),
        }
    }

    /// Apply a partial edit to the record with `id`
    ///
    /// An unknown id usually means the record was deleted by another view
    /// while this edit was pending; the edit is dropped and reported.
    pub fn update_by_id(&mut self, id: &str, patch: &FacePatch) -> Result<&FaceRecord> {
        let Some(index) = self.position(id) else {
            warn!(id = %id, "Update for unknown record id dropped");
            return Err(Error::NotFound(format!("record {}", id)));
        };
        self.records[index].apply(patch);
        Ok(&self.records[index])
    }

    /// Remove and return the record with `id`, if present
    pub fn remove_by_id(&mut self, id: &str) -> Option<FaceRecord> {
        self.position(id).map(|index| self.records.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&FaceRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Records in insertion order
    pub fn list(&self) -> &[FaceRecord] {
        &self.records
    }

    /// Replace the whole contents (used after a reload)
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = FaceRecord>) {
        *self = Self::from_records(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }
}
