//! Merge-on-save reconciliation
//!
//! Several attendees edit the same photo at once, each from a possibly stale
//! copy. A save therefore never treats "missing from the incoming set" as a
//! deletion: records are only ever replaced (whole-record, by id) or added.
//! Deletion goes through [`remove`].

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::model::FaceRecord;

/// Combine the persisted set with an incoming set
///
/// - a server record whose id appears in `incoming` is replaced wholesale by
///   the incoming record (no per-field blending);
/// - server records absent from `incoming` are kept unchanged, in place;
/// - incoming records with new ids are appended in incoming order.
///
/// If `incoming` repeats an id, its last occurrence wins.
pub fn merge(server: &[FaceRecord], incoming: &[FaceRecord]) -> Vec<FaceRecord> {
    let mut latest: HashMap<&str, &FaceRecord> = HashMap::with_capacity(incoming.len());
    for record in incoming {
        if latest.insert(record.id.as_str(), record).is_some() {
            warn!(id = %record.id, "Incoming set repeats a record id, keeping the last one");
        }
    }

    let server_ids: HashSet<&str> = server.iter().map(|r| r.id.as_str()).collect();

    let mut merged: Vec<FaceRecord> = server
        .iter()
        .map(|existing| match latest.get(existing.id.as_str()) {
            Some(updated) => (*updated).clone(),
            None => existing.clone(),
        })
        .collect();

    let mut appended: HashSet<&str> = HashSet::new();
    for record in incoming {
        let id = record.id.as_str();
        if server_ids.contains(id) || !appended.insert(id) {
            continue;
        }
        if let Some(last) = latest.get(id) {
            merged.push((*last).clone());
        }
    }

    debug!(
        server = server.len(),
        incoming = incoming.len(),
        merged = merged.len(),
        "Merged record sets"
    );
    merged
}

/// Explicitly delete records by id, returning how many were removed
pub fn remove(records: &mut Vec<FaceRecord>, ids: &[String]) -> usize {
    let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let before = records.len();
    records.retain(|r| !doomed.contains(r.id.as_str()));
    before - records.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(id: &str) -> FaceRecord {
        FaceRecord::new(id, 0.1, 0.2, 0.1, 0.1)
    }

    fn named(id: &str, name: &str) -> FaceRecord {
        let mut f = face(id);
        f.person_name = Some(name.to_string());
        f
    }

    #[test]
    fn test_shared_id_replaced_in_server_position() {
        let server = vec![face("a"), named("b", "Old"), face("c")];
        let incoming = vec![named("b", "New")];
        let merged = merge(&server, &incoming);
        assert_eq!(merged, vec![face("a"), named("b", "New"), face("c")]);
    }

    #[test]
    fn test_replace_is_whole_record() {
        let mut old = named("x", "A");
        old.person_title = Some("Founder".to_string());
        let new = named("x", "B");

        let merged = merge(&[old], &[new.clone()]);
        assert_eq!(merged, vec![new]);
        assert_eq!(merged[0].person_title, None);
    }

    #[test]
    fn test_new_ids_appended_in_incoming_order() {
        let merged = merge(&[face("a")], &[face("z"), face("a"), face("m")]);
        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "z", "m"]);
    }

    #[test]
    fn test_repeated_incoming_id_last_wins() {
        let merged = merge(&[], &[named("n", "first"), named("n", "second")]);
        assert_eq!(merged, vec![named("n", "second")]);
    }

    #[test]
    fn test_empty_incoming_keeps_everything() {
        let server = vec![face("a"), face("b")];
        assert_eq!(merge(&server, &[]), server);
    }

    #[test]
    fn test_remove_by_ids() {
        let mut records = vec![face("a"), face("b"), face("c")];
        let removed = remove(&mut records, &["a".to_string(), "missing".to_string()]);
        assert_eq!(removed, 1);
        assert_eq!(records, vec![face("b"), face("c")]);
    }
}
