//! Property-style checks of the merge reconciler over seeded random record sets
//!
//! Covers:
//! - disjoint sets merge to their union
//! - shared ids take the incoming record exactly
//! - server-only ids are never dropped
//! - merging a set with itself is the identity

use facetag_common::merge::merge;
use facetag_common::FaceRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

const ROUNDS: u64 = 200;

fn random_record(rng: &mut StdRng, id: String) -> FaceRecord {
    let width = rng.gen_range(0.01..0.3);
    let height = rng.gen_range(0.01..0.3);
    let mut record = FaceRecord::new(
        id,
        rng.gen_range(0.0..(1.0 - width)),
        rng.gen_range(0.0..(1.0 - height)),
        width,
        height,
    );
    if rng.gen_bool(0.5) {
        record.person_name = Some(format!("Person {}", rng.gen_range(0..1000)));
    }
    if rng.gen_bool(0.3) {
        record.linkedin_url = Some("https://www.linkedin.com/in/someone".to_string());
    }
    record
}

/// Records with ids `<prefix>-<n>` for n in `range`
fn random_set(rng: &mut StdRng, prefix: &str, range: std::ops::Range<usize>) -> Vec<FaceRecord> {
    range
        .map(|n| random_record(rng, format!("{}-{}", prefix, n)))
        .collect()
}

fn by_id(records: &[FaceRecord]) -> HashMap<&str, &FaceRecord> {
    records.iter().map(|r| (r.id.as_str(), r)).collect()
}

#[test]
fn test_disjoint_sets_merge_to_union() {
    for seed in 0..ROUNDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let s_len = rng.gen_range(0..20);
        let i_len = rng.gen_range(0..20);
        let server = random_set(&mut rng, "s", 0..s_len);
        let incoming = random_set(&mut rng, "i", 0..i_len);

        let merged = merge(&server, &incoming);
        assert_eq!(merged.len(), server.len() + incoming.len(), "seed {}", seed);

        let merged_ids = by_id(&merged);
        for record in server.iter().chain(incoming.iter()) {
            assert_eq!(merged_ids.get(record.id.as_str()), Some(&record), "seed {}", seed);
        }
    }
}

#[test]
fn test_shared_ids_take_incoming_and_server_only_ids_survive() {
    for seed in 0..ROUNDS {
        let mut rng = StdRng::seed_from_u64(seed);
        // Overlapping id ranges: server 0..a, incoming b..c with b < a
        let a = rng.gen_range(1..25);
        let b = rng.gen_range(0..a);
        let c = rng.gen_range(b..b + 25);
        let server = random_set(&mut rng, "r", 0..a);
        let incoming = random_set(&mut rng, "r", b..c);

        let merged = merge(&server, &incoming);
        let merged_ids = by_id(&merged);
        let server_ids = by_id(&server);
        let incoming_ids = by_id(&incoming);

        for (id, record) in &incoming_ids {
            assert_eq!(merged_ids.get(id), Some(record), "seed {} id {}", seed, id);
        }
        for (id, record) in &server_ids {
            if !incoming_ids.contains_key(id) {
                assert_eq!(merged_ids.get(id), Some(record), "seed {} id {}", seed, id);
            }
        }

        let expected_len = server_ids.len()
            + incoming_ids
                .keys()
                .filter(|id| !server_ids.contains_key(*id))
                .count();
        assert_eq!(merged.len(), expected_len, "seed {}", seed);
    }
}

#[test]
fn test_merge_with_itself_is_identity() {
    for seed in 0..ROUNDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let len = rng.gen_range(0..30);
        let set = random_set(&mut rng, "x", 0..len);
        assert_eq!(merge(&set, &set), set, "seed {}", seed);
    }
}

#[test]
fn test_merge_is_idempotent_for_repeated_saves() {
    let mut rng = StdRng::seed_from_u64(7);
    let server = random_set(&mut rng, "s", 0..10);
    let incoming = random_set(&mut rng, "s", 5..15);

    let once = merge(&server, &incoming);
    let twice = merge(&once, &incoming);
    assert_eq!(once, twice);
}
