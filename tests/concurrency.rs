//! Concurrent writers against one case, on real OS threads.
//!
//! All writers load the same base version, wait on a barrier, jitter by a
//! few hundred microseconds, and submit. Whatever the interleaving:
//!
//! - every successful write bumps the version by exactly one and leaves
//!   exactly one audit entry,
//! - a refused write leaves no trace,
//! - writers on the same field never both succeed from the same base.

mod common;

use std::sync::Barrier;
use std::thread;
use std::time::Duration;

use caseflow::{CaseStore, CaseUpdateCoordinator, FileStore, LogQuery, MemoryStore, UpdateOutcome};
use caseflow_core::model::{Actor, Role};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use common::{CASE, case_at_version, edit};

/// Disjoint text fields, one per writer.
const FIELDS: [&str; 6] = [
    "remark",
    "caseReason",
    "provinceCity",
    "courtName",
    "caseLevel",
    "caseCategory",
];

const SEEDS: u64 = 8;

fn writer(i: usize) -> Actor {
    Actor::new(format!("u-{i}"), format!("Writer {i}"), Role::Assistant)
}

fn jitter(seed: u64, i: usize) -> Duration {
    let mut rng = StdRng::seed_from_u64(seed * 31 + i as u64);
    Duration::from_micros(rng.random_range(0..400))
}

fn disjoint_writers<S: CaseStore>(coordinator: &CaseUpdateCoordinator<S>, seed: u64) {
    let base = case_at_version(coordinator, 2);
    let barrier = Barrier::new(FIELDS.len());

    let outcomes: Vec<(usize, UpdateOutcome)> = thread::scope(|scope| {
        let handles: Vec<_> = FIELDS
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let request = edit(&base, &[*field], json!({ *field: format!("w{i}") }));
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    thread::sleep(jitter(seed, i));
                    let outcome = coordinator.update(CASE, &writer(i), &request).unwrap();
                    (i, outcome)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let final_record = coordinator.get(CASE).unwrap();
    let snapshot = final_record.to_field_map();
    let mut written = 0;
    for (i, outcome) in &outcomes {
        let value = &snapshot[FIELDS[*i]];
        match outcome {
            UpdateOutcome::Updated { .. } => {
                written += 1;
                assert_eq!(value, &json!(format!("w{i}")), "seed {seed}: writer {i} lost");
            }
            UpdateOutcome::Conflict(details) => {
                assert!(details.is_hard(), "seed {seed}: writer {i}: {details:?}");
                assert_ne!(value, &json!(format!("w{i}")), "seed {seed}: refused write landed");
            }
            UpdateOutcome::Unchanged { .. } => panic!("seed {seed}: writer {i} saw no change"),
        }
    }

    assert!(written >= 1, "seed {seed}: somebody must win");
    assert_eq!(final_record.version, 2 + written, "seed {seed}");
    let page = coordinator.change_log(CASE, LogQuery::default()).unwrap();
    assert_eq!(page.total as u64, 2 + written, "seed {seed}");
}

fn same_field_writers<S: CaseStore>(coordinator: &CaseUpdateCoordinator<S>, seed: u64) {
    let base = case_at_version(coordinator, 2);
    let count = 4;
    let barrier = Barrier::new(count);

    let outcomes: Vec<UpdateOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = (0..count)
            .map(|i| {
                let request = edit(&base, &["remark"], json!({ "remark": format!("w{i}") }));
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    thread::sleep(jitter(seed, i));
                    coordinator.update(CASE, &writer(i), &request).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<_> = outcomes
        .iter()
        .filter_map(UpdateOutcome::record)
        .collect();
    assert_eq!(winners.len(), 1, "seed {seed}: exactly one writer wins");
    assert!(
        outcomes
            .iter()
            .filter_map(UpdateOutcome::conflict)
            .all(|d| d.is_hard() && d.conflicting_fields.len() == 1),
        "seed {seed}"
    );

    let stored = coordinator.get(CASE).unwrap();
    assert_eq!(stored.version, 3, "seed {seed}");
    assert_eq!(stored.remark, winners[0].remark, "seed {seed}");
}

#[test]
fn disjoint_writers_memory() {
    for seed in 0..SEEDS {
        disjoint_writers(&CaseUpdateCoordinator::new(MemoryStore::new()), seed);
    }
}

#[test]
fn disjoint_writers_file() {
    for seed in 0..SEEDS {
        let dir = tempfile::tempdir().unwrap();
        disjoint_writers(
            &CaseUpdateCoordinator::new(FileStore::open(dir.path()).unwrap()),
            seed,
        );
    }
}

#[test]
fn same_field_writers_memory() {
    for seed in 0..SEEDS {
        same_field_writers(&CaseUpdateCoordinator::new(MemoryStore::new()), seed);
    }
}

#[test]
fn same_field_writers_file() {
    for seed in 0..SEEDS {
        let dir = tempfile::tempdir().unwrap();
        same_field_writers(
            &CaseUpdateCoordinator::new(FileStore::open(dir.path()).unwrap()),
            seed,
        );
    }
}
