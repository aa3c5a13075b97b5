//! Concurrent writer harnesses.
//!
//! These helpers race several threads against one store, or against several
//! connections to one database file, and tally how the conditional writes
//! resolved.

use crate::fixtures::sample_entity;
use litesync_store::{ConflictKind, StoreResult, SyncEntity, SyncStore, WriteOutcome};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Writes that committed.
    pub applied: usize,
    /// Writes rolled back on a conflict.
    pub conflicts: usize,
    /// The kind of each conflict, in completion order.
    pub conflict_kinds: Vec<ConflictKind>,
    /// Writes that returned an error.
    pub errors: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Total attempted writes.
    pub fn total(&self) -> usize {
        self.applied + self.conflicts + self.errors
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Applied: {}", self.applied);
        println!("Conflicts: {}", self.conflicts);
        println!("Errors: {}", self.errors);
        if let Some(kind) = self.conflict_kinds.first() {
            let uniform = self.conflict_kinds.iter().all(|k| k == kind);
            println!("Conflict kinds: {}", if uniform { kind.to_string() } else { "mixed".into() });
        }
        println!("Duration: {:?}", self.duration);
    }
}

#[derive(Default)]
struct Tally {
    applied: AtomicUsize,
    conflicts: AtomicUsize,
    errors: AtomicUsize,
    kinds: Mutex<Vec<ConflictKind>>,
}

impl Tally {
    fn record<T>(&self, result: StoreResult<WriteOutcome<T>>) {
        let counter = match result {
            Ok(WriteOutcome::Applied(_)) => &self.applied,
            Ok(WriteOutcome::Conflict(kind)) => {
                self.kinds.lock().push(kind);
                &self.conflicts
            }
            Err(_) => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self, started: Instant) -> StressTestResult {
        StressTestResult {
            applied: self.applied.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            conflict_kinds: self.kinds.lock().clone(),
            duration: started.elapsed(),
        }
    }
}

/// Races `threads` writers, each inserting a distinct entity that claims
/// the same client tag.
///
/// Exactly one insert can apply; the rest must conflict.
pub fn race_client_tag(store: &SyncStore, client_id: &str, tag: &str, threads: usize) -> StressTestResult {
    let tally = Arc::new(Tally::default());
    let started = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let store = store.clone();
            let tally = Arc::clone(&tally);
            let entity = sample_entity(client_id, &format!("racer-{i}")).with_client_tag(tag);
            thread::spawn(move || tally.record(store.insert_sync_entity(&entity)))
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    tally.finish(started)
}

/// Races `threads` writers, each committing a two-entity batch whose root
/// claims the same server tag.
///
/// Writer `i` goes through `stores[i % stores.len()]`, so passing several
/// connections to one file races them through SQLite's own locking. Exactly
/// one batch can apply; every other batch must roll back whole.
pub fn race_server_tag(stores: &[SyncStore], client_id: &str, tag: &str, threads: usize) -> StressTestResult {
    assert!(!stores.is_empty(), "race_server_tag needs at least one store");
    let tally = Arc::new(Tally::default());
    let started = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let store = stores[i % stores.len()].clone();
            let tally = Arc::clone(&tally);
            let batch = [
                sample_entity(client_id, &format!("racer-{i}")).with_server_tag(tag),
                sample_entity(client_id, &format!("racer-{i}-child")).with_parent(format!("racer-{i}")),
            ];
            thread::spawn(move || tally.record(store.insert_sync_entities_with_server_tags(&batch)))
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    tally.finish(started)
}

/// Races `threads` writers updating one entity from the same expected
/// version.
///
/// Exactly one update can apply; the rest must conflict.
pub fn race_update(store: &SyncStore, entity: &SyncEntity, expected_version: i64, threads: usize) -> StressTestResult {
    let tally = Arc::new(Tally::default());
    let started = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let store = store.clone();
            let tally = Arc::clone(&tally);
            let entity = entity.clone().with_name(format!("writer-{i}"));
            thread::spawn(move || tally.record(store.update_sync_entity(&entity, expected_version)))
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    tally.finish(started)
}

/// Runs `threads` writers, each inserting `per_thread` entities for its own
/// client.
pub fn concurrent_inserts(store: &SyncStore, threads: usize, per_thread: usize) -> StressTestResult {
    let tally = Arc::new(Tally::default());
    let started = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let store = store.clone();
            let tally = Arc::clone(&tally);
            thread::spawn(move || {
                let client_id = format!("client{t}");
                for i in 0..per_thread {
                    let entity = sample_entity(&client_id, &format!("e{i}"))
                        .with_client_tag(format!("tag{i}"));
                    tally.record(store.insert_sync_entity(&entity));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    tally.finish(started)
}
