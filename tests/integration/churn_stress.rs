#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use ranker::rank::{CounterMetrics, Position, RankEngine, RankOptions};
use ranker::storage::{Collection, NewRecord, RecordChange, SqliteBackend, DEFAULT_TABLE};
use ranker::types::{RecordId, Result, ScopeKey};
use tempfile::tempdir;

const SCOPES: i64 = 4;
const OPERATIONS: usize = 1_500;
const SEED: u64 = 0x5eed_0dd5;

fn random_position(rng: &mut ChaCha8Rng, len: usize) -> Position {
    match rng.gen_range(0..10) {
        0 => Position::Middle,
        1..=3 => Position::Last,
        4..=5 => Position::At(0),
        _ => Position::At(rng.gen_range(0..=len as i64)),
    }
}

#[test]
fn randomized_churn_keeps_order() -> Result<()> {
    let dir = tempdir().expect("tempdir");
    let backend = SqliteBackend::open(dir.path().join("churn.db"), DEFAULT_TABLE)?;
    let metrics = Arc::new(CounterMetrics::default());
    let engine = RankEngine::new(RankOptions::default()).with_metrics(metrics.clone());
    let mut collection = Collection::with_hook(backend, engine);

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut live: HashMap<RecordId, i64> = HashMap::new();
    let mut ids: Vec<RecordId> = Vec::new();

    for step in 0..OPERATIONS {
        let roll = rng.gen_range(0..10);
        if roll < 5 || ids.is_empty() {
            let scope = rng.gen_range(0..SCOPES);
            let len = collection.list(Some(&ScopeKey::Int(scope)))?.len();
            let position = random_position(&mut rng, len);
            let record = collection.insert(
                NewRecord::new(format!("r{step}"))
                    .scope(scope)
                    .position(position),
            )?;
            live.insert(record.id, scope);
            ids.push(record.id);
        } else if roll < 9 {
            let id = ids[rng.gen_range(0..ids.len())];
            let len = collection.list(Some(&ScopeKey::Int(live[&id])))?.len();
            let position = random_position(&mut rng, len);
            collection.update(id, RecordChange::default().position(position))?;
        } else {
            let id = ids.swap_remove(rng.gen_range(0..ids.len()));
            assert!(collection.delete(id)?);
            live.remove(&id);
        }
    }

    let report = collection.verify()?;
    assert!(report.success, "{:?}", report.findings);
    assert_eq!(report.counts.records as usize, live.len());

    for scope in 0..SCOPES {
        let records = collection.list(Some(&ScopeKey::Int(scope)))?;
        assert!(records.windows(2).all(|w| w[0].rank < w[1].rank));
        assert_eq!(
            records.len(),
            live.values().filter(|s| **s == scope).count()
        );
    }

    let snapshot = metrics.snapshot();
    assert!(snapshot.assignments as usize >= OPERATIONS / 2);
    Ok(())
}

#[test]
fn front_insert_storm_forces_shifts() -> Result<()> {
    let dir = tempdir().expect("tempdir");
    let backend = SqliteBackend::open(dir.path().join("storm.db"), DEFAULT_TABLE)?;
    let metrics = Arc::new(CounterMetrics::default());
    let engine = RankEngine::new(RankOptions::default()).with_metrics(metrics.clone());
    let mut collection = Collection::with_hook(backend, engine);

    let mut inserted = Vec::new();
    for n in 0..64 {
        let record =
            collection.insert(NewRecord::new(format!("{n}")).position(Position::At(0)))?;
        inserted.push(record.id);
    }

    let listed: Vec<RecordId> = collection.list(None)?.iter().map(|r| r.id).collect();
    inserted.reverse();
    assert_eq!(listed, inserted);
    assert!(metrics.snapshot().shifts_up > 0);
    assert!(collection.verify()?.success);
    Ok(())
}
