#![allow(missing_docs)]

use ranker::rank::{Position, RankBounds, RankOptions, MAX_RANK};
use ranker::storage::{Collection, NewRecord, RecordChange, SqliteBackend, DEFAULT_TABLE};
use ranker::types::{RankError, Result, ScopeKey};
use tempfile::tempdir;

fn labels(collection: &mut Collection<SqliteBackend>, scope: Option<&ScopeKey>) -> Vec<String> {
    collection
        .list(scope)
        .expect("list")
        .into_iter()
        .map(|r| r.label)
        .collect()
}

#[test]
fn ordering_survives_reopen() -> Result<()> {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tasks.db");
    {
        let backend = SqliteBackend::open(&path, DEFAULT_TABLE)?;
        let mut tasks = Collection::new(backend, RankOptions::default());
        let wash = tasks.insert(NewRecord::new("wash").scope("home"))?;
        tasks.insert(NewRecord::new("cook").scope("home"))?;
        tasks.insert(NewRecord::new("shop").scope("home").position(Position::At(0)))?;
        tasks.update(wash.id, RecordChange::default().position(Position::Last))?;
    }

    let backend = SqliteBackend::open(&path, DEFAULT_TABLE)?;
    let mut tasks = Collection::new(backend, RankOptions::default());
    assert_eq!(
        labels(&mut tasks, Some(&ScopeKey::from("home"))),
        ["shop", "cook", "wash"]
    );
    assert!(tasks.verify()?.success);
    Ok(())
}

#[test]
fn integer_and_text_scopes_stay_apart() -> Result<()> {
    let dir = tempdir().expect("tempdir");
    let backend = SqliteBackend::open(dir.path().join("scopes.db"), "items")?;
    let mut items = Collection::new(backend, RankOptions::default());
    let a = items.insert(NewRecord::new("int").scope(7i64))?;
    let b = items.insert(NewRecord::new("text").scope("7"))?;
    assert_eq!(a.rank, b.rank);
    assert_eq!(labels(&mut items, Some(&ScopeKey::Int(7))), ["int"]);
    assert_eq!(labels(&mut items, Some(&ScopeKey::from("7"))), ["text"]);
    assert!(items.verify()?.success);
    assert_eq!(items.verify()?.counts.scopes, 2);
    Ok(())
}

#[test]
fn shift_down_at_the_ceiling() -> Result<()> {
    let dir = tempdir().expect("tempdir");
    let backend = SqliteBackend::open(dir.path().join("ceiling.db"), DEFAULT_TABLE)?;
    let mut items = Collection::new(backend, RankOptions::default());
    let mut last = items.insert(NewRecord::new("0"))?;
    let mut count = 1;
    while last.rank < MAX_RANK {
        last = items.insert(NewRecord::new(count.to_string()))?;
        count += 1;
    }
    let overflow = items.insert(NewRecord::new("overflow"))?;
    assert_eq!(overflow.rank, MAX_RANK);
    assert_eq!(items.get(last.id)?.map(|r| r.rank), Some(MAX_RANK - 1));
    assert_eq!(items.ordinal(overflow.id)?, Some(count));
    assert!(items.verify()?.success);
    Ok(())
}

#[test]
fn refused_move_rolls_back() -> Result<()> {
    let dir = tempdir().expect("tempdir");
    let backend = SqliteBackend::open(dir.path().join("tight.db"), DEFAULT_TABLE)?;
    let options = RankOptions::default().bounds(RankBounds::new(0, 2)?);
    let mut items = Collection::new(backend, options);
    for label in ["a", "b", "c"] {
        items.insert(NewRecord::new(label).position(Position::At(0)))?;
    }
    let before = items.list(None)?;
    let err = items.insert(NewRecord::new("d").position(Position::At(1)));
    assert!(matches!(err, Err(RankError::InvalidMove { .. })));
    assert_eq!(items.list(None)?, before);
    Ok(())
}

#[test]
fn rebalance_respaces_one_scope() -> Result<()> {
    let dir = tempdir().expect("tempdir");
    let backend = SqliteBackend::open(dir.path().join("respace.db"), DEFAULT_TABLE)?;
    let mut items = Collection::new(backend, RankOptions::default());
    for n in 0..5 {
        items.insert(NewRecord::new(format!("a{n}")).scope(1i64))?;
    }
    let untouched = items.insert(NewRecord::new("b0").scope(2i64))?;

    let report = items.rebalance(Some(&ScopeKey::Int(1)))?;
    assert_eq!(report.records, 5);
    assert_eq!(
        labels(&mut items, Some(&ScopeKey::Int(1))),
        ["a0", "a1", "a2", "a3", "a4"]
    );
    assert_eq!(items.get(untouched.id)?.map(|r| r.rank), Some(untouched.rank));
    Ok(())
}

#[test]
fn rejects_unsafe_table_names() {
    let dir = tempdir().expect("tempdir");
    let err = SqliteBackend::open(dir.path().join("bad.db"), "items; DROP TABLE x").unwrap_err();
    assert!(matches!(err, RankError::InvalidArgument(_)));
}
