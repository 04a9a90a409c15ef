#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use ranker::storage::{Backend, NewRecord, RecordTxn, SqliteBackend, DEFAULT_TABLE};
use serde_json::Value;
use tempfile::TempDir;

fn setup_db(name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(format!("{name}.db"));
    (dir, path)
}

fn ranker(db: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("ranker");
    cmd.env_remove("RANKER_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--db")
        .arg(db);
    cmd
}

fn json(db: &Path, args: &[&str]) -> Value {
    let output = ranker(db)
        .args(["--format", "json"])
        .args(args)
        .output()
        .expect("run ranker");
    assert!(
        output.status.success(),
        "ranker {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json output")
}

fn labels(db: &Path, scope: &str) -> Vec<String> {
    json(db, &["list", "--scope", scope])
        .as_array()
        .expect("array")
        .iter()
        .map(|r| r["label"].as_str().expect("label").to_string())
        .collect()
}

#[test]
fn insert_move_and_list() {
    let (_dir, db) = setup_db("basic");
    let first = json(&db, &["insert", "milk", "--scope", "groceries"]);
    assert_eq!(first["rank"], 0);
    assert_eq!(first["scope"], "groceries");
    json(&db, &["insert", "eggs", "--scope", "groceries"]);
    let bread = json(&db, &["insert", "bread", "--scope", "groceries", "--position", "first"]);
    assert_eq!(labels(&db, "groceries"), ["bread", "milk", "eggs"]);

    let id = bread["id"].as_u64().expect("id").to_string();
    json(&db, &["move", &id, "last"]);
    assert_eq!(labels(&db, "groceries"), ["milk", "eggs", "bread"]);
    json(&db, &["move", &id, "1"]);
    assert_eq!(labels(&db, "groceries"), ["milk", "bread", "eggs"]);
}

#[test]
fn delete_reports_outcome() {
    let (_dir, db) = setup_db("delete");
    let record = json(&db, &["insert", "only"]);
    let id = record["id"].as_u64().expect("id").to_string();
    assert_eq!(json(&db, &["delete", &id])["deleted"], true);
    assert_eq!(json(&db, &["delete", &id])["deleted"], false);
}

#[test]
fn text_output_lists_in_order() {
    let (_dir, db) = setup_db("text");
    ranker(&db).args(["insert", "b"]).assert().success();
    ranker(&db)
        .args(["insert", "a", "--position", "0"])
        .assert()
        .success();
    let output = ranker(&db).arg("list").output().expect("run ranker");
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let order: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().last())
        .collect();
    assert_eq!(order, ["a", "b"]);
}

#[test]
fn rebalance_and_verify() {
    let (_dir, db) = setup_db("maintenance");
    for label in ["x", "y", "z"] {
        json(&db, &["insert", label, "--scope", "3"]);
    }
    let report = json(&db, &["rebalance", "--scope", "3"]);
    assert_eq!(report["records"], 3);
    let verify = json(&db, &["verify"]);
    assert_eq!(verify["success"], true);
    assert_eq!(verify["counts"]["records"], 3);
}

#[test]
fn verify_failure_exits_with_two() {
    let (_dir, db) = setup_db("corrupt");
    {
        let mut backend = SqliteBackend::open(&db, DEFAULT_TABLE).expect("open");
        let mut txn = backend.begin().expect("begin");
        txn.insert_record(&NewRecord::new("a"), 5).expect("insert");
        txn.insert_record(&NewRecord::new("b"), 5).expect("insert");
        txn.commit().expect("commit");
    }
    let output = ranker(&db).arg("verify").output().expect("run ranker");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stdout).contains("share rank 5"));
}

#[test]
fn missing_record_is_an_error() {
    let (_dir, db) = setup_db("missing");
    let output = ranker(&db)
        .args(["move", "42", "first"])
        .output()
        .expect("run ranker");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("record 42 not found"));
}

#[test]
fn invalid_position_is_rejected_by_parser() {
    let (_dir, db) = setup_db("parse");
    ranker(&db)
        .args(["insert", "x", "--position", "sideways"])
        .assert()
        .failure();
}
