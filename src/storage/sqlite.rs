//! SQLite backend.
//!
//! Stores records in a single table:
//!
//! ```sql
//! CREATE TABLE <table> (id INTEGER PRIMARY KEY, scope, rank INTEGER NOT NULL, label TEXT NOT NULL)
//! ```
//!
//! `scope` is declared without a type so integer and text keys keep their
//! storage class and never compare equal to each other. The `(scope, rank)`
//! index is deliberately not unique: bulk shifts update row by row and would
//! trip a per-row uniqueness check halfway through.

use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, trace};

use super::backend::{Backend, RecordTxn};
use super::record::{NewRecord, Record};
use super::store::{RankFilter, RankPredicate, RankStore, RankedRow, ScopeFilter, SortOrder};
use crate::types::{Rank, RankError, RecordId, Result, ScopeKey};

/// Default table name.
pub const DEFAULT_TABLE: &str = "ranked_records";

/// A SQLite database holding one ranked table.
pub struct SqliteBackend {
    conn: Connection,
    table: String,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Opens (or creates) a database file and ensures the table exists.
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        debug!(path = %path.as_ref().display(), table, "opened sqlite backend");
        Self::with_connection(conn, table)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(table: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        validate_identifier(table)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY,
                scope,
                rank INTEGER NOT NULL,
                label TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS {table}_scope_rank ON {table} (scope, rank);"
        ))?;
        Ok(Self {
            conn,
            table: table.to_owned(),
        })
    }

    /// Name of the ranked table.
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Backend for SqliteBackend {
    type Txn<'a> = SqliteTxn<'a>;

    fn begin(&mut self) -> Result<SqliteTxn<'_>> {
        let table = self.table.as_str();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(SqliteTxn { tx, table })
    }
}

/// Write transaction on a [`SqliteBackend`]. Rolls back when dropped uncommitted.
pub struct SqliteTxn<'a> {
    tx: rusqlite::Transaction<'a>,
    table: &'a str,
}

/// `WHERE` clause under construction, with its positional parameters.
struct Selection {
    conditions: Vec<&'static str>,
    params: Vec<Value>,
}

impl Selection {
    fn scope(scope: &ScopeFilter) -> Self {
        let mut selection = Self {
            conditions: Vec::new(),
            params: Vec::new(),
        };
        match scope {
            ScopeFilter::Any => {}
            ScopeFilter::Is(None) => selection.conditions.push("scope IS NULL"),
            ScopeFilter::Is(Some(key)) => selection.and("scope = ?", scope_value(key)),
        }
        selection
    }

    fn filter(filter: &RankFilter) -> Self {
        let mut selection = Self::scope(&filter.scope);
        if let Some(id) = filter.exclude {
            selection.and("id <> ?", Value::Integer(id.0 as i64));
        }
        selection
    }

    fn and(&mut self, condition: &'static str, param: Value) {
        self.conditions.push(condition);
        self.params.push(param);
    }

    fn sql(&self) -> String {
        if self.conditions.is_empty() {
            "1".to_owned()
        } else {
            self.conditions.join(" AND ")
        }
    }
}

fn scope_value(key: &ScopeKey) -> Value {
    match key {
        ScopeKey::Int(v) => Value::Integer(*v),
        ScopeKey::Text(v) => Value::Text(v.clone()),
    }
}

fn ranked_row(row: &Row<'_>) -> rusqlite::Result<RankedRow> {
    Ok(RankedRow {
        id: RecordId(row.get::<_, i64>(0)? as u64),
        rank: row.get(1)?,
    })
}

fn record_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: RecordId(row.get::<_, i64>(0)? as u64),
        scope: row.get(1)?,
        rank: row.get(2)?,
        label: row.get(3)?,
    })
}

impl RankStore for SqliteTxn<'_> {
    fn query_ordered(
        &mut self,
        filter: &RankFilter,
        order: SortOrder,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<RankedRow>> {
        let mut selection = Selection::filter(filter);
        let direction = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let sql = format!(
            "SELECT id, rank FROM {} WHERE {} ORDER BY rank {direction}, id {direction} LIMIT ? OFFSET ?",
            self.table,
            selection.sql()
        );
        selection
            .params
            .push(Value::Integer(limit.map_or(-1, |l| l.min(i64::MAX as usize) as i64)));
        selection
            .params
            .push(Value::Integer(offset.min(i64::MAX as usize) as i64));
        let mut stmt = self.tx.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(selection.params.iter()), ranked_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        trace!(rows = rows.len(), offset, ?limit, "ordered query");
        Ok(rows)
    }

    fn query_exact(&mut self, filter: &RankFilter, rank: Rank) -> Result<Option<RankedRow>> {
        let mut selection = Selection::filter(filter);
        selection.and("rank = ?", Value::Integer(rank));
        let sql = format!(
            "SELECT id, rank FROM {} WHERE {} LIMIT 1",
            self.table,
            selection.sql()
        );
        let mut stmt = self.tx.prepare_cached(&sql)?;
        Ok(stmt
            .query_row(params_from_iter(selection.params.iter()), ranked_row)
            .optional()?)
    }

    fn query_extreme(&mut self, filter: &RankFilter, order: SortOrder) -> Result<Option<Rank>> {
        let selection = Selection::filter(filter);
        let aggregate = match order {
            SortOrder::Asc => "MIN",
            SortOrder::Desc => "MAX",
        };
        let sql = format!(
            "SELECT {aggregate}(rank) FROM {} WHERE {}",
            self.table,
            selection.sql()
        );
        let mut stmt = self.tx.prepare_cached(&sql)?;
        Ok(stmt.query_row(params_from_iter(selection.params.iter()), |row| {
            row.get::<_, Option<Rank>>(0)
        })?)
    }

    fn bulk_increment(
        &mut self,
        filter: &RankFilter,
        predicate: RankPredicate,
        delta: i64,
    ) -> Result<usize> {
        let mut selection = Selection::filter(filter);
        match predicate {
            RankPredicate::AtLeast(r) => selection.and("rank >= ?", Value::Integer(r)),
            RankPredicate::AtMost(r) => selection.and("rank <= ?", Value::Integer(r)),
        }
        let sql = format!(
            "UPDATE {} SET rank = rank + ? WHERE {}",
            self.table,
            selection.sql()
        );
        let params = std::iter::once(Value::Integer(delta)).chain(selection.params);
        let mut stmt = self.tx.prepare_cached(&sql)?;
        Ok(stmt.execute(params_from_iter(params))?)
    }

    fn write_rank(&mut self, id: RecordId, rank: Rank) -> Result<()> {
        let sql = format!("UPDATE {} SET rank = ?1 WHERE id = ?2", self.table);
        let mut stmt = self.tx.prepare_cached(&sql)?;
        if stmt.execute(params![rank, id.0 as i64])? == 0 {
            return Err(RankError::NotFound(id));
        }
        Ok(())
    }
}

impl RecordTxn for SqliteTxn<'_> {
    fn fetch(&mut self, id: RecordId) -> Result<Option<Record>> {
        let sql = format!(
            "SELECT id, scope, rank, label FROM {} WHERE id = ?1",
            self.table
        );
        let mut stmt = self.tx.prepare_cached(&sql)?;
        Ok(stmt.query_row([id.0 as i64], record_row).optional()?)
    }

    fn insert_record(&mut self, record: &NewRecord, rank: Rank) -> Result<RecordId> {
        let sql = format!(
            "INSERT INTO {} (scope, rank, label) VALUES (?1, ?2, ?3)",
            self.table
        );
        self.tx
            .prepare_cached(&sql)?
            .execute(params![record.scope, rank, record.label])?;
        Ok(RecordId(self.tx.last_insert_rowid() as u64))
    }

    fn update_record(&mut self, record: &Record) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET scope = ?1, rank = ?2, label = ?3 WHERE id = ?4",
            self.table
        );
        let changed = self.tx.prepare_cached(&sql)?.execute(params![
            record.scope,
            record.rank,
            record.label,
            record.id.0 as i64
        ])?;
        if changed == 0 {
            return Err(RankError::NotFound(record.id));
        }
        Ok(())
    }

    fn delete_record(&mut self, id: RecordId) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", self.table);
        Ok(self.tx.prepare_cached(&sql)?.execute([id.0 as i64])? > 0)
    }

    fn list(&mut self, scope: &ScopeFilter) -> Result<Vec<Record>> {
        let selection = Selection::scope(scope);
        let sql = format!(
            "SELECT id, scope, rank, label FROM {} WHERE {} ORDER BY rank ASC, id ASC",
            self.table,
            selection.sql()
        );
        let mut stmt = self.tx.prepare_cached(&sql)?;
        let records = stmt
            .query_map(params_from_iter(selection.params.iter()), record_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn scopes(&mut self) -> Result<Vec<Option<ScopeKey>>> {
        let sql = format!("SELECT DISTINCT scope FROM {} ORDER BY scope", self.table);
        let mut stmt = self.tx.prepare_cached(&sql)?;
        let scopes = stmt
            .query_map([], |row| row.get::<_, Option<ScopeKey>>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(scopes)
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`, the only names spliced into SQL text.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid || name.len() > 64 {
        return Err(RankError::InvalidArgument(format!(
            "'{name}' is not a valid table name"
        )));
    }
    Ok(())
}
