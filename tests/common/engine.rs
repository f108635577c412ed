//! In-memory [`Engine`] that records every statement it receives.
//!
//! Rows are served per table: a query answers with the rows registered for
//! the table named in its `FROM` clause, regardless of its WHERE clause.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use tusk::core::engine::FOUND_ROWS_SQL;
use tusk::prelude::*;

/// Builds a row from `(column, value)` pairs.
pub fn row<const N: usize>(pairs: [(&str, Value); N]) -> Fields {
    pairs
        .into_iter()
        .map(|(name, value)| (name.into(), value))
        .collect()
}

#[derive(Default)]
pub struct MockEngine {
    tables: RefCell<HashMap<String, Vec<Fields>>>,
    log: RefCell<Vec<String>>,
    last_count: Cell<usize>,
    total: Cell<Option<u64>>,
    next_id: Cell<i64>,
    pub inserts: RefCell<Vec<(String, Fields)>>,
    pub updates: RefCell<Vec<(String, Fields, FilterNode)>>,
    pub deletes: RefCell<Vec<(String, Vec<String>, Vec<Value>)>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `rows` for every query on `table`.
    pub fn with_rows(self, table: &str, rows: Vec<Fields>) -> Self {
        self.tables.borrow_mut().insert(table.to_string(), rows);
        self
    }

    /// Overrides the value reported by `FOUND_ROWS()`.
    pub fn with_total(self, total: u64) -> Self {
        self.total.set(Some(total));
        self
    }

    /// Identifier returned by the next insert.
    pub fn with_next_id(self, id: i64) -> Self {
        self.next_id.set(id - 1);
        self
    }

    /// Executed statements, `FOUND_ROWS()` excluded.
    pub fn queries(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn queries_on(&self, table: &str) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|sql| from_table(sql) == Some(table))
            .count()
    }
}

fn from_table(sql: &str) -> Option<&str> {
    let start = sql.find(" FROM `")? + " FROM `".len();
    let len = sql[start..].find('`')?;
    Some(&sql[start..start + len])
}

impl Engine for MockEngine {
    fn escape(&self, value: &Value) -> String {
        value.key().replace('\\', "\\\\").replace('\'', "\\'")
    }

    fn query(&self, sql: &str) -> tusk::Result<Vec<Fields>> {
        if sql == FOUND_ROWS_SQL {
            let total = self
                .total
                .get()
                .unwrap_or(self.last_count.get() as u64);
            return Ok(vec![row([("total", Value::Int(total as i64))])]);
        }

        self.log.borrow_mut().push(sql.to_string());
        let rows = from_table(sql)
            .and_then(|table| self.tables.borrow().get(table).cloned())
            .unwrap_or_default();
        self.last_count.set(rows.len());
        Ok(rows)
    }

    fn insert(&self, table: &str, fields: &Fields) -> tusk::Result<Value> {
        self.inserts
            .borrow_mut()
            .push((table.to_string(), fields.clone()));
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        Ok(Value::Int(id))
    }

    fn update(&self, table: &str, fields: &Fields, filter: &FilterNode) -> tusk::Result<u64> {
        self.updates
            .borrow_mut()
            .push((table.to_string(), fields.clone(), filter.clone()));
        Ok(1)
    }

    fn delete(&self, table: &str, key_fields: &[&str], key_values: &[Value]) -> tusk::Result<u64> {
        self.deletes.borrow_mut().push((
            table.to_string(),
            key_fields.iter().map(|k| k.to_string()).collect(),
            key_values.to_vec(),
        ));
        Ok(1)
    }
}

/// Engine whose every call fails, for error propagation tests.
pub struct FailingEngine;

impl Engine for FailingEngine {
    fn escape(&self, value: &Value) -> String {
        value.key()
    }

    fn query(&self, _sql: &str) -> tusk::Result<Vec<Fields>> {
        Err(TuskError::Engine("connection lost".into()))
    }

    fn insert(&self, _table: &str, _fields: &Fields) -> tusk::Result<Value> {
        Err(TuskError::Engine("connection lost".into()))
    }

    fn update(&self, _table: &str, _fields: &Fields, _filter: &FilterNode) -> tusk::Result<u64> {
        Err(TuskError::Engine("connection lost".into()))
    }

    fn delete(&self, _table: &str, _key_fields: &[&str], _key_values: &[Value]) -> tusk::Result<u64> {
        Err(TuskError::Engine("connection lost".into()))
    }
}
