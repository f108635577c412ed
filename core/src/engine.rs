//! The persistence engine seam.
//!
//! Connections, escaping and row fetching live behind [`Engine`]; this crate only
//! produces SQL text and consumes rows. Errors returned by an engine are
//! propagated unchanged by every caller in this crate.

use crate::error::{Result, TuskError};
use crate::filter::FilterNode;
use crate::record::Fields;
use crate::value::{FromValue, Value};

/// Statement used by the default [`Engine::found_rows`].
pub const FOUND_ROWS_SQL: &str = "SELECT FOUND_ROWS() AS total;";

/// A blocking database engine.
pub trait Engine {
    /// Escapes a scalar so it can be placed between single quotes.
    fn escape(&self, value: &Value) -> String;

    /// Runs a statement and returns its rows.
    fn query(&self, sql: &str) -> Result<Vec<Fields>>;

    /// Row count of the last `SQL_CALC_FOUND_ROWS` statement, ignoring its LIMIT.
    fn found_rows(&self) -> Result<u64> {
        let rows = self.query(FOUND_ROWS_SQL)?;
        rows.first()
            .and_then(|row| row.get("total"))
            .and_then(i64::from_value)
            .and_then(|total| u64::try_from(total).ok())
            .ok_or_else(|| TuskError::Engine("FOUND_ROWS() returned no total".to_string()))
    }

    /// Inserts a row and returns the generated identifier.
    fn insert(&self, table: &str, fields: &Fields) -> Result<Value>;

    /// Updates rows matching `filter`, returning the affected count.
    fn update(&self, table: &str, fields: &Fields, filter: &FilterNode) -> Result<u64>;

    /// Deletes rows whose key columns equal `key_values`, returning the affected count.
    fn delete(&self, table: &str, key_fields: &[&str], key_values: &[Value]) -> Result<u64>;
}
