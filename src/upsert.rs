//! Table-agnostic upsert of keyed rows
//!
//! Uses parameterized queries for every value; table and column names are
//! validated and checked against the live schema before they reach SQL text.
//! A batch is applied in a single transaction, so it lands entirely or not
//! at all.

use crate::error::{Result, SyncError};
use crate::schema::{quote_identifier, validate_identifier, TableSchema, ID_COLUMN};
use crate::store::ConnectionProvider;
use crate::value::{to_sql_value, Row};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

/// Upsert `rows` into `table`, returning the number of rows processed
///
/// Opens its own connection and closes it before returning. Rows are applied
/// in input order, so when an `id` repeats within the batch the last row wins.
pub fn upsert(provider: &ConnectionProvider, table: &str, rows: &[Row]) -> Result<usize> {
    let columns = validate_batch(table, rows)?;
    let mut conn = provider.open()?;
    let count = apply_batch(&mut conn, table, &columns, rows)?;
    provider.close(conn)?;
    Ok(count)
}

/// Same as `upsert`, on a connection owned by the caller
pub fn upsert_with_connection(conn: &mut Connection, table: &str, rows: &[Row]) -> Result<usize> {
    let columns = validate_batch(table, rows)?;
    apply_batch(conn, table, &columns, rows)
}

/// Load a batch from a JSON file holding an array of objects
pub fn load_rows(path: impl AsRef<Path>) -> Result<Vec<Row>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
    let rows: Vec<Row> = serde_json::from_str(&contents)?;
    log::debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Check the batch shape without touching the store
///
/// Returns the column list, taken from the first row's keys in order.
fn validate_batch(table: &str, rows: &[Row]) -> Result<Vec<String>> {
    validate_identifier(table)?;

    let first = rows.first().ok_or_else(|| SyncError::EmptyBatch {
        table: table.to_string(),
    })?;

    let columns: Vec<String> = first.keys().cloned().collect();
    for column in &columns {
        validate_identifier(column)?;
    }

    for (index, row) in rows.iter().enumerate() {
        if !row.contains_key(ID_COLUMN) {
            return Err(invalid_row(table, index, format!("missing `{}`", ID_COLUMN)));
        }

        let missing: Vec<&str> = columns
            .iter()
            .filter(|c| !row.contains_key(c.as_str()))
            .map(String::as_str)
            .collect();
        let extra: Vec<&str> = row
            .keys()
            .filter(|k| !first.contains_key(k.as_str()))
            .map(String::as_str)
            .collect();

        if !missing.is_empty() || !extra.is_empty() {
            return Err(invalid_row(
                table,
                index,
                format!(
                    "columns differ from first row (missing: [{}], extra: [{}])",
                    missing.join(", "),
                    extra.join(", ")
                ),
            ));
        }
    }

    Ok(columns)
}

fn apply_batch(
    conn: &mut Connection,
    table: &str,
    columns: &[String],
    rows: &[Row],
) -> Result<usize> {
    let schema = TableSchema::introspect(conn, table)
        .map_err(|e| upsert_error(table, None, e))?
        .ok_or_else(|| SyncError::UnknownTable(table.to_string()))?;

    let bound = bind_rows(&schema, columns, rows)?;
    let sql = build_upsert_sql(table, columns);
    log::debug!("Upsert statement for {}: {}", table, sql);

    let tx = conn
        .transaction()
        .map_err(|e| upsert_error(table, None, e))?;
    {
        let mut stmt = tx
            .prepare_cached(&sql)
            .map_err(|e| upsert_error(table, None, e))?;

        for (index, values) in bound.iter().enumerate() {
            stmt.execute(params_from_iter(values.iter()))
                .map_err(|e| upsert_error(table, Some(index), e))?;
        }
    }
    tx.commit().map_err(|e| upsert_error(table, None, e))?;

    log::info!("Upserted {} rows into {}", rows.len(), table);
    Ok(rows.len())
}

/// Convert every row into positional parameters, in `columns` order
fn bind_rows(schema: &TableSchema, columns: &[String], rows: &[Row]) -> Result<Vec<Vec<SqlValue>>> {
    let mut column_types = Vec::with_capacity(columns.len());
    for column in columns {
        match schema.column(column) {
            Some(def) => column_types.push(def.column_type),
            None => {
                return Err(invalid_row(
                    &schema.table,
                    0,
                    format!("unknown column `{}`", column),
                ))
            }
        }
    }

    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            columns
                .iter()
                .zip(&column_types)
                .map(|(column, column_type)| {
                    let value = &row[column.as_str()];
                    to_sql_value(value, *column_type).map_err(|reason| {
                        invalid_row(&schema.table, index, format!("column `{}`: {}", column, reason))
                    })
                })
                .collect()
        })
        .collect()
}

/// Build `INSERT ... ON CONFLICT (id) DO UPDATE` for the given columns
///
/// Every non-`id` column is overwritten with the proposed value.
fn build_upsert_sql(table: &str, columns: &[String]) -> String {
    let column_list: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| c.as_str() != ID_COLUMN)
        .map(|c| format!("{0} = excluded.{0}", quote_identifier(c)))
        .collect();

    let action = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}",
        quote_identifier(table),
        column_list.join(", "),
        placeholders.join(", "),
        quote_identifier(ID_COLUMN),
        action
    )
}

fn invalid_row(table: &str, index: usize, reason: String) -> SyncError {
    SyncError::InvalidRow {
        table: table.to_string(),
        index,
        reason,
    }
}

fn upsert_error(table: &str, index: Option<usize>, source: rusqlite::Error) -> SyncError {
    SyncError::Upsert {
        table: table.to_string(),
        index,
        source,
    }
}
