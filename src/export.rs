//! Full-table export to JSON
//!
//! Rows are read with every value decoded by its column's declared type and
//! normalized into plain JSON. The whole table is materialized before the
//! output file is touched, and the file is written to a temporary sibling and
//! renamed into place, so a failed export never leaves a partial document.

use crate::error::{Result, SyncError};
use crate::schema::{quote_identifier, validate_identifier, TableSchema};
use crate::store::ConnectionProvider;
use crate::value::{Row, StoreValue};
use rusqlite::Connection;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of a table export
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub status: &'static str,
    #[serde(rename = "file")]
    pub destination: PathBuf,
    #[serde(rename = "rows")]
    pub row_count: usize,
}

/// Export `table` to `<out_dir>/<table>.json`, overwriting any existing file
///
/// The table name is validated before any connection is opened.
pub fn export_table(
    provider: &ConnectionProvider,
    table: &str,
    out_dir: impl AsRef<Path>,
) -> Result<ExportReport> {
    let rows = read_table(provider, table)?;
    let destination = export_path(out_dir.as_ref(), table);
    write_document(&destination, &rows)?;

    log::info!(
        "Exported {} rows from {} to {}",
        rows.len(),
        table,
        destination.display()
    );
    Ok(ExportReport {
        status: "success",
        destination,
        row_count: rows.len(),
    })
}

/// Read every row of `table` as normalized JSON, in store order
///
/// A missing database file is a connection error; it is never created here.
pub fn read_table(provider: &ConnectionProvider, table: &str) -> Result<Vec<Row>> {
    validate_identifier(table)?;
    let conn = provider.open_existing()?;
    let rows = read_table_with_connection(&conn, table)?;
    provider.close(conn)?;
    Ok(rows)
}

/// Same as `read_table`, on a connection owned by the caller
pub fn read_table_with_connection(conn: &Connection, table: &str) -> Result<Vec<Row>> {
    validate_identifier(table)?;
    let export_error = |source: rusqlite::Error| SyncError::Export {
        table: table.to_string(),
        source,
    };

    let schema = TableSchema::introspect(conn, table)
        .map_err(export_error)?
        .ok_or_else(|| SyncError::UnknownTable(table.to_string()))?;

    let column_list: Vec<String> = schema.column_names().map(quote_identifier).collect();
    let sql = format!(
        "SELECT {} FROM {}",
        column_list.join(", "),
        quote_identifier(table)
    );

    let mut stmt = conn.prepare(&sql).map_err(export_error)?;
    let mut rows = stmt.query([]).map_err(export_error)?;

    let mut document = Vec::new();
    while let Some(row) = rows.next().map_err(export_error)? {
        let mut record = Row::new();
        for (i, column) in schema.columns.iter().enumerate() {
            let raw = row.get_ref(i).map_err(export_error)?;
            let value = StoreValue::decode(raw, column.column_type).normalize();
            record.insert(column.name.clone(), value);
        }
        document.push(record);
    }

    log::debug!("Read {} rows from {}", document.len(), table);
    Ok(document)
}

/// Destination file for an export of `table`
pub fn export_path(out_dir: &Path, table: &str) -> PathBuf {
    out_dir.join(format!("{}.json", table))
}

/// Write rows as a pretty-printed JSON array (4-space indent)
pub fn write_document(path: &Path, rows: &[Row]) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    rows.serialize(&mut serializer)?;
    buf.push(b'\n');

    let tmp_path = path.with_extension("json.tmp");
    if let Err(e) = std::fs::write(&tmp_path, &buf) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(SyncError::io(&tmp_path, e));
    }
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(SyncError::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::init_schema;
    use crate::store::StoreConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn insert_order(conn: &Connection, id: &str, total: &str, created_at: &str) {
        conn.execute(
            "INSERT INTO orders (id, customer_info, shipping_address, total_amount, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                id,
                r#"{"name":"Asha","email":"asha@example.com"}"#,
                r#"{"street":"1 MG Road","city":"Pune","state":"MH","zip":"411001"}"#,
                total,
                created_at
            ],
        )
        .unwrap();
    }

    #[test]
    fn decimal_exports_as_float() {
        let conn = test_db();
        conn.execute(
            "INSERT INTO products (id, name, price, rating) VALUES (1, 'clocks_1101', '19.99', '4.8')",
            [],
        )
        .unwrap();

        let rows = read_table_with_connection(&conn, "products").unwrap();
        assert_eq!(rows[0]["price"], json!(19.99));
        assert_eq!(rows[0]["rating"], json!(4.8));
        assert!(rows[0]["price"].is_f64());
    }

    #[test]
    fn timestamp_exports_as_iso_string() {
        let conn = test_db();
        insert_order(&conn, "a1", "3198.00", "2024-01-05T10:00:00");

        let rows = read_table_with_connection(&conn, "orders").unwrap();
        assert_eq!(rows[0]["created_at"], json!("2024-01-05T10:00:00"));
        assert_eq!(rows[0]["total_amount"], json!(3198.0));
    }

    #[test]
    fn default_timestamp_exports_with_t_separator() {
        let conn = test_db();
        conn.execute(
            "INSERT INTO orders (customer_info, shipping_address, total_amount)
             VALUES ('{}', '{}', 10)",
            [],
        )
        .unwrap();

        let rows = read_table_with_connection(&conn, "orders").unwrap();
        let created_at = rows[0]["created_at"].as_str().unwrap();
        assert_eq!(created_at.len(), 19);
        assert_eq!(&created_at[10..11], "T");
        assert_eq!(rows[0]["status"], json!("pending"));
        assert_eq!(rows[0]["id"].as_str().unwrap().len(), 32);
    }

    #[test]
    fn json_and_array_columns_export_as_json() {
        let conn = test_db();
        insert_order(&conn, "a1", "10", "2024-01-05T10:00:00");
        conn.execute(
            "INSERT INTO products (id, name, price, colors) VALUES (1, 'x', 1, '[\"white\",\"gold\"]')",
            [],
        )
        .unwrap();

        let orders = read_table_with_connection(&conn, "orders").unwrap();
        assert_eq!(orders[0]["customer_info"]["email"], json!("asha@example.com"));
        assert_eq!(orders[0]["shipping_address"]["zip"], json!("411001"));

        let products = read_table_with_connection(&conn, "products").unwrap();
        assert_eq!(products[0]["colors"], json!(["white", "gold"]));
        assert_eq!(products[0]["description"], serde_json::Value::Null);
    }

    #[test]
    fn export_keeps_column_order() {
        let conn = test_db();
        conn.execute(
            "INSERT INTO cart_items (id, session_id, quantity) VALUES (1, 'session_abc123', 2)",
            [],
        )
        .unwrap();

        let rows = read_table_with_connection(&conn, "cart_items").unwrap();
        let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["id", "session_id", "product_id", "name", "price", "image_url", "quantity"]
        );
    }

    #[test]
    fn empty_table_exports_empty_document() {
        let conn = test_db();
        assert!(read_table_with_connection(&conn, "order_items").unwrap().is_empty());
    }

    #[test]
    fn unknown_table_is_rejected() {
        let conn = test_db();
        assert!(matches!(
            read_table_with_connection(&conn, "wishlist"),
            Err(SyncError::UnknownTable(_))
        ));
    }

    #[test]
    fn invalid_identifier_fails_before_connecting() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("never.db");
        let provider = ConnectionProvider::new(StoreConfig::new(&db_path));

        let err = export_table(&provider, "drop table x;", dir.path()).unwrap_err();
        assert!(matches!(err, SyncError::InvalidIdentifier(_)));
        assert!(!db_path.exists());
    }

    #[test]
    fn export_table_writes_document_and_report() {
        let dir = TempDir::new().unwrap();
        let provider = ConnectionProvider::new(StoreConfig::new(dir.path().join("store.db")));
        {
            let conn = provider.open().unwrap();
            init_schema(&conn).unwrap();
            conn.execute(
                "INSERT INTO products (id, name, price) VALUES (1, 'varmala_1101', 2999)",
                [],
            )
            .unwrap();
        }

        let report = export_table(&provider, "products", dir.path()).unwrap();
        assert_eq!(report.status, "success");
        assert_eq!(report.row_count, 1);
        assert_eq!(report.destination, dir.path().join("products.json"));

        let contents = std::fs::read_to_string(&report.destination).unwrap();
        assert!(contents.starts_with("[\n    {\n        \"id\": 1,"));
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed[0]["price"], json!(2999.0));
        assert!(!dir.path().join("products.json.tmp").exists());
    }

    #[test]
    fn export_report_serializes_with_file_and_rows() {
        let report = ExportReport {
            status: "success",
            destination: PathBuf::from("orders.json"),
            row_count: 3,
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"status": "success", "file": "orders.json", "rows": 3})
        );
    }

    #[test]
    fn write_document_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("products.json");
        std::fs::write(&path, "stale").unwrap();

        write_document(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
    }

    #[test]
    fn failed_export_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let provider = ConnectionProvider::new(StoreConfig::new(dir.path().join("store.db")));
        provider.close(provider.open().unwrap()).unwrap();

        let err = export_table(&provider, "products", dir.path()).unwrap_err();
        assert!(matches!(err, SyncError::UnknownTable(_)));
        assert!(!dir.path().join("products.json").exists());
    }

    #[test]
    fn export_to_missing_store_does_not_create_it() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("absent.db");
        let provider = ConnectionProvider::new(StoreConfig::new(&db_path));

        let err = export_table(&provider, "products", dir.path()).unwrap_err();
        assert!(matches!(err, SyncError::Connection { .. }));
        assert!(!db_path.exists());
        assert!(!dir.path().join("products.json").exists());
    }

    #[test]
    fn unwritable_destination_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let provider = ConnectionProvider::new(StoreConfig::new(dir.path().join("store.db")));
        {
            let conn = provider.open().unwrap();
            init_schema(&conn).unwrap();
            conn.execute(
                "INSERT INTO products (id, name, price) VALUES (1, 'varmala_1101', 2999)",
                [],
            )
            .unwrap();
        }
        let out_dir = dir.path().join("no_such_dir");

        let err = export_table(&provider, "products", &out_dir).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
        assert!(!out_dir.join("products.json").exists());
        assert!(!out_dir.join("products.json.tmp").exists());
    }

    #[test]
    fn failed_rename_removes_temporary_file() {
        let dir = TempDir::new().unwrap();
        // A directory in the way makes the final rename fail
        let path = dir.path().join("orders.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let err = write_document(&path, &[]).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
        assert!(!dir.path().join("orders.json.tmp").exists());
        assert!(path.is_dir());
    }
}
