//! Table schemas, identifier rules and storefront DDL
//!
//! Only values are ever bound as parameters. Table and column names end up
//! in SQL text, so every name is checked against the identifier grammar and
//! the introspected schema before it is quoted into a statement.

use crate::error::{Result, SyncError};
use crate::store::ConnectionProvider;
use rusqlite::Connection;

/// Longest identifier accepted (PostgreSQL's limit, kept for portability)
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Name of the conflict key column
pub const ID_COLUMN: &str = "id";

/// Storefront tables in dependency order (parents first)
pub const STOREFRONT_TABLES: [&str; 4] = ["products", "orders", "order_items", "cart_items"];

/// Validate a table or column name: ASCII letters, digits and underscore only
pub fn validate_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(SyncError::InvalidIdentifier(name.to_string()))
    }
}

/// Quote an already validated identifier
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name)
}

/// Logical column type, classified from the declared SQL type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Decimal,
    Text,
    Boolean,
    Timestamp,
    Date,
    TextArray,
    Json,
    /// Undeclared or unrecognised type; values keep their natural mapping
    Other,
}

impl ColumnType {
    /// Classify a declared type such as `NUMERIC(10,2)` or `TEXT[]`
    ///
    /// Checks run from most to least specific so `TIMESTAMP` is not read as
    /// a date and `TEXT[]` is not read as plain text.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();

        if upper.is_empty() {
            ColumnType::Other
        } else if upper.ends_with("[]") {
            ColumnType::TextArray
        } else if upper.starts_with("JSON") {
            ColumnType::Json
        } else if upper.contains("TIMESTAMP") || upper.contains("DATETIME") {
            ColumnType::Timestamp
        } else if upper.contains("DATE") {
            ColumnType::Date
        } else if upper.contains("BOOL") {
            ColumnType::Boolean
        } else if upper.contains("INT") || upper == "SERIAL" || upper == "BIGSERIAL" {
            ColumnType::Integer
        } else if upper.contains("NUMERIC") || upper.contains("DECIMAL") {
            ColumnType::Decimal
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            ColumnType::Text
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            ColumnType::Real
        } else {
            ColumnType::Other
        }
    }
}

/// One column of a table as reported by the store
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub declared_type: String,
    pub column_type: ColumnType,
    pub not_null: bool,
    pub primary_key: bool,
}

/// Ordered, typed column list of one table
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Read the schema of `table` from the store
    ///
    /// Returns `None` when the table does not exist.
    pub fn introspect(conn: &Connection, table: &str) -> rusqlite::Result<Option<Self>> {
        let mut stmt = conn.prepare("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1)")?;
        let columns: rusqlite::Result<Vec<ColumnDef>> = stmt
            .query_map([table], |row| {
                let declared_type: String = row.get(1)?;
                Ok(ColumnDef {
                    name: row.get(0)?,
                    column_type: ColumnType::from_declared(&declared_type),
                    declared_type,
                    not_null: row.get::<_, i64>(2)? != 0,
                    primary_key: row.get::<_, i64>(3)? != 0,
                })
            })?
            .collect();
        let columns = columns?;

        if columns.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            table: table.to_string(),
            columns,
        }))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Initialize the storefront schema
///
/// Creates tables if they don't exist:
/// - `products`: catalog entries
/// - `orders`: one row per checkout, customer and shipping info as JSON
/// - `order_items`: order line items
/// - `cart_items`: session-scoped cart lines
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(STOREFRONT_DDL)?;
    log::info!("Database schema initialized");
    Ok(())
}

/// Drop and recreate all storefront tables in one transaction
pub fn reset_schema(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    for table in STOREFRONT_TABLES.iter().rev() {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", quote_identifier(table)))?;
    }
    tx.execute_batch(STOREFRONT_DDL)?;
    tx.commit()?;
    log::info!("Tables dropped and recreated");
    Ok(())
}

/// Open the store and create (or, with `reset`, recreate) the storefront tables
pub fn prepare_store(provider: &ConnectionProvider, reset: bool) -> Result<()> {
    let mut conn = provider.open()?;
    if reset {
        reset_schema(&mut conn).map_err(SyncError::Schema)?;
    } else {
        init_schema(&conn).map_err(SyncError::Schema)?;
    }
    provider.close(conn)
}

const STOREFRONT_DDL: &str = "
    CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        price NUMERIC(10,2) NOT NULL,
        category TEXT,
        image_url TEXT,
        rating NUMERIC(2,1),
        review_count INTEGER DEFAULT 0,
        in_stock NUMERIC(10,1),
        colors TEXT[],
        dimensions TEXT,
        materials TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);

    -- id defaults to a random 128-bit hex string
    CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
        customer_info JSONB NOT NULL,
        shipping_address JSONB NOT NULL,
        total_amount NUMERIC(10,2) NOT NULL,
        status TEXT DEFAULT 'pending',
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS order_items (
        id INTEGER PRIMARY KEY,
        order_id TEXT REFERENCES orders(id) ON DELETE CASCADE,
        product_id INTEGER REFERENCES products(id),
        product_name TEXT,
        product_price NUMERIC(10,2),
        quantity INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id);

    CREATE TABLE IF NOT EXISTS cart_items (
        id INTEGER PRIMARY KEY,
        session_id TEXT NOT NULL,
        product_id INTEGER REFERENCES products(id),
        name TEXT,
        price NUMERIC(10,2),
        image_url TEXT,
        quantity INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_cart_items_session ON cart_items(session_id);
";
