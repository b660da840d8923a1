mod import;

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{anyhow, bail, Context, Result};
use async_graphql::SimpleObject;
use rusqlite::{
    params_from_iter,
    types::{ToSqlOutput, ValueRef},
    Connection, ToSql,
};
use serde::Serialize;
use serde_json::{Number, Value};
use tracing::info;

pub(crate) use self::import::Fixture;
use crate::plan::{Param, SqlQuery};

/// One result row, columns in select order.
pub(crate) type Row = serde_json::Map<String, Value>;

/// The relational store behind the question pipeline.
pub(crate) trait Store: Send + Sync {
    fn execute(&self, query: &SqlQuery) -> Result<Vec<Row>>;
    fn stats(&self) -> Result<CatalogStats>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, SimpleObject)]
pub(crate) struct Count {
    pub(crate) name: String,
    pub(crate) count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, SimpleObject)]
pub(crate) struct CatalogStats {
    pub(crate) total: i64,
    pub(crate) active: i64,
    /// Active products per category.
    pub(crate) by_type: Vec<Count>,
    /// Active products per region.
    pub(crate) by_region: Vec<Count>,
    pub(crate) unique_suppliers: i64,
    pub(crate) total_restrictions: i64,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS feed_products_sample (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_name TEXT NOT NULL,
    product_code TEXT,
    name TEXT,
    type TEXT,
    cost_per_kg REAL,
    cost_currency TEXT,
    supplier TEXT,
    supplier_country TEXT,
    supplier_email TEXT,
    supplier_phone TEXT,
    supplier_address TEXT,
    is_standard_product INTEGER DEFAULT 0,
    created_at INTEGER,
    is_active INTEGER DEFAULT 1
);
CREATE TABLE IF NOT EXISTS feed_product_restrictions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER,
    species TEXT,
    sex TEXT,
    min_age_months INTEGER,
    max_age_months INTEGER,
    breeding_cycle TEXT,
    lactation_cycle TEXT,
    production_focus TEXT,
    is_eligible INTEGER DEFAULT 1,
    max_perc_feed REAL,
    max_perc_conc REAL,
    is_active INTEGER DEFAULT 1,
    FOREIGN KEY (product_id) REFERENCES feed_products_sample(id)
);
CREATE INDEX IF NOT EXISTS idx_product_name ON feed_products_sample(product_name);
CREATE INDEX IF NOT EXISTS idx_product_code ON feed_products_sample(product_code);
CREATE INDEX IF NOT EXISTS idx_product_type ON feed_products_sample(type);
CREATE INDEX IF NOT EXISTS idx_supplier_country ON feed_products_sample(supplier_country);
CREATE INDEX IF NOT EXISTS idx_supplier ON feed_products_sample(supplier);
CREATE INDEX IF NOT EXISTS idx_is_active ON feed_products_sample(is_active);
CREATE INDEX IF NOT EXISTS idx_restrictions_product ON feed_product_restrictions(product_id);
";

/// SQLite-backed catalog. Clones share one connection.
#[derive(Clone)]
pub(crate) struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub(crate) fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        info!("Opened catalog at {}", path.display());
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("failed to create catalog schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    pub(crate) fn is_reachable(&self) -> bool {
        self.lock()
            .and_then(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?))
            .is_ok()
    }

    fn count(conn: &Connection, sql: &str) -> Result<i64> {
        Ok(conn.query_row(sql, [], |row| row.get(0))?)
    }

    fn counts(conn: &Connection, sql: &str) -> Result<Vec<Count>> {
        let mut stmt = conn.prepare(sql)?;
        let counts = stmt
            .query_map([], |row| {
                Ok(Count {
                    name: row
                        .get::<_, Option<String>>(0)?
                        .unwrap_or_else(|| "Unknown".to_string()),
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(counts)
    }
}

impl Store for Database {
    /// Runs a single read-only statement.
    fn execute(&self, query: &SqlQuery) -> Result<Vec<Row>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&query.sql)?;
        if !stmt.readonly() {
            bail!("only read-only statements can be executed");
        }
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (i, column) in columns.iter().enumerate() {
                record.insert(column.clone(), to_json(row.get_ref(i)?));
            }
            records.push(record);
        }
        Ok(records)
    }

    fn stats(&self) -> Result<CatalogStats> {
        let conn = self.lock()?;
        Ok(CatalogStats {
            total: Self::count(&conn, "SELECT COUNT(*) FROM feed_products_sample")?,
            active: Self::count(
                &conn,
                "SELECT COUNT(*) FROM feed_products_sample WHERE is_active = 1",
            )?,
            by_type: Self::counts(
                &conn,
                "SELECT type, COUNT(*) FROM feed_products_sample WHERE is_active = 1 \
                 GROUP BY type ORDER BY type",
            )?,
            by_region: Self::counts(
                &conn,
                "SELECT supplier_country, COUNT(*) AS n FROM feed_products_sample \
                 WHERE is_active = 1 GROUP BY supplier_country ORDER BY n DESC, supplier_country",
            )?,
            unique_suppliers: Self::count(
                &conn,
                "SELECT COUNT(DISTINCT supplier) FROM feed_products_sample \
                 WHERE supplier IS NOT NULL AND is_active = 1",
            )?,
            total_restrictions: Self::count(
                &conn,
                "SELECT COUNT(*) FROM feed_product_restrictions",
            )?,
        })
    }
}

impl ToSql for Param {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Param::Text(text) => text.to_sql(),
            Param::Real(value) => value.to_sql(),
        }
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::String(format!("<{} bytes>", blob.len())),
    }
}

#[cfg(test)]
pub(crate) fn sample() -> Database {
    let db = Database::open_in_memory().unwrap();
    let fixture: Fixture =
        serde_json::from_str(include_str!("../fixtures/sample_catalog.json")).unwrap();
    db.import(&fixture).unwrap();
    db
}
