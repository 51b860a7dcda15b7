//! SQLite-backed catalog database
//!
//! This module owns the catalog's single embedded store:
//! - products, with a soft-delete flag and relative document paths
//! - the category lookup table
//! - the key/value parameters table (margin, data directory, ...)
//! - bulk CSV import inside one transaction, with a progress callback
//!
//! Schema changes are applied as forward migrations and never drop data.

mod categories;
mod import;
mod parameters;
mod products;
mod schema;
mod types;

pub use import::{ImportOptions, ImportProgress, ImportRecord, ImportStats, PROGRESS_INTERVAL};
pub use parameters::{
    DEFAULT_MARGIN, DEFAULT_THRESHOLD, PARAM_DATA_DIR, PARAM_MARGIN, PARAM_THRESHOLD,
};
pub use types::*;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use miette::{IntoDiagnostic, Result};
use rusqlite::{Connection, Row};

/// The catalog database
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open or create the database file, migrating the schema forward
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).into_diagnostic()?;
        }

        let conn = Connection::open(path).into_diagnostic()?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .into_diagnostic()?;

        let mut db = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        db.prepare()?;
        tracing::debug!("opened catalog database {}", path.display());
        Ok(db)
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().into_diagnostic()?;
        let mut db = Self { conn, path: None };
        db.prepare()?;
        Ok(db)
    }

    fn prepare(&mut self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys=ON;")
            .into_diagnostic()?;
        self.migrate()
    }

    /// Location of the database file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get catalog statistics
    pub fn statistics(&self) -> Result<CatalogStats> {
        let (total, active, with_datasheet, with_quote): (i64, i64, i64, i64) = self
            .conn
            .query_row(
                r#"SELECT COUNT(*),
                          COALESCE(SUM(active), 0),
                          COUNT(datasheet_path),
                          COUNT(quote_path)
                   FROM products"#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .into_diagnostic()?;

        let mut by_category = BTreeMap::new();
        {
            let mut stmt = self
                .conn
                .prepare("SELECT category, COUNT(*) FROM products GROUP BY category")
                .into_diagnostic()?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })
                .into_diagnostic()?;

            for row in rows {
                let (category, count) = row.into_diagnostic()?;
                by_category.insert(category, count as usize);
            }
        }

        let total_categories: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
            .into_diagnostic()?;

        let db_size_bytes = self
            .path
            .as_ref()
            .and_then(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(CatalogStats {
            total_products: total as usize,
            active_products: active as usize,
            inactive_products: (total - active) as usize,
            with_datasheet: with_datasheet as usize,
            with_quote: with_quote as usize,
            by_category,
            total_categories: total_categories as usize,
            db_size_bytes,
        })
    }

    /// Execute raw SQL query (read-only)
    pub fn query_raw(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let mut stmt = self.conn.prepare(sql).into_diagnostic()?;
        if !stmt.readonly() {
            return Err(miette::miette!("only read-only queries are allowed"));
        }
        let column_count = stmt.column_count();

        let rows = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    let value: String = row
                        .get::<_, rusqlite::types::Value>(i)
                        .map(|v| match v {
                            rusqlite::types::Value::Null => "NULL".to_string(),
                            rusqlite::types::Value::Integer(i) => i.to_string(),
                            rusqlite::types::Value::Real(f) => f.to_string(),
                            rusqlite::types::Value::Text(s) => s,
                            rusqlite::types::Value::Blob(_) => "<blob>".to_string(),
                        })
                        .unwrap_or_default();
                    values.push(value);
                }
                Ok(values)
            })
            .into_diagnostic()?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }

    /// Get column names for a query
    pub fn query_columns(&self, sql: &str) -> Result<Vec<String>> {
        let stmt = self.conn.prepare(sql).into_diagnostic()?;
        Ok(stmt.column_names().iter().map(|s| s.to_string()).collect())
    }
}

/// Columns selected for a full product row, in `row_to_product` order
pub(crate) const PRODUCT_COLUMNS: &str = "id, category, sub_category, designation, dimensions, \
     purchase_price, supplier_reference, active, datasheet_path, quote_path, created, updated";

pub(crate) fn row_to_product(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        category: row.get(1)?,
        sub_category: row.get(2)?,
        designation: row.get(3)?,
        dimensions: row.get(4)?,
        purchase_price: row.get(5)?,
        supplier_reference: row.get(6)?,
        active: row.get::<_, i64>(7)? != 0,
        datasheet_path: row.get(8)?,
        quote_path: row.get(9)?,
        created: parse_datetime(row.get::<_, String>(10)?),
        updated: parse_datetime(row.get::<_, String>(11)?),
    })
}

/// Parse datetime string to DateTime<Utc>
fn parse_datetime(s: String) -> DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc.timestamp_opt(0, 0).single().unwrap_or_default())
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_file_and_reopen_keeps_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".chiffrage").join("catalog.db");

        let id = {
            let mut db = Database::open(&path).unwrap();
            db.add_product(&NewProduct::new("Portes", "Bloc-porte EI30", 410.0))
                .unwrap()
        };

        let db = Database::open(&path).unwrap();
        let product = db.get_product(id).unwrap().unwrap();
        assert_eq!(product.designation, "Bloc-porte EI30");
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[test]
    fn test_statistics() {
        let mut db = Database::open_in_memory().unwrap();
        let a = db
            .add_product(&NewProduct::new("Portes", "Bloc-porte EI30", 410.0))
            .unwrap();
        db.add_product(&NewProduct {
            datasheet_path: Some("fiches/ferme-porte.pdf".into()),
            ..NewProduct::new("Quincaillerie", "Ferme-porte", 85.0)
        })
        .unwrap();
        db.deactivate_product(a).unwrap();

        let stats = db.statistics().unwrap();
        assert_eq!(stats.total_products, 2);
        assert_eq!(stats.active_products, 1);
        assert_eq!(stats.inactive_products, 1);
        assert_eq!(stats.with_datasheet, 1);
        assert_eq!(stats.with_quote, 0);
        assert_eq!(stats.by_category.get("Portes"), Some(&1));
        assert_eq!(stats.total_categories, 2);
    }

    #[test]
    fn test_query_raw_rejects_writes() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.query_raw("DELETE FROM products").is_err());

        let rows = db
            .query_raw("SELECT value FROM parameters WHERE key = 'marge'")
            .unwrap();
        assert_eq!(rows, vec![vec!["20.0".to_string()]]);
    }
}
