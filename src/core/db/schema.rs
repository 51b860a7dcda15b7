//! Database schema and forward migrations

use miette::{IntoDiagnostic, Result};
use rusqlite::params;

use super::Database;

/// Current schema version
pub(super) const SCHEMA_VERSION: i32 = 2;

/// Ordered migrations; each entry brings the schema to `version`
const MIGRATIONS: &[(i32, &str)] = &[
    (
        1,
        r#"
        -- Category lookup
        CREATE TABLE IF NOT EXISTS categories (
            name TEXT PRIMARY KEY
        );

        -- Catalog products
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category TEXT NOT NULL REFERENCES categories(name) ON UPDATE CASCADE,
            sub_category TEXT,
            designation TEXT NOT NULL,
            dimensions TEXT,
            purchase_price REAL NOT NULL DEFAULT 0,
            supplier_reference TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            datasheet_path TEXT,
            quote_path TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);
        CREATE INDEX IF NOT EXISTS idx_products_active ON products(active);

        -- Key/value settings
        CREATE TABLE IF NOT EXISTS parameters (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        INSERT OR IGNORE INTO parameters (key, value) VALUES ('marge', '20.0');
        INSERT OR IGNORE INTO parameters (key, value) VALUES ('repertoire_donnees', '');
        "#,
    ),
    (
        2,
        r#"
        ALTER TABLE products ADD COLUMN created TEXT NOT NULL DEFAULT '1970-01-01T00:00:00+00:00';
        ALTER TABLE products ADD COLUMN updated TEXT NOT NULL DEFAULT '1970-01-01T00:00:00+00:00';
        CREATE INDEX IF NOT EXISTS idx_products_reference ON products(supplier_reference);
        INSERT OR IGNORE INTO parameters (key, value) VALUES ('seuil_association', '0.7');
        "#,
    ),
];

impl Database {
    /// Bring the schema up to `SCHEMA_VERSION`
    pub(super) fn migrate(&mut self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);",
            )
            .into_diagnostic()?;

        let current = self.schema_version()?;
        if current > SCHEMA_VERSION {
            return Err(miette::miette!(
                "catalog schema version {} is newer than this program supports ({})",
                current,
                SCHEMA_VERSION
            ));
        }

        for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
            let tx = self.conn.transaction().into_diagnostic()?;
            tx.execute_batch(sql).into_diagnostic()?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![version],
            )
            .into_diagnostic()?;
            tx.commit().into_diagnostic()?;
            tracing::debug!("applied catalog migration {}", version);
        }

        Ok(())
    }

    /// Highest applied migration, 0 for a fresh database
    pub fn schema_version(&self) -> Result<i32> {
        self.conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .into_diagnostic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_is_current() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let mut db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.migrate().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_v1_rows_survive_upgrade() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("old.db");
        {
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
                 INSERT INTO schema_version VALUES (1);",
            )
            .unwrap();
            conn.execute_batch(MIGRATIONS[0].1).unwrap();
            conn.execute_batch(
                "INSERT INTO categories VALUES ('Portes');
                 INSERT INTO products (category, designation, purchase_price)
                 VALUES ('Portes', 'Porte ancienne', 100.0);",
            )
            .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
        let product = db.get_product(1).unwrap().unwrap();
        assert_eq!(product.designation, "Porte ancienne");
        assert!(product.active);
    }
}
