//! Category lookup table

use miette::{IntoDiagnostic, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::{Category, Database};
use crate::core::error::CatalogError;

impl Database {
    /// List categories with their product counts (all products, active or not)
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"SELECT c.name, COUNT(p.id)
                   FROM categories c
                   LEFT JOIN products p ON p.category = c.name
                   GROUP BY c.name
                   ORDER BY c.name"#,
            )
            .into_diagnostic()?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Category {
                    name: row.get(0)?,
                    product_count: row.get::<_, i64>(1)? as usize,
                })
            })
            .into_diagnostic()?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }

    /// Register a new category
    pub fn add_category(&mut self, name: &str) -> Result<()> {
        let name = validate_name(name)?;
        if category_exists(&self.conn, &name)? {
            return Err(CatalogError::CategoryExists(name).into());
        }
        ensure_category(&self.conn, &name)?;
        Ok(())
    }

    /// Rename a category; products follow through `ON UPDATE CASCADE`
    pub fn rename_category(&mut self, old: &str, new: &str) -> Result<()> {
        let new = validate_name(new)?;
        if !category_exists(&self.conn, old)? {
            return Err(CatalogError::CategoryNotFound(old.to_string()).into());
        }
        if old == new {
            return Ok(());
        }
        if category_exists(&self.conn, &new)? {
            return Err(CatalogError::CategoryExists(new).into());
        }

        self.conn
            .execute(
                "UPDATE categories SET name = ?1 WHERE name = ?2",
                params![new, old],
            )
            .into_diagnostic()?;
        tracing::info!("renamed category '{}' to '{}'", old, new);
        Ok(())
    }

    /// Remove an unused category
    pub fn remove_category(&mut self, name: &str) -> Result<()> {
        if !category_exists(&self.conn, name)? {
            return Err(CatalogError::CategoryNotFound(name.to_string()).into());
        }

        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM products WHERE category = ?1",
                params![name],
                |row| row.get(0),
            )
            .into_diagnostic()?;
        if count > 0 {
            return Err(CatalogError::CategoryInUse {
                name: name.to_string(),
                count: count as usize,
            }
            .into());
        }

        self.conn
            .execute("DELETE FROM categories WHERE name = ?1", params![name])
            .into_diagnostic()?;
        Ok(())
    }

    /// Distinct sub-categories used within a category
    pub fn sub_categories(&self, category: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"SELECT DISTINCT sub_category FROM products
                   WHERE category = ?1 AND sub_category IS NOT NULL
                   ORDER BY sub_category"#,
            )
            .into_diagnostic()?;
        let rows = stmt
            .query_map(params![category], |row| row.get(0))
            .into_diagnostic()?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::InvalidCategory.into());
    }
    Ok(trimmed.to_string())
}

fn category_exists(conn: &Connection, name: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM categories WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()
        .into_diagnostic()?;
    Ok(found.is_some())
}

/// Insert the category if missing; returns the trimmed name
pub(super) fn ensure_category(conn: &Connection, name: &str) -> Result<String> {
    let name = validate_name(name)?;
    conn.execute(
        "INSERT OR IGNORE INTO categories (name) VALUES (?1)",
        params![name],
    )
    .into_diagnostic()?;
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::{NewProduct, ProductFilter};

    #[test]
    fn test_add_and_list() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_category("Portes").unwrap();
        db.add_category("Cloisons").unwrap();
        db.add_product(&NewProduct::new("Portes", "Bloc-porte", 1.0))
            .unwrap();

        let categories = db.list_categories().unwrap();
        assert_eq!(
            categories,
            vec![
                Category {
                    name: "Cloisons".into(),
                    product_count: 0
                },
                Category {
                    name: "Portes".into(),
                    product_count: 1
                },
            ]
        );

        assert!(db.add_category("Portes").is_err());
        assert!(db.add_category("  ").is_err());
    }

    #[test]
    fn test_rename_moves_products() {
        let mut db = Database::open_in_memory().unwrap();
        let id = db
            .add_product(&NewProduct::new("Portes", "Bloc-porte", 1.0))
            .unwrap();

        db.rename_category("Portes", "Blocs-portes").unwrap();

        assert_eq!(db.get_product(id).unwrap().unwrap().category, "Blocs-portes");
        let found = db
            .search_products(&ProductFilter::default().category("Blocs-portes"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(db.rename_category("Portes", "X").is_err());
    }

    #[test]
    fn test_rename_onto_existing_fails() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_category("A").unwrap();
        db.add_category("B").unwrap();
        assert!(db.rename_category("A", "B").is_err());
    }

    #[test]
    fn test_remove_refused_while_used() {
        let mut db = Database::open_in_memory().unwrap();
        let id = db
            .add_product(&NewProduct::new("Portes", "Bloc-porte", 1.0))
            .unwrap();

        let err = db.remove_category("Portes").unwrap_err();
        assert!(err.to_string().contains("used by 1 product"));

        db.delete_product(id).unwrap();
        db.remove_category("Portes").unwrap();
        assert!(db.list_categories().unwrap().is_empty());
        assert!(db.remove_category("Portes").is_err());
    }

    #[test]
    fn test_sub_categories() {
        let mut db = Database::open_in_memory().unwrap();
        for sub in ["EI60", "EI30", "EI30"] {
            db.add_product(&NewProduct {
                sub_category: Some(sub.into()),
                ..NewProduct::new("Portes", "Bloc-porte", 1.0)
            })
            .unwrap();
        }
        assert_eq!(db.sub_categories("Portes").unwrap(), vec!["EI30", "EI60"]);
    }
}
