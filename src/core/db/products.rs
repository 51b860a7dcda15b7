//! Product CRUD and search

use miette::{IntoDiagnostic, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::categories::ensure_category;
use super::{now, row_to_product, Database, DocumentKind, DocumentRef, NewProduct, Product};
use super::{ProductFilter, ProductUpdate, PRODUCT_COLUMNS};
use crate::core::error::CatalogError;

impl Database {
    /// Add a product, registering its category if needed
    pub fn add_product(&mut self, product: &NewProduct) -> Result<i64> {
        let id = insert_product(&self.conn, product)?;
        tracing::info!("added product {} '{}'", id, product.designation);
        Ok(id)
    }

    /// Get a product by id, active or not
    pub fn get_product(&self, id: i64) -> Result<Option<Product>> {
        fetch_product(&self.conn, id)
    }

    /// Get a product by id or fail with `ProductNotFound`
    pub fn require_product(&self, id: i64) -> Result<Product> {
        self.get_product(id)?
            .ok_or_else(|| CatalogError::ProductNotFound(id).into())
    }

    /// Apply a partial update
    pub fn update_product(&mut self, id: i64, update: &ProductUpdate) -> Result<()> {
        apply_update(&self.conn, id, update)?;
        tracing::debug!("updated product {}", id);
        Ok(())
    }

    /// Soft delete: the row stays, default searches skip it
    pub fn deactivate_product(&mut self, id: i64) -> Result<()> {
        self.set_active(id, false)
    }

    /// Undo a soft delete
    pub fn reactivate_product(&mut self, id: i64) -> Result<()> {
        self.set_active(id, true)
    }

    fn set_active(&mut self, id: i64, active: bool) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE products SET active = ?1, updated = ?2 WHERE id = ?3",
                params![active as i64, now(), id],
            )
            .into_diagnostic()?;
        if changed == 0 {
            return Err(CatalogError::ProductNotFound(id).into());
        }
        Ok(())
    }

    /// Hard delete
    pub fn delete_product(&mut self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM products WHERE id = ?1", params![id])
            .into_diagnostic()?;
        if changed == 0 {
            return Err(CatalogError::ProductNotFound(id).into());
        }
        tracing::info!("deleted product {}", id);
        Ok(())
    }

    /// Search products with filters
    pub fn search_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut sql = format!("SELECT {} FROM products WHERE 1=1", PRODUCT_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if !filter.include_inactive {
            sql.push_str(" AND active = 1");
        }

        if let Some(ref category) = filter.category {
            sql.push_str(" AND category = ?");
            params_vec.push(Box::new(category.clone()));
        }

        if let Some(ref sub_category) = filter.sub_category {
            sql.push_str(" AND sub_category = ?");
            params_vec.push(Box::new(sub_category.clone()));
        }

        // Terms are matched after the query: LIKE folds ASCII case only
        let words: Vec<String> = filter
            .term
            .as_deref()
            .map(|term| term.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default();

        sql.push_str(" ORDER BY category, designation, id");

        if words.is_empty() {
            if let Some(limit) = filter.limit {
                sql.push_str(&format!(" LIMIT {}", limit));
            }
        }

        let mut stmt = self.conn.prepare(&sql).into_diagnostic()?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), row_to_product)
            .into_diagnostic()?;

        let mut products = Vec::new();
        for row in rows {
            if filter.limit.is_some_and(|limit| products.len() >= limit) {
                break;
            }
            let product = row.into_diagnostic()?;
            if matches_words(&product, &words) {
                products.push(product);
            }
        }
        Ok(products)
    }

    /// Count products
    pub fn count_products(&self, include_inactive: bool) -> Result<usize> {
        let sql = if include_inactive {
            "SELECT COUNT(*) FROM products"
        } else {
            "SELECT COUNT(*) FROM products WHERE active = 1"
        };
        let count: i64 = self
            .conn
            .query_row(sql, [], |row| row.get(0))
            .into_diagnostic()?;
        Ok(count as usize)
    }

    /// Every stored document path, for broken-link checks
    pub fn document_references(&self) -> Result<Vec<DocumentRef>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, datasheet_path, quote_path FROM products ORDER BY id")
            .into_diagnostic()?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .into_diagnostic()?;

        let mut refs = Vec::new();
        for row in rows {
            let (product_id, datasheet, quote) = row.into_diagnostic()?;
            if let Some(path) = datasheet {
                refs.push(DocumentRef {
                    product_id,
                    kind: DocumentKind::Datasheet,
                    path,
                });
            }
            if let Some(path) = quote {
                refs.push(DocumentRef {
                    product_id,
                    kind: DocumentKind::Quote,
                    path,
                });
            }
        }
        Ok(refs)
    }
}

/// Every lowercased word appears in the designation, reference or dimensions
fn matches_words(product: &Product, words: &[String]) -> bool {
    if words.is_empty() {
        return true;
    }
    let haystack = [
        Some(product.designation.as_str()),
        product.supplier_reference.as_deref(),
        product.dimensions.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::to_lowercase)
    .collect::<Vec<_>>();

    words
        .iter()
        .all(|word| haystack.iter().any(|field| field.contains(word.as_str())))
}

/// Trim and turn empty strings into `None`
fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn validate_designation(designation: &str) -> Result<String> {
    let trimmed = designation.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::InvalidProduct("designation is empty".into()).into());
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: f64) -> Result<f64> {
    if !price.is_finite() || price < 0.0 {
        return Err(CatalogError::InvalidPrice(price.to_string()).into());
    }
    Ok(price)
}

pub(super) fn insert_product(conn: &Connection, product: &NewProduct) -> Result<i64> {
    let designation = validate_designation(&product.designation)?;
    let price = validate_price(product.purchase_price)?;
    let category = ensure_category(conn, &product.category)?;
    let timestamp = now();

    conn.execute(
        r#"INSERT INTO products (category, sub_category, designation, dimensions,
               purchase_price, supplier_reference, active, datasheet_path, quote_path,
               created, updated)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)"#,
        params![
            category,
            clean(&product.sub_category),
            designation,
            clean(&product.dimensions),
            price,
            clean(&product.supplier_reference),
            product.active as i64,
            clean(&product.datasheet_path),
            clean(&product.quote_path),
            timestamp,
        ],
    )
    .into_diagnostic()?;

    Ok(conn.last_insert_rowid())
}

pub(super) fn fetch_product(conn: &Connection, id: i64) -> Result<Option<Product>> {
    conn.query_row(
        &format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS),
        params![id],
        row_to_product,
    )
    .optional()
    .into_diagnostic()
}

pub(super) fn apply_update(conn: &Connection, id: i64, update: &ProductUpdate) -> Result<()> {
    if fetch_product(conn, id)?.is_none() {
        return Err(CatalogError::ProductNotFound(id).into());
    }

    let mut sets: Vec<&'static str> = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![];

    let designation = update
        .designation
        .as_deref()
        .map(validate_designation)
        .transpose()?;
    let price = update.purchase_price.map(validate_price).transpose()?;

    if let Some(ref category) = update.category {
        let category = ensure_category(conn, category)?;
        sets.push("category = ?");
        params_vec.push(Box::new(category));
    }
    if let Some(ref sub_category) = update.sub_category {
        sets.push("sub_category = ?");
        params_vec.push(Box::new(clean(sub_category)));
    }
    if let Some(designation) = designation {
        sets.push("designation = ?");
        params_vec.push(Box::new(designation));
    }
    if let Some(ref dimensions) = update.dimensions {
        sets.push("dimensions = ?");
        params_vec.push(Box::new(clean(dimensions)));
    }
    if let Some(price) = price {
        sets.push("purchase_price = ?");
        params_vec.push(Box::new(price));
    }
    if let Some(ref reference) = update.supplier_reference {
        sets.push("supplier_reference = ?");
        params_vec.push(Box::new(clean(reference)));
    }
    if let Some(active) = update.active {
        sets.push("active = ?");
        params_vec.push(Box::new(active as i64));
    }
    if let Some(ref path) = update.datasheet_path {
        sets.push("datasheet_path = ?");
        params_vec.push(Box::new(clean(path)));
    }
    if let Some(ref path) = update.quote_path {
        sets.push("quote_path = ?");
        params_vec.push(Box::new(clean(path)));
    }

    if sets.is_empty() {
        return Ok(());
    }

    sets.push("updated = ?");
    params_vec.push(Box::new(now()));
    params_vec.push(Box::new(id));

    let sql = format!("UPDATE products SET {} WHERE id = ?", sets.join(", "));
    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    conn.execute(&sql, params_refs.as_slice()).into_diagnostic()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn door() -> NewProduct {
        NewProduct {
            sub_category: Some("EI30".into()),
            dimensions: Some("2040x930".into()),
            supplier_reference: Some("BP-EI30-93".into()),
            datasheet_path: Some("documents/fiches/bp-ei30.pdf".into()),
            quote_path: Some("documents/devis/D-2024-017.pdf".into()),
            ..NewProduct::new("Portes", "Bloc-porte coupe-feu EI30 1 vantail", 412.5)
        }
    }

    #[test]
    fn test_add_then_get_returns_same_fields() {
        let mut db = Database::open_in_memory().unwrap();
        let input = door();
        let id = db.add_product(&input).unwrap();

        let product = db.get_product(id).unwrap().unwrap();
        assert_eq!(product.id, id);
        assert_eq!(product.category, input.category);
        assert_eq!(product.sub_category, input.sub_category);
        assert_eq!(product.designation, input.designation);
        assert_eq!(product.dimensions, input.dimensions);
        assert_eq!(product.purchase_price, input.purchase_price);
        assert_eq!(product.supplier_reference, input.supplier_reference);
        assert!(product.active);
        assert_eq!(product.datasheet_path, input.datasheet_path);
        assert_eq!(product.quote_path, input.quote_path);
    }

    #[test]
    fn test_get_unknown_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_product(42).unwrap().is_none());
        assert!(db.require_product(42).is_err());
    }

    #[test]
    fn test_empty_optional_fields_are_stored_as_null() {
        let mut db = Database::open_in_memory().unwrap();
        let id = db
            .add_product(&NewProduct {
                sub_category: Some("   ".into()),
                ..NewProduct::new("Portes", "  Porte  ", 1.0)
            })
            .unwrap();
        let product = db.get_product(id).unwrap().unwrap();
        assert_eq!(product.sub_category, None);
        assert_eq!(product.designation, "Porte");
    }

    #[test]
    fn test_rejects_invalid_products() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(db.add_product(&NewProduct::new("Portes", "", 1.0)).is_err());
        assert!(db.add_product(&NewProduct::new("Portes", "X", -1.0)).is_err());
        assert!(db.add_product(&NewProduct::new("Portes", "X", f64::NAN)).is_err());
        assert!(db.add_product(&NewProduct::new("", "X", 1.0)).is_err());
        assert_eq!(db.count_products(true).unwrap(), 0);
    }

    #[test]
    fn test_soft_delete_excludes_from_default_search() {
        let mut db = Database::open_in_memory().unwrap();
        let id = db.add_product(&door()).unwrap();
        db.add_product(&NewProduct::new("Portes", "Bloc-porte EI60", 520.0))
            .unwrap();

        db.deactivate_product(id).unwrap();

        let visible = db.search_products(&ProductFilter::default()).unwrap();
        assert_eq!(visible.len(), 1);
        assert!(visible.iter().all(|p| p.id != id));

        let kept = db.get_product(id).unwrap().unwrap();
        assert!(!kept.active);

        let all = db
            .search_products(&ProductFilter::default().include_inactive())
            .unwrap();
        assert_eq!(all.len(), 2);

        db.reactivate_product(id).unwrap();
        assert_eq!(db.count_products(false).unwrap(), 2);
    }

    #[test]
    fn test_ids_are_not_reused_after_hard_delete() {
        let mut db = Database::open_in_memory().unwrap();
        let first = db.add_product(&door()).unwrap();
        db.delete_product(first).unwrap();
        assert!(db.get_product(first).unwrap().is_none());

        let second = db.add_product(&door()).unwrap();
        assert!(second > first);
        assert!(db.delete_product(first).is_err());
    }

    #[test]
    fn test_search_by_category_and_term() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_product(&door()).unwrap();
        db.add_product(&NewProduct::new("Portes", "Bloc-porte EI60 2 vantaux", 890.0))
            .unwrap();
        db.add_product(&NewProduct {
            supplier_reference: Some("FP-200".into()),
            ..NewProduct::new("Quincaillerie", "Ferme-porte à bras", 85.0)
        })
        .unwrap();

        let doors = db
            .search_products(&ProductFilter::default().category("Portes"))
            .unwrap();
        assert_eq!(doors.len(), 2);

        let ei60 = db
            .search_products(&ProductFilter::default().term("bloc ei60"))
            .unwrap();
        assert_eq!(ei60.len(), 1);
        assert_eq!(ei60[0].designation, "Bloc-porte EI60 2 vantaux");

        let by_reference = db
            .search_products(&ProductFilter::default().term("fp-200"))
            .unwrap();
        assert_eq!(by_reference.len(), 1);

        let none = db
            .search_products(&ProductFilter::default().category("Quincaillerie").term("EI30"))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_product(&NewProduct::new("Portes", "Remise 10% incluse", 1.0))
            .unwrap();
        db.add_product(&NewProduct::new("Portes", "Porte 100 cm", 1.0))
            .unwrap();

        let hits = db
            .search_products(&ProductFilter::default().term("10%"))
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_search_folds_accented_capitals() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_product(&NewProduct::new("Quincaillerie", "BÉQUILLE DOUBLE", 19.0))
            .unwrap();
        db.add_product(&NewProduct::new("Menuiseries", "PORTE-FENÊTRE 2 VANTAUX", 640.0))
            .unwrap();

        let hits = db
            .search_products(&ProductFilter::default().term("béquille"))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].designation, "BÉQUILLE DOUBLE");

        let hits = db
            .search_products(&ProductFilter::default().term("porte-fenêtre vantaux"))
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_search_limit_applies_after_term() {
        let mut db = Database::open_in_memory().unwrap();
        for name in ["Charnière", "Béquille inox", "Cylindre", "Béquille laiton"] {
            db.add_product(&NewProduct::new("Quincaillerie", name, 1.0))
                .unwrap();
        }
        let filter = ProductFilter {
            limit: Some(1),
            ..ProductFilter::default().term("BÉQUILLE")
        };
        let hits = db.search_products(&filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].designation, "Béquille inox");
    }

    #[test]
    fn test_failed_update_leaves_no_category() {
        let mut db = Database::open_in_memory().unwrap();
        let id = db.add_product(&door()).unwrap();

        let update = ProductUpdate {
            category: Some("Fantôme".into()),
            purchase_price: Some(-3.0),
            ..Default::default()
        };
        assert!(db.update_product(id, &update).is_err());
        assert!(db
            .list_categories()
            .unwrap()
            .iter()
            .all(|c| c.name != "Fantôme"));
        assert_eq!(db.get_product(id).unwrap().unwrap().category, "Portes");
    }

    #[test]
    fn test_search_limit_and_order() {
        let mut db = Database::open_in_memory().unwrap();
        for name in ["Charnière", "Béquille", "Cylindre"] {
            db.add_product(&NewProduct::new("Quincaillerie", name, 1.0))
                .unwrap();
        }
        let filter = ProductFilter {
            limit: Some(2),
            ..Default::default()
        };
        let hits = db.search_products(&filter).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].designation, "Béquille");
    }

    #[test]
    fn test_partial_update() {
        let mut db = Database::open_in_memory().unwrap();
        let id = db.add_product(&door()).unwrap();

        let update = ProductUpdate {
            purchase_price: Some(450.0),
            dimensions: Some(None),
            category: Some("Portes techniques".into()),
            ..Default::default()
        };
        db.update_product(id, &update).unwrap();

        let product = db.get_product(id).unwrap().unwrap();
        assert_eq!(product.purchase_price, 450.0);
        assert_eq!(product.dimensions, None);
        assert_eq!(product.category, "Portes techniques");
        assert_eq!(product.supplier_reference.as_deref(), Some("BP-EI30-93"));
        assert!(product.updated >= product.created);

        assert!(db.update_product(999, &update).is_err());
    }

    #[test]
    fn test_document_references() {
        let mut db = Database::open_in_memory().unwrap();
        let id = db.add_product(&door()).unwrap();
        db.add_product(&NewProduct::new("Portes", "Sans document", 1.0))
            .unwrap();

        let refs = db.document_references().unwrap();
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.product_id == id));
        assert!(refs.iter().any(|r| r.kind == DocumentKind::Quote));
    }
}
