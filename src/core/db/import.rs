//! Bulk product import
//!
//! A straight iterate-and-insert loop inside one transaction. The caller's
//! progress callback runs synchronously inside the loop.

use miette::{IntoDiagnostic, Result};

use super::products::{apply_update, fetch_product, insert_product};
use super::{Database, NewProduct, ProductUpdate};
use crate::core::error::CatalogError;

/// Rows between two progress callbacks
pub const PROGRESS_INTERVAL: usize = 50;

/// One parsed CSV row
#[derive(Debug, Clone)]
pub struct ImportRecord {
    /// 1-based line number in the source file (header is line 1)
    pub row: usize,
    /// Existing product id, when the file carries an ID column
    pub id: Option<i64>,
    pub product: NewProduct,
}

/// Import behaviour switches
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Delete every product before importing
    pub replace: bool,
    /// Rows whose ID matches an existing product update it
    pub update: bool,
    /// Validate and count, then roll back
    pub dry_run: bool,
    /// Skip bad rows instead of aborting the whole import
    pub skip_errors: bool,
}

/// Progress snapshot passed to the callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportProgress {
    pub processed: usize,
    pub total: usize,
}

/// Import statistics
#[derive(Debug, Default)]
pub struct ImportStats {
    pub rows_processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub removed: usize,
    /// One message per skipped row
    pub errors: Vec<String>,
}

impl Database {
    /// Import parsed rows in a single transaction
    ///
    /// Rows that failed parsing arrive as `Err` and are handled like rows that
    /// fail validation: skipped and logged with `skip_errors`, fatal without.
    pub fn import_products(
        &mut self,
        rows: Vec<std::result::Result<ImportRecord, CatalogError>>,
        options: &ImportOptions,
        progress: &mut dyn FnMut(ImportProgress),
    ) -> Result<ImportStats> {
        let total = rows.len();
        let mut stats = ImportStats::default();
        let tx = self.conn.transaction().into_diagnostic()?;

        if options.replace {
            stats.removed = tx.execute("DELETE FROM products", []).into_diagnostic()?;
        }

        for (index, row) in rows.into_iter().enumerate() {
            stats.rows_processed += 1;

            let outcome = row.map_err(miette::Report::from).and_then(|record| {
                let row_num = record.row;
                import_one(&tx, record, options).map_err(|e| {
                    CatalogError::InvalidRow {
                        row: row_num,
                        message: e.to_string(),
                    }
                    .into()
                })
            });

            match outcome {
                Ok(Outcome::Created) => stats.created += 1,
                Ok(Outcome::Updated) => stats.updated += 1,
                Err(e) => {
                    if !options.skip_errors {
                        // Dropping the transaction rolls everything back
                        return Err(e);
                    }
                    tracing::warn!("skipped: {}", e);
                    stats.skipped += 1;
                    stats.errors.push(e.to_string());
                }
            }

            let processed = index + 1;
            if processed % PROGRESS_INTERVAL == 0 || processed == total {
                progress(ImportProgress { processed, total });
            }
        }

        if options.dry_run {
            tx.rollback().into_diagnostic()?;
        } else {
            tx.commit().into_diagnostic()?;
        }

        tracing::info!(
            "import: {} row(s), {} created, {} updated, {} skipped{}",
            stats.rows_processed,
            stats.created,
            stats.updated,
            stats.skipped,
            if options.dry_run { " (dry run)" } else { "" }
        );
        Ok(stats)
    }
}

enum Outcome {
    Created,
    Updated,
}

fn import_one(
    conn: &rusqlite::Connection,
    record: ImportRecord,
    options: &ImportOptions,
) -> Result<Outcome> {
    if options.update {
        if let Some(id) = record.id {
            if fetch_product(conn, id)?.is_some() {
                let p = record.product;
                let update = ProductUpdate {
                    category: Some(p.category),
                    sub_category: Some(p.sub_category),
                    designation: Some(p.designation),
                    dimensions: Some(p.dimensions),
                    purchase_price: Some(p.purchase_price),
                    supplier_reference: Some(p.supplier_reference),
                    active: Some(p.active),
                    datasheet_path: Some(p.datasheet_path),
                    quote_path: Some(p.quote_path),
                };
                apply_update(conn, id, &update)?;
                return Ok(Outcome::Updated);
            }
        }
    }

    insert_product(conn, &record.product)?;
    Ok(Outcome::Created)
}
