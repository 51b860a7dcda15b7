//! Automatic PDF-to-product association
//!
//! Every PDF under a directory is turned into text and scored against the
//! designation of each active product. Every product at or above the
//! threshold gets the PDF attached; there is no ranking between candidates.
//! PDFs are visited in path order and a product keeps the first one it gets
//! during a run, even with `overwrite`.

use miette::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::db::{Database, DocumentKind, ProductFilter, ProductUpdate};
use crate::core::extract::TextExtractor;
use crate::core::matching::DocumentWords;
use crate::core::paths::DataDir;

#[derive(Debug, Clone)]
pub struct AssociationOptions {
    /// Minimum overlap score, between 0 and 1
    pub threshold: f64,
    /// Replace paths products already have
    pub overwrite: bool,
    pub dry_run: bool,
}

/// One product getting one document
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub product_id: i64,
    pub designation: String,
    pub document: String,
    pub score: f64,
}

#[derive(Debug, Default, Serialize)]
pub struct AssociationReport {
    pub scanned: usize,
    pub assigned: Vec<Assignment>,
    /// Matches left alone because the product already had a path
    pub kept_existing: usize,
    /// PDFs that matched no product
    pub unmatched: Vec<String>,
    /// PDFs whose text could not be read
    pub unreadable: Vec<PathBuf>,
}

/// Scan `dir` for PDFs and attach them to matching products
pub fn associate(
    db: &mut Database,
    data_dir: &DataDir,
    dir: &Path,
    kind: DocumentKind,
    extractor: &dyn TextExtractor,
    options: &AssociationOptions,
) -> Result<AssociationReport> {
    let products = db.search_products(&ProductFilter::default())?;
    let mut report = AssociationReport::default();
    // Products given a document earlier in this run
    let mut attached: HashSet<i64> = HashSet::new();

    for pdf in find_pdfs(dir) {
        report.scanned += 1;

        let stored = match data_dir.to_relative(&pdf) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("skipping {}: {}", pdf.display(), e);
                report.unreadable.push(pdf);
                continue;
            }
        };

        let text = match extractor.extract(&pdf) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("cannot read {}: {}", pdf.display(), e);
                report.unreadable.push(pdf);
                continue;
            }
        };
        let words = DocumentWords::new(&text);
        if words.is_empty() {
            tracing::warn!("no text in {}", pdf.display());
            report.unreadable.push(pdf);
            continue;
        }

        let mut matched = false;
        for product in &products {
            let score = words.score(&product.designation);
            if score < options.threshold {
                continue;
            }
            matched = true;

            let keep = attached.contains(&product.id)
                || (product.document(kind).is_some() && !options.overwrite);
            if keep {
                tracing::debug!(
                    "product {} already has a {}, keeping it",
                    product.id,
                    kind.label()
                );
                report.kept_existing += 1;
                continue;
            }

            if !options.dry_run {
                let update = ProductUpdate::default().with_document(kind, Some(stored.clone()));
                db.update_product(product.id, &update)?;
            }
            attached.insert(product.id);
            report.assigned.push(Assignment {
                product_id: product.id,
                designation: product.designation.clone(),
                document: stored.clone(),
                score,
            });
        }

        if !matched {
            report.unmatched.push(stored);
        }
    }

    tracing::info!(
        "association: {} PDF(s) scanned, {} assignment(s){}",
        report.scanned,
        report.assigned.len(),
        if options.dry_run { " (dry run)" } else { "" }
    );
    Ok(report)
}

fn find_pdfs(dir: &Path) -> Vec<PathBuf> {
    let mut pdfs: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!("cannot walk {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .map(|e| e.into_path())
        .collect();
    pdfs.sort();
    pdfs
}
