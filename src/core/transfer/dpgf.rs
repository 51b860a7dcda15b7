//! Cart export: DPGF price breakdown and the documents that go with it

use miette::{IntoDiagnostic, Result};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{encode, format_price, Encoding};
use crate::core::cart::Cart;
use crate::core::db::DocumentKind;
use crate::core::paths::DataDir;

pub const DPGF_COLUMNS: &[&str] = &[
    "ARTICLE",
    "DESIGNATION",
    "CATEGORIE",
    "SOUS_CATEGORIE",
    "DIMENSIONS",
    "PRIX_ACHAT",
    "PRIX_VENTE",
    "FICHE_TECHNIQUE",
    "DEVIS",
];

/// Write the cart as a DPGF CSV followed by a TOTAL row
pub fn write_dpgf<W: Write>(
    cart: &Cart,
    margin: f64,
    data_dir: &DataDir,
    encoding: Encoding,
    mut out: W,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());

    let absolute = |stored: &Option<String>| -> String {
        stored
            .as_deref()
            .map(|s| data_dir.resolve(s).display().to_string())
            .unwrap_or_default()
    };

    writer.write_record(DPGF_COLUMNS).into_diagnostic()?;
    for line in cart.lines(margin) {
        let item = line.item;
        writer
            .write_record([
                item.supplier_reference.clone().unwrap_or_default(),
                item.designation.clone(),
                item.category.clone(),
                item.sub_category.clone().unwrap_or_default(),
                item.dimensions.clone().unwrap_or_default(),
                format_price(item.purchase_price),
                format_price(line.sale_price),
                absolute(&item.datasheet_path),
                absolute(&item.quote_path),
            ])
            .into_diagnostic()?;
    }

    writer
        .write_record([
            "TOTAL".to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            format_price(cart.total_purchase()),
            format_price(cart.total_sale(margin)),
            String::new(),
            String::new(),
        ])
        .into_diagnostic()?;

    let buffer = writer.into_inner().into_diagnostic()?;
    let text = String::from_utf8(buffer).into_diagnostic()?;
    out.write_all(&encode(&text, encoding)).into_diagnostic()?;
    out.flush().into_diagnostic()?;
    Ok(())
}

/// Outcome of copying the cart's documents
#[derive(Debug, Default)]
pub struct CopyReport {
    pub copied: Vec<PathBuf>,
    /// Product id, document kind and the absolute path that was not found
    pub missing: Vec<(i64, DocumentKind, PathBuf)>,
}

/// Copy every attached document of the cart into `target`
///
/// A document shared by several products is copied once. Different documents
/// with the same file name get a `-2`, `-3`... suffix. Missing files are
/// reported, not fatal.
pub fn copy_documents(cart: &Cart, data_dir: &DataDir, target: &Path) -> Result<CopyReport> {
    std::fs::create_dir_all(target).into_diagnostic()?;

    let mut report = CopyReport::default();
    let mut seen = HashSet::new();
    let mut taken = HashSet::new();

    for item in cart.items() {
        let documents = [
            (DocumentKind::Datasheet, &item.datasheet_path),
            (DocumentKind::Quote, &item.quote_path),
        ];
        for (kind, stored) in documents {
            let Some(stored) = stored.as_deref() else {
                continue;
            };
            let source = data_dir.resolve(stored);
            if !source.is_file() {
                tracing::warn!(
                    "product {}: {} not found at {}",
                    item.product_id,
                    kind.label(),
                    source.display()
                );
                report.missing.push((item.product_id, kind, source));
                continue;
            }
            if !seen.insert(source.clone()) {
                continue;
            }

            let Some(name) = source.file_name() else {
                continue;
            };
            let destination = free_destination(target, Path::new(name), &taken);
            taken.insert(destination.clone());
            std::fs::copy(&source, &destination).map_err(|e| {
                miette::miette!("cannot copy {}: {}", source.display(), e)
            })?;
            tracing::debug!("copied {} to {}", source.display(), destination.display());
            report.copied.push(destination);
        }
    }

    Ok(report)
}

fn free_destination(target: &Path, name: &Path, taken: &HashSet<PathBuf>) -> PathBuf {
    let candidate = target.join(name);
    if !taken.contains(&candidate) {
        return candidate;
    }

    let stem = name.file_stem().unwrap_or_default().to_string_lossy();
    let extension = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (2..)
        .map(|n| target.join(format!("{}-{}{}", stem, n, extension)))
        .find(|path| !taken.contains(path))
        .unwrap_or(candidate)
}
