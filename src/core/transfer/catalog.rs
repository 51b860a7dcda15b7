//! Catalog CSV: the whole product table, one row per product

use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use super::{decode, encode, format_price, parse_price, Encoding};
use crate::core::db::{ImportRecord, NewProduct, Product};
use crate::core::error::CatalogError;
use crate::core::matching::fold_accents;
use crate::core::paths::DataDir;

/// Export column order
pub const CATALOG_COLUMNS: &[&str] = &[
    "ID",
    "CATEGORIE",
    "SOUS_CATEGORIE",
    "ARTICLE",
    "DESIGNATION",
    "DIMENSIONS",
    "PRIX_ACHAT",
    "FICHE_TECHNIQUE",
    "DEVIS",
    "ACTIF",
];

pub const REQUIRED_COLUMNS: &[&str] = &["CATEGORIE", "DESIGNATION", "PRIX_ACHAT"];

/// Header spellings seen in hand-made spreadsheets
const ALIASES: &[(&str, &str)] = &[
    ("REFERENCE", "ARTICLE"),
    ("REF", "ARTICLE"),
    ("SOUS_CAT", "SOUS_CATEGORIE"),
    ("PRIX", "PRIX_ACHAT"),
    ("FICHE", "FICHE_TECHNIQUE"),
    ("FT", "FICHE_TECHNIQUE"),
];

/// Result of parsing a catalog file
#[derive(Debug)]
pub struct ParsedCatalog {
    pub encoding: Encoding,
    /// Header names that were not recognised and are ignored
    pub ignored_columns: Vec<String>,
    pub rows: Vec<std::result::Result<ImportRecord, CatalogError>>,
}

/// Read and parse a catalog file from disk
pub fn read_catalog(path: &Path, data_dir: &DataDir) -> Result<ParsedCatalog> {
    let bytes = std::fs::read(path)
        .map_err(|e| miette::miette!("cannot read {}: {}", path.display(), e))?;
    parse_catalog(&bytes, data_dir)
}

/// Parse catalog CSV contents
///
/// Fails only when the header is unusable. Individual bad rows come back as
/// `Err` entries so the import can decide whether to skip them.
pub fn parse_catalog(bytes: &[u8], data_dir: &DataDir) -> Result<ParsedCatalog> {
    let (text, encoding) = decode(bytes);
    tracing::debug!("catalog file decoded as {}", encoding);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers().into_diagnostic()?.clone();
    let mut columns: HashMap<&'static str, usize> = HashMap::new();
    let mut ignored_columns = Vec::new();
    for (index, raw) in headers.iter().enumerate() {
        match canonical_column(raw) {
            Some(name) => {
                columns.entry(name).or_insert(index);
            }
            None if raw.trim().is_empty() => {}
            None => ignored_columns.push(raw.trim().to_string()),
        }
    }

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !columns.contains_key(*c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CatalogError::MissingColumns(missing).into());
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let fallback_line = index + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                rows.push(Err(CatalogError::InvalidRow {
                    row: fallback_line,
                    message: e.to_string(),
                }));
                continue;
            }
        };
        let row = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_line);

        // Blank lines Excel leaves at the end of a sheet
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let field = |name: &str| -> Option<String> {
            columns
                .get(name)
                .and_then(|&i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        rows.push(
            parse_row(&field, data_dir).map_err(|message| CatalogError::InvalidRow { row, message }),
        );
        if let Some(Ok(record)) = rows.last_mut() {
            record.row = row;
        }
    }

    Ok(ParsedCatalog {
        encoding,
        ignored_columns,
        rows,
    })
}

fn parse_row(
    field: &dyn Fn(&str) -> Option<String>,
    data_dir: &DataDir,
) -> std::result::Result<ImportRecord, String> {
    let id = match field("ID") {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| format!("invalid ID '{}'", raw))?,
        ),
        None => None,
    };

    let category = field("CATEGORIE").ok_or("missing CATEGORIE")?;
    let designation = field("DESIGNATION").ok_or("missing DESIGNATION")?;
    let purchase_price = match field("PRIX_ACHAT") {
        Some(raw) => parse_price(&raw).ok_or_else(|| format!("invalid price '{}'", raw))?,
        None => 0.0,
    };
    let active = match field("ACTIF") {
        Some(raw) => parse_active(&raw).ok_or_else(|| format!("invalid ACTIF value '{}'", raw))?,
        None => true,
    };

    let document = |name: &str| -> std::result::Result<Option<String>, String> {
        field(name)
            .map(|raw| stored_path(&raw, data_dir))
            .transpose()
    };

    Ok(ImportRecord {
        row: 0,
        id,
        product: NewProduct {
            category,
            sub_category: field("SOUS_CATEGORIE"),
            designation,
            dimensions: field("DIMENSIONS"),
            purchase_price,
            supplier_reference: field("ARTICLE"),
            active,
            datasheet_path: document("FICHE_TECHNIQUE")?,
            quote_path: document("DEVIS")?,
        },
    })
}

/// Store a path relative to the data directory with `/` separators
///
/// Relative values are taken from the data directory, so `..` may not climb
/// out of it.
fn stored_path(raw: &str, data_dir: &DataDir) -> std::result::Result<String, String> {
    let absolute = if Path::new(raw).is_absolute() {
        Path::new(raw).to_path_buf()
    } else {
        data_dir.resolve(raw)
    };
    data_dir.to_relative(&absolute).map_err(|e| e.to_string())
}

/// Parse an ACTIF cell; empty means active
pub fn parse_active(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "" | "1" | "oui" | "o" | "true" | "vrai" | "x" | "yes" => Some(true),
        "0" | "non" | "n" | "false" | "faux" | "no" => Some(false),
        _ => None,
    }
}

fn canonical_column(raw: &str) -> Option<&'static str> {
    let normalized: String = fold_accents(raw.trim())
        .to_uppercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();

    CATALOG_COLUMNS
        .iter()
        .find(|c| **c == normalized)
        .copied()
        .or_else(|| {
            ALIASES
                .iter()
                .find(|(alias, _)| *alias == normalized)
                .map(|(_, column)| *column)
        })
}

/// Write products as a catalog CSV that `parse_catalog` reads back
pub fn write_catalog<W: Write>(
    products: &[Product],
    encoding: Encoding,
    mut out: W,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());

    writer.write_record(CATALOG_COLUMNS).into_diagnostic()?;
    for p in products {
        writer
            .write_record([
                p.id.to_string(),
                p.category.clone(),
                p.sub_category.clone().unwrap_or_default(),
                p.supplier_reference.clone().unwrap_or_default(),
                p.designation.clone(),
                p.dimensions.clone().unwrap_or_default(),
                format_price(p.purchase_price),
                p.datasheet_path.clone().unwrap_or_default(),
                p.quote_path.clone().unwrap_or_default(),
                if p.active { "1" } else { "0" }.to_string(),
            ])
            .into_diagnostic()?;
    }

    let buffer = writer.into_inner().into_diagnostic()?;
    let text = String::from_utf8(buffer).into_diagnostic()?;
    out.write_all(&encode(&text, encoding)).into_diagnostic()?;
    out.flush().into_diagnostic()?;
    Ok(())
}
