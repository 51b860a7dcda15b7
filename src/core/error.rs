//! Domain errors for catalog operations

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that callers are expected to match on or show to the user
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("product {0} not found")]
    #[diagnostic(
        code(chiffrage::product::not_found),
        help("use `chiffrage product list --all` to see inactive products too")
    )]
    ProductNotFound(i64),

    #[error("invalid product: {0}")]
    #[diagnostic(code(chiffrage::product::invalid))]
    InvalidProduct(String),

    #[error("invalid price '{0}'")]
    #[diagnostic(
        code(chiffrage::product::price),
        help("prices are written like 1234.50, 1234,50 or 1 234,50 €")
    )]
    InvalidPrice(String),

    #[error("category '{0}' not found")]
    #[diagnostic(code(chiffrage::category::not_found))]
    CategoryNotFound(String),

    #[error("category '{name}' is used by {count} product(s)")]
    #[diagnostic(
        code(chiffrage::category::in_use),
        help("move or delete those products first, or rename the category")
    )]
    CategoryInUse { name: String, count: usize },

    #[error("category '{0}' already exists")]
    #[diagnostic(code(chiffrage::category::exists))]
    CategoryExists(String),

    #[error("invalid category name")]
    #[diagnostic(code(chiffrage::category::invalid))]
    InvalidCategory,

    #[error("invalid value '{value}' for parameter '{key}': {reason}")]
    #[diagnostic(code(chiffrage::parameter::invalid))]
    InvalidParameter {
        key: String,
        value: String,
        reason: String,
    },

    #[error("CSV header is missing required column(s): {}", .0.join(", "))]
    #[diagnostic(
        code(chiffrage::csv::columns),
        help("the header row must contain CATEGORIE, DESIGNATION and PRIX_ACHAT; columns are separated by ';'")
    )]
    MissingColumns(Vec<String>),

    #[error("row {row}: {message}")]
    #[diagnostic(code(chiffrage::csv::row))]
    InvalidRow { row: usize, message: String },

    #[error("{path:?} is outside the data directory {data_dir:?}")]
    #[diagnostic(
        code(chiffrage::paths::outside),
        help("documents must live under the data directory (parameter `repertoire_donnees`)")
    )]
    OutsideDataDir { path: PathBuf, data_dir: PathBuf },

    #[error("not a catalog (searched from {searched_from:?}). Run 'chiffrage init' to create one.")]
    #[diagnostic(code(chiffrage::workspace::not_found))]
    WorkspaceNotFound { searched_from: PathBuf },

    #[error("catalog already exists at {0:?}")]
    #[diagnostic(code(chiffrage::workspace::exists))]
    WorkspaceExists(PathBuf),
}
