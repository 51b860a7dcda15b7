//! Catalog row types and query descriptors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub category: String,
    pub sub_category: Option<String>,
    pub designation: String,
    pub dimensions: Option<String>,
    pub purchase_price: f64,
    pub supplier_reference: Option<String>,
    pub active: bool,
    /// Technical data sheet, relative to the data directory
    pub datasheet_path: Option<String>,
    /// Supplier quote, relative to the data directory
    pub quote_path: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Product {
    /// Stored path for the given kind of document
    pub fn document(&self, kind: DocumentKind) -> Option<&str> {
        match kind {
            DocumentKind::Datasheet => self.datasheet_path.as_deref(),
            DocumentKind::Quote => self.quote_path.as_deref(),
        }
    }
}

/// Fields for a product that does not exist yet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProduct {
    pub category: String,
    pub sub_category: Option<String>,
    pub designation: String,
    pub dimensions: Option<String>,
    pub purchase_price: f64,
    pub supplier_reference: Option<String>,
    pub active: bool,
    pub datasheet_path: Option<String>,
    pub quote_path: Option<String>,
}

impl NewProduct {
    pub fn new(category: impl Into<String>, designation: impl Into<String>, price: f64) -> Self {
        Self {
            category: category.into(),
            designation: designation.into(),
            purchase_price: price,
            active: true,
            ..Default::default()
        }
    }
}

/// Partial update; `None` leaves a field untouched, `Some(None)` clears it
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub category: Option<String>,
    pub sub_category: Option<Option<String>>,
    pub designation: Option<String>,
    pub dimensions: Option<Option<String>>,
    pub purchase_price: Option<f64>,
    pub supplier_reference: Option<Option<String>>,
    pub active: Option<bool>,
    pub datasheet_path: Option<Option<String>>,
    pub quote_path: Option<Option<String>>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.sub_category.is_none()
            && self.designation.is_none()
            && self.dimensions.is_none()
            && self.purchase_price.is_none()
            && self.supplier_reference.is_none()
            && self.active.is_none()
            && self.datasheet_path.is_none()
            && self.quote_path.is_none()
    }

    /// Set the stored path for one kind of document
    pub fn with_document(mut self, kind: DocumentKind, path: Option<String>) -> Self {
        match kind {
            DocumentKind::Datasheet => self.datasheet_path = Some(path),
            DocumentKind::Quote => self.quote_path = Some(path),
        }
        self
    }
}

/// Which attached document a path refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Fiche technique
    Datasheet,
    /// Devis
    Quote,
}

impl DocumentKind {
    pub fn column(&self) -> &'static str {
        match self {
            DocumentKind::Datasheet => "datasheet_path",
            DocumentKind::Quote => "quote_path",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Datasheet => "fiche technique",
            DocumentKind::Quote => "devis",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Filter for product searches
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub sub_category: Option<String>,
    /// Every whitespace-separated word must match designation, reference or dimensions
    pub term: Option<String>,
    pub include_inactive: bool,
    pub limit: Option<usize>,
}

impl ProductFilter {
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    pub fn include_inactive(mut self) -> Self {
        self.include_inactive = true;
        self
    }
}

/// A category with its product count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub name: String,
    pub product_count: usize,
}

/// Catalog-wide statistics
#[derive(Debug, Default, Serialize)]
pub struct CatalogStats {
    pub total_products: usize,
    pub active_products: usize,
    pub inactive_products: usize,
    pub with_datasheet: usize,
    pub with_quote: usize,
    pub by_category: BTreeMap<String, usize>,
    pub total_categories: usize,
    pub db_size_bytes: u64,
}

/// A stored document path and the product it belongs to
#[derive(Debug, Clone)]
pub struct DocumentRef {
    pub product_id: i64,
    pub kind: DocumentKind,
    pub path: String,
}
