//! Key/value parameters (margin, data directory, association threshold)

use miette::{IntoDiagnostic, Result};
use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::core::error::CatalogError;

/// Margin percentage applied to purchase prices
pub const PARAM_MARGIN: &str = "marge";
/// Configured data directory for attached documents
pub const PARAM_DATA_DIR: &str = "repertoire_donnees";
/// Minimum word-overlap score for PDF association
pub const PARAM_THRESHOLD: &str = "seuil_association";

pub const DEFAULT_MARGIN: f64 = 20.0;
pub const DEFAULT_THRESHOLD: f64 = 0.7;

impl Database {
    /// Read a raw parameter value
    pub fn get_parameter(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM parameters WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .into_diagnostic()
    }

    /// Store a parameter; numeric keys are trimmed and validated, others kept verbatim
    pub fn set_parameter(&mut self, key: &str, value: &str) -> Result<()> {
        let value = match key {
            PARAM_MARGIN => {
                parse_margin(value.trim())?;
                value.trim()
            }
            PARAM_THRESHOLD => {
                parse_threshold(value.trim())?;
                value.trim()
            }
            _ => value,
        };

        self.conn
            .execute(
                "INSERT INTO parameters (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .into_diagnostic()?;
        tracing::debug!("parameter {} = {}", key, value);
        Ok(())
    }

    /// All parameters ordered by key
    pub fn list_parameters(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM parameters ORDER BY key")
            .into_diagnostic()?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .into_diagnostic()?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }

    /// Margin percentage, 20.0 unless changed
    pub fn margin(&self) -> Result<f64> {
        match self.get_parameter(PARAM_MARGIN)? {
            Some(value) => parse_margin(&value),
            None => Ok(DEFAULT_MARGIN),
        }
    }

    pub fn set_margin(&mut self, margin: f64) -> Result<()> {
        self.set_parameter(PARAM_MARGIN, &margin.to_string())
    }

    /// Association threshold in (0, 1]
    pub fn association_threshold(&self) -> Result<f64> {
        match self.get_parameter(PARAM_THRESHOLD)? {
            Some(value) => parse_threshold(&value),
            None => Ok(DEFAULT_THRESHOLD),
        }
    }

    /// Configured data directory; `None` when unset or empty
    pub fn data_dir_setting(&self) -> Result<Option<String>> {
        Ok(self
            .get_parameter(PARAM_DATA_DIR)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }
}

/// Parse a decimal that may use a comma separator
fn parse_decimal(value: &str) -> Option<f64> {
    value.trim().replace(',', ".").parse::<f64>().ok()
}

fn parse_margin(value: &str) -> Result<f64> {
    match parse_decimal(value) {
        Some(m) if m.is_finite() && m >= 0.0 => Ok(m),
        _ => Err(CatalogError::InvalidParameter {
            key: PARAM_MARGIN.into(),
            value: value.into(),
            reason: "expected a non-negative percentage".into(),
        }
        .into()),
    }
}

fn parse_threshold(value: &str) -> Result<f64> {
    match parse_decimal(value) {
        Some(t) if t > 0.0 && t <= 1.0 => Ok(t),
        _ => Err(CatalogError::InvalidParameter {
            key: PARAM_THRESHOLD.into(),
            value: value.into(),
            reason: "expected a fraction between 0 (excluded) and 1".into(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_defaults_to_twenty() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.margin().unwrap(), 20.0);
    }

    #[test]
    fn test_margin_is_mutable() {
        let mut db = Database::open_in_memory().unwrap();
        db.set_margin(35.5).unwrap();
        assert_eq!(db.margin().unwrap(), 35.5);

        db.set_parameter(PARAM_MARGIN, "12,5").unwrap();
        assert_eq!(db.margin().unwrap(), 12.5);
    }

    #[test]
    fn test_invalid_margin_is_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(db.set_parameter(PARAM_MARGIN, "-3").is_err());
        assert!(db.set_parameter(PARAM_MARGIN, "beaucoup").is_err());
        assert_eq!(db.margin().unwrap(), 20.0);
    }

    #[test]
    fn test_threshold() {
        let mut db = Database::open_in_memory().unwrap();
        assert_eq!(db.association_threshold().unwrap(), DEFAULT_THRESHOLD);
        db.set_parameter(PARAM_THRESHOLD, "0.5").unwrap();
        assert_eq!(db.association_threshold().unwrap(), 0.5);
        assert!(db.set_parameter(PARAM_THRESHOLD, "0").is_err());
        assert!(db.set_parameter(PARAM_THRESHOLD, "1.5").is_err());
    }

    #[test]
    fn test_data_dir_setting_empty_is_none() {
        let mut db = Database::open_in_memory().unwrap();
        assert_eq!(db.data_dir_setting().unwrap(), None);
        db.set_parameter(PARAM_DATA_DIR, "/srv/documents").unwrap();
        assert_eq!(
            db.data_dir_setting().unwrap().as_deref(),
            Some("/srv/documents")
        );
    }

    #[test]
    fn test_unknown_keys_round_trip() {
        let mut db = Database::open_in_memory().unwrap();
        db.set_parameter("societe", "  Destri SARL\n").unwrap();
        assert_eq!(
            db.get_parameter("societe").unwrap().as_deref(),
            Some("  Destri SARL\n")
        );
        db.set_parameter(PARAM_MARGIN, " 25 ").unwrap();
        assert_eq!(db.get_parameter(PARAM_MARGIN).unwrap().as_deref(), Some("25"));
        let keys: Vec<String> = db.list_parameters().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["marge", "repertoire_donnees", "seuil_association", "societe"]
        );
    }
}
