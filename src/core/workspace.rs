//! Catalog workspace discovery and layout

use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::core::error::CatalogError;

/// Name of the marker directory at the root of a catalog
pub const MARKER_DIR: &str = ".chiffrage";

/// Database file inside the marker directory
pub const DATABASE_FILE: &str = "catalog.db";

/// A catalog workspace: the directory holding `.chiffrage/`
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Find the workspace by walking up from the current directory
    pub fn discover() -> Result<Self> {
        let current = std::env::current_dir().into_diagnostic()?;
        Self::discover_from(&current)
    }

    /// Find the workspace by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self> {
        let mut current = start.canonicalize().into_diagnostic()?;

        loop {
            if current.join(MARKER_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(CatalogError::WorkspaceNotFound {
                    searched_from: start.to_path_buf(),
                }
                .into());
            }
        }
    }

    /// Open a workspace at an explicit root, without walking up
    pub fn at(root: &Path) -> Result<Self> {
        let root = root.canonicalize().into_diagnostic()?;
        if !root.join(MARKER_DIR).is_dir() {
            return Err(CatalogError::WorkspaceNotFound {
                searched_from: root,
            }
            .into());
        }
        Ok(Self { root })
    }

    /// Resolve the workspace from an optional `--catalog` flag
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::at(path),
            None => Self::discover(),
        }
    }

    /// Create a new workspace at the given path
    pub fn init(path: &Path, force: bool) -> Result<Self> {
        std::fs::create_dir_all(path).into_diagnostic()?;
        let root = path.canonicalize().into_diagnostic()?;

        let marker = root.join(MARKER_DIR);
        if marker.exists() && !force {
            return Err(CatalogError::WorkspaceExists(root).into());
        }

        std::fs::create_dir_all(&marker).into_diagnostic()?;
        let config_path = marker.join("config.yaml");
        if !config_path.exists() || force {
            std::fs::write(&config_path, Self::default_config()).into_diagnostic()?;
        }

        for dir in ["documents/fiches", "documents/devis", "exports"] {
            std::fs::create_dir_all(root.join(dir)).into_diagnostic()?;
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# DestriChiffrage catalog configuration

# Directory holding attached documents; overrides the `repertoire_donnees` parameter
# data_dir: ""

# Command used to extract text from PDFs ({pdf} is replaced by the file path)
# pdf_text_command: "pdftotext -layout {pdf} -"

# Encoding of exported CSV files (cp1252 or utf8)
# export_encoding: cp1252

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto
"#
    }

    /// Root directory of the catalog
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.chiffrage` directory
    pub fn marker_dir(&self) -> PathBuf {
        self.root.join(MARKER_DIR)
    }

    /// Path of the SQLite database
    pub fn database_path(&self) -> PathBuf {
        self.marker_dir().join(DATABASE_FILE)
    }

    /// Path of the catalog-level config file
    pub fn config_path(&self) -> PathBuf {
        self.marker_dir().join("config.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_layout() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path(), false).unwrap();

        assert!(ws.marker_dir().is_dir());
        assert!(ws.config_path().exists());
        assert!(ws.root().join("documents/fiches").is_dir());
        assert!(ws.root().join("documents/devis").is_dir());
    }

    #[test]
    fn test_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path(), false).unwrap();

        let err = Workspace::init(tmp.path(), false).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        assert!(Workspace::init(tmp.path(), true).is_ok());
    }

    #[test]
    fn test_discover_from_nested_dir() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path(), false).unwrap();

        let nested = tmp.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let ws = Workspace::discover_from(&nested).unwrap();
        assert_eq!(ws.root(), tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_discover_fails_without_marker() {
        let tmp = tempdir().unwrap();
        let err = Workspace::discover_from(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("not a catalog"));
    }
}
