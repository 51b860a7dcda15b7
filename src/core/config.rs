//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::workspace::Workspace;

/// Default command used to pull text out of a PDF
pub const DEFAULT_PDF_TEXT_COMMAND: &str = "pdftotext -layout {pdf} -";

/// Catalog configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding attached documents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Command extracting text from a PDF; `{pdf}` is replaced by the path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_text_command: Option<String>,

    /// Encoding of exported CSV files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_encoding: Option<String>,

    /// Default output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(workspace: Option<&Workspace>) -> Self {
        let mut config = Config::default();

        // 1. Global user config
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 2. Catalog config (.chiffrage/config.yaml)
        if let Some(ws) = workspace {
            if let Some(local) = Self::read_file(&ws.config_path()) {
                // A relative data_dir in the catalog file is relative to the catalog root
                let local = Config {
                    data_dir: local.data_dir.map(|d| {
                        if d.is_absolute() {
                            d
                        } else {
                            ws.root().join(d)
                        }
                    }),
                    ..local
                };
                config.merge(local);
            }
        }

        // 3. Environment variables
        if let Ok(dir) = std::env::var("CHIFFRAGE_DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(cmd) = std::env::var("CHIFFRAGE_PDF_TEXT_COMMAND") {
            if !cmd.is_empty() {
                config.pdf_text_command = Some(cmd);
            }
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                tracing::warn!("ignoring unreadable config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "chiffrage")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.pdf_text_command.is_some() {
            self.pdf_text_command = other.pdf_text_command;
        }
        if other.export_encoding.is_some() {
            self.export_encoding = other.export_encoding;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    /// PDF text extraction command, falling back to pdftotext
    pub fn pdf_text_command(&self) -> String {
        self.pdf_text_command
            .clone()
            .unwrap_or_else(|| DEFAULT_PDF_TEXT_COMMAND.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Config {
            pdf_text_command: Some("a".into()),
            export_encoding: Some("cp1252".into()),
            ..Default::default()
        };
        base.merge(Config {
            export_encoding: Some("utf8".into()),
            ..Default::default()
        });

        assert_eq!(base.pdf_text_command.as_deref(), Some("a"));
        assert_eq!(base.export_encoding.as_deref(), Some("utf8"));
    }

    #[test]
    fn test_pdf_text_command_default() {
        let config = Config::default();
        assert_eq!(config.pdf_text_command(), DEFAULT_PDF_TEXT_COMMAND);
    }

    #[test]
    fn test_catalog_config_relative_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::init(tmp.path(), false).unwrap();
        std::fs::write(ws.config_path(), "data_dir: docs\n").unwrap();

        let config = Config::load(Some(&ws));
        // The env override may be set on the developer machine
        if std::env::var("CHIFFRAGE_DATA_DIR").is_err() {
            assert_eq!(config.data_dir, Some(ws.root().join("docs")));
        }
    }
}
