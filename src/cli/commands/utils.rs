//! Shared utilities for CLI commands

use clap::ValueEnum;
use miette::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::transfer::Encoding;
use crate::core::{Config, DataDir, Database, Workspace};

/// Everything a catalog command needs: where the catalog is, its settings,
/// the open database and the resolved data directory
pub struct CatalogContext {
    pub workspace: Workspace,
    pub config: Config,
    pub db: Database,
    pub data_dir: DataDir,
}

impl CatalogContext {
    /// Locate the catalog from `--catalog` or the current directory and open it
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let workspace = Workspace::locate(global.catalog.as_deref())?;
        let config = Config::load(Some(&workspace));
        let db = Database::open(&workspace.database_path())?;
        let data_dir = resolve_data_dir(&config, &db, workspace.root())?;
        tracing::debug!(
            "catalog {} with data directory {}",
            workspace.root().display(),
            data_dir.root().display()
        );
        Ok(Self {
            workspace,
            config,
            db,
            data_dir,
        })
    }

    /// Output format from the flag, then `default_format`, then `Auto`
    pub fn format(&self, global: &GlobalOpts) -> OutputFormat {
        effective_format(global.format, &self.config)
    }

    /// Export encoding from the flag, then `export_encoding`, then Windows-1252
    pub fn export_encoding(&self, flag: Option<Encoding>) -> Result<Encoding> {
        match (flag, self.config.export_encoding.as_deref()) {
            (Some(e), _) => Ok(e),
            (None, Some(configured)) => configured
                .parse::<Encoding>()
                .map_err(|e| miette::miette!("export_encoding: {}", e)),
            (None, None) => Ok(Encoding::default()),
        }
    }
}

/// Data directory: config or environment, then the `repertoire_donnees`
/// parameter, then the catalog root. Relative settings are taken from the root.
pub fn resolve_data_dir(config: &Config, db: &Database, root: &Path) -> Result<DataDir> {
    let absolute = |dir: PathBuf| if dir.is_absolute() { dir } else { root.join(dir) };

    if let Some(dir) = &config.data_dir {
        return Ok(DataDir::new(absolute(dir.clone())));
    }
    if let Some(setting) = db.data_dir_setting()? {
        return Ok(DataDir::new(absolute(PathBuf::from(setting))));
    }
    Ok(DataDir::new(root))
}

pub fn effective_format(flag: OutputFormat, config: &Config) -> OutputFormat {
    if flag != OutputFormat::Auto {
        return flag;
    }
    config
        .default_format
        .as_deref()
        .and_then(|s| OutputFormat::from_str(s, true).ok())
        .unwrap_or(OutputFormat::Auto)
}

/// Print a value as JSON or YAML; other formats are handled by the caller
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| miette::miette!("JSON serialization error: {}", e))?;
            println!("{}", json);
            Ok(true)
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(value)
                .map_err(|e| miette::miette!("YAML serialization error: {}", e))?;
            print!("{}", yaml);
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_resolution_order() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let mut db = Database::open_in_memory().unwrap();

        // Nothing configured: the catalog root
        let config = Config::default();
        assert_eq!(resolve_data_dir(&config, &db, root).unwrap().root(), root);

        // Parameter, relative to the root
        db.set_parameter("repertoire_donnees", "documents").unwrap();
        assert_eq!(
            resolve_data_dir(&config, &db, root).unwrap().root(),
            root.join("documents")
        );

        // Config wins over the parameter
        let config = Config {
            data_dir: Some(PathBuf::from("/srv/docs")),
            ..Default::default()
        };
        assert_eq!(
            resolve_data_dir(&config, &db, root).unwrap().root(),
            Path::new("/srv/docs")
        );
    }

    #[test]
    fn test_effective_format() {
        let config = Config {
            default_format: Some("JSON".into()),
            ..Default::default()
        };
        assert_eq!(effective_format(OutputFormat::Auto, &config), OutputFormat::Json);
        assert_eq!(effective_format(OutputFormat::Csv, &config), OutputFormat::Csv);
        assert_eq!(
            effective_format(OutputFormat::Auto, &Config::default()),
            OutputFormat::Auto
        );
    }
}
