//! `chiffrage config` command - Configuration management
//!
//! Settings live in two YAML files: the global user file and the catalog's
//! `.chiffrage/config.yaml`. Environment variables override both.

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::transfer::Encoding;
use crate::core::{Config, Workspace};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path(PathArgs),

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,

    /// Show only the catalog config file
    #[arg(long = "catalog-only", conflicts_with = "global_only")]
    pub catalog_only: bool,

    /// Show only the global (user) config file
    #[arg(long = "global-only")]
    pub global_only: bool,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (see `chiffrage config keys`)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of catalog config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of catalog config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Show only the catalog config path
    #[arg(long = "catalog-only", conflicts_with = "global_only")]
    pub catalog_only: bool,

    /// Show only the global config path
    #[arg(long = "global-only")]
    pub global_only: bool,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("data_dir", "Directory holding data sheets and quotes"),
    (
        "pdf_text_command",
        "Command printing a PDF's text, {pdf} is the file",
    ),
    ("export_encoding", "CSV export encoding (cp1252, utf8)"),
    (
        "default_format",
        "Default output format (yaml, json, tsv, csv, md, id)",
    ),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Unset(args) => run_unset(args, global),
        ConfigCommands::Path(args) => run_path(args, global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::locate(global.catalog.as_deref()).ok();
    let config = Config::load(workspace.as_ref());

    if let Some(key) = &args.key {
        check_key(key)?;
        return match get_config_value(&config, key) {
            Some(v) => {
                println!("{}", v);
                Ok(())
            }
            None => Err(miette::miette!("Key '{}' is not set", key)),
        };
    }

    if args.catalog_only {
        return show_file("Catalog config:", &catalog_config_path(global)?);
    }
    if args.global_only {
        return show_file("Global config:", &global_config_path()?);
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    for (key, _) in VALID_KEYS {
        print_config_value(key, get_config_value(&config, key).as_deref());
    }

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Environment variables (CHIFFRAGE_DATA_DIR, CHIFFRAGE_PDF_TEXT_COMMAND)");
    println!("  2. Catalog config (.chiffrage/config.yaml)");
    println!("  3. Global config (~/.config/chiffrage/config.yaml)");
    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    check_value(&args.key, &args.value)?;

    let config_path = if args.global {
        global_config_path()?
    } else {
        catalog_config_path(global)?
    };

    let mut map = read_mapping(&config_path)?;
    map.insert(
        serde_yml::Value::String(args.key.clone()),
        serde_yml::Value::String(args.value.clone()),
    );

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    write_mapping(&config_path, map)?;

    if !global.quiet {
        println!(
            "{} Set {} {} {} in {} config",
            style("✓").green(),
            style(&args.key).cyan(),
            style("→").dim(),
            style(&args.value).yellow(),
            scope(args.global)
        );
    }
    Ok(())
}

fn run_unset(args: UnsetArgs, global: &GlobalOpts) -> Result<()> {
    let config_path = if args.global {
        global_config_path()?
    } else {
        catalog_config_path(global)?
    };

    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut map = read_mapping(&config_path)?;
    let removed = map
        .remove(&serde_yml::Value::String(args.key.clone()))
        .is_some();
    if !removed {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }
    write_mapping(&config_path, map)?;

    if !global.quiet {
        println!(
            "{} Removed {} from {} config",
            style("✓").green(),
            style(&args.key).cyan(),
            scope(args.global)
        );
    }
    Ok(())
}

fn run_path(args: PathArgs, global: &GlobalOpts) -> Result<()> {
    if args.catalog_only {
        println!("{}", catalog_config_path(global)?.display());
        return Ok(());
    }
    if args.global_only {
        println!("{}", global_config_path()?.display());
        return Ok(());
    }

    let global_path = global_config_path()?;
    println!("{}", style("Configuration file paths:").bold());
    println!();
    println!("  {} {}", style("Global:").cyan(), global_path.display());
    println!("          {}", existence(&global_path));

    println!();
    match catalog_config_path(global) {
        Ok(path) => {
            println!("  {} {}", style("Catalog:").cyan(), path.display());
            println!("          {}", existence(&path));
        }
        Err(_) => println!(
            "  {} {}",
            style("Catalog:").cyan(),
            style("(not in a catalog)").dim()
        ),
    }
    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'chiffrage config set <key> <value>' to set a value.").dim()
    );
    Ok(())
}

fn scope(global: bool) -> &'static str {
    if global {
        "global"
    } else {
        "catalog"
    }
}

fn existence(path: &Path) -> console::StyledObject<&'static str> {
    if path.exists() {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    }
}

fn global_config_path() -> Result<PathBuf> {
    Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))
}

fn catalog_config_path(global: &GlobalOpts) -> Result<PathBuf> {
    Ok(Workspace::locate(global.catalog.as_deref())?.config_path())
}

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            help = "run `chiffrage config keys` to list them",
            "Unknown configuration key '{}'",
            key
        ))
    }
}

fn check_value(key: &str, value: &str) -> Result<()> {
    match key {
        "export_encoding" => value
            .parse::<Encoding>()
            .map(|_| ())
            .map_err(|e| miette::miette!("{}", e)),
        "default_format" => OutputFormat::from_str(value, true)
            .map(|_| ())
            .map_err(|_| miette::miette!("'{}' is not an output format", value)),
        "pdf_text_command" if value.trim().is_empty() => {
            Err(miette::miette!("pdf_text_command cannot be empty"))
        }
        _ => Ok(()),
    }
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "data_dir" => config.data_dir.as_ref().map(|d| d.display().to_string()),
        "pdf_text_command" => Some(config.pdf_text_command()),
        "export_encoding" => config.export_encoding.clone(),
        "default_format" => config.default_format.clone(),
        _ => None,
    }
}

fn print_config_value(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("  {}: {}", style(key).cyan(), style(v).yellow());
    } else {
        println!("  {}: {}", style(key).cyan(), style("(not set)").dim());
    }
}

fn show_file(title: &str, path: &Path) -> Result<()> {
    println!("{} {}", style(title).bold(), style(path.display()).dim());
    println!();

    if path.exists() {
        let content = fs::read_to_string(path).into_diagnostic()?;
        print!("{}", content);
    } else {
        println!("{}", style("(not created)").dim());
    }
    Ok(())
}

/// Read a config file as a YAML mapping; missing or empty files give an empty one
fn read_mapping(path: &Path) -> Result<serde_yml::Mapping> {
    if !path.exists() {
        return Ok(serde_yml::Mapping::new());
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    match serde_yml::from_str::<serde_yml::Value>(&content).into_diagnostic()? {
        serde_yml::Value::Mapping(map) => Ok(map),
        serde_yml::Value::Null => Ok(serde_yml::Mapping::new()),
        _ => Err(miette::miette!(
            "{} is not a YAML mapping",
            path.display()
        )),
    }
}

fn write_mapping(path: &Path, map: serde_yml::Mapping) -> Result<()> {
    let yaml = serde_yml::to_string(&serde_yml::Value::Mapping(map)).into_diagnostic()?;
    fs::write(path, yaml).into_diagnostic()
}
