//! `chiffrage init` command - Initialize a new catalog

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::cli::GlobalOpts;
use crate::core::error::CatalogError;
use crate::core::{Database, Workspace};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Rewrite the default config even if .chiffrage/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    let workspace = match Workspace::init(&path, args.force) {
        Ok(ws) => ws,
        Err(report) => {
            if let Some(CatalogError::WorkspaceExists(root)) = report.downcast_ref::<CatalogError>() {
                println!(
                    "{} Catalog already exists at {}",
                    style("!").yellow(),
                    style(root.display()).cyan()
                );
                println!();
                println!("Use {} to reinitialize", style("chiffrage init --force").yellow());
                return Ok(());
            }
            return Err(report);
        }
    };

    // Creating the database applies the schema and default parameters
    let db = Database::open(&workspace.database_path())?;
    let version = db.schema_version()?;

    if global.quiet {
        return Ok(());
    }

    println!(
        "{} Initialized catalog at {}",
        style("✓").green(),
        style(workspace.root().display()).cyan()
    );
    println!("  Schema version {}", version);
    println!();
    println!("Created catalog structure:");
    print_structure(workspace.root());
    println!();
    println!("Next steps:");
    println!(
        "  {} Import an existing catalog",
        style("chiffrage import catalogue.csv").yellow()
    );
    println!(
        "  {} Add a product by hand",
        style("chiffrage product new -i").yellow()
    );
    println!(
        "  {} Attach data sheets automatically",
        style("chiffrage associate documents/fiches").yellow()
    );
    Ok(())
}

fn print_structure(root: &Path) {
    let entries = [
        ".chiffrage/",
        ".chiffrage/config.yaml",
        ".chiffrage/catalog.db",
        "documents/fiches/",
        "documents/devis/",
        "exports/",
    ];

    for entry in entries {
        if root.join(entry).exists() {
            let prefix = if entry.ends_with('/') { "📁" } else { "📄" };
            println!("  {} {}", prefix, style(entry).dim());
        }
    }
}
