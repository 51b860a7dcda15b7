//! `chiffrage db` command - Inspect the catalog database

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::{print_structured, CatalogContext};
use crate::cli::helpers::escape_csv;
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Show catalog statistics
    Status,

    /// List document paths that point to missing files
    Check,

    /// Execute a read-only SQL query
    Query {
        /// SQL query to execute
        sql: String,
    },
}

pub fn run(cmd: DbCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        DbCommands::Status => run_status(global),
        DbCommands::Check => run_check(global),
        DbCommands::Query { sql } => run_query(&sql, global),
    }
}

fn run_status(global: &GlobalOpts) -> Result<()> {
    let ctx = CatalogContext::open(global)?;
    let stats = ctx.db.statistics()?;

    if print_structured(&stats, ctx.format(global))? {
        return Ok(());
    }

    println!("{}", style("Catalog Status").bold());
    println!("{}", style("─".repeat(40)).dim());
    println!("  Location:        {}", ctx.workspace.database_path().display());
    println!("  Data directory:  {}", ctx.data_dir.root().display());
    println!("  Schema version:  {}", ctx.db.schema_version()?);
    println!(
        "  Products:        {} ({} active, {} inactive)",
        style(stats.total_products).cyan(),
        stats.active_products,
        stats.inactive_products
    );
    println!("  With data sheet: {}", stats.with_datasheet);
    println!("  With quote:      {}", stats.with_quote);
    println!("  Categories:      {}", style(stats.total_categories).cyan());
    println!(
        "  Database size:   {} KB",
        style(stats.db_size_bytes / 1024).cyan()
    );

    if !stats.by_category.is_empty() {
        println!();
        println!("  {}", style("By Category:").bold());
        for (category, count) in &stats.by_category {
            println!("    {:<24} {}", category, count);
        }
    }
    Ok(())
}

fn run_check(global: &GlobalOpts) -> Result<()> {
    let ctx = CatalogContext::open(global)?;
    let references = ctx.db.document_references()?;

    let missing: Vec<_> = references
        .iter()
        .filter(|r| !ctx.data_dir.exists(&r.path))
        .collect();

    for reference in &missing {
        println!(
            "  {} product {:>5}  {:<16} {}",
            style("✗").red(),
            reference.product_id,
            reference.kind.label(),
            ctx.data_dir.resolve(&reference.path).display()
        );
    }

    if missing.is_empty() {
        if !global.quiet {
            println!(
                "{} All {} document path(s) resolve under {}",
                style("✓").green(),
                references.len(),
                ctx.data_dir.root().display()
            );
        }
        Ok(())
    } else {
        Err(miette::miette!(
            help = "fix the paths with `chiffrage product attach` or set the data directory",
            "{} of {} document path(s) point to missing files",
            missing.len(),
            references.len()
        ))
    }
}

fn run_query(sql: &str, global: &GlobalOpts) -> Result<()> {
    let ctx = CatalogContext::open(global)?;

    let columns = ctx.db.query_columns(sql)?;
    let rows = ctx.db.query_raw(sql)?;

    match ctx.format(global) {
        format @ (OutputFormat::Json | OutputFormat::Yaml) => {
            let objects: Vec<serde_json::Value> = rows
                .iter()
                .map(|row| {
                    let mut obj = serde_json::Map::new();
                    for (col, val) in columns.iter().zip(row) {
                        obj.insert(col.clone(), serde_json::Value::String(val.clone()));
                    }
                    serde_json::Value::Object(obj)
                })
                .collect();
            print_structured(&objects, format)?;
        }
        OutputFormat::Csv => {
            println!("{}", columns.join(","));
            for row in rows {
                println!(
                    "{}",
                    row.iter().map(|s| escape_csv(s)).collect::<Vec<_>>().join(",")
                );
            }
        }
        OutputFormat::Id => {
            for first in rows.iter().filter_map(|row| row.first()) {
                println!("{}", first);
            }
        }
        _ => {
            println!("{}", columns.join("\t"));
            for row in rows {
                println!("{}", row.join("\t"));
            }
        }
    }

    Ok(())
}
