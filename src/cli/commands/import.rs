//! `chiffrage import` command - Load products from a semicolon CSV file
//!
//! Expected header (order free, case and accents ignored):
//! `ID;CATEGORIE;SOUS_CATEGORIE;ARTICLE;DESIGNATION;DIMENSIONS;PRIX_ACHAT;FICHE_TECHNIQUE;DEVIS;ACTIF`.
//! Only CATEGORIE, DESIGNATION and PRIX_ACHAT are required.

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::commands::utils::CatalogContext;
use crate::cli::GlobalOpts;
use crate::core::db::ImportOptions;
use crate::core::transfer::{read_catalog, REQUIRED_COLUMNS};

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file to import
    pub file: PathBuf,

    /// Delete every existing product first
    #[arg(long)]
    pub replace: bool,

    /// Rows whose ID matches an existing product update it instead of adding a copy
    #[arg(long, conflicts_with = "replace")]
    pub update: bool,

    /// Check the file and report what would happen, without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Abort on the first bad row instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Do not ask for confirmation before --replace
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CatalogContext::open(global)?;

    let parsed = read_catalog(&args.file, &ctx.data_dir).map_err(|e| {
        miette::miette!(
            help = format!("required columns: {}", REQUIRED_COLUMNS.join(";")),
            "{}: {}",
            args.file.display(),
            e
        )
    })?;

    if !global.quiet {
        println!(
            "{} Reading {} ({}, {} row(s))",
            style("→").blue(),
            style(args.file.display()).cyan(),
            parsed.encoding,
            parsed.rows.len()
        );
        if !parsed.ignored_columns.is_empty() {
            println!(
                "  {} ignored column(s): {}",
                style("!").yellow(),
                parsed.ignored_columns.join(", ")
            );
        }
    }

    if args.replace && !args.dry_run && !args.yes {
        let existing = ctx.db.count_products(true)?;
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete the {} existing product(s) first?", existing))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let options = ImportOptions {
        replace: args.replace,
        update: args.update,
        dry_run: args.dry_run,
        skip_errors: !args.strict,
    };

    let bar = progress_bar(parsed.rows.len(), global.quiet);
    let stats = ctx.db.import_products(parsed.rows, &options, &mut |progress| {
        if let Some(bar) = &bar {
            bar.set_position(progress.processed as u64);
        }
    });
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    let stats = stats?;

    let verb = if args.dry_run { "Would import" } else { "Imported" };
    println!(
        "{} {} {} row(s): {} created, {} updated, {} skipped",
        style("✓").green(),
        verb,
        style(stats.rows_processed).cyan(),
        style(stats.created).green(),
        style(stats.updated).yellow(),
        if stats.skipped > 0 {
            style(stats.skipped).red()
        } else {
            style(stats.skipped).dim()
        }
    );
    if stats.removed > 0 {
        println!("  Removed {} existing product(s) first", stats.removed);
    }

    if !stats.errors.is_empty() && !global.quiet {
        println!();
        println!("{}", style("Skipped rows:").bold());
        for error in stats.errors.iter().take(20) {
            println!("  {} {}", style("✗").red(), error);
        }
        if stats.errors.len() > 20 {
            println!("  ... and {} more", stats.errors.len() - 20);
        }
    }
    Ok(())
}

fn progress_bar(len: usize, quiet: bool) -> Option<ProgressBar> {
    if quiet || len == 0 {
        return None;
    }
    let bar = ProgressBar::new(len as u64);
    let bar_style = ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} rows")
        .ok()?
        .progress_chars("█▉▊▋▌▍▎▏ ");
    bar.set_style(bar_style);
    if bar.is_hidden() {
        None
    } else {
        Some(bar)
    }
}
