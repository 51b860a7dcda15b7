//! `chiffrage cart` command - Price a selection of products
//!
//! The cart lives for one invocation. Product ids come from the command line
//! or from stdin with `-`, so a filtered listing can be piped in:
//!
//! ```bash
//! chiffrage product list -c Portes -f id | chiffrage cart export - -o devis.csv
//! ```

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::io::BufRead;
use std::path::PathBuf;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use crate::cli::commands::export::default_output;
use crate::cli::commands::utils::{print_structured, CatalogContext};
use crate::cli::helpers::{format_euros, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cart::{Cart, QuoteLine};
use crate::core::db::Database;
use crate::core::transfer::{copy_documents, write_dpgf, Encoding};

#[derive(Subcommand, Debug)]
pub enum CartCommands {
    /// Show priced lines and totals
    Show(ShowArgs),

    /// Write the DPGF CSV and optionally gather the attached documents
    Export(ExportArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Product ids, or - to read them from stdin
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Margin percentage (default: the catalog's `marge` parameter)
    #[arg(long, short = 'm')]
    pub margin: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Product ids, or - to read them from stdin
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Output file (default: exports/dpgf_<date>.csv)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Also copy every attached data sheet and quote into this directory
    #[arg(long, short = 'd')]
    pub documents: Option<PathBuf>,

    /// Margin percentage (default: the catalog's `marge` parameter)
    #[arg(long, short = 'm')]
    pub margin: Option<f64>,

    /// File encoding: cp1252 (Excel on Windows) or utf8 (with BOM)
    #[arg(long, short = 'e')]
    pub encoding: Option<Encoding>,
}

pub fn run(cmd: CartCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CartCommands::Show(args) => run_show(args, global),
        CartCommands::Export(args) => run_export(args, global),
    }
}

/// Parse ids, expanding `-` to whitespace-separated ids read from stdin
fn collect_ids(raw: &[String], stdin: impl BufRead) -> Result<Vec<i64>> {
    let mut tokens: Vec<String> = Vec::new();
    let mut stdin = Some(stdin);
    for arg in raw {
        if arg == "-" {
            if let Some(input) = stdin.take() {
                for line in input.lines() {
                    let line = line.into_diagnostic()?;
                    tokens.extend(line.split_whitespace().map(String::from));
                }
            }
        } else {
            tokens.extend(arg.split(',').map(|s| s.trim().to_string()));
        }
    }

    tokens
        .into_iter()
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<i64>()
                .map_err(|_| miette::miette!("'{}' is not a product id", t))
        })
        .collect()
}

fn build_cart(db: &Database, ids: &[i64]) -> Result<Cart> {
    let mut cart = Cart::new();
    for &id in ids {
        let product = db.require_product(id)?;
        if !product.active {
            tracing::warn!("product {} is deactivated", id);
        }
        if !cart.add(&product) {
            tracing::debug!("product {} listed twice", id);
        }
    }
    Ok(cart)
}

fn check_margin(margin: Option<f64>, db: &Database) -> Result<f64> {
    match margin {
        Some(m) if m.is_finite() && m >= 0.0 => Ok(m),
        Some(m) => Err(miette::miette!("margin must be a non-negative percentage, got {}", m)),
        None => db.margin(),
    }
}

#[derive(Tabled)]
struct LineRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Reference")]
    reference: String,
    #[tabled(rename = "Designation")]
    designation: String,
    #[tabled(rename = "Purchase")]
    purchase: String,
    #[tabled(rename = "Sale")]
    sale: String,
}

impl From<&QuoteLine<'_>> for LineRow {
    fn from(line: &QuoteLine<'_>) -> Self {
        Self {
            id: line.item.product_id,
            reference: line.item.supplier_reference.clone().unwrap_or_default(),
            designation: truncate_str(&line.item.designation, 48),
            purchase: format_euros(line.item.purchase_price),
            sale: format_euros(line.sale_price),
        }
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = CatalogContext::open(global)?;
    let ids = collect_ids(&args.ids, std::io::stdin().lock())?;
    let cart = build_cart(&ctx.db, &ids)?;
    let margin = check_margin(args.margin, &ctx.db)?;
    let lines = cart.lines(margin);

    let format = ctx.format(global);
    if print_structured(&lines, format)? {
        return Ok(());
    }
    if format == OutputFormat::Id {
        for item in cart.items() {
            println!("{}", item.product_id);
        }
        return Ok(());
    }

    let rows: Vec<LineRow> = lines.iter().map(LineRow::from).collect();
    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..5)).with(Alignment::right()));
    println!("{}", table);

    println!(
        "  {} product(s)   {} {}   {} {} {}",
        style(cart.len()).cyan(),
        style("purchase").dim(),
        style(format_euros(cart.total_purchase())).bold(),
        style("sale").dim(),
        style(format_euros(cart.total_sale(margin))).green().bold(),
        style(format!("(margin {}%)", margin)).dim()
    );
    Ok(())
}

fn run_export(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = CatalogContext::open(global)?;
    let ids = collect_ids(&args.ids, std::io::stdin().lock())?;
    let cart = build_cart(&ctx.db, &ids)?;
    let margin = check_margin(args.margin, &ctx.db)?;
    let encoding = ctx.export_encoding(args.encoding)?;

    let output = args
        .output
        .unwrap_or_else(|| default_output(ctx.workspace.root(), "dpgf"));
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).into_diagnostic()?;
        }
    }
    let file = std::fs::File::create(&output)
        .map_err(|e| miette::miette!("cannot create {}: {}", output.display(), e))?;
    write_dpgf(&cart, margin, &ctx.data_dir, encoding, std::io::BufWriter::new(file))?;

    if !global.quiet {
        println!(
            "{} Exported {} line(s) to {} (total {}, {})",
            style("✓").green(),
            style(cart.len()).cyan(),
            style(output.display()).cyan(),
            format_euros(cart.total_sale(margin)),
            encoding
        );
    }

    if let Some(target) = args.documents {
        let report = copy_documents(&cart, &ctx.data_dir, &target)?;
        if !global.quiet {
            println!(
                "{} Copied {} document(s) to {}",
                style("✓").green(),
                style(report.copied.len()).cyan(),
                style(target.display()).cyan()
            );
        }
        for (id, kind, path) in &report.missing {
            println!(
                "  {} product {}: {} missing ({})",
                style("!").yellow(),
                id,
                kind.label(),
                path.display()
            );
        }
    }
    Ok(())
}
