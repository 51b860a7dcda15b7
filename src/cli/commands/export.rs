//! `chiffrage export` command - Write the catalog as a semicolon CSV file

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::cli::commands::utils::CatalogContext;
use crate::cli::GlobalOpts;
use crate::core::db::ProductFilter;
use crate::core::transfer::{write_catalog, Encoding};

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Output file, or - for stdout (default: exports/catalogue_<date>.csv)
    pub output: Option<PathBuf>,

    /// Only this category
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Include deactivated products
    #[arg(long, short = 'a')]
    pub all: bool,

    /// File encoding: cp1252 (Excel on Windows) or utf8 (with BOM)
    #[arg(long, short = 'e')]
    pub encoding: Option<Encoding>,
}

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = CatalogContext::open(global)?;
    let encoding = ctx.export_encoding(args.encoding)?;

    let filter = ProductFilter {
        category: args.category,
        include_inactive: args.all,
        ..Default::default()
    };
    let products = ctx.db.search_products(&filter)?;

    if args.output.as_deref() == Some(Path::new("-")) {
        return write_catalog(&products, encoding, std::io::stdout().lock());
    }

    let output = args.output.unwrap_or_else(|| {
        default_output(ctx.workspace.root(), "catalogue")
    });
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).into_diagnostic()?;
        }
    }
    let file = std::fs::File::create(&output)
        .map_err(|e| miette::miette!("cannot create {}: {}", output.display(), e))?;
    write_catalog(&products, encoding, std::io::BufWriter::new(file))?;

    if !global.quiet {
        println!(
            "{} Exported {} product(s) to {} ({})",
            style("✓").green(),
            style(products.len()).cyan(),
            style(output.display()).cyan(),
            encoding
        );
    }
    Ok(())
}

/// `exports/<stem>_<YYYYMMDD_HHMM>.csv` under the catalog root
pub fn default_output(root: &Path, stem: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M");
    root.join("exports").join(format!("{}_{}.csv", stem, stamp))
}
