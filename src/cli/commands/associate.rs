//! `chiffrage associate` command - Attach PDFs to products by their text

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::commands::product::DocumentArg;
use crate::cli::commands::utils::{print_structured, CatalogContext};
use crate::cli::helpers::truncate_str;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::db::DocumentKind;
use crate::core::extract::{CommandExtractor, SidecarExtractor, TextExtractor};
use crate::core::{associate, AssociationOptions};

#[derive(clap::Args, Debug)]
pub struct AssociateArgs {
    /// Directory scanned recursively for PDF files
    pub dir: PathBuf,

    /// Which document the PDFs are
    #[arg(long, short = 'k', value_enum, default_value_t = DocumentArg::Datasheet)]
    pub kind: DocumentArg,

    /// Minimum score between 0 and 1 (default: the `seuil_association` parameter)
    #[arg(long, short = 't')]
    pub threshold: Option<f64>,

    /// Replace documents products already have
    #[arg(long)]
    pub overwrite: bool,

    /// Show what would be attached without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Read pre-extracted text from `name.txt` next to each `name.pdf`
    #[arg(long, conflicts_with = "command")]
    pub sidecar: bool,

    /// Text extraction command, `{pdf}` is replaced by the file path
    #[arg(long)]
    pub command: Option<String>,
}

pub fn run(args: AssociateArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CatalogContext::open(global)?;

    if !args.dir.is_dir() {
        return Err(miette::miette!(
            "{} is not a directory",
            args.dir.display()
        ));
    }
    let dir = args.dir.canonicalize().map_err(|e| {
        miette::miette!("cannot access {}: {}", args.dir.display(), e)
    })?;

    let threshold = match args.threshold {
        Some(t) if t > 0.0 && t <= 1.0 => t,
        Some(t) => {
            return Err(miette::miette!(
                "threshold must be in (0, 1], got {}",
                t
            ))
        }
        None => ctx.db.association_threshold()?,
    };
    let options = AssociationOptions {
        threshold,
        overwrite: args.overwrite,
        dry_run: args.dry_run,
    };

    let extractor: Box<dyn TextExtractor> = if args.sidecar {
        Box::new(SidecarExtractor)
    } else {
        let command = args
            .command
            .unwrap_or_else(|| ctx.config.pdf_text_command());
        Box::new(CommandExtractor::new(&command)?)
    };

    let kind: DocumentKind = args.kind.into();
    let report = associate(
        &mut ctx.db,
        &ctx.data_dir,
        &dir,
        kind,
        extractor.as_ref(),
        &options,
    )?;

    let format = ctx.format(global);
    if print_structured(&report, format)? {
        return Ok(());
    }
    if format == OutputFormat::Id {
        for assignment in &report.assigned {
            println!("{}", assignment.product_id);
        }
        return Ok(());
    }

    if !global.quiet {
        for a in &report.assigned {
            println!(
                "  {} {:>5}  {:<40} {} {}",
                style("+").green(),
                a.product_id,
                truncate_str(&a.designation, 40),
                style(&a.document).cyan(),
                style(format!("({:.0}%)", a.score * 100.0)).dim()
            );
        }
        for pdf in &report.unmatched {
            println!("  {} {} matched no product", style("-").dim(), pdf);
        }
        for pdf in &report.unreadable {
            println!("  {} {} could not be read", style("!").yellow(), pdf.display());
        }
    }

    let verb = if args.dry_run { "Would attach" } else { "Attached" };
    println!(
        "{} {} {} {}(s) from {} PDF(s), threshold {}",
        style("✓").green(),
        verb,
        style(report.assigned.len()).cyan(),
        kind.label(),
        report.scanned,
        threshold
    );
    if report.kept_existing > 0 {
        println!(
            "  {} existing document(s) kept, use --overwrite to replace them",
            report.kept_existing
        );
    }
    Ok(())
}
