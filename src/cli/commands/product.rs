//! `chiffrage product` command - Browse and edit catalog products

use clap::{Subcommand, ValueEnum};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::commands::utils::{print_structured, CatalogContext};
use crate::cli::helpers::{format_euros, success};
use crate::cli::table::{CellValue, ColumnDef, TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cart::sale_price;
use crate::core::db::{DocumentKind, NewProduct, Product, ProductFilter, ProductUpdate};
use crate::core::paths::DataDir;
use crate::core::transfer::parse_price;

#[derive(Subcommand, Debug)]
pub enum ProductCommands {
    /// List products, optionally filtered
    List(ListArgs),

    /// Show one product in full
    Show(ShowArgs),

    /// Add a product
    New(NewArgs),

    /// Change fields of a product
    Edit(EditArgs),

    /// Hide a product from searches (soft delete)
    Deactivate(IdArg),

    /// Bring a deactivated product back
    Restore(IdArg),

    /// Delete a product permanently
    Delete(DeleteArgs),

    /// Attach or detach a data sheet or supplier quote
    Attach(AttachArgs),

    /// Print the absolute path of an attached document
    Path(PathArgs),
}

/// Which attached document
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum DocumentArg {
    /// Fiche technique
    Datasheet,
    /// Devis
    Quote,
}

impl From<DocumentArg> for DocumentKind {
    fn from(arg: DocumentArg) -> Self {
        match arg {
            DocumentArg::Datasheet => DocumentKind::Datasheet,
            DocumentArg::Quote => DocumentKind::Quote,
        }
    }
}

/// Columns to display in list output
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ListColumn {
    Id,
    Category,
    SubCategory,
    Reference,
    Designation,
    Dimensions,
    Price,
    SalePrice,
    Active,
    Datasheet,
    Quote,
}

impl ListColumn {
    fn key(&self) -> &'static str {
        match self {
            ListColumn::Id => "id",
            ListColumn::Category => "category",
            ListColumn::SubCategory => "sub-category",
            ListColumn::Reference => "reference",
            ListColumn::Designation => "designation",
            ListColumn::Dimensions => "dimensions",
            ListColumn::Price => "price",
            ListColumn::SalePrice => "sale-price",
            ListColumn::Active => "active",
            ListColumn::Datasheet => "datasheet",
            ListColumn::Quote => "quote",
        }
    }
}

const PRODUCT_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 8),
    ColumnDef::new("category", "CATEGORY", 18),
    ColumnDef::new("sub-category", "SUB-CATEGORY", 18),
    ColumnDef::new("reference", "REFERENCE", 16),
    ColumnDef::new("designation", "DESIGNATION", 40),
    ColumnDef::new("dimensions", "DIMENSIONS", 14),
    ColumnDef::new("price", "PRICE", 14),
    ColumnDef::new("sale-price", "SALE PRICE", 14),
    ColumnDef::new("active", "ACTIVE", 6),
    ColumnDef::new("datasheet", "DATASHEET", 30),
    ColumnDef::new("quote", "QUOTE", 30),
];

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Words that must all appear in the designation, reference or dimensions
    pub search: Option<String>,

    /// Only this category
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Only this sub-category
    #[arg(long, short = 's')]
    pub sub_category: Option<String>,

    /// Include deactivated products
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Columns to display
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = vec![
        ListColumn::Id,
        ListColumn::Category,
        ListColumn::Reference,
        ListColumn::Designation,
        ListColumn::Price,
    ])]
    pub columns: Vec<ListColumn>,

    /// Wrap long designations at this width instead of truncating
    #[arg(long, short = 'w')]
    pub wrap: Option<usize>,

    /// Show only the count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct IdArg {
    /// Product id
    pub id: i64,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Product id
    pub id: i64,
}

#[derive(clap::Args, Debug, Default)]
pub struct NewArgs {
    /// Category (created if it does not exist)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Designation
    #[arg(long, short = 'd')]
    pub designation: Option<String>,

    /// Purchase price, e.g. 412.50 or "412,50"
    #[arg(long, short = 'p')]
    pub price: Option<String>,

    #[arg(long, short = 's')]
    pub sub_category: Option<String>,

    #[arg(long)]
    pub dimensions: Option<String>,

    /// Supplier reference (ARTICLE)
    #[arg(long, short = 'r')]
    pub reference: Option<String>,

    /// Technical data sheet inside the data directory
    #[arg(long)]
    pub datasheet: Option<PathBuf>,

    /// Supplier quote inside the data directory
    #[arg(long)]
    pub quote: Option<PathBuf>,

    /// Prompt for the fields
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

/// Options left out are unchanged; an empty value clears an optional field
#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Product id
    pub id: i64,

    #[arg(long, short = 'c')]
    pub category: Option<String>,

    #[arg(long, short = 'd')]
    pub designation: Option<String>,

    #[arg(long, short = 'p')]
    pub price: Option<String>,

    #[arg(long, short = 's')]
    pub sub_category: Option<String>,

    #[arg(long)]
    pub dimensions: Option<String>,

    #[arg(long, short = 'r')]
    pub reference: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Product id
    pub id: i64,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct AttachArgs {
    /// Product id
    pub id: i64,

    /// Document file; must be inside the data directory
    #[arg(required_unless_present = "detach")]
    pub file: Option<PathBuf>,

    /// Kind of document
    #[arg(long, short = 'k', value_enum, default_value = "datasheet")]
    pub kind: DocumentArg,

    /// Remove the attached document instead
    #[arg(long, conflicts_with = "file")]
    pub detach: bool,
}

#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Product id
    pub id: i64,

    #[arg(long, short = 'k', value_enum, default_value = "datasheet")]
    pub kind: DocumentArg,
}

pub fn run(cmd: ProductCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ProductCommands::List(args) => run_list(args, global),
        ProductCommands::Show(args) => run_show(args, global),
        ProductCommands::New(args) => run_new(args, global),
        ProductCommands::Edit(args) => run_edit(args, global),
        ProductCommands::Deactivate(args) => run_set_active(args.id, false, global),
        ProductCommands::Restore(args) => run_set_active(args.id, true, global),
        ProductCommands::Delete(args) => run_delete(args, global),
        ProductCommands::Attach(args) => run_attach(args, global),
        ProductCommands::Path(args) => run_path(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = CatalogContext::open(global)?;

    let filter = ProductFilter {
        category: args.category,
        sub_category: args.sub_category,
        term: args.search,
        include_inactive: args.all,
        limit: args.limit,
    };
    let products = ctx.db.search_products(&filter)?;

    if args.count {
        println!("{}", products.len());
        return Ok(());
    }

    let format = match ctx.format(global) {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };
    if print_structured(&products, format)? {
        return Ok(());
    }

    if products.is_empty() && format == OutputFormat::Tsv {
        if !global.quiet {
            println!("No products found.");
        }
        return Ok(());
    }

    let margin = ctx.db.margin()?;
    let rows = products
        .iter()
        .map(|p| product_row(p, margin, &ctx.data_dir));
    let visible: Vec<&str> = args.columns.iter().map(ListColumn::key).collect();

    let config = match args.wrap {
        Some(width) => TableConfig::with_wrap(width),
        None if global.quiet => TableConfig::for_pipe(),
        None => TableConfig::default(),
    };
    TableFormatter::new(PRODUCT_COLUMNS, "product")
        .with_config(config)
        .output(rows, format, &visible);
    Ok(())
}

fn product_row(p: &Product, margin: f64, data_dir: &DataDir) -> TableRow {
    let document = |stored: Option<&str>| match stored {
        Some(s) => CellValue::Document(s.to_string(), data_dir.exists(s)),
        None => CellValue::Empty,
    };

    TableRow::new(p.id)
        .cell("id", CellValue::Id(p.id))
        .cell("category", CellValue::Category(p.category.clone()))
        .cell(
            "sub-category",
            p.sub_category
                .as_deref()
                .map_or(CellValue::Empty, |s| CellValue::Category(s.to_string())),
        )
        .cell("reference", CellValue::opt_text(p.supplier_reference.as_deref()))
        .cell("designation", CellValue::Text(p.designation.clone()))
        .cell("dimensions", CellValue::opt_text(p.dimensions.as_deref()))
        .cell("price", CellValue::Price(p.purchase_price))
        .cell("sale-price", CellValue::Price(sale_price(p.purchase_price, margin)))
        .cell("active", CellValue::Active(p.active))
        .cell("datasheet", document(p.datasheet_path.as_deref()))
        .cell("quote", document(p.quote_path.as_deref()))
}

/// A product as shown by `product show`: stored fields plus derived ones
#[derive(Serialize)]
struct ProductView<'a> {
    #[serde(flatten)]
    product: &'a Product,
    sale_price: f64,
    margin: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    datasheet_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quote_file: Option<PathBuf>,
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = CatalogContext::open(global)?;
    let product = ctx.db.require_product(args.id)?;
    let margin = ctx.db.margin()?;

    let format = match ctx.format(global) {
        OutputFormat::Auto => OutputFormat::Yaml,
        f => f,
    };

    match format {
        OutputFormat::Id => {
            println!("{}", product.id);
            return Ok(());
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let view = ProductView {
                product: &product,
                sale_price: sale_price(product.purchase_price, margin),
                margin,
                datasheet_file: product.datasheet_path.as_deref().map(|s| ctx.data_dir.resolve(s)),
                quote_file: product.quote_path.as_deref().map(|s| ctx.data_dir.resolve(s)),
            };
            print_structured(&view, format)?;
            return Ok(());
        }
        _ => {}
    }

    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{}: {}",
        style("ID").bold(),
        style(product.id).cyan()
    );
    println!("{}: {}", style("Designation").bold(), style(&product.designation).yellow());
    println!("{}: {}", style("Category").bold(), product.category);
    if let Some(sub) = &product.sub_category {
        println!("{}: {}", style("Sub-category").bold(), sub);
    }
    if let Some(reference) = &product.supplier_reference {
        println!("{}: {}", style("Reference").bold(), reference);
    }
    if let Some(dimensions) = &product.dimensions {
        println!("{}: {}", style("Dimensions").bold(), dimensions);
    }
    println!(
        "{}: {}",
        style("Purchase price").bold(),
        format_euros(product.purchase_price)
    );
    println!(
        "{}: {} {}",
        style("Sale price").bold(),
        format_euros(sale_price(product.purchase_price, margin)),
        style(format!("(margin {}%)", margin)).dim()
    );
    if !product.active {
        println!("{}: {}", style("Status").bold(), style("inactive").red());
    }
    println!("{}", style("─".repeat(60)).dim());

    for kind in [DocumentKind::Datasheet, DocumentKind::Quote] {
        if let Some(stored) = product.document(kind) {
            let file = ctx.data_dir.resolve(stored);
            let marker = if file.is_file() {
                style("✓").green()
            } else {
                style("✗ missing").red()
            };
            println!("{}: {} {}", style(kind.label()).bold(), file.display(), marker);
        }
    }
    println!(
        "{}: {}   {}: {}",
        style("Created").dim(),
        product.created.format("%Y-%m-%d %H:%M"),
        style("Updated").dim(),
        product.updated.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CatalogContext::open(global)?;

    let args = if args.interactive {
        prompt_new(&ctx, args)?
    } else {
        args
    };

    let category = args
        .category
        .ok_or_else(|| miette::miette!("Category is required (use --category or -i for interactive)"))?;
    let designation = args
        .designation
        .ok_or_else(|| miette::miette!("Designation is required (use --designation or -i for interactive)"))?;
    let price = match args.price {
        Some(raw) => parse_price(&raw)
            .ok_or(crate::core::error::CatalogError::InvalidPrice(raw))?,
        None => return Err(miette::miette!("Price is required (use --price or -i for interactive)")),
    };

    let stored = |path: Option<PathBuf>| -> Result<Option<String>> {
        path.map(|p| ctx.data_dir.to_relative(&p)).transpose()
    };

    let product = NewProduct {
        category,
        sub_category: args.sub_category,
        designation,
        dimensions: args.dimensions,
        purchase_price: price,
        supplier_reference: args.reference,
        active: true,
        datasheet_path: stored(args.datasheet)?,
        quote_path: stored(args.quote)?,
    };

    let id = ctx.db.add_product(&product)?;
    if global.quiet {
        println!("{}", id);
    } else {
        success(
            false,
            format!(
                "Created product {} {}",
                style(id).cyan(),
                style(&product.designation).yellow()
            ),
        );
    }
    Ok(())
}

fn prompt_new(ctx: &CatalogContext, mut args: NewArgs) -> Result<NewArgs> {
    let theme = ColorfulTheme::default();

    if args.category.is_none() {
        let mut names: Vec<String> = ctx
            .db
            .list_categories()?
            .into_iter()
            .map(|c| c.name)
            .collect();
        names.push("(new category)".to_string());
        let choice = Select::with_theme(&theme)
            .with_prompt("Category")
            .items(&names)
            .default(0)
            .interact()
            .into_diagnostic()?;
        args.category = if choice + 1 == names.len() {
            Some(
                Input::<String>::with_theme(&theme)
                    .with_prompt("New category name")
                    .interact_text()
                    .into_diagnostic()?,
            )
        } else {
            Some(names[choice].clone())
        };
    }

    if args.designation.is_none() {
        args.designation = Some(
            Input::with_theme(&theme)
                .with_prompt("Designation")
                .interact_text()
                .into_diagnostic()?,
        );
    }

    if args.price.is_none() {
        let price: String = Input::with_theme(&theme)
            .with_prompt("Purchase price (€)")
            .validate_with(|input: &String| -> std::result::Result<(), &str> {
                match parse_price(input) {
                    Some(p) if p >= 0.0 => Ok(()),
                    _ => Err("enter a non-negative amount, e.g. 412,50"),
                }
            })
            .interact_text()
            .into_diagnostic()?;
        args.price = Some(price);
    }

    let optional = |prompt: &str| -> Result<Option<String>> {
        let value: String = Input::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .into_diagnostic()?;
        Ok(Some(value.trim().to_string()).filter(|v| !v.is_empty()))
    };

    if args.sub_category.is_none() {
        args.sub_category = optional("Sub-category (optional)")?;
    }
    if args.reference.is_none() {
        args.reference = optional("Supplier reference (optional)")?;
    }
    if args.dimensions.is_none() {
        args.dimensions = optional("Dimensions (optional)")?;
    }
    Ok(args)
}

/// `Some("")` clears an optional field
fn optional_update(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| {
        let v = v.trim().to_string();
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    })
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CatalogContext::open(global)?;

    let purchase_price = args
        .price
        .map(|raw| parse_price(&raw).ok_or(crate::core::error::CatalogError::InvalidPrice(raw)))
        .transpose()?;

    let update = ProductUpdate {
        category: args.category,
        sub_category: optional_update(args.sub_category),
        designation: args.designation,
        dimensions: optional_update(args.dimensions),
        purchase_price,
        supplier_reference: optional_update(args.reference),
        ..Default::default()
    };

    if update.is_empty() {
        return Err(miette::miette!(
            "Nothing to change. Pass at least one of --category, --designation, --price, --sub-category, --dimensions, --reference"
        ));
    }

    ctx.db.update_product(args.id, &update)?;
    success(global.quiet, format!("Updated product {}", style(args.id).cyan()));
    Ok(())
}

fn run_set_active(id: i64, active: bool, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CatalogContext::open(global)?;
    if active {
        ctx.db.reactivate_product(id)?;
        success(global.quiet, format!("Restored product {}", style(id).cyan()));
    } else {
        ctx.db.deactivate_product(id)?;
        success(
            global.quiet,
            format!("Deactivated product {} (use 'product restore' to undo)", style(id).cyan()),
        );
    }
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CatalogContext::open(global)?;
    let product = ctx.db.require_product(args.id)?;

    if !args.yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Delete product {} '{}' permanently?",
                product.id, product.designation
            ))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    ctx.db.delete_product(args.id)?;
    success(global.quiet, format!("Deleted product {}", style(args.id).cyan()));
    Ok(())
}

fn run_attach(args: AttachArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CatalogContext::open(global)?;
    let kind = DocumentKind::from(args.kind);

    let stored = match (&args.file, args.detach) {
        (_, true) => None,
        (Some(file), false) => {
            if !file.is_file() {
                return Err(miette::miette!("File not found: {}", file.display()));
            }
            Some(ctx.data_dir.to_relative(file)?)
        }
        (None, false) => return Err(miette::miette!("Give a file to attach, or --detach")),
    };

    let update = ProductUpdate::default().with_document(kind, stored.clone());
    ctx.db.update_product(args.id, &update)?;

    match stored {
        Some(path) => success(
            global.quiet,
            format!(
                "Attached {} {} to product {}",
                kind.label(),
                style(path).yellow(),
                style(args.id).cyan()
            ),
        ),
        None => success(
            global.quiet,
            format!("Detached {} from product {}", kind.label(), style(args.id).cyan()),
        ),
    }
    Ok(())
}

fn run_path(args: PathArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = CatalogContext::open(global)?;
    let product = ctx.db.require_product(args.id)?;
    let kind = DocumentKind::from(args.kind);

    let stored = product
        .document(kind)
        .ok_or_else(|| miette::miette!("Product {} has no {}", args.id, kind.label()))?;
    let file = ctx.data_dir.resolve(stored);
    if !file.is_file() {
        tracing::warn!("{} does not exist", file.display());
    }
    println!("{}", file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_update_clears_on_empty() {
        assert_eq!(optional_update(None), None);
        assert_eq!(optional_update(Some("  ".into())), Some(None));
        assert_eq!(
            optional_update(Some(" 2040x930 ".into())),
            Some(Some("2040x930".into()))
        );
    }

    #[test]
    fn test_list_columns_match_definitions() {
        let all = ListColumn::value_variants();
        for column in all {
            assert!(
                PRODUCT_COLUMNS.iter().any(|c| c.key == column.key()),
                "{:?} has no column definition",
                column
            );
        }
    }

    #[test]
    fn test_product_row_marks_missing_documents() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("present.pdf"), b"%PDF").unwrap();
        let data_dir = DataDir::new(tmp.path());

        let product = Product {
            id: 3,
            category: "Portes".into(),
            sub_category: None,
            designation: "Bloc-porte".into(),
            dimensions: None,
            purchase_price: 100.0,
            supplier_reference: None,
            active: true,
            datasheet_path: Some("present.pdf".into()),
            quote_path: Some("absent.pdf".into()),
            created: chrono::Utc::now(),
            updated: chrono::Utc::now(),
        };

        let row = product_row(&product, 20.0, &data_dir);
        assert!(matches!(row.get("datasheet"), Some(CellValue::Document(_, true))));
        assert!(matches!(row.get("quote"), Some(CellValue::Document(_, false))));
        assert!(matches!(row.get("sale-price"), Some(CellValue::Price(p)) if (*p - 120.0).abs() < 1e-9));
    }
}
