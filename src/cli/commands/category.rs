//! `chiffrage category` command - Manage product categories

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::{print_structured, CatalogContext};
use crate::cli::helpers::success;
use crate::cli::table::{CellValue, ColumnDef, TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// List categories with their product counts
    List {
        /// Also list the sub-categories in use
        #[arg(long, short = 's')]
        sub_categories: bool,
    },

    /// Register a new category
    Add {
        name: String,
    },

    /// Rename a category; its products follow
    Rename {
        old: String,
        new: String,
    },

    /// Remove a category that no product uses
    Remove {
        name: String,
    },
}

const CATEGORY_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("name", "CATEGORY", 30),
    ColumnDef::new("products", "PRODUCTS", 10),
    ColumnDef::new("sub-categories", "SUB-CATEGORIES", 50),
];

pub fn run(cmd: CategoryCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CategoryCommands::List { sub_categories } => run_list(sub_categories, global),
        CategoryCommands::Add { name } => {
            let mut ctx = CatalogContext::open(global)?;
            ctx.db.add_category(&name)?;
            success(global.quiet, format!("Added category {}", style(name.trim()).yellow()));
            Ok(())
        }
        CategoryCommands::Rename { old, new } => {
            let mut ctx = CatalogContext::open(global)?;
            ctx.db.rename_category(&old, &new)?;
            success(
                global.quiet,
                format!(
                    "Renamed category {} {} {}",
                    style(&old).yellow(),
                    style("→").dim(),
                    style(new.trim()).yellow()
                ),
            );
            Ok(())
        }
        CategoryCommands::Remove { name } => {
            let mut ctx = CatalogContext::open(global)?;
            ctx.db.remove_category(&name)?;
            success(global.quiet, format!("Removed category {}", style(&name).yellow()));
            Ok(())
        }
    }
}

fn run_list(with_sub_categories: bool, global: &GlobalOpts) -> Result<()> {
    let ctx = CatalogContext::open(global)?;
    let categories = ctx.db.list_categories()?;

    let format = match ctx.format(global) {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };
    if print_structured(&categories, format)? {
        return Ok(());
    }

    let mut rows = Vec::with_capacity(categories.len());
    for category in &categories {
        let mut row = TableRow::new(&category.name)
            .cell("name", CellValue::Category(category.name.clone()))
            .cell("products", CellValue::Number(category.product_count as i64));
        if with_sub_categories {
            let subs = ctx.db.sub_categories(&category.name)?;
            row = row.cell(
                "sub-categories",
                if subs.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(subs.join(", "))
                },
            );
        }
        rows.push(row);
    }

    let visible: &[&str] = if with_sub_categories {
        &["name", "products", "sub-categories"]
    } else {
        &["name", "products"]
    };
    let config = if global.quiet {
        TableConfig::for_pipe()
    } else {
        TableConfig::default()
    };
    TableFormatter::new(CATEGORY_COLUMNS, "category")
        .with_config(config)
        .output(rows, format, visible);
    Ok(())
}
