//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    associate::AssociateArgs, cart::CartCommands, category::CategoryCommands,
    completions::CompletionsArgs, config::ConfigCommands, db::DbCommands, export::ExportArgs,
    import::ImportArgs, init::InitArgs, param::ParamCommands, product::ProductCommands,
};

#[derive(Parser)]
#[command(name = "chiffrage")]
#[command(author, version, about = "DestriChiffrage - product catalog and quoting")]
#[command(long_about = "Keeps a catalog of products with their technical data sheets and supplier quotes, \
exchanges it with spreadsheets as CSV and prices selections of products into DPGF exports.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Catalog root (default: auto-detect by finding .chiffrage/)
    #[arg(long, global = true, env = "CHIFFRAGE_CATALOG")]
    pub catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new catalog
    Init(InitArgs),

    /// Browse and edit products
    #[command(subcommand)]
    Product(ProductCommands),

    /// Manage product categories
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Read and change catalog parameters (margin, data directory, ...)
    #[command(subcommand)]
    Param(ParamCommands),

    /// Import products from a semicolon CSV file
    Import(ImportArgs),

    /// Export the catalog as a semicolon CSV file
    Export(ExportArgs),

    /// Price a selection of products and export it as a DPGF
    #[command(subcommand)]
    Cart(CartCommands),

    /// Attach PDFs to products by matching their text against designations
    Associate(AssociateArgs),

    /// Database maintenance
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, table for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Aligned columns for the terminal
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}
