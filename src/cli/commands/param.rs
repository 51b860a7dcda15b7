//! `chiffrage param` command - Catalog parameters stored in the database
//!
//! Parameters travel with the catalog file, unlike configuration which is
//! per user or per checkout.

use clap::Subcommand;
use console::style;
use miette::Result;
use std::collections::BTreeMap;

use crate::cli::commands::utils::{print_structured, CatalogContext};
use crate::cli::helpers::success;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::db::{PARAM_DATA_DIR, PARAM_MARGIN, PARAM_THRESHOLD};

#[derive(Subcommand, Debug)]
pub enum ParamCommands {
    /// List all parameters
    List,

    /// Print one parameter's value
    Get {
        key: String,
    },

    /// Set a parameter (marge, repertoire_donnees, seuil_association, or any other key)
    Set {
        key: String,
        value: String,
    },
}

const KNOWN: &[(&str, &str)] = &[
    (PARAM_MARGIN, "Margin percentage applied to purchase prices"),
    (PARAM_DATA_DIR, "Directory holding attached documents (empty = catalog root)"),
    (PARAM_THRESHOLD, "Minimum word overlap for PDF association, in (0, 1]"),
];

pub fn run(cmd: ParamCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ParamCommands::List => run_list(global),
        ParamCommands::Get { key } => {
            let ctx = CatalogContext::open(global)?;
            let value = match key.as_str() {
                PARAM_MARGIN => Some(ctx.db.margin()?.to_string()),
                PARAM_THRESHOLD => Some(ctx.db.association_threshold()?.to_string()),
                _ => ctx.db.get_parameter(&key)?,
            };
            match value {
                Some(v) => {
                    println!("{}", v);
                    Ok(())
                }
                None => Err(miette::miette!("Parameter '{}' is not set", key)),
            }
        }
        ParamCommands::Set { key, value } => {
            let mut ctx = CatalogContext::open(global)?;
            ctx.db.set_parameter(&key, &value)?;
            success(
                global.quiet,
                format!(
                    "Set {} {} {}",
                    style(&key).cyan(),
                    style("→").dim(),
                    style(value.trim()).yellow()
                ),
            );
            Ok(())
        }
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let ctx = CatalogContext::open(global)?;
    let params: BTreeMap<String, String> = ctx.db.list_parameters()?.into_iter().collect();

    let format = ctx.format(global);
    if print_structured(&params, format)? {
        return Ok(());
    }
    if format == OutputFormat::Csv {
        println!("key,value");
        for (key, value) in &params {
            println!("{},{}", key, crate::cli::helpers::escape_csv(value));
        }
        return Ok(());
    }

    for (key, value) in &params {
        let shown = if value.is_empty() {
            style("(empty)".to_string()).dim()
        } else {
            style(value.clone()).yellow()
        };
        println!("  {:<22} {}", style(key).cyan(), shown);
        if let Some((_, description)) = KNOWN.iter().find(|(k, _)| *k == key.as_str()) {
            if !global.quiet {
                println!("  {:<22} {}", "", style(description).dim());
            }
        }
    }

    if !global.quiet {
        println!();
        println!(
            "  {} {}",
            style("Data directory in use:").dim(),
            ctx.data_dir.root().display()
        );
    }
    Ok(())
}
