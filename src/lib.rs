//! DestriChiffrage: product catalog and quoting toolkit
//!
//! Keeps a SQLite catalog of products with their technical data sheets and
//! supplier quotes, exchanges it with spreadsheets as semicolon CSV, and
//! prices selections of products into DPGF exports.

pub mod cli;
pub mod core;
