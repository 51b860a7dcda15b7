//! CLI command implementations

pub mod utils;

pub mod associate;
pub mod cart;
pub mod category;
pub mod completions;
pub mod config;
pub mod db;
pub mod export;
pub mod import;
pub mod init;
pub mod param;
pub mod product;
