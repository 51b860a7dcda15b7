//! Core module - catalog storage, quoting and file exchange

pub mod associate;
pub mod cart;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod matching;
pub mod paths;
pub mod transfer;
pub mod workspace;

pub use associate::{associate, AssociationOptions, AssociationReport};
pub use cart::{Cart, CartItem};
pub use config::Config;
pub use db::Database;
pub use error::CatalogError;
pub use paths::DataDir;
pub use transfer::Encoding;
pub use workspace::Workspace;
