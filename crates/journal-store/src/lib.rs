//! SQLite persistence for journals, uploads, sessions and trades.

pub mod db;
pub mod journals;
mod models;
pub mod options;
pub mod repository;

pub use db::JournalDb;
pub use options::{CustomOptions, OptionKind, SqliteOptionStore};
