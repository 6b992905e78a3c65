//! # Storage Layer
//!
//! Persistence for the registry and its configuration.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Animals | SQLite | `.studbook/registry.db` |
//! | Config | TOML | `.studbook/config.toml` |
//!
//! ## Project Structure
//!
//! ```text
//! .studbook/
//! ├── registry.db           # Animal records (source of truth)
//! ├── config.toml           # Project configuration
//! └── .gitignore            # Ignores SQLite WAL files
//! ```
//!
//! ## Key Types
//!
//! - [`AnimalStore`] - The record interface the pedigree engine reads through
//! - [`SqliteStore`] - The registry database
//! - [`MemoryStore`] - In-memory records for tests and embedding
//! - [`Project`] - Entry point for accessing a registry on disk
//! - [`Config`] - Project and global configuration

mod store;
mod memory;
mod sqlite;
mod config;
mod project;

pub use store::{AnimalStore, ChildQuery, Page, StoreError, MAX_OFFSET};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig};
pub use project::{Project, ProjectError};
