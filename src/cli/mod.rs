//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Registry setup | `init`, `check` |
//! | Animal | Record management | `animal add`, `animal update`, `animal show` |
//! | Pedigree | Ancestry queries | `tree`, `children`, `compat`, `render` |
//! | Classification | Inheritance lookup | `resolve` |
//!
//! Commands that take an animal accept either its ID (`h-1a2b3c4`) or its
//! exact registered name.
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! The default can be changed with `default_format` in the global config.
//!
//! ## Logging
//!
//! Logs go to stderr. `--verbose` (or `-v`) enables debug logging; `RUST_LOG`
//! overrides both:
//! ```bash
//! studbook --verbose tree "Northern Dancer"
//! RUST_LOG=studbook=trace studbook check
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod animal;
mod pedigree_cmd;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
