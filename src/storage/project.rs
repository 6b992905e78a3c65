//! Project management
//!
//! Handles project initialization and provides access to the registry.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{Config, SqliteStore};
use crate::pedigree::Limits;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a studbook project. Run 'studbook init' first.")]
    NotInProject,
}

/// A studbook project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(".studbook").is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let studbook_dir = root.join(".studbook");

        fs::create_dir_all(&studbook_dir).with_context(|| {
            format!(
                "Failed to create .studbook directory: {}",
                studbook_dir.display()
            )
        })?;

        let config_path = studbook_dir.join("config.toml");
        if !config_path.exists() {
            let default_config = r#"# studbook configuration

# Generations shown by 'studbook tree' and 'studbook render' by default
default_tree_depth = 3

[limits]
# Deepest ancestry query accepted
max_tree_depth = 10
# Deepest rendered pedigree document accepted
max_render_depth = 5
# Page size bounds for 'studbook children'
max_children_limit = 200
default_children_limit = 50
"#;
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = studbook_dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = r#"# SQLite write-ahead files
registry.db-wal
registry.db-shm
"#;
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        let project = Self::open(root)?;

        // Create the database up front so the schema exists after init
        project.store()?;

        Ok(project)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .studbook directory path
    pub fn studbook_dir(&self) -> PathBuf {
        self.root.join(".studbook")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the configured pedigree limits
    pub fn limits(&self) -> Limits {
        self.config.project.limits.clone()
    }

    /// Returns the path to the registry database
    pub fn db_path(&self) -> PathBuf {
        self.studbook_dir().join("registry.db")
    }

    /// Opens the registry database
    pub fn store(&self) -> Result<SqliteStore> {
        let path = self.db_path();
        SqliteStore::open(&path)
            .with_context(|| format!("Failed to open registry: {}", path.display()))
    }
}
