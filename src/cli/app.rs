//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{animal, pedigree_cmd};
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "studbook")]
#[command(author, version, about = "Breeding registry with pedigree analysis")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new registry
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage animals
    #[command(subcommand)]
    Animal(animal::AnimalCommands),

    /// Predict offspring classification from parent classifications
    Resolve {
        /// Sire classification (A, B, C, AB, unknown), or a registered animal
        sire: String,

        /// Dam classification (A, B, C, AB, unknown), or a registered animal
        dam: String,
    },

    /// Show the ancestry tree of an animal
    Tree {
        /// Animal ID or name
        animal: String,

        /// Generations of parents to include (0-10)
        #[arg(long, short)]
        depth: Option<u32>,
    },

    /// List the direct children of an animal
    Children {
        /// Animal ID or name
        animal: String,

        /// Filter by gender
        #[arg(long, short)]
        gender: Option<String>,

        /// Filter by breeder
        #[arg(long, short)]
        breeder: Option<String>,

        /// Page size
        #[arg(long, short)]
        limit: Option<usize>,

        /// Matches to skip
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Evaluate a proposed mating
    Compat {
        /// Sire ID or name
        sire: String,

        /// Dam ID or name
        dam: String,
    },

    /// Render an ancestry tree as a stand-alone HTML page
    Render {
        /// Animal ID or name
        animal: String,

        /// Generations of parents to include (0-5)
        #[arg(long, short)]
        depth: Option<u32>,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        out: Option<std::path::PathBuf>,
    },

    /// Scan the registry for corrupted parent references
    Check,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => Config::load()?.global.default_format.into(),
    };
    let output = Output::new(format);

    output.verbose("studbook starting");

    match cli.command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing registry at: {}", path));
            let project = Project::init(&path)?;
            output.verbose_ctx(
                "init",
                &format!("Created .studbook directory at: {}", project.studbook_dir().display()),
            );
            output.success(&format!(
                "Initialized studbook registry at {}",
                project.root().display()
            ));
        }

        Commands::Animal(cmd) => animal::run(cmd, &output)?,

        Commands::Resolve { sire, dam } => pedigree_cmd::resolve(&output, &sire, &dam)?,

        Commands::Tree { animal, depth } => pedigree_cmd::tree(&output, &animal, depth)?,

        Commands::Children {
            animal,
            gender,
            breeder,
            limit,
            offset,
        } => pedigree_cmd::children(
            &output,
            &animal,
            gender.as_deref(),
            breeder,
            limit,
            offset,
        )?,

        Commands::Compat { sire, dam } => pedigree_cmd::compat(&output, &sire, &dam)?,

        Commands::Render { animal, depth, out } => {
            pedigree_cmd::render(&output, &animal, depth, out.as_deref())?
        }

        Commands::Check => pedigree_cmd::check(&output)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}

/// Installs the stderr log subscriber; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let default = if verbose { "studbook=debug" } else { "studbook=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
