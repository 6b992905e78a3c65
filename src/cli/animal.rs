//! Animal CLI commands

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Subcommand;

use super::output::Output;
use crate::domain::{Animal, AnimalId, AnimalUpdate, Classification, Gender, NewAnimal};
use crate::pedigree::Pedigree;
use crate::storage::{AnimalStore, ChildQuery, Project, SqliteStore, StoreError};

#[derive(Subcommand)]
pub enum AnimalCommands {
    /// Register a new animal
    Add {
        /// Registered name (must be unique)
        name: String,

        /// Gender (male, female, neutered)
        #[arg(long, short)]
        gender: Gender,

        /// Classification (A, B, C, AB); derived when both parents are given
        #[arg(long = "class", short)]
        classification: Option<Classification>,

        /// Sire ID or name
        #[arg(long)]
        sire: Option<String>,

        /// Dam ID or name
        #[arg(long)]
        dam: Option<String>,

        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        born: Option<NaiveDate>,

        #[arg(long)]
        color: Option<String>,

        /// Breeder reference
        #[arg(long)]
        breeder: Option<String>,
    },

    /// Change an animal's details or parents
    Update {
        /// Animal ID or name
        animal: String,

        /// New registered name
        #[arg(long)]
        name: Option<String>,

        /// Classification; ignored when both parents are on file
        #[arg(long = "class", short)]
        classification: Option<Classification>,

        /// Sire ID or name
        #[arg(long, conflicts_with = "no_sire")]
        sire: Option<String>,

        /// Remove the sire reference
        #[arg(long)]
        no_sire: bool,

        /// Dam ID or name
        #[arg(long, conflicts_with = "no_dam")]
        dam: Option<String>,

        /// Remove the dam reference
        #[arg(long)]
        no_dam: bool,

        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        born: Option<NaiveDate>,

        #[arg(long)]
        color: Option<String>,

        /// Breeder reference
        #[arg(long)]
        breeder: Option<String>,
    },

    /// Show animal details
    Show {
        /// Animal ID or name
        animal: String,
    },

    /// List registered animals
    List {
        /// Filter by gender
        #[arg(long, short)]
        gender: Option<Gender>,

        /// Filter by breeder
        #[arg(long, short)]
        breeder: Option<String>,
    },

    /// Remove an animal with no registered children
    Remove {
        /// Animal ID or name
        animal: String,
    },
}

pub fn run(cmd: AnimalCommands, output: &Output) -> Result<()> {
    match cmd {
        AnimalCommands::Add {
            name,
            gender,
            classification,
            sire,
            dam,
            born,
            color,
            breeder,
        } => {
            let project = Project::open_current()?;
            let store = project.store()?;

            let input = NewAnimal {
                name,
                gender: Some(gender),
                classification,
                sire: sire.map(|s| find_animal(&store, &s).map(|a| a.id)).transpose()?,
                dam: dam.map(|d| find_animal(&store, &d).map(|a| a.id)).transpose()?,
                birth_date: born,
                color,
                breeder,
            };

            let pedigree = Pedigree::new(&store, project.limits());
            let animal = pedigree.register(input)?;

            if output.is_json() {
                output.data(&animal);
            } else {
                output.success(&format!(
                    "Registered {} ({}), class {}",
                    animal.name, animal.id, animal.classification
                ));
            }
            Ok(())
        }

        AnimalCommands::Update {
            animal,
            name,
            classification,
            sire,
            no_sire,
            dam,
            no_dam,
            born,
            color,
            breeder,
        } => {
            let project = Project::open_current()?;
            let store = project.store()?;
            let target = find_animal(&store, &animal)?;

            let changes = AnimalUpdate {
                name,
                classification,
                sire: parent_change(&store, sire, no_sire)?,
                dam: parent_change(&store, dam, no_dam)?,
                birth_date: born.map(Some),
                color: color.map(Some),
                breeder: breeder.map(Some),
            };
            output.verbose_ctx(
                "animal update",
                &format!("{}: parents changed = {}", target.id, changes.changes_parents()),
            );

            let pedigree = Pedigree::new(&store, project.limits());
            let updated = pedigree.update(&target.id, changes)?;

            if output.is_json() {
                output.data(&updated);
            } else {
                output.success(&format!(
                    "Updated {} ({}), class {}",
                    updated.name, updated.id, updated.classification
                ));
            }
            Ok(())
        }

        AnimalCommands::Show { animal } => show(output, &animal),

        AnimalCommands::List { gender, breeder } => {
            let project = Project::open_current()?;
            let store = project.store()?;
            let animals = store.list(gender, breeder.as_deref())?;

            if output.is_json() {
                output.data(&animals);
            } else if animals.is_empty() {
                println!("No animals found.");
            } else {
                print_table(&animals);
            }
            Ok(())
        }

        AnimalCommands::Remove { animal } => {
            let project = Project::open_current()?;
            let store = project.store()?;
            let target = find_animal(&store, &animal)?;

            match store.delete(&target.id) {
                Err(StoreError::Constraint(_)) => {
                    bail!("Cannot remove {}: it is registered as a parent", target.name)
                }
                result => {
                    result.with_context(|| format!("Failed to remove {}", target.name))?;
                }
            }
            output.success(&format!("Removed {} ({})", target.name, target.id));
            Ok(())
        }
    }
}

fn show(output: &Output, key: &str) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.store()?;
    let animal = find_animal(&store, key)?;

    let sire = parent_of(&store, animal.sire.as_ref())?;
    let dam = parent_of(&store, animal.dam.as_ref())?;
    let children = store.find_children(&ChildQuery::new(animal.id.clone(), 1))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "animal": animal,
            "sire_name": sire.map(|s| s.name),
            "dam_name": dam.map(|d| d.name),
            "children": children.total_count,
        }));
        return Ok(());
    }

    println!("Animal: {} ({})", animal.name, animal.id);
    println!("Gender: {}", animal.gender);
    println!("Class: {}", animal.classification);
    if let Some(born) = animal.birth_date {
        println!("Born: {}", born.format("%Y-%m-%d"));
    }
    if let Some(color) = &animal.color {
        println!("Color: {}", color);
    }
    if let Some(breeder) = &animal.breeder {
        println!("Breeder: {}", breeder);
    }
    println!("Sire: {}", describe_parent(animal.sire.as_ref(), sire.as_ref()));
    println!("Dam: {}", describe_parent(animal.dam.as_ref(), dam.as_ref()));
    println!("Children: {}", children.total_count);
    println!("Updated: {}", animal.updated_at.format("%Y-%m-%d %H:%M"));

    Ok(())
}

/// Prints animals as an aligned table
pub(super) fn print_table(animals: &[Animal]) {
    println!("{:<10} {:<9} {:<5} {:<6} NAME", "ID", "GENDER", "CLASS", "BORN");
    println!("{}", "-".repeat(60));
    for animal in animals {
        let born = animal
            .birth_year()
            .map(|y| y.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:<9} {:<5} {:<6} {}",
            animal.id, animal.gender, animal.classification, born, animal.name
        );
    }
}

/// Looks up an animal by ID, falling back to an exact name match
pub(super) fn find_animal(store: &SqliteStore, key: &str) -> Result<Animal> {
    match lookup_animal(store, key)? {
        Some(animal) => Ok(animal),
        None => bail!("Animal not found: {}", key),
    }
}

pub(super) fn lookup_animal(store: &SqliteStore, key: &str) -> Result<Option<Animal>> {
    if let Ok(id) = key.parse::<AnimalId>() {
        if let Some(animal) = store.get(&id)? {
            return Ok(Some(animal));
        }
    }

    Ok(store.find_by_name(key)?)
}

fn parent_change(
    store: &SqliteStore,
    key: Option<String>,
    clear: bool,
) -> Result<Option<Option<AnimalId>>> {
    if clear {
        return Ok(Some(None));
    }
    match key {
        Some(key) => Ok(Some(Some(find_animal(store, &key)?.id))),
        None => Ok(None),
    }
}

fn parent_of(store: &SqliteStore, id: Option<&AnimalId>) -> Result<Option<Animal>> {
    match id {
        Some(id) => Ok(store.get(id)?),
        None => Ok(None),
    }
}

fn describe_parent(id: Option<&AnimalId>, parent: Option<&Animal>) -> String {
    match (id, parent) {
        (_, Some(parent)) => format!("{} ({})", parent.name, parent.id),
        (Some(id), None) => format!("{} (missing)", id),
        (None, None) => "unknown".to_string(),
    }
}
