//! Domain models for the registry
//!
//! Contains the core record types and pure rules without any I/O concerns.

mod id;
mod animal;
mod classification;
mod graph;
mod parentage;

pub use id::{AnimalId, IdError};
pub use animal::{Animal, AnimalUpdate, Gender, NewAnimal};
pub use classification::{resolve, Classification};
pub use graph::{integrity_issues, IntegrityIssue, ParentGraph, ParentRole};
pub use parentage::{check_parents, ParentageError};
