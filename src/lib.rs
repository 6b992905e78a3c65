//! Studbook - A breeding registry with a pedigree engine
//!
//! Tracks animals and their sire/dam references, assigns offspring
//! classifications from the parents', and answers ancestry questions:
//! bounded cycle-safe ancestry trees, direct offspring, breeding
//! compatibility and stand-alone HTML pedigree documents.

pub mod domain;
pub mod storage;
pub mod pedigree;
pub mod cli;

pub use domain::{Animal, AnimalId, Classification, Gender};
pub use pedigree::{Pedigree, PedigreeError};
