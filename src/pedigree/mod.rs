//! # Pedigree Engine
//!
//! Ancestry-aware operations over an [`AnimalStore`]:
//!
//! | Operation | Module |
//! |-----------|--------|
//! | Offspring classification | [`crate::domain::resolve`] |
//! | Bounded, cycle-safe ancestry trees | `traversal` |
//! | Direct children with filters and paging | `offspring` |
//! | Breeding compatibility | `compatibility` |
//! | HTML pedigree documents | `render` |
//! | Validated create/update | `registration` |
//!
//! [`Pedigree`] bundles a store with the configured [`Limits`]; depth and
//! page-size limits are checked before the store is touched.
//!
//! All state is per call. The only bookkeeping a traversal keeps is the set
//! of identifiers on its current root-to-node path.

mod traversal;
mod offspring;
mod compatibility;
mod render;
mod registration;

pub use traversal::{build_tree, AncestryNode, Traversal};
pub use offspring::{find_children, ChildFilter};
pub use compatibility::{evaluate, CompatibilityResult, RiskLevel, COMPATIBILITY_DEPTH};
pub use render::{escape_html, render_document};
pub use registration::{register, update};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    resolve, Animal, AnimalId, AnimalUpdate, Classification, NewAnimal, ParentageError,
};
use crate::storage::{AnimalStore, Page, StoreError};

#[derive(Debug, Error)]
pub enum PedigreeError {
    #[error("Depth {depth} is out of range (allowed 0-{max})")]
    InvalidDepth { depth: u32, max: u32 },

    #[error("Limit {limit} is out of range (allowed 1-{max})")]
    InvalidLimit { limit: usize, max: usize },

    #[error("Offset {offset} is out of range (allowed 0-{max})")]
    InvalidOffset { offset: usize, max: usize },

    #[error("No unused ID left for '{0}'")]
    IdSpaceExhausted(String),

    #[error("Animal not found: {0}")]
    AnimalNotFound(AnimalId),

    #[error("Invalid breeding pair: {0}")]
    InvalidPair(String),

    #[error(transparent)]
    Parentage(#[from] ParentageError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resource limits applied before any store access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Deepest ancestry query accepted
    pub max_tree_depth: u32,

    /// Deepest rendered document accepted
    pub max_render_depth: u32,

    /// Largest page size for child queries
    pub max_children_limit: usize,

    /// Page size when the caller gives none
    pub default_children_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_tree_depth: 10,
            max_render_depth: 5,
            max_children_limit: 200,
            default_children_limit: 50,
        }
    }
}

fn check_depth(depth: u32, max: u32) -> Result<(), PedigreeError> {
    if depth > max {
        return Err(PedigreeError::InvalidDepth { depth, max });
    }
    Ok(())
}

/// The pedigree engine over a borrowed store
pub struct Pedigree<'s, S: AnimalStore + ?Sized> {
    store: &'s S,
    limits: Limits,
}

impl<'s, S: AnimalStore + ?Sized> Pedigree<'s, S> {
    pub fn new(store: &'s S, limits: Limits) -> Self {
        Self { store, limits }
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Offspring classification for a parent pair; `None` means unknown
    pub fn resolve_classification(
        &self,
        sire: Option<Classification>,
        dam: Option<Classification>,
    ) -> Option<Classification> {
        resolve(sire, dam)
    }

    /// Classification on file for an animal
    pub fn classification_of(&self, id: &AnimalId) -> Result<Classification, PedigreeError> {
        self.store
            .classification_of(id)?
            .ok_or_else(|| PedigreeError::AnimalNotFound(id.clone()))
    }

    /// Ancestry traversal keeping "not found" and "cyclic" apart
    pub fn trace(&self, id: &AnimalId, depth: u32) -> Result<Traversal, PedigreeError> {
        check_depth(depth, self.limits.max_tree_depth)?;
        Ok(build_tree(self.store, id, depth)?)
    }

    /// Ancestry tree, or `None` if the animal is unknown or its ancestry is cyclic
    pub fn ancestry_tree(
        &self,
        id: &AnimalId,
        depth: u32,
    ) -> Result<Option<AncestryNode>, PedigreeError> {
        Ok(self.trace(id, depth)?.into_tree())
    }

    /// Direct children of an animal
    pub fn children(&self, id: &AnimalId, filter: &ChildFilter) -> Result<Page<Animal>, PedigreeError> {
        find_children(self.store, id, filter, &self.limits)
    }

    /// Evaluates a proposed mating
    ///
    /// Fails if either animal is unknown, if both are the same animal, or if
    /// the sire is not male or the dam not female.
    pub fn evaluate_compatibility(
        &self,
        sire_id: &AnimalId,
        dam_id: &AnimalId,
    ) -> Result<CompatibilityResult, PedigreeError> {
        if sire_id == dam_id {
            return Err(PedigreeError::InvalidPair(
                "sire and dam must be different animals".to_string(),
            ));
        }

        let sire = self.require(sire_id)?;
        let dam = self.require(dam_id)?;

        if !sire.gender.can_sire() {
            return Err(PedigreeError::InvalidPair(format!(
                "{} ({}) is {}, not a breeding male",
                sire.name, sire.id, sire.gender
            )));
        }
        if !dam.gender.can_dam() {
            return Err(PedigreeError::InvalidPair(format!(
                "{} ({}) is {}, not a breeding female",
                dam.name, dam.id, dam.gender
            )));
        }

        Ok(evaluate(self.store, &sire, &dam)?)
    }

    /// Renders the ancestry of an animal as a stand-alone HTML page
    ///
    /// Unknown animals and cyclic ancestry produce an error page, not an `Err`.
    pub fn render_ancestry_document(
        &self,
        id: &AnimalId,
        depth: u32,
    ) -> Result<String, PedigreeError> {
        check_depth(depth, self.limits.max_render_depth)?;
        let traversal = build_tree(self.store, id, depth)?;
        Ok(render_document(&traversal))
    }

    /// Registers a new animal
    pub fn register(&self, input: NewAnimal) -> Result<Animal, PedigreeError> {
        register(self.store, input)
    }

    /// Applies changes to an existing animal
    pub fn update(&self, id: &AnimalId, changes: AnimalUpdate) -> Result<Animal, PedigreeError> {
        update(self.store, id, changes)
    }

    fn require(&self, id: &AnimalId) -> Result<Animal, PedigreeError> {
        self.store
            .get(id)?
            .ok_or_else(|| PedigreeError::AnimalNotFound(id.clone()))
    }
}
