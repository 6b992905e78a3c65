//! Record store interface
//!
//! The pedigree engine reads animals through this narrow trait and writes
//! back only through [`AnimalStore::upsert`]. Uniqueness and referential
//! protection belong to the implementation.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Animal, AnimalId, Classification, Gender};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Store lock poisoned")]
    Lock,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Largest page offset a store accepts; SQLite binds offsets as `i64`
pub const MAX_OFFSET: usize = i64::MAX as usize;

/// Query for the direct children of an animal
#[derive(Debug, Clone)]
pub struct ChildQuery {
    /// Matches animals whose sire or dam is this animal
    pub parent: AnimalId,
    pub gender: Option<Gender>,
    pub breeder: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl ChildQuery {
    pub fn new(parent: AnimalId, limit: usize) -> Self {
        Self {
            parent,
            gender: None,
            breeder: None,
            limit,
            offset: 0,
        }
    }

    /// Returns true if the animal satisfies the query, ignoring pagination
    pub fn matches(&self, animal: &Animal) -> bool {
        animal.id != self.parent
            && animal.is_child_of(&self.parent)
            && self.gender.map_or(true, |g| animal.gender == g)
            && self
                .breeder
                .as_ref()
                .map_or(true, |b| animal.breeder.as_ref() == Some(b))
    }
}

/// One page of query results plus the unpaginated match count
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<T> Page<T> {
    /// Returns true if more matches exist past this page
    pub fn has_more(&self) -> bool {
        self.offset.saturating_add(self.items.len()) < self.total_count
    }
}

/// Key-addressed store of animal records
pub trait AnimalStore {
    /// Point lookup by identifier
    fn get(&self, id: &AnimalId) -> Result<Option<Animal>, StoreError>;

    /// Looks up only the classification of an animal
    fn classification_of(&self, id: &AnimalId) -> Result<Option<Classification>, StoreError> {
        Ok(self.get(id)?.map(|animal| animal.classification))
    }

    /// Animals whose sire or dam is `query.parent`, ordered by name
    fn find_children(&self, query: &ChildQuery) -> Result<Page<Animal>, StoreError>;

    /// Inserts or replaces a record
    fn upsert(&self, animal: &Animal) -> Result<(), StoreError>;
}
