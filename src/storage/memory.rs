//! In-memory animal store
//!
//! Thread-safe `HashMap` behind an `RwLock`. Used by tests and by callers
//! embedding the pedigree engine over records they already hold.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::store::{AnimalStore, ChildQuery, Page, StoreError};
use crate::domain::{Animal, AnimalId};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    animals: Arc<RwLock<HashMap<AnimalId, Animal>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            animals: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a store holding the given animals, without any validation
    pub fn with_animals(animals: impl IntoIterator<Item = Animal>) -> Self {
        let map = animals
            .into_iter()
            .map(|animal| (animal.id.clone(), animal))
            .collect();

        Self {
            animals: Arc::new(RwLock::new(map)),
        }
    }
}

impl AnimalStore for MemoryStore {
    fn get(&self, id: &AnimalId) -> Result<Option<Animal>, StoreError> {
        let animals = self.animals.read().map_err(|_| StoreError::Lock)?;
        Ok(animals.get(id).cloned())
    }

    fn find_children(&self, query: &ChildQuery) -> Result<Page<Animal>, StoreError> {
        let animals = self.animals.read().map_err(|_| StoreError::Lock)?;

        let mut matches: Vec<&Animal> = animals.values().filter(|a| query.matches(a)).collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let total_count = matches.len();
        let items = matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();

        Ok(Page {
            items,
            total_count,
            limit: query.limit,
            offset: query.offset,
        })
    }

    fn upsert(&self, animal: &Animal) -> Result<(), StoreError> {
        let mut animals = self.animals.write().map_err(|_| StoreError::Lock)?;

        if animals
            .values()
            .any(|other| other.id != animal.id && other.name == animal.name)
        {
            return Err(StoreError::Constraint(format!(
                "name '{}' is already registered",
                animal.name
            )));
        }

        animals.insert(animal.id.clone(), animal.clone());
        Ok(())
    }
}
