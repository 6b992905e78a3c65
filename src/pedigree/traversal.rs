//! Ancestry traversal
//!
//! Materializes an animal's ancestry to a bounded depth by point lookups
//! into the store. Records reference parents by identifier only, so the tree
//! is built fresh per call and never holds pointers back into the store.
//!
//! The cycle guard tracks the identifiers on the current root-to-node path.
//! Each materialized node's sire and dam references are checked against that
//! path before anything else, independently of the remaining depth. A hit
//! aborts the whole traversal: corrupted ancestry yields no tree at all.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

use crate::domain::{Animal, AnimalId, Classification, Gender};
use crate::storage::{AnimalStore, StoreError};

/// One animal in an ancestry tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AncestryNode {
    pub id: AnimalId,
    pub name: String,
    pub gender: Gender,
    pub classification: Classification,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub breeder: Option<String>,

    /// Absent at depth 0 and when the sire is unknown or unresolvable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sire: Option<Box<AncestryNode>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dam: Option<Box<AncestryNode>>,
}

impl AncestryNode {
    /// Creates a leaf node from a record
    pub fn leaf(animal: &Animal) -> Self {
        Self {
            id: animal.id.clone(),
            name: animal.name.clone(),
            gender: animal.gender,
            classification: animal.classification,
            birth_date: animal.birth_date,
            color: animal.color.clone(),
            breeder: animal.breeder.clone(),
            sire: None,
            dam: None,
        }
    }

    pub fn birth_year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.birth_date.map(|d| d.year())
    }

    /// Returns true if neither parent branch is present
    pub fn is_leaf(&self) -> bool {
        self.sire.is_none() && self.dam.is_none()
    }

    /// Iterates over the present parent branches, sire first
    pub fn branches(&self) -> impl Iterator<Item = &AncestryNode> {
        self.sire.iter().chain(self.dam.iter()).map(|b| &**b)
    }

    /// Identifiers of every ancestor in the tree, excluding this node
    pub fn ancestor_ids(&self) -> BTreeSet<AnimalId> {
        let mut ids = BTreeSet::new();
        let mut stack: Vec<&AncestryNode> = self.branches().collect();

        while let Some(node) = stack.pop() {
            ids.insert(node.id.clone());
            stack.extend(node.branches());
        }

        ids
    }

    /// Number of generations in the tree, counting this node as one
    pub fn generations(&self) -> usize {
        1 + self.branches().map(|b| b.generations()).max().unwrap_or(0)
    }
}

/// Outcome of an ancestry traversal
#[derive(Debug, Clone, PartialEq)]
pub enum Traversal {
    Found(AncestryNode),

    /// The root identifier does not resolve to a record
    NotFound(AnimalId),

    /// `animal` references `ancestor`, which is already on its own ancestry path
    Cyclic { animal: AnimalId, ancestor: AnimalId },
}

impl Traversal {
    /// Collapses "not found" and "cyclic" into `None`
    pub fn into_tree(self) -> Option<AncestryNode> {
        match self {
            Traversal::Found(node) => Some(node),
            Traversal::NotFound(_) | Traversal::Cyclic { .. } => None,
        }
    }

    pub fn is_cyclic(&self) -> bool {
        matches!(self, Traversal::Cyclic { .. })
    }
}

/// Result of expanding one node
enum Step {
    Node(AncestryNode),
    Missing,
    Cycle { animal: AnimalId, ancestor: AnimalId },
}

/// Builds the ancestry tree of `id` down to `depth` generations of parents
///
/// A record that names itself as sire or dam is reported as
/// [`Traversal::Cyclic`] even at depth 0, since parent references are
/// checked before the depth bound.
///
/// Depth limits are the caller's concern; see [`super::Pedigree::trace`].
pub fn build_tree<S: AnimalStore + ?Sized>(
    store: &S,
    id: &AnimalId,
    depth: u32,
) -> Result<Traversal, StoreError> {
    let mut path = HashSet::new();

    match expand(store, id, depth, &mut path)? {
        Step::Node(node) => Ok(Traversal::Found(node)),
        Step::Missing => {
            debug!(animal = %id, "ancestry root not found");
            Ok(Traversal::NotFound(id.clone()))
        }
        Step::Cycle { animal, ancestor } => {
            warn!(
                root = %id,
                animal = %animal,
                ancestor = %ancestor,
                "cyclic ancestry detected; registry data needs repair"
            );
            Ok(Traversal::Cyclic { animal, ancestor })
        }
    }
}

fn expand<S: AnimalStore + ?Sized>(
    store: &S,
    id: &AnimalId,
    depth: u32,
    path: &mut HashSet<AnimalId>,
) -> Result<Step, StoreError> {
    let Some(animal) = store.get(id)? else {
        return Ok(Step::Missing);
    };

    path.insert(animal.id.clone());
    let step = expand_parents(store, &animal, depth, path);
    path.remove(&animal.id);

    step
}

fn expand_parents<S: AnimalStore + ?Sized>(
    store: &S,
    animal: &Animal,
    depth: u32,
    path: &mut HashSet<AnimalId>,
) -> Result<Step, StoreError> {
    // The path includes the animal itself, so self references land here too
    if let Some(ancestor) = animal.parents().find(|p| path.contains(*p)) {
        return Ok(Step::Cycle {
            animal: animal.id.clone(),
            ancestor: ancestor.clone(),
        });
    }

    let mut node = AncestryNode::leaf(animal);
    if depth == 0 {
        return Ok(Step::Node(node));
    }

    if let Some(sire_id) = &animal.sire {
        match expand(store, sire_id, depth - 1, path)? {
            Step::Node(sire) => node.sire = Some(Box::new(sire)),
            Step::Missing => debug!(animal = %animal.id, sire = %sire_id, "sire not found"),
            cycle @ Step::Cycle { .. } => return Ok(cycle),
        }
    }

    if let Some(dam_id) = &animal.dam {
        match expand(store, dam_id, depth - 1, path)? {
            Step::Node(dam) => node.dam = Some(Box::new(dam)),
            Step::Missing => debug!(animal = %animal.id, dam = %dam_id, "dam not found"),
            cycle @ Step::Cycle { .. } => return Ok(cycle),
        }
    }

    Ok(Step::Node(node))
}
