//! Whole-registry parent graph
//!
//! Loads every sire/dam edge into a petgraph `DiGraph` (edge direction:
//! parent -> child) so the registry can be scanned for corrupted ancestry.
//! Unlike the bounded pedigree traversal, this sees the complete graph and
//! reports every cycle, not just the first one on a path.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::animal::{Animal, Gender};
use super::id::AnimalId;

/// Which parent reference an edge came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRole {
    Sire,
    Dam,
}

impl fmt::Display for ParentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentRole::Sire => write!(f, "sire"),
            ParentRole::Dam => write!(f, "dam"),
        }
    }
}

/// A problem found by [`integrity_issues`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// Animals whose ancestry loops back on itself
    Cycle { animals: Vec<AnimalId> },

    /// A parent reference pointing at no stored animal
    MissingParent {
        animal: AnimalId,
        role: ParentRole,
        parent: AnimalId,
    },

    SelfReference { animal: AnimalId, role: ParentRole },

    SameParent { animal: AnimalId, parent: AnimalId },

    /// A parent whose gender does not fit its role
    WrongGender {
        animal: AnimalId,
        role: ParentRole,
        parent: AnimalId,
        gender: Gender,
    },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::Cycle { animals } => {
                let ids: Vec<String> = animals.iter().map(|id| id.to_string()).collect();
                write!(f, "ancestry cycle through {}", ids.join(" -> "))
            }
            IntegrityIssue::MissingParent { animal, role, parent } => {
                write!(f, "{} references missing {} {}", animal, role, parent)
            }
            IntegrityIssue::SelfReference { animal, role } => {
                write!(f, "{} is recorded as its own {}", animal, role)
            }
            IntegrityIssue::SameParent { animal, parent } => {
                write!(f, "{} has {} as both sire and dam", animal, parent)
            }
            IntegrityIssue::WrongGender {
                animal,
                role,
                parent,
                gender,
            } => write!(f, "{} of {} is {} ({})", role, animal, parent, gender),
        }
    }
}

/// Parent graph over a set of animals
#[derive(Debug, Default)]
pub struct ParentGraph {
    graph: DiGraph<AnimalId, ParentRole>,

    node_map: HashMap<AnimalId, NodeIndex>,
}

impl ParentGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Builds the graph from a collection of animals
    ///
    /// References to animals outside the collection are skipped.
    pub fn from_animals<'a>(animals: impl IntoIterator<Item = &'a Animal>) -> Self {
        let mut graph = Self::new();

        // First pass: add all nodes
        let animals: Vec<_> = animals.into_iter().collect();
        for animal in &animals {
            graph.add_animal(animal.id.clone());
        }

        // Second pass: add all edges
        for animal in &animals {
            if let Some(sire) = &animal.sire {
                graph.link(sire, &animal.id, ParentRole::Sire);
            }
            if let Some(dam) = &animal.dam {
                graph.link(dam, &animal.id, ParentRole::Dam);
            }
        }

        graph
    }

    fn add_animal(&mut self, id: AnimalId) {
        if !self.node_map.contains_key(&id) {
            let idx = self.graph.add_node(id.clone());
            self.node_map.insert(id, idx);
        }
    }

    /// Adds a parent -> child edge; returns false if either end is unknown
    fn link(&mut self, parent: &AnimalId, child: &AnimalId, role: ParentRole) -> bool {
        match (self.node_map.get(parent), self.node_map.get(child)) {
            (Some(&p), Some(&c)) => {
                self.graph.add_edge(p, c, role);
                true
            }
            _ => false,
        }
    }

    /// Returns every set of animals that forms an ancestry cycle
    ///
    /// Self-loops are reported as single-animal cycles.
    pub fn cycles(&self) -> Vec<Vec<AnimalId>> {
        let mut cycles: Vec<Vec<AnimalId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
            })
            .map(|scc| {
                let mut ids: Vec<AnimalId> = scc
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect();
                ids.sort();
                ids
            })
            .collect();

        cycles.sort();
        cycles
    }
}

/// Scans a full set of animals for parentage violations and cycles
pub fn integrity_issues(animals: &[Animal]) -> Vec<IntegrityIssue> {
    let by_id: HashMap<&AnimalId, &Animal> = animals.iter().map(|a| (&a.id, a)).collect();
    let mut issues = Vec::new();

    let mut sorted: Vec<&Animal> = animals.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    for animal in sorted {
        if let (Some(s), Some(d)) = (&animal.sire, &animal.dam) {
            if s == d {
                issues.push(IntegrityIssue::SameParent {
                    animal: animal.id.clone(),
                    parent: s.clone(),
                });
            }
        }

        let refs = [
            (ParentRole::Sire, animal.sire.as_ref()),
            (ParentRole::Dam, animal.dam.as_ref()),
        ];

        for (role, parent_id) in refs {
            let Some(parent_id) = parent_id else { continue };

            if parent_id == &animal.id {
                issues.push(IntegrityIssue::SelfReference {
                    animal: animal.id.clone(),
                    role,
                });
                continue;
            }

            match by_id.get(parent_id) {
                None => issues.push(IntegrityIssue::MissingParent {
                    animal: animal.id.clone(),
                    role,
                    parent: parent_id.clone(),
                }),
                Some(parent) => {
                    let fits = match role {
                        ParentRole::Sire => parent.gender.can_sire(),
                        ParentRole::Dam => parent.gender.can_dam(),
                    };
                    if !fits {
                        issues.push(IntegrityIssue::WrongGender {
                            animal: animal.id.clone(),
                            role,
                            parent: parent_id.clone(),
                            gender: parent.gender,
                        });
                    }
                }
            }
        }
    }

    let graph = ParentGraph::from_animals(animals);
    for cycle in graph.cycles() {
        // Self-references are already reported above
        if cycle.len() > 1 {
            issues.push(IntegrityIssue::Cycle { animals: cycle });
        }
    }

    issues
}
