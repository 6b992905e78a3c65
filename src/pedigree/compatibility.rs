//! Breeding compatibility analysis
//!
//! Classifies a proposed mating in order:
//!
//! 1. forbidden parent/child pairs (short-circuit, no prediction)
//! 2. siblings sharing a sire or a dam (high risk)
//! 3. any ancestor shared within [`COMPATIBILITY_DEPTH`] generations (medium)
//! 4. otherwise low risk
//!
//! The offspring classification is predicted for every pair that is not
//! forbidden.

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::domain::{resolve, Animal, AnimalId, Classification};
use crate::storage::{AnimalStore, StoreError};

use super::traversal::{build_tree, Traversal};

/// Generations searched for shared ancestors
pub const COMPATIBILITY_DEPTH: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a compatibility evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityResult {
    pub sire: AnimalId,
    pub dam: AnimalId,

    /// False only for forbidden pairs
    pub breeding_possible: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_classification: Option<Classification>,

    /// Absent for forbidden pairs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,

    pub inbreeding_detected: bool,

    pub shared_ancestors: Vec<AnimalId>,

    pub reason: String,

    pub recommendation: String,

    /// Rules broken by a forbidden pair
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
}

/// Evaluates a mating between `sire` and `dam`
///
/// Assumes the caller has checked that the two are different animals, the
/// sire can breed as a male and the dam as a female.
pub fn evaluate<S: AnimalStore + ?Sized>(
    store: &S,
    sire: &Animal,
    dam: &Animal,
) -> Result<CompatibilityResult, StoreError> {
    let violations = forbidden_relations(sire, dam);
    if !violations.is_empty() {
        debug!(sire = %sire.id, dam = %dam.id, "forbidden pair");
        return Ok(CompatibilityResult {
            sire: sire.id.clone(),
            dam: dam.id.clone(),
            breeding_possible: false,
            predicted_classification: None,
            risk_level: None,
            inbreeding_detected: true,
            shared_ancestors: Vec::new(),
            reason: violations.join("; "),
            recommendation: "Breeding not allowed: direct parent/child relationship".to_string(),
            violations,
        });
    }

    let sire_ancestors = ancestor_set(store, sire)?;
    let dam_ancestors = ancestor_set(store, dam)?;
    let shared_ancestors: Vec<AnimalId> =
        sire_ancestors.intersection(&dam_ancestors).cloned().collect();

    let (risk_level, reason, recommendation) = if let Some(relation) = sibling_relation(sire, dam) {
        (
            RiskLevel::High,
            relation.to_string(),
            "Not recommended: close inbreeding".to_string(),
        )
    } else if !shared_ancestors.is_empty() {
        (
            RiskLevel::Medium,
            format!(
                "distant relation: {} shared ancestor(s) within {} generations",
                shared_ancestors.len(),
                COMPATIBILITY_DEPTH
            ),
            "Proceed with caution: review the shared lines".to_string(),
        )
    } else {
        (
            RiskLevel::Low,
            format!("no shared ancestors within {} generations", COMPATIBILITY_DEPTH),
            "Suitable pairing".to_string(),
        )
    };

    Ok(CompatibilityResult {
        sire: sire.id.clone(),
        dam: dam.id.clone(),
        breeding_possible: true,
        predicted_classification: resolve(Some(sire.classification), Some(dam.classification)),
        risk_level: Some(risk_level),
        inbreeding_detected: risk_level != RiskLevel::Low,
        shared_ancestors,
        reason,
        recommendation,
        violations: Vec::new(),
    })
}

fn forbidden_relations(sire: &Animal, dam: &Animal) -> Vec<String> {
    let mut violations = Vec::new();

    if sire.dam.as_ref() == Some(&dam.id) {
        violations.push(format!(
            "mother/son mating: {} is the dam of {}",
            dam.name, sire.name
        ));
    }
    if dam.sire.as_ref() == Some(&sire.id) {
        violations.push(format!(
            "father/daughter mating: {} is the sire of {}",
            sire.name, dam.name
        ));
    }

    violations
}

fn sibling_relation(sire: &Animal, dam: &Animal) -> Option<&'static str> {
    let same_sire = sire.sire.is_some() && sire.sire == dam.sire;
    let same_dam = sire.dam.is_some() && sire.dam == dam.dam;

    match (same_sire, same_dam) {
        (true, true) => Some("full siblings: same sire and dam"),
        (true, false) => Some("half siblings: same sire"),
        (false, true) => Some("half siblings: same dam"),
        (false, false) => None,
    }
}

fn ancestor_set<S: AnimalStore + ?Sized>(
    store: &S,
    animal: &Animal,
) -> Result<BTreeSet<AnimalId>, StoreError> {
    match build_tree(store, &animal.id, COMPATIBILITY_DEPTH)? {
        Traversal::Found(node) => Ok(node.ancestor_ids()),
        Traversal::Cyclic { .. } => {
            warn!(animal = %animal.id, "ancestry is cyclic; ignoring it for compatibility");
            Ok(BTreeSet::new())
        }
        Traversal::NotFound(_) => Ok(BTreeSet::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Gender;
    use crate::storage::MemoryStore;

    fn stallion(name: &str, class: Classification) -> Animal {
        Animal::new(name, Gender::Male, class)
    }

    fn mare(name: &str, class: Classification) -> Animal {
        Animal::new(name, Gender::Female, class)
    }

    fn run(animals: &[Animal], sire: &Animal, dam: &Animal) -> CompatibilityResult {
        let store = MemoryStore::with_animals(animals.iter().cloned());
        evaluate(&store, sire, dam).unwrap()
    }

    #[test]
    fn unrelated_a_and_b() {
        let sire = stallion("Sire", Classification::A);
        let dam = mare("Dam", Classification::B);

        let result = run(&[sire.clone(), dam.clone()], &sire, &dam);

        assert!(result.breeding_possible);
        assert_eq!(result.predicted_classification, Some(Classification::AB));
        assert_eq!(result.risk_level, Some(RiskLevel::Low));
        assert!(!result.inbreeding_detected);
        assert!(result.shared_ancestors.is_empty());
    }

    #[test]
    fn unrelated_a_and_a() {
        let sire = stallion("Sire", Classification::A);
        let dam = mare("Dam", Classification::A);

        let result = run(&[sire.clone(), dam.clone()], &sire, &dam);

        assert_eq!(result.predicted_classification, Some(Classification::A));
        assert_eq!(result.risk_level, Some(RiskLevel::Low));
    }

    #[test]
    fn father_daughter_is_forbidden() {
        for class in Classification::all() {
            let sire = stallion("Sire", *class);
            let dam = mare("Daughter", *class).with_sire(sire.id.clone());

            let result = run(&[sire.clone(), dam.clone()], &sire, &dam);

            assert!(!result.breeding_possible);
            assert!(result.reason.contains("father/daughter mating"));
            assert_eq!(result.predicted_classification, None);
            assert_eq!(result.risk_level, None);
            assert_eq!(result.violations.len(), 1);
        }
    }

    #[test]
    fn mother_son_is_forbidden() {
        let dam = mare("Mother", Classification::B);
        let sire = stallion("Son", Classification::A).with_dam(dam.id.clone());

        let result = run(&[sire.clone(), dam.clone()], &sire, &dam);

        assert!(!result.breeding_possible);
        assert!(result.reason.contains("mother/son mating"));
    }

    #[test]
    fn full_siblings_are_high_risk() {
        let father = stallion("Father", Classification::A);
        let mother = mare("Mother", Classification::A);
        let brother = stallion("Brother", Classification::A)
            .with_sire(father.id.clone())
            .with_dam(mother.id.clone());
        let sister = mare("Sister", Classification::A)
            .with_sire(father.id.clone())
            .with_dam(mother.id.clone());

        let result = run(
            &[father.clone(), mother.clone(), brother.clone(), sister.clone()],
            &brother,
            &sister,
        );

        assert!(result.breeding_possible);
        assert_eq!(result.risk_level, Some(RiskLevel::High));
        assert!(result.inbreeding_detected);
        assert!(result.reason.contains("full siblings"));
        assert_eq!(result.shared_ancestors.len(), 2);
    }

    #[test]
    fn half_siblings_are_high_risk() {
        let father = stallion("Father", Classification::B);
        let brother = stallion("Brother", Classification::B).with_sire(father.id.clone());
        let sister = mare("Sister", Classification::C).with_sire(father.id.clone());

        let result = run(&[father, brother.clone(), sister.clone()], &brother, &sister);

        assert_eq!(result.risk_level, Some(RiskLevel::High));
        assert!(result.reason.contains("half siblings"));
        assert_eq!(result.predicted_classification, Some(Classification::C));
    }

    #[test]
    fn shared_grandparent_is_medium_risk() {
        let grandsire = stallion("Grandsire", Classification::A);
        let uncle = stallion("Uncle", Classification::A).with_sire(grandsire.id.clone());
        let aunt = mare("Aunt", Classification::A).with_sire(grandsire.id.clone());
        let cousin_m = stallion("Cousin M", Classification::A).with_sire(uncle.id.clone());
        let cousin_f = mare("Cousin F", Classification::B).with_dam(aunt.id.clone());

        let result = run(
            &[
                grandsire.clone(),
                uncle,
                aunt,
                cousin_m.clone(),
                cousin_f.clone(),
            ],
            &cousin_m,
            &cousin_f,
        );

        assert!(result.breeding_possible);
        assert_eq!(result.risk_level, Some(RiskLevel::Medium));
        assert!(result.inbreeding_detected);
        assert_eq!(result.shared_ancestors, vec![grandsire.id]);
        assert!(result.reason.contains("distant relation"));
    }

    /// Builds a male line of `len` generations below `root`, returning it oldest first
    fn line(root: &Animal, prefix: &str, len: usize) -> Vec<Animal> {
        let mut parent = root.id.clone();
        (0..len)
            .map(|i| {
                let a = stallion(&format!("{} {}", prefix, i), Classification::A)
                    .with_sire(parent.clone());
                parent = a.id.clone();
                a
            })
            .collect()
    }

    #[test]
    fn overlap_beyond_three_generations_is_low_risk() {
        // Root is the great-great-grandsire of both candidates
        let root = stallion("Root", Classification::A);
        let left = line(&root, "Left", 3);
        let right = line(&root, "Right", 3);
        let sire = stallion("Candidate", Classification::A).with_sire(left[2].id.clone());
        let dam = mare("Candidate mare", Classification::A).with_sire(right[2].id.clone());

        let mut animals = vec![root, sire.clone(), dam.clone()];
        animals.extend(left);
        animals.extend(right);

        let result = run(&animals, &sire, &dam);

        assert_eq!(result.risk_level, Some(RiskLevel::Low));
        assert!(result.shared_ancestors.is_empty());
    }

    #[test]
    fn cyclic_ancestry_does_not_fail_evaluation() {
        let mut x = stallion("X", Classification::A);
        let mut y = stallion("Y", Classification::A);
        x.sire = Some(y.id.clone());
        y.sire = Some(x.id.clone());
        let dam = mare("Dam", Classification::B);

        let result = run(&[x.clone(), y, dam.clone()], &x, &dam);

        assert!(result.breeding_possible);
        assert_eq!(result.risk_level, Some(RiskLevel::Low));
    }
}
