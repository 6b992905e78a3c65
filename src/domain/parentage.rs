//! Parentage rules
//!
//! Checks the per-record invariants on a proposed sire/dam pair. The
//! transitive acyclicity rule needs store access and lives in the
//! registration path.

use thiserror::Error;

use super::animal::{Animal, Gender};
use super::id::AnimalId;

#[derive(Debug, Error, PartialEq)]
pub enum ParentageError {
    #[error("Animal name must not be empty")]
    EmptyName,

    #[error("Gender is required")]
    MissingGender,

    #[error("Classification is required unless both parents are on file")]
    MissingClassification,

    #[error("Parent not found: {0}")]
    ParentNotFound(AnimalId),

    #[error("Animal {0} cannot be its own parent")]
    SelfReference(AnimalId),

    #[error("Sire and dam must be different animals: {0}")]
    SameParent(AnimalId),

    #[error("Sire {sire} must be male, but is {gender}")]
    SireNotMale { sire: AnimalId, gender: Gender },

    #[error("Dam {dam} must be female, but is {gender}")]
    DamNotFemale { dam: AnimalId, gender: Gender },

    #[error("Setting {parent} as a parent of {animal} would create an ancestry cycle")]
    CycleDetected { animal: AnimalId, parent: AnimalId },
}

/// Validates a proposed sire/dam pair for `child`
pub fn check_parents(
    child: &AnimalId,
    sire: Option<&Animal>,
    dam: Option<&Animal>,
) -> Result<(), ParentageError> {
    for parent in sire.iter().chain(dam.iter()) {
        if &parent.id == child {
            return Err(ParentageError::SelfReference(child.clone()));
        }
    }

    if let (Some(s), Some(d)) = (sire, dam) {
        if s.id == d.id {
            return Err(ParentageError::SameParent(s.id.clone()));
        }
    }

    if let Some(s) = sire {
        if !s.gender.can_sire() {
            return Err(ParentageError::SireNotMale {
                sire: s.id.clone(),
                gender: s.gender,
            });
        }
    }

    if let Some(d) = dam {
        if !d.gender.can_dam() {
            return Err(ParentageError::DamNotFemale {
                dam: d.id.clone(),
                gender: d.gender,
            });
        }
    }

    Ok(())
}
