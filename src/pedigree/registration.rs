//! Validated writes
//!
//! Creating or updating an animal checks the parent references against the
//! store, assigns the classification and upserts the record. When both
//! parents are on file the classification is always derived from theirs,
//! whatever the caller supplied.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::domain::{
    check_parents, resolve, Animal, AnimalId, AnimalUpdate, Classification, NewAnimal,
    ParentageError,
};
use crate::storage::AnimalStore;

use super::PedigreeError;

/// Candidate IDs tried before registration gives up
const MAX_ID_ATTEMPTS: u32 = 16;

/// Registers a new animal
pub fn register<S: AnimalStore + ?Sized>(
    store: &S,
    input: NewAnimal,
) -> Result<Animal, PedigreeError> {
    let name = valid_name(&input.name)?;
    let gender = input.gender.ok_or(ParentageError::MissingGender)?;

    let sire = fetch_parent(store, input.sire.as_ref())?;
    let dam = fetch_parent(store, input.dam.as_ref())?;
    let classification = assign_classification(sire.as_ref(), dam.as_ref(), input.classification)?;

    let mut animal = Animal::new(name, gender, classification)
        .with_sire(input.sire)
        .with_dam(input.dam);
    animal.id = unused_id(store, &animal.name, animal.created_at)?;
    animal.birth_date = input.birth_date;
    animal.color = input.color;
    animal.breeder = input.breeder;

    check_parents(&animal.id, sire.as_ref(), dam.as_ref())?;
    for parent in animal.parents() {
        ensure_acyclic(store, &animal.id, parent)?;
    }

    store.upsert(&animal)?;
    info!(animal = %animal.id, name = %animal.name, class = %animal.classification, "registered animal");

    Ok(animal)
}

/// Applies `changes` to the animal `id`
pub fn update<S: AnimalStore + ?Sized>(
    store: &S,
    id: &AnimalId,
    changes: AnimalUpdate,
) -> Result<Animal, PedigreeError> {
    let mut animal = store
        .get(id)?
        .ok_or_else(|| PedigreeError::AnimalNotFound(id.clone()))?;

    let parents_changed = changes.changes_parents();

    if let Some(name) = &changes.name {
        animal.name = valid_name(name)?;
    }
    if let Some(birth_date) = changes.birth_date {
        animal.birth_date = birth_date;
    }
    if let Some(color) = changes.color {
        animal.color = color;
    }
    if let Some(breeder) = changes.breeder {
        animal.breeder = breeder;
    }

    if let Some(sire) = changes.sire {
        animal.sire = sire;
    }
    if let Some(dam) = changes.dam {
        animal.dam = dam;
    }

    let sire = fetch_parent(store, animal.sire.as_ref())?;
    let dam = fetch_parent(store, animal.dam.as_ref())?;
    check_parents(&animal.id, sire.as_ref(), dam.as_ref())?;

    if parents_changed {
        for parent in animal.parents() {
            ensure_acyclic(store, &animal.id, parent)?;
        }
    }

    let requested = changes.classification.or(Some(animal.classification));
    animal.classification = assign_classification(sire.as_ref(), dam.as_ref(), requested)?;

    animal.touch();
    store.upsert(&animal)?;
    info!(animal = %animal.id, name = %animal.name, class = %animal.classification, "updated animal");

    Ok(animal)
}

/// First ID for `name` that no stored record holds yet
fn unused_id<S: AnimalStore + ?Sized>(
    store: &S,
    name: &str,
    created_at: DateTime<Utc>,
) -> Result<AnimalId, PedigreeError> {
    for attempt in 0..MAX_ID_ATTEMPTS {
        let id = AnimalId::with_attempt(name, created_at, attempt);
        if store.get(&id)?.is_none() {
            return Ok(id);
        }
        debug!(%id, attempt, "animal ID already taken");
    }

    Err(PedigreeError::IdSpaceExhausted(name.to_string()))
}

fn valid_name(name: &str) -> Result<String, ParentageError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ParentageError::EmptyName);
    }
    Ok(name.to_string())
}

fn fetch_parent<S: AnimalStore + ?Sized>(
    store: &S,
    id: Option<&AnimalId>,
) -> Result<Option<Animal>, PedigreeError> {
    let Some(id) = id else {
        return Ok(None);
    };

    match store.get(id)? {
        Some(parent) => Ok(Some(parent)),
        None => Err(ParentageError::ParentNotFound(id.clone()).into()),
    }
}

/// Derived classification when both parents are known, else the requested one
fn assign_classification(
    sire: Option<&Animal>,
    dam: Option<&Animal>,
    requested: Option<Classification>,
) -> Result<Classification, ParentageError> {
    let derived = resolve(
        sire.map(|s| s.classification),
        dam.map(|d| d.classification),
    );

    if let (Some(derived), Some(requested)) = (derived, requested) {
        if derived != requested {
            debug!(%derived, %requested, "classification derived from parents");
        }
    }

    derived
        .or(requested)
        .ok_or(ParentageError::MissingClassification)
}

/// Fails if `animal` appears in the ancestry of `parent`
fn ensure_acyclic<S: AnimalStore + ?Sized>(
    store: &S,
    animal: &AnimalId,
    parent: &AnimalId,
) -> Result<(), PedigreeError> {
    let mut stack = vec![parent.clone()];
    let mut visited = HashSet::new();

    while let Some(current) = stack.pop() {
        if &current == animal {
            return Err(ParentageError::CycleDetected {
                animal: animal.clone(),
                parent: parent.clone(),
            }
            .into());
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        if let Some(record) = store.get(&current)? {
            stack.extend(record.parents().cloned());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Gender;
    use crate::storage::MemoryStore;

    fn new_animal(name: &str, gender: Gender, class: Option<Classification>) -> NewAnimal {
        NewAnimal {
            name: name.to_string(),
            gender: Some(gender),
            classification: class,
            ..NewAnimal::default()
        }
    }

    fn parentage(err: PedigreeError) -> ParentageError {
        match err {
            PedigreeError::Parentage(e) => e,
            other => panic!("expected a parentage error, got {:?}", other),
        }
    }

    fn founders(store: &MemoryStore) -> (Animal, Animal) {
        let sire = register(store, new_animal("Sire", Gender::Male, Some(Classification::A))).unwrap();
        let dam = register(store, new_animal("Dam", Gender::Female, Some(Classification::B))).unwrap();
        (sire, dam)
    }

    #[test]
    fn registers_founder() {
        let store = MemoryStore::new();

        let animal = register(
            &store,
            new_animal("  Founder  ", Gender::Male, Some(Classification::C)),
        )
        .unwrap();

        assert_eq!(animal.name, "Founder");
        assert_eq!(animal.classification, Classification::C);
        assert_eq!(store.get(&animal.id).unwrap(), Some(animal));
    }

    #[test]
    fn classification_from_parents_overrides_input() {
        let store = MemoryStore::new();
        let (sire, dam) = founders(&store);

        let foal = register(
            &store,
            NewAnimal {
                sire: Some(sire.id.clone()),
                dam: Some(dam.id.clone()),
                ..new_animal("Foal", Gender::Female, Some(Classification::C))
            },
        )
        .unwrap();

        assert_eq!(foal.classification, Classification::AB);
    }

    #[test]
    fn one_known_parent_keeps_input() {
        let store = MemoryStore::new();
        let (sire, _) = founders(&store);

        let foal = register(
            &store,
            NewAnimal {
                sire: Some(sire.id.clone()),
                ..new_animal("Foal", Gender::Female, Some(Classification::C))
            },
        )
        .unwrap();

        assert_eq!(foal.classification, Classification::C);
    }

    #[test]
    fn classification_required_without_both_parents() {
        let store = MemoryStore::new();

        let err = register(&store, new_animal("Foal", Gender::Female, None)).unwrap_err();
        assert_eq!(parentage(err), ParentageError::MissingClassification);
    }

    #[test]
    fn classification_optional_with_both_parents() {
        let store = MemoryStore::new();
        let (sire, dam) = founders(&store);

        let foal = register(
            &store,
            NewAnimal {
                sire: Some(sire.id),
                dam: Some(dam.id),
                ..new_animal("Foal", Gender::Male, None)
            },
        )
        .unwrap();

        assert_eq!(foal.classification, Classification::AB);
    }

    #[test]
    fn rejects_empty_name_and_missing_gender() {
        let store = MemoryStore::new();

        let err = register(&store, new_animal("   ", Gender::Male, Some(Classification::A))).unwrap_err();
        assert_eq!(parentage(err), ParentageError::EmptyName);

        let input = NewAnimal {
            name: "Nameless".to_string(),
            classification: Some(Classification::A),
            ..NewAnimal::default()
        };
        assert_eq!(parentage(register(&store, input).unwrap_err()), ParentageError::MissingGender);
    }

    #[test]
    fn rejects_unknown_parent() {
        let store = MemoryStore::new();
        let ghost: AnimalId = "h-0badf00".parse().unwrap();

        let err = register(
            &store,
            NewAnimal {
                sire: Some(ghost.clone()),
                ..new_animal("Foal", Gender::Male, Some(Classification::A))
            },
        )
        .unwrap_err();

        assert_eq!(parentage(err), ParentageError::ParentNotFound(ghost));
    }

    #[test]
    fn rejects_wrong_parent_genders() {
        let store = MemoryStore::new();
        let (sire, dam) = founders(&store);

        let err = register(
            &store,
            NewAnimal {
                sire: Some(dam.id.clone()),
                ..new_animal("Foal", Gender::Male, Some(Classification::A))
            },
        )
        .unwrap_err();
        assert!(matches!(parentage(err), ParentageError::SireNotMale { .. }));

        let err = register(
            &store,
            NewAnimal {
                dam: Some(sire.id.clone()),
                ..new_animal("Foal", Gender::Male, Some(Classification::A))
            },
        )
        .unwrap_err();
        assert!(matches!(parentage(err), ParentageError::DamNotFemale { .. }));
    }

    #[test]
    fn rejects_same_animal_as_both_parents() {
        let store = MemoryStore::new();
        let (sire, _) = founders(&store);

        let err = register(
            &store,
            NewAnimal {
                sire: Some(sire.id.clone()),
                dam: Some(sire.id.clone()),
                ..new_animal("Foal", Gender::Male, Some(Classification::A))
            },
        )
        .unwrap_err();

        assert_eq!(parentage(err), ParentageError::SameParent(sire.id));
    }

    #[test]
    fn update_rejects_self_reference() {
        let store = MemoryStore::new();
        let (sire, _) = founders(&store);

        let changes = AnimalUpdate {
            sire: Some(Some(sire.id.clone())),
            ..AnimalUpdate::default()
        };
        let err = update(&store, &sire.id, changes).unwrap_err();

        assert_eq!(parentage(err), ParentageError::SelfReference(sire.id));
    }

    #[test]
    fn update_rejects_cycle() {
        let store = MemoryStore::new();
        let (grandsire, _) = founders(&store);
        let son = register(
            &store,
            NewAnimal {
                sire: Some(grandsire.id.clone()),
                ..new_animal("Son", Gender::Male, Some(Classification::A))
            },
        )
        .unwrap();
        let grandson = register(
            &store,
            NewAnimal {
                sire: Some(son.id.clone()),
                ..new_animal("Grandson", Gender::Male, Some(Classification::A))
            },
        )
        .unwrap();

        let changes = AnimalUpdate {
            sire: Some(Some(grandson.id.clone())),
            ..AnimalUpdate::default()
        };
        let err = update(&store, &grandsire.id, changes).unwrap_err();

        assert_eq!(
            parentage(err),
            ParentageError::CycleDetected {
                animal: grandsire.id.clone(),
                parent: grandson.id,
            }
        );
        assert_eq!(store.get(&grandsire.id).unwrap().unwrap().sire, None);
    }

    #[test]
    fn update_rederives_classification() {
        let store = MemoryStore::new();
        let (sire, dam) = founders(&store);
        let foal = register(&store, new_animal("Foal", Gender::Female, Some(Classification::C))).unwrap();

        let changes = AnimalUpdate {
            sire: Some(Some(sire.id.clone())),
            dam: Some(Some(dam.id.clone())),
            ..AnimalUpdate::default()
        };
        let updated = update(&store, &foal.id, changes).unwrap();

        assert_eq!(updated.classification, Classification::AB);
        assert!(updated.updated_at >= foal.updated_at);

        // A requested class cannot override the derived one
        let changes = AnimalUpdate {
            classification: Some(Classification::A),
            ..AnimalUpdate::default()
        };
        assert_eq!(update(&store, &foal.id, changes).unwrap().classification, Classification::AB);
    }

    #[test]
    fn update_clears_fields() {
        let store = MemoryStore::new();
        let (sire, _) = founders(&store);
        let foal = register(
            &store,
            NewAnimal {
                sire: Some(sire.id.clone()),
                color: Some("bay".to_string()),
                ..new_animal("Foal", Gender::Female, Some(Classification::B))
            },
        )
        .unwrap();

        let changes = AnimalUpdate {
            sire: Some(None),
            color: Some(None),
            name: Some("Renamed".to_string()),
            ..AnimalUpdate::default()
        };
        let updated = update(&store, &foal.id, changes).unwrap();

        assert_eq!(updated.sire, None);
        assert_eq!(updated.color, None);
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.classification, Classification::B);
    }

    #[test]
    fn update_unknown_animal() {
        let store = MemoryStore::new();
        let ghost: AnimalId = "h-0000001".parse().unwrap();

        assert!(matches!(
            update(&store, &ghost, AnimalUpdate::default()),
            Err(PedigreeError::AnimalNotFound(_))
        ));
    }

    fn holder_of(id: AnimalId, name: &str) -> Animal {
        let mut animal = Animal::new(name, Gender::Male, Classification::A);
        animal.id = id;
        animal
    }

    #[test]
    fn taken_id_is_skipped() {
        let now = Utc::now();
        let taken = AnimalId::new("Newcomer", now);
        let store = MemoryStore::with_animals([holder_of(taken.clone(), "Existing")]);

        let id = unused_id(&store, "Newcomer", now).unwrap();

        assert_ne!(id, taken);
        assert_eq!(id, AnimalId::with_attempt("Newcomer", now, 1));
        assert_eq!(store.get(&taken).unwrap().unwrap().name, "Existing");
    }

    #[test]
    fn id_attempts_run_out() {
        let now = Utc::now();
        let store = MemoryStore::with_animals((0..MAX_ID_ATTEMPTS).map(|attempt| {
            holder_of(
                AnimalId::with_attempt("Newcomer", now, attempt),
                &format!("Holder {}", attempt),
            )
        }));

        assert!(matches!(
            unused_id(&store, "Newcomer", now),
            Err(PedigreeError::IdSpaceExhausted(name)) if name == "Newcomer"
        ));
    }
}
