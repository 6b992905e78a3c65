//! Animal domain model
//!
//! Animals are the registry's records. Each may reference a sire (father)
//! and a dam (mother), which makes the registry a self-referential graph
//! addressed by [`AnimalId`].

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::classification::Classification;
use super::id::AnimalId;

/// Gender of an animal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Breeding male, eligible as a sire
    Male,

    /// Breeding female, eligible as a dam
    Female,

    /// Not used for breeding
    Neutered,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Neutered => "neutered",
        }
    }

    /// Returns true if an animal of this gender may be recorded as a sire
    pub fn can_sire(&self) -> bool {
        matches!(self, Gender::Male)
    }

    /// Returns true if an animal of this gender may be recorded as a dam
    pub fn can_dam(&self) -> bool {
        matches!(self, Gender::Female)
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "stallion" | "sire" => Ok(Gender::Male),
            "female" | "f" | "mare" | "dam" => Ok(Gender::Female),
            "neutered" | "gelding" | "n" => Ok(Gender::Neutered),
            _ => Err(format!("Unknown gender: {}", s)),
        }
    }
}

/// A registered animal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,

    /// Unique registered name
    pub name: String,

    pub gender: Gender,

    pub classification: Classification,

    /// Biological father
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sire: Option<AnimalId>,

    /// Biological mother
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dam: Option<AnimalId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Opaque breeder reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breeder: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Animal {
    /// Creates a new animal with no parents on file
    pub fn new(name: impl Into<String>, gender: Gender, classification: Classification) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: AnimalId::new(&name, now),
            name,
            gender,
            classification,
            sire: None,
            dam: None,
            birth_date: None,
            color: None,
            breeder: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the sire reference
    pub fn with_sire(mut self, sire: impl Into<Option<AnimalId>>) -> Self {
        self.sire = sire.into();
        self
    }

    /// Sets the dam reference
    pub fn with_dam(mut self, dam: impl Into<Option<AnimalId>>) -> Self {
        self.dam = dam.into();
        self
    }

    pub fn with_birth_date(mut self, date: NaiveDate) -> Self {
        self.birth_date = Some(date);
        self
    }

    pub fn with_breeder(mut self, breeder: impl Into<String>) -> Self {
        self.breeder = Some(breeder.into());
        self
    }

    /// Returns the birth year, if the birth date is known
    pub fn birth_year(&self) -> Option<i32> {
        self.birth_date.map(|d| d.year())
    }

    /// Returns true if the animal has the given animal as sire or dam
    pub fn is_child_of(&self, parent: &AnimalId) -> bool {
        self.sire.as_ref() == Some(parent) || self.dam.as_ref() == Some(parent)
    }

    /// Iterates over the recorded parent references, sire first
    pub fn parents(&self) -> impl Iterator<Item = &AnimalId> {
        self.sire.iter().chain(self.dam.iter())
    }

    /// Marks the record as modified
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Input for registering a new animal
#[derive(Debug, Clone, Default)]
pub struct NewAnimal {
    pub name: String,
    pub gender: Option<Gender>,
    /// Caller-chosen classification; overridden when both parents are known
    pub classification: Option<Classification>,
    pub sire: Option<AnimalId>,
    pub dam: Option<AnimalId>,
    pub birth_date: Option<NaiveDate>,
    pub color: Option<String>,
    pub breeder: Option<String>,
}

/// Changes to an existing animal
///
/// Outer `None` leaves a field unchanged; `Some(None)` clears an optional one.
#[derive(Debug, Clone, Default)]
pub struct AnimalUpdate {
    pub name: Option<String>,
    pub classification: Option<Classification>,
    pub sire: Option<Option<AnimalId>>,
    pub dam: Option<Option<AnimalId>>,
    pub birth_date: Option<Option<NaiveDate>>,
    pub color: Option<Option<String>>,
    pub breeder: Option<Option<String>>,
}

impl AnimalUpdate {
    /// Returns true if the update touches a parent reference
    pub fn changes_parents(&self) -> bool {
        self.sire.is_some() || self.dam.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_animal_has_no_parents() {
        let animal = Animal::new("Comet", Gender::Male, Classification::A);

        assert_eq!(animal.name, "Comet");
        assert!(animal.sire.is_none());
        assert!(animal.dam.is_none());
        assert_eq!(animal.parents().count(), 0);
    }

    #[test]
    fn is_child_of_checks_both_sides() {
        let sire = Animal::new("Sire", Gender::Male, Classification::A);
        let dam = Animal::new("Dam", Gender::Female, Classification::B);
        let foal = Animal::new("Foal", Gender::Female, Classification::AB)
            .with_sire(sire.id.clone())
            .with_dam(dam.id.clone());

        assert!(foal.is_child_of(&sire.id));
        assert!(foal.is_child_of(&dam.id));
        assert!(!sire.is_child_of(&dam.id));
        assert_eq!(foal.parents().collect::<Vec<_>>(), vec![&sire.id, &dam.id]);
    }

    #[test]
    fn birth_year() {
        let date = NaiveDate::from_ymd_opt(2015, 4, 1).unwrap();
        let animal = Animal::new("Comet", Gender::Male, Classification::A).with_birth_date(date);

        assert_eq!(animal.birth_year(), Some(2015));
    }

    #[test]
    fn gender_parsing() {
        assert_eq!("stallion".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("Mare".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("gelding".parse::<Gender>().unwrap(), Gender::Neutered);
        assert!("unicorn".parse::<Gender>().is_err());
    }

    #[test]
    fn serialization_omits_missing_parents() {
        let animal = Animal::new("Comet", Gender::Male, Classification::A);
        let json = serde_json::to_value(&animal).unwrap();

        assert!(json.get("sire").is_none());
        assert_eq!(json["gender"], "male");
        assert_eq!(json["classification"], "A");
    }
}
