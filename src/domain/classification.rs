//! Breed classification and inheritance
//!
//! Every animal belongs to one of four closed breed categories. When both
//! parents are on file, the offspring's category follows a fixed table:
//!
//! | Parents       | Offspring |
//! |---------------|-----------|
//! | X + X         | X         |
//! | A + B         | AB        |
//! | A + C         | C         |
//! | B + C         | C         |
//! | any + AB      | AB        |
//!
//! The table is symmetric; [`resolve`] normalizes the pair before lookup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Breed classification of an animal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    A,
    B,
    C,
    AB,
}

impl Classification {
    /// Returns all classification values
    pub fn all() -> &'static [Classification] {
        &[
            Classification::A,
            Classification::B,
            Classification::C,
            Classification::AB,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::A => "A",
            Classification::B => "B",
            Classification::C => "C",
            Classification::AB => "AB",
        }
    }

    /// Position used to put a pair into canonical order
    fn rank(self) -> u8 {
        match self {
            Classification::A => 0,
            Classification::B => 1,
            Classification::C => 2,
            Classification::AB => 3,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Classification::A),
            "B" => Ok(Classification::B),
            "C" => Ok(Classification::C),
            "AB" | "BA" => Ok(Classification::AB),
            _ => Err(format!("Unknown classification: {}", s)),
        }
    }
}

/// Resolves the offspring classification from the parents' classifications.
///
/// Returns `None` ("unknown") when either parent classification is missing;
/// a classification is never guessed from one side only.
pub fn resolve(
    sire: Option<Classification>,
    dam: Option<Classification>,
) -> Option<Classification> {
    let (sire, dam) = (sire?, dam?);
    let (low, high) = if sire.rank() <= dam.rank() {
        (sire, dam)
    } else {
        (dam, sire)
    };

    use Classification::*;
    let offspring = match (low, high) {
        (x, y) if x == y => x,
        (_, AB) => AB,
        (A, B) => AB,
        (A, C) | (B, C) => C,
        _ => C,
    };

    Some(offspring)
}
