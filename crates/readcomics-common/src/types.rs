//! Core type definitions shared by the account and catalog layers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gender shown on a user profile.
///
/// Stored as a single-letter code. New accounts default to [`Gender::Unicorn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[default]
    #[serde(rename = "U")]
    Unicorn,
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    /// All choices in display order.
    pub const ALL: [Gender; 4] = [Self::Male, Self::Female, Self::Unicorn, Self::Other];

    /// Single-letter code persisted in the database.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Unicorn => "U",
            Self::Other => "O",
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Unicorn => "Unicorn",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" => Ok(Self::Male),
            "F" => Ok(Self::Female),
            "U" => Ok(Self::Unicorn),
            "O" => Ok(Self::Other),
            _ => Err(format!("Invalid gender code: {}", s)),
        }
    }
}

/// Kind of record registered in the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchObjectType {
    Character,
    Person,
    Publisher,
}

impl fmt::Display for SearchObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character => write!(f, "character"),
            Self::Person => write!(f, "person"),
            Self::Publisher => write!(f, "publisher"),
        }
    }
}

impl std::str::FromStr for SearchObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "character" => Ok(Self::Character),
            "person" => Ok(Self::Person),
            "publisher" => Ok(Self::Publisher),
            _ => Err(format!("Invalid search object type: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_codes_roundtrip() {
        for gender in Gender::ALL {
            let parsed: Gender = gender.code().parse().unwrap();
            assert_eq!(parsed, gender);
        }
        assert!("X".parse::<Gender>().is_err());
    }

    #[test]
    fn test_gender_serde_uses_code() {
        let json = serde_json::to_string(&Gender::Female).unwrap();
        assert_eq!(json, "\"F\"");
        let back: Gender = serde_json::from_str("\"O\"").unwrap();
        assert_eq!(back, Gender::Other);
    }

    #[test]
    fn test_gender_default_and_label() {
        assert_eq!(Gender::default(), Gender::Unicorn);
        assert_eq!(Gender::Unicorn.label(), "Unicorn");
    }

    #[test]
    fn test_search_object_type_display() {
        assert_eq!(SearchObjectType::Publisher.to_string(), "publisher");
        assert_eq!(
            "person".parse::<SearchObjectType>().unwrap(),
            SearchObjectType::Person
        );
    }
}
