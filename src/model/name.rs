//! Name in the lexical graph.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Opaque name identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NameId(pub u64);

impl fmt::Display for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Grammatical gender tag carried by every name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Neutral,
    #[default]
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Neutral => "neutral",
            Gender::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = Error;

    /// Accepts the full tag or its single-letter abbreviation, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "neutral" | "n" => Ok(Gender::Neutral),
            "unknown" | "u" | "" => Ok(Gender::Unknown),
            other => Err(Error::Validation(format!("unknown gender tag '{other}'"))),
        }
    }
}

/// A stored name. `(text, locale, gender)` is unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    pub id: NameId,
    pub text: String,
    pub locale: String,
    pub gender: Gender,
}

impl Name {
    pub fn key(&self) -> NameKey {
        NameKey::new(&self.text, &self.locale, self.gender)
    }
}

/// Uniqueness key of a name after cleaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameKey {
    pub text: String,
    pub locale: String,
    pub gender: Gender,
}

impl NameKey {
    pub fn new(text: &str, locale: &str, gender: Gender) -> Self {
        Self { text: text.to_string(), locale: locale.to_string(), gender }
    }
}

/// A name that has not been resolved to an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameInput {
    pub name: String,
    pub locale: String,
    #[serde(default)]
    pub gender: Gender,
}

impl NameInput {
    pub fn new(name: impl Into<String>, locale: impl Into<String>, gender: Gender) -> Self {
        Self { name: name.into(), locale: locale.into(), gender }
    }
}

/// Partial update of a stored name. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameUpdate {
    pub text: Option<String>,
    pub locale: Option<String>,
    pub gender: Option<Gender>,
}

impl NameUpdate {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.locale.is_none() && self.gender.is_none()
    }

    /// Locale or gender changes invalidate derived cluster memberships.
    pub fn touches_classification(&self) -> bool {
        self.locale.is_some() || self.gender.is_some()
    }
}

/// Provenance record attached to a name (e.g. the page it was found on).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSource {
    pub name_id: NameId,
    pub source: String,
    pub added_at: DateTime<Utc>,
}
