//! Edges and memberships between names.

use std::fmt;

use serde::{Deserialize, Serialize};
use super::{Gender, Name, NameId, NameSource};

/// Opaque cluster identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId(pub u64);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A semantic grouping of names ("biblical", "gemstones", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub label: String,
}

/// Directed translation `src → dst`, tagged with the locale of `dst`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranslationEdge {
    pub src: NameId,
    pub dst: NameId,
    pub locale: String,
}

impl TranslationEdge {
    /// The "other" end of the edge from the given name.
    pub fn other_name(&self, from: NameId) -> Option<NameId> {
        if from == self.src { Some(self.dst) }
        else if from == self.dst { Some(self.src) }
        else { None }
    }
}

/// A translation partner resolved to its stored name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationLink {
    pub id: NameId,
    pub name: String,
    pub locale: String,
    pub gender: Gender,
    /// Locale recorded on the edge itself.
    pub edge_locale: String,
}

/// A name with everything directly attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameRecord {
    pub name: Name,
    pub variants: Vec<Name>,
    pub translations: Vec<TranslationLink>,
    pub clusters: Vec<Cluster>,
    pub sources: Vec<NameSource>,
}
