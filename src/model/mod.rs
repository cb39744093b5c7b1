//! # Lexical Graph Model
//!
//! Plain DTOs for the name graph. These types cross every boundary:
//! store ↔ graph services ↔ decorators ↔ caller.
//!
//! Pure data with no I/O.

pub mod name;
pub mod relation;
pub mod candidate;
pub mod context;

pub use name::{Gender, Name, NameId, NameInput, NameKey, NameSource, NameUpdate};
pub use relation::{Cluster, ClusterId, NameRecord, TranslationEdge, TranslationLink};
pub use candidate::{
    Candidate, CandidateSource,
    VariantProposal, TranslationProposal, ClusterProposal,
    VariantCandidate, TranslationCandidate, ClusterCandidate,
    MANUAL_CONFIDENCE, PERSISTED_CONFIDENCE, INHERITED_CONFIDENCE,
};
pub use context::{
    NameContext, ManualHints, TranslationHint, DecoratedResult,
    PersistedRelations, PersistedVariant, PersistedTranslation, PersistedCluster,
};
