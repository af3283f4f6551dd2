//! Card recommendation workflow: catalog ingestion through ranked, explained results.

pub mod assembler;
pub mod auth;
pub mod catalog;
pub mod domain;
pub mod eligibility;
mod fields;
pub mod history;
pub mod normalizer;
pub mod persona;
pub mod questions;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;
pub mod validation;

pub use assembler::{Recommendation, RecommendationAssembler, RecommendedCard, ScoredCard};
pub use auth::{SessionVerifier, TrustedHeaderVerifier};
pub use catalog::{
    CatalogOrigin, CatalogProvider, CatalogSnapshot, CatalogSource, JsonFileCatalog,
    NoPrimaryCatalog, StaticCatalog,
};
pub use domain::{AdvisorFlow, CardRecord, UserId, UserProfile};
pub use persona::Persona;
pub use repository::{InMemoryRecommendationRepository, RecommendationStore};
pub use router::advisor_router;
pub use scoring::{CardScore, ScoringConfig, ScoringEngine};
pub use service::{AdvancedOutcome, AdvisorService, AdvisorServiceError, BeginnerOutcome};
pub use session::{AdvisorSession, InMemorySessionStore};

#[cfg(test)]
mod tests;
