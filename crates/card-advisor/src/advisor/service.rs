use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::assembler::{Recommendation, RecommendationAssembler};
use super::catalog::{CatalogError, CatalogOrigin, CatalogProvider, CatalogSnapshot, CatalogSource};
use super::domain::{AdvisorFlow, RecommendationId, UserId, UserProfile};
use super::eligibility::filter_eligible;
use super::history::{TransactionEntry, TransactionHistory};
use super::normalizer::{blend_transactions, follow_up_map, normalize};
use super::persona::{detect, Persona};
use super::questions::{follow_up_questions, needs_more_info, FollowUpQuestion, REQUIRED_KEYS};
use super::repository::{
    RecommendationRecord, RecommendationRepository, RecommendationStore, RepositoryError,
};
use super::scoring::{ScoringConfig, ScoringEngine};
use super::session::{AdvisorSession, SessionStore, SessionStoreError, SessionUpdate};
use super::validation::{validate_recommend, FieldError};
use crate::config::AdvisorSettings;

/// Service composing the catalog, transaction history, scoring pipeline and stores.
pub struct AdvisorService<C, H, R, S> {
    catalog: Arc<CatalogProvider<C>>,
    history: Arc<H>,
    recommendations: RecommendationStore<R>,
    sessions: Arc<S>,
    settings: AdvisorSettings,
}

static RECOMMENDATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_recommendation_id() -> RecommendationId {
    let id = RECOMMENDATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RecommendationId(format!("rec-{id:06}"))
}

/// Beginner-flow result; `recommendation_id` is `None` when persistence failed.
#[derive(Debug, Clone)]
pub struct BeginnerOutcome {
    pub recommendation_id: Option<RecommendationId>,
    pub recommendation: Recommendation,
    pub catalog_origin: CatalogOrigin,
    pub fallback_catalog: bool,
}

#[derive(Debug, Clone)]
pub enum AdvancedOutcome {
    NeedsMoreInfo {
        persona: Persona,
        questions: Vec<FollowUpQuestion>,
    },
    Scored {
        recommendation_id: Option<RecommendationId>,
        recommendation: Recommendation,
        catalog_origin: CatalogOrigin,
        model: String,
    },
}

impl<C, H, R, S> AdvisorService<C, H, R, S>
where
    C: CatalogSource + 'static,
    H: TransactionHistory + 'static,
    R: RecommendationRepository + 'static,
    S: SessionStore + 'static,
{
    pub fn new(
        catalog: C,
        history: Arc<H>,
        recommendations: Arc<R>,
        sessions: Arc<S>,
        settings: AdvisorSettings,
    ) -> Self {
        Self {
            catalog: Arc::new(CatalogProvider::new(catalog, settings.catalog_page_size)),
            history,
            recommendations: RecommendationStore::new(recommendations),
            sessions,
            settings,
        }
    }

    pub fn settings(&self) -> &AdvisorSettings {
        &self.settings
    }

    /// Score a beginner questionnaire. The payload is coerced leniently; only a
    /// non-object body is rejected.
    pub async fn recommend_beginner(
        &self,
        user: &UserId,
        payload: Value,
    ) -> Result<BeginnerOutcome, AdvisorServiceError> {
        if !payload.is_object() {
            return Err(AdvisorServiceError::Invalid(vec![FieldError {
                field: "body".to_string(),
                message: "expected a JSON object".to_string(),
            }]));
        }

        let min_results = self.settings.beginner_min_results;
        let mut profile = normalize(&payload);
        let (snapshot, transactions) = self.gather(user, min_results).await?;
        if blend_transactions(&mut profile, &transactions) {
            debug!(user = %user.0, "blended transaction history into sparse spend profile");
        }

        let engine = ScoringEngine::new(ScoringConfig::beginner());
        let recommendation =
            self.assemble(AdvisorFlow::Beginner, engine, min_results, &profile, &snapshot);
        let recommendation_id = self.persist(user, &profile, &snapshot, &recommendation);

        Ok(BeginnerOutcome {
            recommendation_id,
            recommendation,
            catalog_origin: snapshot.origin,
            fallback_catalog: snapshot.uses_fallback(),
        })
    }

    /// Score an advanced-flow request, or ask the follow-up round first.
    pub async fn recommend_advanced(
        &self,
        user: &UserId,
        payload: Value,
    ) -> Result<AdvancedOutcome, AdvisorServiceError> {
        let answers = follow_up_map(&payload);
        let incomplete = answers.len() < REQUIRED_KEYS.len() || needs_more_info(&answers);
        // Absent profile fields wait for the clarification round; malformed ones never pass.
        match validate_recommend(&payload) {
            Ok(_) => {}
            Err(errors) if incomplete && errors.iter().all(FieldError::is_missing) => {}
            Err(errors) => return Err(AdvisorServiceError::Invalid(errors)),
        }
        let mut profile = normalize(&payload);

        if incomplete {
            let persona = detect(&profile);
            info!(
                user = %user.0,
                ?persona,
                "follow-up answers incomplete, asking clarification round"
            );
            return Ok(AdvancedOutcome::NeedsMoreInfo {
                persona,
                questions: follow_up_questions(persona),
            });
        }

        let results = self.settings.advanced_results;
        let (snapshot, transactions) = self.gather(user, results).await?;
        blend_transactions(&mut profile, &transactions);

        let engine = ScoringEngine::new(ScoringConfig::advanced());
        let recommendation =
            self.assemble(AdvisorFlow::Advanced, engine, results, &profile, &snapshot);
        let recommendation_id = self.persist(user, &profile, &snapshot, &recommendation);

        Ok(AdvancedOutcome::Scored {
            recommendation_id,
            recommendation,
            catalog_origin: snapshot.origin,
            model: self.settings.model_label.clone(),
        })
    }

    /// Most recent stored recommendation for the flow, in canonical form.
    pub fn latest(
        &self,
        user: &UserId,
        flow: AdvisorFlow,
    ) -> Result<Option<RecommendationRecord>, AdvisorServiceError> {
        Ok(self.recommendations.latest(user, flow)?)
    }

    /// "Start over": drops the stored recommendation and the questionnaire session.
    pub fn start_over(
        &self,
        user: &UserId,
        flow: AdvisorFlow,
    ) -> Result<bool, AdvisorServiceError> {
        let removed = self.recommendations.clear(user, flow)?;
        self.sessions.clear(user)?;
        Ok(removed)
    }

    pub fn session(&self, user: &UserId) -> Result<AdvisorSession, AdvisorServiceError> {
        Ok(self.sessions.load(user)?.unwrap_or_default())
    }

    pub fn update_session(
        &self,
        user: &UserId,
        update: SessionUpdate,
    ) -> Result<AdvisorSession, AdvisorServiceError> {
        let mut session = self.session(user)?;
        session.apply(update);
        self.sessions.save(user, &session)?;
        Ok(session)
    }

    pub fn reset_session(&self, user: &UserId) -> Result<(), AdvisorServiceError> {
        Ok(self.sessions.clear(user)?)
    }

    /// Catalog and transaction history are independent reads, fetched together.
    /// History failures only cost the spend enrichment.
    async fn gather(
        &self,
        user: &UserId,
        min_size: usize,
    ) -> Result<(CatalogSnapshot, Vec<TransactionEntry>), AdvisorServiceError> {
        let provider = Arc::clone(&self.catalog);
        let history = Arc::clone(&self.history);
        let owner = user.clone();

        let (catalog, transactions) = tokio::join!(
            tokio::task::spawn_blocking(move || provider.fetch(min_size)),
            tokio::task::spawn_blocking(move || history.recent(&owner)),
        );

        let snapshot = catalog.map_err(|err| AdvisorServiceError::Internal(err.to_string()))??;
        if snapshot.uses_fallback() {
            info!(
                origin = snapshot.origin.as_str(),
                supplemented = snapshot.supplemented,
                "scoring against fallback catalog records"
            );
        }

        let transactions = match transactions {
            Ok(Ok(entries)) => entries,
            Ok(Err(err)) => {
                debug!(error = %err, "transaction history unavailable, skipping enrichment");
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, "transaction history task failed");
                Vec::new()
            }
        };

        Ok((snapshot, transactions))
    }

    fn assemble(
        &self,
        flow: AdvisorFlow,
        engine: ScoringEngine,
        results: usize,
        profile: &UserProfile,
        snapshot: &CatalogSnapshot,
    ) -> Recommendation {
        let eligibility = filter_eligible(profile, &snapshot.cards);
        let persona = detect(profile);
        debug!(
            flow = flow.as_str(),
            tier = ?eligibility.tier,
            pool = eligibility.cards.len(),
            ?persona,
            "eligibility filtered"
        );
        RecommendationAssembler::new(engine, results).assemble(
            flow,
            profile,
            persona,
            &eligibility,
            &snapshot.cards,
        )
    }

    fn persist(
        &self,
        user: &UserId,
        profile: &UserProfile,
        snapshot: &CatalogSnapshot,
        recommendation: &Recommendation,
    ) -> Option<RecommendationId> {
        let record = RecommendationRecord {
            id: next_recommendation_id(),
            user: user.clone(),
            flow: recommendation.flow,
            recommendation: recommendation.clone(),
            credit_score: profile.credit_score_value(),
            catalog_origin: snapshot.origin,
            created_at: Utc::now(),
        };
        self.recommendations.save(&record)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdvisorServiceError {
    #[error("request failed validation")]
    Invalid(Vec<FieldError>),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Session(#[from] SessionStoreError),
    #[error("internal error: {0}")]
    Internal(String),
}
