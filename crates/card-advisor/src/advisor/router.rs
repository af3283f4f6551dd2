use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use super::assembler::{Recommendation, RecommendedCard};
use super::auth::SessionVerifier;
use super::catalog::CatalogSource;
use super::domain::{AdvisorFlow, SpendCategory, UserId};
use super::history::TransactionHistory;
use super::repository::RecommendationRepository;
use super::service::{AdvancedOutcome, AdvisorService, AdvisorServiceError, BeginnerOutcome};
use super::session::{AdvisorSession, SessionStore, SessionUpdate};
use super::validation::FieldError;

/// Handler state: the service plus the identity seam in front of it.
pub struct AdvisorState<C, H, R, S> {
    pub service: Arc<AdvisorService<C, H, R, S>>,
    pub verifier: Arc<dyn SessionVerifier>,
}

impl<C, H, R, S> Clone for AdvisorState<C, H, R, S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            verifier: Arc::clone(&self.verifier),
        }
    }
}

/// Router exposing the recommendation endpoints, stored results and questionnaire session.
pub fn advisor_router<C, H, R, S>(
    service: Arc<AdvisorService<C, H, R, S>>,
    verifier: Arc<dyn SessionVerifier>,
) -> Router
where
    C: CatalogSource + 'static,
    H: TransactionHistory + 'static,
    R: RecommendationRepository + 'static,
    S: SessionStore + 'static,
{
    Router::new()
        .route("/api/ai/beginner", post(beginner_handler::<C, H, R, S>))
        .route("/api/ai/recommend", post(recommend_handler::<C, H, R, S>))
        .route(
            "/api/recommendations/:flow",
            get(latest_handler::<C, H, R, S>).delete(start_over_handler::<C, H, R, S>),
        )
        .route(
            "/api/advisor/session",
            get(session_handler::<C, H, R, S>)
                .put(update_session_handler::<C, H, R, S>)
                .delete(reset_session_handler::<C, H, R, S>),
        )
        .with_state(AdvisorState { service, verifier })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BeginnerCardView<'a> {
    card_id: &'a str,
    card_name: &'a str,
    bank: &'a str,
    score: u8,
    reasoning: &'a str,
    annual_value: u64,
    key_perks: &'a [String],
    benefit_summary: &'a [String],
}

impl<'a> From<&'a RecommendedCard> for BeginnerCardView<'a> {
    fn from(card: &'a RecommendedCard) -> Self {
        Self {
            card_id: &card.card_id.0,
            card_name: &card.card_name,
            bank: &card.bank,
            score: card.score,
            reasoning: &card.reasoning,
            annual_value: card.annual_value,
            key_perks: &card.key_perks,
            benefit_summary: &card.benefit_summary,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdvancedCardView<'a> {
    id: &'a str,
    name: &'a str,
    bank: &'a str,
    score: u8,
    reason: &'a str,
    annual_fee: u32,
    pros: &'a [String],
    best_categories: &'a [SpendCategory],
}

impl<'a> From<&'a RecommendedCard> for AdvancedCardView<'a> {
    fn from(card: &'a RecommendedCard) -> Self {
        Self {
            id: &card.card_id.0,
            name: &card.card_name,
            bank: &card.bank,
            score: card.score,
            reason: &card.reasoning,
            annual_fee: card.annual_fee,
            pros: &card.pros,
            best_categories: &card.best_categories,
        }
    }
}

fn beginner_body(outcome: &BeginnerOutcome) -> Value {
    let recommendation = &outcome.recommendation;
    let cards: Vec<BeginnerCardView<'_>> = recommendation.cards.iter().map(Into::into).collect();
    json!({
        "success": true,
        "recommendation_id": outcome.recommendation_id.as_ref().map(|id| id.0.as_str()),
        "fallback_catalog": outcome.fallback_catalog,
        "data": {
            "recommendations": cards,
            "application_guide": recommendation.application_guide,
            "credit_education": recommendation.credit_education,
            "overall_analysis": recommendation.overall_analysis,
            "persona": recommendation.persona,
        },
    })
}

fn advanced_cards(recommendation: &Recommendation) -> Vec<AdvancedCardView<'_>> {
    recommendation.cards.iter().map(Into::into).collect()
}

fn error_body(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({ "error": error }))).into_response()
}

fn invalid_input(details: Vec<FieldError>) -> Response {
    let payload = json!({
        "error": "invalid_input",
        "details": details,
    });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn service_error(err: AdvisorServiceError) -> Response {
    match err {
        AdvisorServiceError::Invalid(details) => invalid_input(details),
        AdvisorServiceError::Catalog(error) => {
            warn!(error = %error, "catalog unavailable, request not scored");
            error_body(StatusCode::SERVICE_UNAVAILABLE, &error.to_string())
        }
        other => error_body(StatusCode::INTERNAL_SERVER_ERROR, &other.to_string()),
    }
}

fn authenticate<C, H, R, S>(
    state: &AdvisorState<C, H, R, S>,
    headers: &HeaderMap,
) -> Result<UserId, Response> {
    state
        .verifier
        .verify(headers)
        .map_err(|error| error_body(StatusCode::UNAUTHORIZED, &error.to_string()))
}

fn parse_body(body: &Bytes) -> Result<Value, Response> {
    serde_json::from_slice(body).map_err(|error| {
        invalid_input(vec![FieldError {
            field: "body".to_string(),
            message: error.to_string(),
        }])
    })
}

fn parse_flow(raw: &str) -> Result<AdvisorFlow, Response> {
    AdvisorFlow::parse(raw)
        .ok_or_else(|| error_body(StatusCode::BAD_REQUEST, &format!("unknown flow '{raw}'")))
}

pub(crate) async fn beginner_handler<C, H, R, S>(
    State(state): State<AdvisorState<C, H, R, S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    C: CatalogSource + 'static,
    H: TransactionHistory + 'static,
    R: RecommendationRepository + 'static,
    S: SessionStore + 'static,
{
    let user = match authenticate(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let payload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };

    match state.service.recommend_beginner(&user, payload).await {
        Ok(outcome) => (StatusCode::OK, Json(beginner_body(&outcome))).into_response(),
        Err(err) => service_error(err),
    }
}

pub(crate) async fn recommend_handler<C, H, R, S>(
    State(state): State<AdvisorState<C, H, R, S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    C: CatalogSource + 'static,
    H: TransactionHistory + 'static,
    R: RecommendationRepository + 'static,
    S: SessionStore + 'static,
{
    let user = match authenticate(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let payload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };

    match state.service.recommend_advanced(&user, payload).await {
        Ok(AdvancedOutcome::NeedsMoreInfo { persona, questions }) => {
            let payload = json!({
                "status": "needs_more_info",
                "persona": persona,
                "questions": questions,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Ok(AdvancedOutcome::Scored {
            recommendation_id,
            recommendation,
            catalog_origin,
            model,
        }) => {
            let payload = json!({
                "status": "success",
                "cards": advanced_cards(&recommendation),
                "analysis": recommendation.overall_analysis,
                "persona": recommendation.persona,
                "recommendationId": recommendation_id.map(|id| id.0),
                "metadata": {
                    "model": model,
                    "catalogSource": catalog_origin.as_str(),
                },
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => service_error(err),
    }
}

pub(crate) async fn latest_handler<C, H, R, S>(
    State(state): State<AdvisorState<C, H, R, S>>,
    headers: HeaderMap,
    Path(flow): Path<String>,
) -> Response
where
    C: CatalogSource + 'static,
    H: TransactionHistory + 'static,
    R: RecommendationRepository + 'static,
    S: SessionStore + 'static,
{
    let user = match authenticate(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let flow = match parse_flow(&flow) {
        Ok(flow) => flow,
        Err(response) => return response,
    };

    match state.service.latest(&user, flow) {
        Ok(Some(record)) => {
            let payload = json!({
                "recommendation_id": record.id.0,
                "flow": record.flow.as_str(),
                "created_at": record.created_at,
                "catalog_source": record.catalog_origin.as_str(),
                "recommendation": record.recommendation,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Ok(None) => error_body(StatusCode::NOT_FOUND, "no saved recommendation"),
        Err(err) => service_error(err),
    }
}

pub(crate) async fn start_over_handler<C, H, R, S>(
    State(state): State<AdvisorState<C, H, R, S>>,
    headers: HeaderMap,
    Path(flow): Path<String>,
) -> Response
where
    C: CatalogSource + 'static,
    H: TransactionHistory + 'static,
    R: RecommendationRepository + 'static,
    S: SessionStore + 'static,
{
    let user = match authenticate(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let flow = match parse_flow(&flow) {
        Ok(flow) => flow,
        Err(response) => return response,
    };

    match state.service.start_over(&user, flow) {
        Ok(deleted) => (StatusCode::OK, Json(json!({ "deleted": deleted }))).into_response(),
        Err(err) => service_error(err),
    }
}

fn session_body(session: &AdvisorSession) -> Value {
    json!({
        "session": session,
        "pending_questions": session.pending_questions(),
    })
}

pub(crate) async fn session_handler<C, H, R, S>(
    State(state): State<AdvisorState<C, H, R, S>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogSource + 'static,
    H: TransactionHistory + 'static,
    R: RecommendationRepository + 'static,
    S: SessionStore + 'static,
{
    let user = match authenticate(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state.service.session(&user) {
        Ok(session) => (StatusCode::OK, Json(session_body(&session))).into_response(),
        Err(err) => service_error(err),
    }
}

pub(crate) async fn update_session_handler<C, H, R, S>(
    State(state): State<AdvisorState<C, H, R, S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    C: CatalogSource + 'static,
    H: TransactionHistory + 'static,
    R: RecommendationRepository + 'static,
    S: SessionStore + 'static,
{
    let user = match authenticate(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let update: SessionUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(error) => {
            return invalid_input(vec![FieldError {
                field: "body".to_string(),
                message: error.to_string(),
            }])
        }
    };

    match state.service.update_session(&user, update) {
        Ok(session) => (StatusCode::OK, Json(session_body(&session))).into_response(),
        Err(err) => service_error(err),
    }
}

pub(crate) async fn reset_session_handler<C, H, R, S>(
    State(state): State<AdvisorState<C, H, R, S>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogSource + 'static,
    H: TransactionHistory + 'static,
    R: RecommendationRepository + 'static,
    S: SessionStore + 'static,
{
    let user = match authenticate(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state.service.reset_session(&user) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => service_error(err),
    }
}
