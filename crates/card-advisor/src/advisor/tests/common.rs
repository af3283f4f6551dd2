use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};

use crate::advisor::auth::{TrustedHeaderVerifier, USER_ID_HEADER};
use crate::advisor::catalog::{normalize_row, CatalogSource, CatalogSourceError, StaticCatalog};
use crate::advisor::domain::{CardRecord, UserId};
use crate::advisor::history::{
    HistoryError, InMemoryTransactionHistory, TransactionEntry, TransactionHistory,
};
use crate::advisor::repository::{InMemoryRecommendationRepository, PayloadShape};
use crate::advisor::session::InMemorySessionStore;
use crate::advisor::{advisor_router, AdvisorService};
use crate::config::AdvisorSettings;

pub(super) type TestService = AdvisorService<
    StaticCatalog,
    InMemoryTransactionHistory,
    InMemoryRecommendationRepository,
    InMemorySessionStore,
>;

pub(super) fn user() -> UserId {
    UserId("user-001".to_string())
}

pub(super) fn card_row(id: &str, extra: Value) -> Value {
    let mut row = json!({
        "id": id,
        "name": format!("{id} card"),
        "bank": "Test Bank",
        "popularity_score": 50
    });
    if let (Some(base), Some(extra)) = (row.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }
    row
}

pub(super) fn card(id: &str, extra: Value) -> CardRecord {
    normalize_row(&card_row(id, extra)).expect("fixture normalizes")
}

pub(super) fn secured_card() -> CardRecord {
    card(
        "fd-secured",
        json!({
            "card_type": "secured",
            "annual_fee": 0,
            "min_age": 18,
            "best_for": ["groceries"]
        }),
    )
}

pub(super) fn income_gated_card() -> CardRecord {
    card(
        "gated-rewards",
        json!({
            "card_type": "rewards",
            "annual_fee": 0,
            "min_income_salaried": 300000,
            "min_age": 18
        }),
    )
}

/// Two active primary rows, below the beginner minimum of three.
pub(super) fn two_card_rows() -> Vec<Value> {
    vec![
        card_row(
            "primary-cashback",
            json!({
                "card_type": "cashback",
                "annual_fee": 500,
                "best_for": ["online_shopping"],
                "popularity_score": 80
            }),
        ),
        card_row(
            "primary-travel",
            json!({
                "card_type": "travel",
                "annual_fee": 2500,
                "lounge_access": "domestic",
                "best_for": ["travel"],
                "popularity_score": 70
            }),
        ),
    ]
}

pub(super) fn student_payload() -> Value {
    json!({ "age": 19, "employment": "student", "income": 0, "topCategories": [] })
}

pub(super) fn complete_follow_ups() -> Value {
    json!({
        "ageBand": "26_35",
        "incomeBand": "6l_12l",
        "securedReadiness": "unsecured_only",
        "primarySpendFocus": "online_shopping",
        "valuePriority": "cashback"
    })
}

pub(super) fn advanced_payload(follow_ups: Value) -> Value {
    json!({
        "creditScore": 752,
        "annualIncome": 900000,
        "employmentType": "salaried",
        "primaryBank": "HDFC Bank",
        "city": "Bengaluru",
        "spendBreakdown": { "online_shopping": 12000, "dining": 4000, "groceries": 6000 },
        "followUpAnswers": follow_ups
    })
}

pub(super) fn grocery_transactions() -> Vec<TransactionEntry> {
    vec![
        TransactionEntry {
            posted_on: None,
            description: "BigBasket".to_string(),
            category: "groceries".to_string(),
            amount: 4200.0,
        },
        TransactionEntry {
            posted_on: None,
            description: "Swiggy".to_string(),
            category: "food".to_string(),
            amount: 1800.0,
        },
    ]
}

pub(super) struct UnavailableCatalog;

impl CatalogSource for UnavailableCatalog {
    fn fetch_active(&self, _limit: usize) -> Result<Vec<Value>, CatalogSourceError> {
        Err(CatalogSourceError::Unavailable("connection refused".to_string()))
    }
}

pub(super) struct FailingHistory;

impl TransactionHistory for FailingHistory {
    fn recent(&self, _user: &UserId) -> Result<Vec<TransactionEntry>, HistoryError> {
        Err(HistoryError::Unavailable("statement service down".to_string()))
    }
}

pub(super) struct Harness {
    pub service: Arc<TestService>,
    pub repository: InMemoryRecommendationRepository,
    pub history: Arc<InMemoryTransactionHistory>,
}

pub(super) fn build_service(rows: Vec<Value>, shapes: &[PayloadShape]) -> Harness {
    let repository = InMemoryRecommendationRepository::accepting(shapes);
    let history = Arc::new(InMemoryTransactionHistory::default());
    let service = Arc::new(AdvisorService::new(
        StaticCatalog::new(rows),
        Arc::clone(&history),
        Arc::new(repository.clone()),
        Arc::new(InMemorySessionStore::default()),
        AdvisorSettings::default(),
    ));
    Harness {
        service,
        repository,
        history,
    }
}

pub(super) fn router_for(service: Arc<TestService>) -> Router {
    advisor_router(service, Arc::new(TrustedHeaderVerifier::default()))
}

pub(super) fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, user().0)
        .header(axum::http::header::CONTENT_TYPE, "application/json");
    let body = match body {
        Some(value) => Body::from(serde_json::to_vec(&value).expect("serializable body")),
        None => Body::empty(),
    };
    builder.body(body).expect("valid request")
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
