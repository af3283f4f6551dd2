use axum::http::{Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::advisor::repository::PayloadShape;

#[tokio::test]
async fn unauthenticated_requests_are_rejected_before_scoring() {
    let harness = build_service(two_card_rows(), &[PayloadShape::Modern]);
    let router = router_for(harness.service.clone());

    let response = router
        .oneshot(
            Request::post("/api/ai/beginner")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(student_payload().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(harness
        .service
        .latest(&user(), crate::advisor::AdvisorFlow::Beginner)
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn beginner_route_returns_recommendation_envelope() {
    let harness = build_service(two_card_rows(), &[PayloadShape::Modern]);
    let response = router_for(harness.service)
        .oneshot(request(Method::POST, "/api/ai/beginner", Some(student_payload())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["fallback_catalog"], true);
    assert!(body["recommendation_id"].is_string());

    let recommendations = body["data"]["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 3);
    for item in recommendations {
        for key in [
            "cardId",
            "cardName",
            "bank",
            "score",
            "reasoning",
            "annualValue",
            "keyPerks",
            "benefitSummary",
        ] {
            assert!(item.get(key).is_some(), "missing {key}");
        }
    }
    assert!(body["data"]["application_guide"].is_array());
    assert!(body["data"]["credit_education"].is_array());
    assert!(body["data"]["overall_analysis"].is_string());
}

#[tokio::test]
async fn recommend_route_returns_questions_without_follow_ups() {
    let harness = build_service(two_card_rows(), &[PayloadShape::Modern]);
    let response = router_for(harness.service)
        .oneshot(request(
            Method::POST,
            "/api/ai/recommend",
            Some(advanced_payload(json!({}))),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "needs_more_info");
    assert_eq!(body["questions"].as_array().unwrap().len(), 5);
    assert!(body.get("cards").is_none());
}

#[tokio::test]
async fn recommend_route_scores_complete_requests() {
    let harness = build_service(two_card_rows(), &[PayloadShape::Modern]);
    let response = router_for(harness.service)
        .oneshot(request(
            Method::POST,
            "/api/ai/recommend",
            Some(advanced_payload(complete_follow_ups())),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["metadata"]["model"], "rules-v1");
    assert_eq!(body["metadata"]["catalogSource"], "primary");
    assert!(body["recommendationId"].is_string());
    let cards = body["cards"].as_array().unwrap();
    assert_eq!(cards.len(), 3);
    for key in ["id", "name", "bank", "score", "reason", "annualFee", "pros", "bestCategories"] {
        assert!(cards[0].get(key).is_some(), "missing {key}");
    }
}

#[tokio::test]
async fn invalid_body_reports_field_errors() {
    let harness = build_service(two_card_rows(), &[PayloadShape::Modern]);
    let response = router_for(harness.service)
        .oneshot(request(
            Method::POST,
            "/api/ai/recommend",
            Some(json!({ "creditScore": 120, "annualIncome": -5 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "invalid_input");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|detail| detail["field"].as_str())
        .collect();
    assert!(fields.contains(&"creditScore"));
    assert!(fields.contains(&"annualIncome"));
    assert!(fields.contains(&"city"));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let harness = build_service(two_card_rows(), &[PayloadShape::Modern]);
    let response = router_for(harness.service)
        .oneshot(
            Request::post("/api/ai/beginner")
                .header(crate::advisor::auth::USER_ID_HEADER, "user-001")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unavailable_catalog_maps_to_service_unavailable() {
    let service = std::sync::Arc::new(crate::advisor::AdvisorService::new(
        UnavailableCatalog,
        std::sync::Arc::new(crate::advisor::history::NoTransactionHistory),
        std::sync::Arc::new(crate::advisor::InMemoryRecommendationRepository::default()),
        std::sync::Arc::new(crate::advisor::InMemorySessionStore::default()),
        crate::config::AdvisorSettings::default(),
    ));
    let router = crate::advisor::advisor_router(
        service,
        std::sync::Arc::new(crate::advisor::TrustedHeaderVerifier::default()),
    );

    let response = router
        .oneshot(request(Method::POST, "/api/ai/beginner", Some(student_payload())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn saved_recommendation_can_be_fetched_and_deleted() {
    let harness = build_service(two_card_rows(), &[PayloadShape::Modern]);
    let router = router_for(harness.service.clone());

    let response = router
        .clone()
        .oneshot(request(Method::POST, "/api/ai/beginner", Some(student_payload())))
        .await
        .unwrap();
    let created = json_body(response).await;

    let response = router
        .clone()
        .oneshot(request(Method::GET, "/api/recommendations/beginner", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = json_body(response).await;
    assert_eq!(fetched["recommendation_id"], created["recommendation_id"]);

    let response = router
        .clone()
        .oneshot(request(Method::DELETE, "/api/recommendations/beginner", None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["deleted"], true);

    let response = router
        .clone()
        .oneshot(request(Method::GET, "/api/recommendations/beginner", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .oneshot(request(Method::GET, "/api/recommendations/premium", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_endpoints_save_and_reset_progress() {
    let harness = build_service(two_card_rows(), &[PayloadShape::Modern]);
    let router = router_for(harness.service);

    let response = router
        .clone()
        .oneshot(request(
            Method::PUT,
            "/api/advisor/session",
            Some(json!({
                "step": "basics",
                "answers": { "age": 19, "employmentType": "student" }
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["session"]["step"], "income");
    assert_eq!(body["session"]["persona"], "student_firsttime");
    assert_eq!(body["pending_questions"].as_array().unwrap().len(), 5);

    let response = router
        .clone()
        .oneshot(request(Method::GET, "/api/advisor/session", None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["session"]["answers"]["age"], 19);

    let response = router
        .clone()
        .oneshot(request(Method::DELETE, "/api/advisor/session", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(request(Method::GET, "/api/advisor/session", None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["session"]["step"], "basics");
}

#[tokio::test]
async fn bare_follow_up_request_gets_clarification_round() {
    let harness = build_service(two_card_rows(), &[PayloadShape::Modern]);
    let response = router_for(harness.service)
        .oneshot(request(
            Method::POST,
            "/api/ai/recommend",
            Some(json!({ "followUpAnswers": {} })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "needs_more_info");
    assert_eq!(body["questions"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn complete_follow_ups_still_require_profile_fields() {
    let harness = build_service(two_card_rows(), &[PayloadShape::Modern]);
    let response = router_for(harness.service)
        .oneshot(request(
            Method::POST,
            "/api/ai/recommend",
            Some(json!({ "followUpAnswers": complete_follow_ups() })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["details"][0]["field"], "employmentType");
}

#[tokio::test]
async fn aliased_credit_score_is_range_checked() {
    let harness = build_service(two_card_rows(), &[PayloadShape::Modern]);
    let mut payload = advanced_payload(complete_follow_ups());
    if let Some(object) = payload.as_object_mut() {
        object.remove("creditScore");
        object.insert("credit_history".to_string(), json!(950));
    }
    let response = router_for(harness.service)
        .oneshot(request(Method::POST, "/api/ai/recommend", Some(payload)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["details"][0]["field"], "creditScore");
    assert_eq!(body["details"][0]["message"], "must be between 300 and 900");
}
