//! Persistence boundary for recommendations.
//!
//! The service works with one canonical [`RecommendationRecord`]. Stores that predate the
//! current schema only accept the legacy payload layout, so the record is mapped to a
//! [`PayloadShape`] at this boundary and nowhere else.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::assembler::Recommendation;
use super::catalog::CatalogOrigin;
use super::domain::{AdvisorFlow, RecommendationId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: RecommendationId,
    pub user: UserId,
    pub flow: AdvisorFlow,
    pub recommendation: Recommendation,
    pub credit_score: Option<u16>,
    pub catalog_origin: CatalogOrigin,
    pub created_at: DateTime<Utc>,
}

/// Column layouts a backing store may expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    Modern,
    Legacy,
}

impl PayloadShape {
    /// Order in which shapes are attempted on insert.
    pub const PREFERENCE: [PayloadShape; 2] = [PayloadShape::Modern, PayloadShape::Legacy];

    pub fn encode(self, record: &RecommendationRecord) -> Value {
        match self {
            Self::Modern => json!({
                "id": record.id.0,
                "user_id": record.user.0,
                "flow_type": record.flow.as_str(),
                "recommendation": record.recommendation,
                "credit_score": record.credit_score,
                "catalog_source": record.catalog_origin.as_str(),
                "created_at": record.created_at,
            }),
            Self::Legacy => json!({
                "id": record.id.0,
                "user_id": record.user.0,
                "recommendation_type": legacy_type(record.flow),
                "recommendation_data": record.recommendation,
                "profile_data": {
                    "credit_score": record.credit_score,
                    "fallback_catalog": record.catalog_origin == CatalogOrigin::Fallback,
                },
                "created_at": record.created_at,
            }),
        }
    }

    /// Detects the layout from its discriminating key.
    pub fn detect(payload: &Value) -> Option<Self> {
        if payload.get("flow_type").is_some() {
            Some(Self::Modern)
        } else if payload.get("recommendation_type").is_some() {
            Some(Self::Legacy)
        } else {
            None
        }
    }

    pub fn decode(payload: &Value) -> Result<RecommendationRecord, RepositoryError> {
        let corrupt = |err: serde_json::Error| RepositoryError::Corrupt(err.to_string());
        let record = match Self::detect(payload) {
            Some(Self::Modern) => {
                let row: ModernPayload = serde_json::from_value(payload.clone()).map_err(corrupt)?;
                RecommendationRecord {
                    id: RecommendationId(row.id),
                    user: UserId(row.user_id),
                    flow: parse_flow(&row.flow_type)?,
                    recommendation: row.recommendation,
                    credit_score: row.credit_score,
                    catalog_origin: row.catalog_source,
                    created_at: row.created_at,
                }
            }
            Some(Self::Legacy) => {
                let row: LegacyPayload = serde_json::from_value(payload.clone()).map_err(corrupt)?;
                RecommendationRecord {
                    id: RecommendationId(row.id),
                    user: UserId(row.user_id),
                    flow: parse_flow(row.recommendation_type.trim_start_matches("ai_"))?,
                    recommendation: row.recommendation_data,
                    credit_score: row.profile_data.credit_score,
                    catalog_origin: if row.profile_data.fallback_catalog {
                        CatalogOrigin::Fallback
                    } else {
                        CatalogOrigin::Primary
                    },
                    created_at: row.created_at,
                }
            }
            None => {
                return Err(RepositoryError::Corrupt(
                    "payload matches no known layout".to_string(),
                ))
            }
        };
        Ok(record)
    }
}

fn parse_flow(raw: &str) -> Result<AdvisorFlow, RepositoryError> {
    AdvisorFlow::parse(raw)
        .ok_or_else(|| RepositoryError::Corrupt(format!("unknown flow type '{raw}'")))
}

fn legacy_type(flow: AdvisorFlow) -> &'static str {
    match flow {
        AdvisorFlow::Beginner => "ai_beginner",
        AdvisorFlow::Advanced => "ai_advisor",
    }
}

#[derive(Deserialize)]
struct ModernPayload {
    id: String,
    user_id: String,
    flow_type: String,
    recommendation: Recommendation,
    credit_score: Option<u16>,
    catalog_source: CatalogOrigin,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct LegacyPayload {
    id: String,
    user_id: String,
    recommendation_type: String,
    recommendation_data: Recommendation,
    #[serde(default)]
    profile_data: LegacyProfileData,
    created_at: DateTime<Utc>,
}

#[derive(Default, Deserialize)]
struct LegacyProfileData {
    credit_score: Option<u16>,
    #[serde(default)]
    fallback_catalog: bool,
}

/// Storage of opaque payloads keyed by (user, flow); the latest insert supersedes earlier ones.
pub trait RecommendationRepository: Send + Sync {
    fn insert_payload(
        &self,
        user: &UserId,
        flow: AdvisorFlow,
        shape: PayloadShape,
        payload: Value,
    ) -> Result<(), RepositoryError>;
    fn latest_payload(
        &self,
        user: &UserId,
        flow: AdvisorFlow,
    ) -> Result<Option<Value>, RepositoryError>;
    fn delete(&self, user: &UserId, flow: AdvisorFlow) -> Result<bool, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("store rejected the {0:?} payload layout")]
    SchemaMismatch(PayloadShape),
    #[error("stored payload is unreadable: {0}")]
    Corrupt(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Shape-negotiating wrapper used by the service.
pub struct RecommendationStore<R> {
    repository: Arc<R>,
}

impl<R> Clone for RecommendationStore<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: RecommendationRepository> RecommendationStore<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Best-effort save. Returns the id only when some payload layout was accepted;
    /// every failure is logged and swallowed.
    pub fn save(&self, record: &RecommendationRecord) -> Option<RecommendationId> {
        for shape in PayloadShape::PREFERENCE {
            match self
                .repository
                .insert_payload(&record.user, record.flow, shape, shape.encode(record))
            {
                Ok(()) => {
                    debug!(id = %record.id.0, ?shape, "recommendation persisted");
                    return Some(record.id.clone());
                }
                Err(RepositoryError::SchemaMismatch(rejected)) => {
                    debug!(?rejected, "store rejected payload layout, trying next");
                }
                Err(err) => {
                    warn!(error = %err, "failed to persist recommendation");
                    return None;
                }
            }
        }
        warn!(id = %record.id.0, "no payload layout accepted, recommendation not persisted");
        None
    }

    pub fn latest(
        &self,
        user: &UserId,
        flow: AdvisorFlow,
    ) -> Result<Option<RecommendationRecord>, RepositoryError> {
        self.repository
            .latest_payload(user, flow)?
            .map(|payload| PayloadShape::decode(&payload))
            .transpose()
    }

    pub fn clear(&self, user: &UserId, flow: AdvisorFlow) -> Result<bool, RepositoryError> {
        self.repository.delete(user, flow)
    }
}

/// In-process repository; accepts only the configured layouts.
#[derive(Clone)]
pub struct InMemoryRecommendationRepository {
    accepted: Vec<PayloadShape>,
    rows: Arc<Mutex<HashMap<(UserId, AdvisorFlow), Value>>>,
}

impl Default for InMemoryRecommendationRepository {
    fn default() -> Self {
        Self::accepting(&[PayloadShape::Modern])
    }
}

impl InMemoryRecommendationRepository {
    pub fn accepting(shapes: &[PayloadShape]) -> Self {
        Self {
            accepted: shapes.to_vec(),
            rows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Stores a raw payload directly, bypassing layout checks.
    pub fn seed(&self, user: UserId, flow: AdvisorFlow, payload: Value) {
        if let Ok(mut rows) = self.rows.lock() {
            rows.insert((user, flow), payload);
        }
    }

    fn rows(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(UserId, AdvisorFlow), Value>>, RepositoryError> {
        self.rows
            .lock()
            .map_err(|_| RepositoryError::Unavailable("recommendation store poisoned".to_string()))
    }
}

impl RecommendationRepository for InMemoryRecommendationRepository {
    fn insert_payload(
        &self,
        user: &UserId,
        flow: AdvisorFlow,
        shape: PayloadShape,
        payload: Value,
    ) -> Result<(), RepositoryError> {
        if !self.accepted.contains(&shape) {
            return Err(RepositoryError::SchemaMismatch(shape));
        }
        self.rows()?.insert((user.clone(), flow), payload);
        Ok(())
    }

    fn latest_payload(
        &self,
        user: &UserId,
        flow: AdvisorFlow,
    ) -> Result<Option<Value>, RepositoryError> {
        Ok(self.rows()?.get(&(user.clone(), flow)).cloned())
    }

    fn delete(&self, user: &UserId, flow: AdvisorFlow) -> Result<bool, RepositoryError> {
        Ok(self.rows()?.remove(&(user.clone(), flow)).is_some())
    }
}
