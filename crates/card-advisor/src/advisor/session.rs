//! Serializable questionnaire state with an explicit save/load boundary.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::domain::{UserId, UserProfile};
use super::normalizer::{follow_up_map, normalize};
use super::persona::{detect, Persona};
use super::questions::{follow_up_questions, missing_required, FollowUpQuestion};

pub const SESSION_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorStep {
    #[default]
    Basics,
    Income,
    Spending,
    Goals,
    FollowUp,
    Review,
}

impl AdvisorStep {
    pub const fn next(self) -> Self {
        match self {
            Self::Basics => Self::Income,
            Self::Income => Self::Spending,
            Self::Spending => Self::Goals,
            Self::Goals => Self::FollowUp,
            Self::FollowUp | Self::Review => Self::Review,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorSession {
    pub version: u32,
    pub step: AdvisorStep,
    /// Questionnaire answers in request-payload form.
    pub answers: Map<String, Value>,
    pub follow_up_answers: BTreeMap<String, String>,
    pub persona: Option<Persona>,
    pub updated_at: DateTime<Utc>,
}

impl Default for AdvisorSession {
    fn default() -> Self {
        Self {
            version: SESSION_VERSION,
            step: AdvisorStep::default(),
            answers: Map::new(),
            follow_up_answers: BTreeMap::new(),
            persona: None,
            updated_at: Utc::now(),
        }
    }
}

/// Answers submitted for one questionnaire step.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub step: AdvisorStep,
    #[serde(default)]
    pub answers: Map<String, Value>,
    #[serde(default, alias = "follow_up_answers")]
    pub follow_up_answers: Map<String, Value>,
}

impl AdvisorSession {
    /// Merges a step's answers, moves past that step and re-detects the persona.
    pub fn apply(&mut self, update: SessionUpdate) {
        for (key, value) in update.answers {
            if value.is_null() {
                self.answers.remove(&key);
            } else {
                self.answers.insert(key, value);
            }
        }
        let mut wrapper = Map::new();
        wrapper.insert(
            "followUpAnswers".to_string(),
            Value::Object(update.follow_up_answers),
        );
        self.follow_up_answers
            .extend(follow_up_map(&Value::Object(wrapper)));

        self.step = self.step.max(update.step.next());
        self.persona = Some(detect(&self.profile()));
        self.updated_at = Utc::now();
    }

    /// Questionnaire answers and follow-ups combined into one request payload.
    pub fn payload(&self) -> Value {
        let mut payload = self.answers.clone();
        let follow_ups: Map<String, Value> = self
            .follow_up_answers
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();
        payload.insert("followUpAnswers".to_string(), Value::Object(follow_ups));
        Value::Object(payload)
    }

    pub fn profile(&self) -> UserProfile {
        normalize(&self.payload())
    }

    /// Required follow-up questions not yet answered, worded for the current persona.
    pub fn pending_questions(&self) -> Vec<FollowUpQuestion> {
        let missing = missing_required(&self.follow_up_answers);
        let persona = self.persona.unwrap_or(Persona::SalariedEveryday);
        follow_up_questions(persona)
            .into_iter()
            .filter(|question| missing.contains(&question.id))
            .collect()
    }
}

/// Save/load boundary for questionnaire sessions.
pub trait SessionStore: Send + Sync {
    fn load(&self, user: &UserId) -> Result<Option<AdvisorSession>, SessionStoreError>;
    fn save(&self, user: &UserId, session: &AdvisorSession) -> Result<(), SessionStoreError>;
    fn clear(&self, user: &UserId) -> Result<(), SessionStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Keeps sessions as serialized JSON, the same form a browser or cache would hold.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<UserId, String>>>,
}

impl InMemorySessionStore {
    fn sessions(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<UserId, String>>, SessionStoreError> {
        self.sessions
            .lock()
            .map_err(|_| SessionStoreError::Unavailable("session store poisoned".to_string()))
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, user: &UserId) -> Result<Option<AdvisorSession>, SessionStoreError> {
        let Some(raw) = self.sessions()?.get(user).cloned() else {
            return Ok(None);
        };
        let session: AdvisorSession = serde_json::from_str(&raw)?;
        if session.version != SESSION_VERSION {
            tracing::warn!(
                user = %user.0,
                version = session.version,
                "discarding session with stale version"
            );
            return Ok(None);
        }
        Ok(Some(session))
    }

    fn save(&self, user: &UserId, session: &AdvisorSession) -> Result<(), SessionStoreError> {
        let raw = serde_json::to_string(session)?;
        self.sessions()?.insert(user.clone(), raw);
        Ok(())
    }

    fn clear(&self, user: &UserId) -> Result<(), SessionStoreError> {
        self.sessions()?.remove(user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(step: AdvisorStep, answers: Value) -> SessionUpdate {
        SessionUpdate {
            step,
            answers: answers.as_object().cloned().unwrap_or_default(),
            follow_up_answers: Map::new(),
        }
    }

    #[test]
    fn steps_advance_and_never_move_back() {
        let mut session = AdvisorSession::default();
        session.apply(update(AdvisorStep::Income, json!({ "annualIncome": 900000 })));
        assert_eq!(session.step, AdvisorStep::Spending);
        session.apply(update(AdvisorStep::Basics, json!({ "age": 31 })));
        assert_eq!(session.step, AdvisorStep::Spending);
        assert_eq!(session.answers.len(), 2);
    }

    #[test]
    fn persona_tracks_latest_answers() {
        let mut session = AdvisorSession::default();
        session.apply(update(
            AdvisorStep::Basics,
            json!({ "employmentType": "student", "age": 19 }),
        ));
        assert_eq!(session.persona, Some(Persona::StudentFirsttime));
        session.apply(update(
            AdvisorStep::Basics,
            json!({ "employmentType": "freelancer", "age": 34, "creditScore": 760 }),
        ));
        assert_eq!(session.persona, Some(Persona::SelfEmployed));
    }

    #[test]
    fn pending_questions_shrink_as_follow_ups_arrive() {
        let mut session = AdvisorSession::default();
        assert_eq!(session.pending_questions().len(), 5);
        session.apply(SessionUpdate {
            step: AdvisorStep::FollowUp,
            answers: Map::new(),
            follow_up_answers: json!({ "ageBand": "21_25", "valuePriority": "cashback" })
                .as_object()
                .cloned()
                .unwrap_or_default(),
        });
        let pending: Vec<&str> = session.pending_questions().iter().map(|q| q.id).collect();
        assert_eq!(pending, vec!["income_band", "secured_readiness", "primary_spend_focus"]);
        assert_eq!(session.step, AdvisorStep::Review);
    }

    #[test]
    fn store_round_trips_through_json() {
        let store = InMemorySessionStore::default();
        let user = UserId("u-1".into());
        let mut session = AdvisorSession::default();
        session.apply(update(AdvisorStep::Basics, json!({ "city": "Chennai" })));
        store.save(&user, &session).unwrap();
        assert_eq!(store.load(&user).unwrap(), Some(session));
        store.clear(&user).unwrap();
        assert_eq!(store.load(&user).unwrap(), None);
    }
}
