mod config;
mod rules;

pub use config::{ScoringConfig, ScoringWeights};
pub(crate) use rules::effective_value_priority;

use serde::{Deserialize, Serialize};

use super::domain::{CardId, CardRecord, UserProfile};

/// Signal an adjustment was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    BankAffinity,
    CategoryOverlap,
    PrimaryFocus,
    ValuePriority,
    SecondaryPreference,
    AgeBand,
    IncomeProfile,
    SecuredReadiness,
    FeeTolerance,
}

/// Discrete contribution to a card score, kept for audits and reasoning text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub points: i16,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardScore {
    pub card_id: CardId,
    /// Clamped match score.
    pub total: u8,
    /// Base plus every adjustment, before clamping.
    pub raw: i16,
    pub components: Vec<ScoreComponent>,
}

impl CardScore {
    pub fn has_factor(&self, factor: ScoreFactor) -> bool {
        self.components
            .iter()
            .any(|component| component.factor == factor && component.points > 0)
    }
}

/// Stateless scorer; each card is scored independently of the rest of the pool.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(&self, profile: &UserProfile, card: &CardRecord) -> CardScore {
        let (components, adjustments) = rules::score_card(profile, card, &self.config);
        let raw = self.config.base.saturating_add(adjustments);
        let total = raw.clamp(
            i16::from(self.config.min_score),
            i16::from(self.config.max_score),
        ) as u8;

        CardScore {
            card_id: card.id.clone(),
            total,
            raw,
            components,
        }
    }
}
