//! Eligibility filtering with income relaxation.
//!
//! Age and credit-score thresholds are enforced by issuers and are never relaxed. Declared
//! income is self-reported and often zero for students, so it is the only constraint that
//! gives way when the strict pool comes back empty.

use serde::{Deserialize, Serialize};

use super::domain::{CardRecord, UserProfile};

/// Which pool the filter settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityTier {
    Strict,
    IncomeRelaxed,
    FullCatalog,
}

#[derive(Debug, Clone)]
pub struct EligibilityReport {
    pub cards: Vec<CardRecord>,
    pub tier: EligibilityTier,
}

/// Never empty when `catalog` is non-empty.
pub fn filter_eligible(profile: &UserProfile, catalog: &[CardRecord]) -> EligibilityReport {
    let hard: Vec<&CardRecord> = catalog
        .iter()
        .filter(|card| passes_hard_constraints(profile, card))
        .collect();

    let strict: Vec<CardRecord> = hard
        .iter()
        .filter(|card| meets_income(profile, card))
        .map(|card| (*card).clone())
        .collect();

    if !strict.is_empty() {
        return EligibilityReport {
            cards: strict,
            tier: EligibilityTier::Strict,
        };
    }

    if !hard.is_empty() {
        return EligibilityReport {
            cards: hard.into_iter().cloned().collect(),
            tier: EligibilityTier::IncomeRelaxed,
        };
    }

    EligibilityReport {
        cards: catalog.to_vec(),
        tier: EligibilityTier::FullCatalog,
    }
}

/// Duplicate, credit-score and age checks.
pub fn passes_hard_constraints(profile: &UserProfile, card: &CardRecord) -> bool {
    if profile.holds_card_named(&card.name) {
        return false;
    }

    if let (Some(required), Some(score)) = (card.min_credit_score, profile.credit_score_value()) {
        if required > score {
            return false;
        }
    }

    if let Some(age) = profile.effective_age() {
        if card.min_age.is_some_and(|min| age < min) || card.max_age.is_some_and(|max| age > max)
        {
            return false;
        }
    }

    true
}

pub fn meets_income(profile: &UserProfile, card: &CardRecord) -> bool {
    match card.min_income_for(profile.employment) {
        Some(required) => u64::from(required) <= profile.effective_annual_income(),
        None => true,
    }
}
