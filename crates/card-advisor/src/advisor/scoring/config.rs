use serde::{Deserialize, Serialize};

/// Base score, clamp range and adjustment weights for one entry flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub base: i16,
    pub min_score: u8,
    pub max_score: u8,
    pub weights: ScoringWeights,
}

impl ScoringConfig {
    pub fn beginner() -> Self {
        Self {
            base: 55,
            min_score: 45,
            max_score: 95,
            weights: ScoringWeights::default(),
        }
    }

    pub fn advanced() -> Self {
        Self {
            base: 52,
            min_score: 35,
            max_score: 96,
            weights: ScoringWeights::default(),
        }
    }
}

/// Additive adjustments in score points. Penalties are stored as negative values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub bank_affinity: i16,
    pub category_match: i16,
    pub category_cap: i16,
    pub primary_focus: i16,

    pub low_fee_zero: i16,
    pub low_fee_modest: i16,
    pub low_fee_high_penalty: i16,
    pub low_fee_secured: i16,
    pub capability_match: i16,
    pub high_reward_rate: i16,

    pub secondary_match: i16,
    pub secondary_partial: i16,

    pub young_secured: i16,
    pub young_unsecured_penalty: i16,

    pub no_income_gated_penalty: i16,
    pub no_income_friendly: i16,
    pub mid_income_gated_penalty: i16,
    pub mid_income_low_fee: i16,
    pub high_income_reasonable_fee: i16,

    pub fd_secured: i16,
    pub unsecured_only_penalty: i16,

    pub fee_zero_match: i16,
    pub fee_zero_miss: i16,
    pub fee_1000_match: i16,
    pub fee_1000_miss: i16,
    pub fee_5000_match: i16,
    pub fee_5000_miss: i16,
    pub fee_premium_match: i16,

    /// Annual fee (rupees) still counted as low.
    pub modest_fee: u32,
    /// Annual fee above which low-fee seekers are penalized.
    pub high_fee: u32,
    /// Annual fee ceiling for the high-income bias.
    pub reasonable_fee: u32,
    /// Best reward rate (percent) treated as accelerated.
    pub high_reward_pct: f64,
    pub near_zero_income: u64,
    pub mid_income_ceiling: u64,
    pub high_income_floor: u64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            bank_affinity: 6,
            category_match: 4,
            category_cap: 12,
            primary_focus: 10,
            low_fee_zero: 10,
            low_fee_modest: 5,
            low_fee_high_penalty: -10,
            low_fee_secured: 8,
            capability_match: 10,
            high_reward_rate: 6,
            secondary_match: 4,
            secondary_partial: 2,
            young_secured: 12,
            young_unsecured_penalty: -10,
            no_income_gated_penalty: -15,
            no_income_friendly: 12,
            mid_income_gated_penalty: -8,
            mid_income_low_fee: 4,
            high_income_reasonable_fee: 3,
            fd_secured: 8,
            unsecured_only_penalty: -12,
            fee_zero_match: 6,
            fee_zero_miss: -8,
            fee_1000_match: 4,
            fee_1000_miss: -6,
            fee_5000_match: 3,
            fee_5000_miss: -4,
            fee_premium_match: 4,
            modest_fee: 500,
            high_fee: 2_500,
            reasonable_fee: 10_000,
            high_reward_pct: 2.0,
            near_zero_income: 100_000,
            mid_income_ceiling: 600_000,
            high_income_floor: 1_200_000,
        }
    }
}
