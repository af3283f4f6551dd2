use super::super::domain::{
    AgeBand, CardRecord, FeeTolerance, PrimaryGoal, RewardPreference, SecuredReadiness,
    TravelFrequency, UpiNeed, UserProfile, ValuePriority,
};
use super::config::{ScoringConfig, ScoringWeights};
use super::{ScoreComponent, ScoreFactor};

const TOP_CATEGORY_COUNT: usize = 3;

pub(crate) fn score_card(
    profile: &UserProfile,
    card: &CardRecord,
    config: &ScoringConfig,
) -> (Vec<ScoreComponent>, i16) {
    let weights = &config.weights;
    let mut ledger = Ledger::default();

    bank_affinity(profile, card, weights, &mut ledger);
    category_overlap(profile, card, weights, &mut ledger);
    value_priority(profile, card, weights, &mut ledger);
    secondary_preferences(profile, card, weights, &mut ledger);
    age_band(profile, card, weights, &mut ledger);
    income_profile(profile, card, weights, &mut ledger);
    secured_readiness(profile, card, weights, &mut ledger);
    fee_tolerance(profile, card, weights, &mut ledger);

    (ledger.components, ledger.total)
}

/// Declared value priority, or one inferred from the beginner flow's primary goal.
pub(crate) fn effective_value_priority(profile: &UserProfile) -> Option<ValuePriority> {
    if let Some(priority) = profile.follow_up.value_priority {
        return Some(priority);
    }
    match profile.primary_goal? {
        PrimaryGoal::CreditBuilding | PrimaryGoal::DebtManagement => {
            Some(ValuePriority::BuildCredit)
        }
        PrimaryGoal::Cashback | PrimaryGoal::OnlineShopping => Some(ValuePriority::Cashback),
        PrimaryGoal::TravelPerks => Some(ValuePriority::Travel),
        PrimaryGoal::Rewards | PrimaryGoal::PremiumLifestyle => Some(ValuePriority::Rewards),
        PrimaryGoal::EverydaySavings => Some(ValuePriority::LowFee),
        PrimaryGoal::FuelSavings => None,
    }
}

#[derive(Default)]
struct Ledger {
    components: Vec<ScoreComponent>,
    total: i16,
}

impl Ledger {
    fn add(&mut self, factor: ScoreFactor, points: i16, note: impl Into<String>) {
        if points == 0 {
            return;
        }
        self.total += points;
        self.components.push(ScoreComponent {
            factor,
            points,
            note: note.into(),
        });
    }
}

fn bank_affinity(
    profile: &UserProfile,
    card: &CardRecord,
    weights: &ScoringWeights,
    ledger: &mut Ledger,
) {
    let declared = profile.primary_bank.trim().to_lowercase();
    let bank = card.bank.trim().to_lowercase();
    if declared.is_empty() || bank.is_empty() {
        return;
    }
    if bank.contains(&declared) {
        ledger.add(
            ScoreFactor::BankAffinity,
            weights.bank_affinity,
            format!("existing {} relationship", card.bank),
        );
    }
}

fn category_overlap(
    profile: &UserProfile,
    card: &CardRecord,
    weights: &ScoringWeights,
    ledger: &mut Ledger,
) {
    let matched: Vec<&str> = profile
        .top_categories(TOP_CATEGORY_COUNT)
        .into_iter()
        .filter(|category| card.serves(*category))
        .map(|category| category.as_str())
        .collect();
    if !matched.is_empty() {
        let points = (weights.category_match * matched.len() as i16).min(weights.category_cap);
        ledger.add(
            ScoreFactor::CategoryOverlap,
            points,
            format!("built for {}", matched.join(", ")),
        );
    }

    if let Some(focus) = profile.follow_up.primary_spend_focus {
        if card.serves(focus) {
            ledger.add(
                ScoreFactor::PrimaryFocus,
                weights.primary_focus,
                format!("matches primary spend focus {}", focus.as_str()),
            );
        }
    }
}

fn value_priority(
    profile: &UserProfile,
    card: &CardRecord,
    weights: &ScoringWeights,
    ledger: &mut Ledger,
) {
    let Some(priority) = effective_value_priority(profile) else {
        return;
    };

    if priority.favors_low_fee() {
        let fee = card.annual_fee;
        if fee == 0 {
            ledger.add(ScoreFactor::ValuePriority, weights.low_fee_zero, "no annual fee");
        } else if fee <= weights.modest_fee {
            ledger.add(
                ScoreFactor::ValuePriority,
                weights.low_fee_modest,
                format!("low annual fee of {fee}"),
            );
        } else if fee > weights.high_fee {
            ledger.add(
                ScoreFactor::ValuePriority,
                weights.low_fee_high_penalty,
                format!("annual fee of {fee} is high for a low-fee goal"),
            );
        }
        if card.is_secured() {
            ledger.add(
                ScoreFactor::ValuePriority,
                weights.low_fee_secured,
                "secured against a fixed deposit",
            );
        }
        return;
    }

    let capabilities = card.capabilities;
    match priority {
        ValuePriority::Cashback if capabilities.cashback => {
            ledger.add(ScoreFactor::ValuePriority, weights.capability_match, "cashback card")
        }
        ValuePriority::Travel if capabilities.travel => {
            ledger.add(ScoreFactor::ValuePriority, weights.capability_match, "travel perks")
        }
        ValuePriority::Upi if capabilities.upi => ledger.add(
            ScoreFactor::ValuePriority,
            weights.capability_match,
            "UPI-linked RuPay card",
        ),
        ValuePriority::Rewards if card.reward_rate.best_pct() >= weights.high_reward_pct => {
            ledger.add(
                ScoreFactor::ValuePriority,
                weights.high_reward_rate,
                format!("accelerated rewards up to {:.1}%", card.reward_rate.best_pct()),
            )
        }
        _ => {}
    }
}

fn secondary_preferences(
    profile: &UserProfile,
    card: &CardRecord,
    weights: &ScoringWeights,
    ledger: &mut Ledger,
) {
    let answers = &profile.follow_up;
    let capabilities = card.capabilities;

    let reward_fit = match answers.reward_type {
        Some(RewardPreference::Cashback) => capabilities.cashback,
        Some(RewardPreference::Miles) => capabilities.travel,
        Some(RewardPreference::Points) => {
            !capabilities.cashback && card.reward_rate.best_pct() >= weights.high_reward_pct
        }
        None => false,
    };
    if reward_fit {
        ledger.add(
            ScoreFactor::SecondaryPreference,
            weights.secondary_match,
            "reward type fits preference",
        );
    }

    if capabilities.travel {
        match answers.travel_frequency {
            Some(TravelFrequency::Frequently) => ledger.add(
                ScoreFactor::SecondaryPreference,
                weights.secondary_match,
                "frequent traveller",
            ),
            Some(TravelFrequency::Occasionally) => ledger.add(
                ScoreFactor::SecondaryPreference,
                weights.secondary_partial,
                "occasional traveller",
            ),
            _ => {}
        }
    }

    if capabilities.upi {
        match answers.upi_need {
            Some(UpiNeed::Heavy) => ledger.add(
                ScoreFactor::SecondaryPreference,
                weights.secondary_match,
                "heavy UPI usage",
            ),
            Some(UpiNeed::Some) => ledger.add(
                ScoreFactor::SecondaryPreference,
                weights.secondary_partial,
                "occasional UPI usage",
            ),
            _ => {}
        }
    }
}

fn age_band(
    profile: &UserProfile,
    card: &CardRecord,
    weights: &ScoringWeights,
    ledger: &mut Ledger,
) {
    if profile.age_band() != Some(AgeBand::Age18To20) {
        return;
    }
    if card.is_secured() {
        ledger.add(
            ScoreFactor::AgeBand,
            weights.young_secured,
            "secured cards approve readily at 18-20",
        );
    } else {
        ledger.add(
            ScoreFactor::AgeBand,
            weights.young_unsecured_penalty,
            "unsecured approval is unlikely at 18-20",
        );
    }
}

fn income_profile(
    profile: &UserProfile,
    card: &CardRecord,
    weights: &ScoringWeights,
    ledger: &mut Ledger,
) {
    let income = profile.effective_annual_income();

    if income < weights.near_zero_income {
        if card.requires_income() {
            ledger.add(
                ScoreFactor::IncomeProfile,
                weights.no_income_gated_penalty,
                "needs income proof you have not declared",
            );
        }
        if card.is_secured() || card.annual_fee == 0 {
            ledger.add(
                ScoreFactor::IncomeProfile,
                weights.no_income_friendly,
                "no income proof needed",
            );
        }
    } else if income < weights.mid_income_ceiling {
        if let Some(min_income) = card.min_income_for(profile.employment) {
            if u64::from(min_income) > income {
                ledger.add(
                    ScoreFactor::IncomeProfile,
                    weights.mid_income_gated_penalty,
                    format!("minimum income {min_income} above declared income"),
                );
            }
        }
        if card.annual_fee <= weights.modest_fee {
            ledger.add(
                ScoreFactor::IncomeProfile,
                weights.mid_income_low_fee,
                "fee suits a moderate income",
            );
        }
    } else if income >= weights.high_income_floor && card.annual_fee <= weights.reasonable_fee {
        ledger.add(
            ScoreFactor::IncomeProfile,
            weights.high_income_reasonable_fee,
            "fee easily offset at this income",
        );
    }
}

fn secured_readiness(
    profile: &UserProfile,
    card: &CardRecord,
    weights: &ScoringWeights,
    ledger: &mut Ledger,
) {
    if !card.is_secured() {
        return;
    }
    let readiness = profile
        .follow_up
        .secured_readiness
        .or(profile.has_fixed_deposit.then_some(SecuredReadiness::HasFd));
    match readiness {
        Some(SecuredReadiness::HasFd | SecuredReadiness::FdReady) => ledger.add(
            ScoreFactor::SecuredReadiness,
            weights.fd_secured,
            "can be issued against your fixed deposit",
        ),
        Some(SecuredReadiness::UnsecuredOnly) => ledger.add(
            ScoreFactor::SecuredReadiness,
            weights.unsecured_only_penalty,
            "requires a fixed deposit you prefer to avoid",
        ),
        _ => {}
    }
}

fn fee_tolerance(
    profile: &UserProfile,
    card: &CardRecord,
    weights: &ScoringWeights,
    ledger: &mut Ledger,
) {
    let Some(tolerance) = profile.follow_up.fee_tolerance else {
        return;
    };
    let fee = card.annual_fee;
    let (points, note) = match tolerance {
        FeeTolerance::Zero if fee == 0 => (weights.fee_zero_match, "within zero-fee tolerance"),
        FeeTolerance::Zero => (weights.fee_zero_miss, "charges a fee you want to avoid"),
        FeeTolerance::UpTo1000 if fee <= 1_000 => (weights.fee_1000_match, "fee within 1,000"),
        FeeTolerance::UpTo1000 => (weights.fee_1000_miss, "fee above 1,000"),
        FeeTolerance::UpTo5000 if fee <= 5_000 => (weights.fee_5000_match, "fee within 5,000"),
        FeeTolerance::UpTo5000 => (weights.fee_5000_miss, "fee above 5,000"),
        FeeTolerance::PremiumOk if fee > 5_000 => {
            (weights.fee_premium_match, "premium fee accepted")
        }
        FeeTolerance::PremiumOk => return,
    };
    ledger.add(ScoreFactor::FeeTolerance, points, note);
}
