use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::json;

use super::common::*;
use crate::advisor::catalog::fallback_catalog;
use crate::advisor::domain::{
    EmploymentType, FeeTolerance, FollowUpAnswers, RewardPreference, SecuredReadiness,
    SpendCategory, TravelFrequency, UpiNeed, UserProfile, ValuePriority,
};
use crate::advisor::eligibility::filter_eligible;
use crate::advisor::normalizer::normalize;
use crate::advisor::scoring::{ScoreFactor, ScoringConfig, ScoringEngine, ScoringWeights};

fn points(score: &crate::advisor::scoring::CardScore, factor: ScoreFactor) -> i16 {
    score
        .components
        .iter()
        .filter(|component| component.factor == factor)
        .map(|component| component.points)
        .sum()
}

#[test]
fn young_student_prefers_secured_card_over_income_gated_card() {
    let profile = normalize(&student_payload());
    let engine = ScoringEngine::new(ScoringConfig::beginner());
    let catalog = vec![secured_card(), income_gated_card()];

    let secured = engine.score(&profile, &catalog[0]);
    let gated = engine.score(&profile, &catalog[1]);
    assert_eq!(secured.total, 79);
    assert_eq!(gated.total, 45, "raw {} clamps to the beginner floor", gated.raw);
    assert!(secured.total > gated.total);

    let report = filter_eligible(&profile, &catalog);
    assert_eq!(report.cards.len(), 1);
    assert_eq!(report.cards[0].id, secured.card_id);
}

#[test]
fn category_overlap_is_capped() {
    let config = ScoringConfig {
        weights: ScoringWeights {
            category_match: 5,
            ..ScoringWeights::default()
        },
        ..ScoringConfig::advanced()
    };
    let engine = ScoringEngine::new(config);
    let card = card(
        "multi",
        json!({ "best_for": ["online_shopping", "dining", "entertainment"] }),
    );
    let profile = UserProfile {
        declared_top_categories: vec![
            SpendCategory::OnlineShopping,
            SpendCategory::Dining,
            SpendCategory::Entertainment,
        ],
        annual_income: 700_000,
        ..UserProfile::default()
    };

    let score = engine.score(&profile, &card);
    assert_eq!(points(&score, ScoreFactor::CategoryOverlap), 12);
}

#[test]
fn fee_priority_and_fee_tolerance_both_apply() {
    let engine = ScoringEngine::new(ScoringConfig::advanced());
    let free = card("free", json!({ "annual_fee": 0 }));
    let pricey = card("pricey", json!({ "annual_fee": 3000 }));
    let profile = UserProfile {
        annual_income: 700_000,
        follow_up: FollowUpAnswers {
            value_priority: Some(ValuePriority::LowFee),
            fee_tolerance: Some(FeeTolerance::Zero),
            ..FollowUpAnswers::default()
        },
        ..UserProfile::default()
    };

    let free_score = engine.score(&profile, &free);
    assert_eq!(points(&free_score, ScoreFactor::ValuePriority), 10);
    assert_eq!(points(&free_score, ScoreFactor::FeeTolerance), 6);

    let pricey_score = engine.score(&profile, &pricey);
    assert_eq!(points(&pricey_score, ScoreFactor::ValuePriority), -10);
    assert_eq!(points(&pricey_score, ScoreFactor::FeeTolerance), -8);
}

#[test]
fn secured_readiness_cuts_both_ways() {
    let engine = ScoringEngine::new(ScoringConfig::advanced());
    let secured = secured_card();
    let mut profile = UserProfile {
        annual_income: 700_000,
        ..UserProfile::default()
    };

    profile.follow_up.secured_readiness = Some(SecuredReadiness::FdReady);
    assert_eq!(points(&engine.score(&profile, &secured), ScoreFactor::SecuredReadiness), 8);

    profile.follow_up.secured_readiness = Some(SecuredReadiness::UnsecuredOnly);
    assert_eq!(points(&engine.score(&profile, &secured), ScoreFactor::SecuredReadiness), -12);

    profile.follow_up.secured_readiness = None;
    profile.has_fixed_deposit = true;
    assert_eq!(points(&engine.score(&profile, &secured), ScoreFactor::SecuredReadiness), 8);
}

#[test]
fn bank_affinity_matches_case_insensitively() {
    let engine = ScoringEngine::new(ScoringConfig::advanced());
    let card = card("hdfc", json!({ "bank": "HDFC Bank" }));
    let profile = UserProfile {
        primary_bank: "hdfc".to_string(),
        annual_income: 700_000,
        ..UserProfile::default()
    };
    assert_eq!(points(&engine.score(&profile, &card), ScoreFactor::BankAffinity), 6);
}

#[test]
fn bank_affinity_needs_both_banks_and_only_matches_inside_the_card_bank() {
    let engine = ScoringEngine::new(ScoringConfig::advanced());
    let mut profile = UserProfile {
        primary_bank: "HDFC Bank".to_string(),
        annual_income: 700_000,
        ..UserProfile::default()
    };

    let bankless = card("bankless", json!({ "bank": "" }));
    assert_eq!(points(&engine.score(&profile, &bankless), ScoreFactor::BankAffinity), 0);

    let short_name = card("hdfc-short", json!({ "bank": "HDFC" }));
    assert_eq!(points(&engine.score(&profile, &short_name), ScoreFactor::BankAffinity), 0);

    profile.primary_bank = "   ".to_string();
    let any_bank = card("any", json!({ "bank": "HDFC Bank" }));
    assert_eq!(points(&engine.score(&profile, &any_bank), ScoreFactor::BankAffinity), 0);
}

fn adult_profile(follow_up: FollowUpAnswers) -> UserProfile {
    UserProfile {
        age: 30,
        annual_income: 700_000,
        follow_up,
        ..UserProfile::default()
    }
}

#[test]
fn reward_type_preference_rewards_matching_card() {
    let engine = ScoringEngine::new(ScoringConfig::advanced());
    let cashback = card("cb", json!({ "card_type": "cashback", "annual_fee": 0 }));
    let fuel = card("fuel", json!({ "card_type": "fuel", "annual_fee": 0 }));
    let profile = adult_profile(FollowUpAnswers {
        reward_type: Some(RewardPreference::Cashback),
        ..FollowUpAnswers::default()
    });

    assert_eq!(points(&engine.score(&profile, &cashback), ScoreFactor::SecondaryPreference), 4);
    assert_eq!(points(&engine.score(&profile, &fuel), ScoreFactor::SecondaryPreference), 0);
}

#[test]
fn travel_frequency_scales_travel_card_bonus() {
    let engine = ScoringEngine::new(ScoringConfig::advanced());
    let travel = card("trv", json!({ "card_type": "travel", "annual_fee": 0 }));
    let mut profile = adult_profile(FollowUpAnswers {
        travel_frequency: Some(TravelFrequency::Frequently),
        ..FollowUpAnswers::default()
    });
    assert_eq!(points(&engine.score(&profile, &travel), ScoreFactor::SecondaryPreference), 4);

    profile.follow_up.travel_frequency = Some(TravelFrequency::Occasionally);
    assert_eq!(points(&engine.score(&profile, &travel), ScoreFactor::SecondaryPreference), 2);

    profile.follow_up.travel_frequency = Some(TravelFrequency::Rarely);
    assert_eq!(points(&engine.score(&profile, &travel), ScoreFactor::SecondaryPreference), 0);
}

#[test]
fn heavy_upi_need_rewards_upi_card() {
    let engine = ScoringEngine::new(ScoringConfig::advanced());
    let upi = card(
        "rupay",
        json!({ "card_type": "entry_level", "best_for": ["upi"], "annual_fee": 0 }),
    );
    let mut profile = adult_profile(FollowUpAnswers {
        upi_need: Some(UpiNeed::Heavy),
        ..FollowUpAnswers::default()
    });
    assert_eq!(points(&engine.score(&profile, &upi), ScoreFactor::SecondaryPreference), 4);

    profile.follow_up.upi_need = Some(UpiNeed::Some);
    assert_eq!(points(&engine.score(&profile, &upi), ScoreFactor::SecondaryPreference), 2);
}

#[test]
fn primary_spend_focus_adds_focus_bonus() {
    let engine = ScoringEngine::new(ScoringConfig::advanced());
    let grocer = card("grocer", json!({ "best_for": ["groceries"], "annual_fee": 0 }));
    let diner = card("diner", json!({ "best_for": ["dining"], "annual_fee": 0 }));
    let profile = adult_profile(FollowUpAnswers {
        primary_spend_focus: Some(SpendCategory::Groceries),
        ..FollowUpAnswers::default()
    });

    assert_eq!(points(&engine.score(&profile, &grocer), ScoreFactor::PrimaryFocus), 10);
    assert_eq!(points(&engine.score(&profile, &diner), ScoreFactor::PrimaryFocus), 0);
}

#[test]
fn mid_income_penalizes_gate_and_credits_modest_fee() {
    let engine = ScoringEngine::new(ScoringConfig::advanced());
    let gated = card("gated", json!({ "annual_fee": 0, "min_income_salaried": 500000 }));
    let reachable = card("reachable", json!({ "annual_fee": 0, "min_income_salaried": 300000 }));
    let pricey = card("pricey", json!({ "annual_fee": 2500 }));
    let profile = UserProfile {
        age: 30,
        annual_income: 400_000,
        ..UserProfile::default()
    };

    assert_eq!(points(&engine.score(&profile, &gated), ScoreFactor::IncomeProfile), -4);
    assert_eq!(points(&engine.score(&profile, &reachable), ScoreFactor::IncomeProfile), 4);
    assert_eq!(points(&engine.score(&profile, &pricey), ScoreFactor::IncomeProfile), 0);
}

#[test]
fn value_priority_matches_card_capability() {
    let engine = ScoringEngine::new(ScoringConfig::advanced());
    let cases = [
        (ValuePriority::Cashback, json!({ "card_type": "cashback" })),
        (ValuePriority::Travel, json!({ "card_type": "travel" })),
        (ValuePriority::Upi, json!({ "best_for": ["upi"] })),
    ];
    let plain = card("plain", json!({ "card_type": "fuel" }));

    for (priority, extra) in cases {
        let profile = adult_profile(FollowUpAnswers {
            value_priority: Some(priority),
            ..FollowUpAnswers::default()
        });
        let matching = card("matching", extra);
        assert_eq!(points(&engine.score(&profile, &matching), ScoreFactor::ValuePriority), 10);
        assert_eq!(points(&engine.score(&profile, &plain), ScoreFactor::ValuePriority), 0);
    }
}

#[test]
fn teenage_applicants_are_steered_away_from_unsecured_cards() {
    let engine = ScoringEngine::new(ScoringConfig::advanced());
    let profile = UserProfile {
        age: 19,
        annual_income: 700_000,
        ..UserProfile::default()
    };
    let unsecured = card("unsecured", json!({ "card_type": "rewards", "annual_fee": 0 }));

    assert_eq!(points(&engine.score(&profile, &unsecured), ScoreFactor::AgeBand), -10);
    assert_eq!(points(&engine.score(&profile, &secured_card()), ScoreFactor::AgeBand), 12);
}

#[test]
fn removing_a_card_never_changes_other_scores() {
    let engine = ScoringEngine::new(ScoringConfig::beginner());
    let profile = normalize(&json!({
        "age": 27,
        "monthlyIncome": 60000,
        "spending": { "shopping": 9000, "dining": 3000 },
        "goals": ["cashback"]
    }));
    let full = fallback_catalog();
    let reduced: Vec<_> = full.iter().skip(1).cloned().collect();

    for card in &reduced {
        let in_full = full
            .iter()
            .find(|candidate| candidate.id == card.id)
            .map(|candidate| engine.score(&profile, candidate));
        assert_eq!(in_full, Some(engine.score(&profile, card)));
    }
}

fn arb_profile() -> impl Strategy<Value = UserProfile> {
    (
        0u8..80,
        0u64..4_000_000,
        prop::option::of(prop::sample::select(vec![
            ValuePriority::LowFee,
            ValuePriority::BuildCredit,
            ValuePriority::Cashback,
            ValuePriority::Travel,
            ValuePriority::Upi,
            ValuePriority::Rewards,
        ])),
        prop::option::of(prop::sample::select(vec![
            FeeTolerance::Zero,
            FeeTolerance::UpTo1000,
            FeeTolerance::UpTo5000,
            FeeTolerance::PremiumOk,
        ])),
        prop::option::of(prop::sample::select(vec![
            SecuredReadiness::HasFd,
            SecuredReadiness::FdReady,
            SecuredReadiness::OpenToSecured,
            SecuredReadiness::UnsecuredOnly,
        ])),
        0.0f64..50_000.0,
        any::<bool>(),
    )
        .prop_map(|(age, income, priority, tolerance, readiness, travel, self_employed)| {
            UserProfile {
                age,
                annual_income: income,
                employment: if self_employed {
                    EmploymentType::SelfEmployed
                } else {
                    EmploymentType::Salaried
                },
                primary_bank: "ICICI".to_string(),
                spend: BTreeMap::from([
                    (SpendCategory::Travel, travel),
                    (SpendCategory::OnlineShopping, 5_000.0),
                ]),
                follow_up: FollowUpAnswers {
                    value_priority: priority,
                    fee_tolerance: tolerance,
                    secured_readiness: readiness,
                    ..FollowUpAnswers::default()
                },
                ..UserProfile::default()
            }
        })
}

proptest! {
    #[test]
    fn scores_stay_within_clamp_and_repeat_exactly(profile in arb_profile()) {
        for config in [ScoringConfig::beginner(), ScoringConfig::advanced()] {
            let (min, max) = (config.min_score, config.max_score);
            let engine = ScoringEngine::new(config);
            for card in fallback_catalog() {
                let first = engine.score(&profile, &card);
                prop_assert!(first.total >= min && first.total <= max);
                prop_assert_eq!(first, engine.score(&profile, &card));
            }
        }
    }
}
