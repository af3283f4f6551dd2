//! Turns raw questionnaire payloads from either entry flow into a [`UserProfile`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::domain::{
    CreditScoreEstimate, EmploymentType, FollowUpAnswers, PrimaryGoal, SpendCategory,
    UserProfile,
};
use super::fields::{amount_at, array_at, flag_at, number, pick, text, text_at};
use super::history::{recent_window, TransactionEntry};

pub(crate) const CREDIT_SCORE_KEYS: [&str; 4] =
    ["creditScore", "credit_score", "creditHistory", "credit_history"];
pub(crate) const MONTHLY_INCOME_KEYS: [&str; 4] =
    ["monthlyIncome", "monthly_income", "income", "monthlySalary"];
pub(crate) const ANNUAL_INCOME_KEYS: [&str; 3] = ["annualIncome", "annual_income", "yearlyIncome"];
pub(crate) const EMPLOYMENT_KEYS: [&str; 4] =
    ["employmentType", "employment_type", "employment", "occupation"];
pub(crate) const PRIMARY_BANK_KEYS: [&str; 6] = [
    "primaryBank",
    "primary_bank",
    "bankName",
    "bank_name",
    "bankingRelationship",
    "bank",
];
pub(crate) const CITY_KEYS: [&str; 2] = ["city", "location"];
pub(crate) const EXISTING_CARDS_KEYS: [&str; 3] =
    ["existingCards", "existing_cards", "currentCards"];
pub(crate) const FIXED_DEPOSIT_KEYS: [&str; 2] = ["fixedDeposit", "fixed_deposit"];
pub(crate) const SPEND_KEYS: [&str; 6] = [
    "spendBreakdown",
    "spend_breakdown",
    "spending",
    "monthlySpending",
    "monthly_spending",
    "spend",
];
pub(crate) const FOLLOW_UP_KEYS: [&str; 3] = ["followUpAnswers", "follow_up_answers", "followUps"];

/// Best-effort profile from whatever the payload carries; never fails.
pub fn normalize(raw: &Value) -> UserProfile {
    let empty = Map::new();
    let object = raw.as_object().unwrap_or(&empty);

    let monthly_income = amount_at(object, &MONTHLY_INCOME_KEYS);
    let mut annual_income = amount_at(object, &ANNUAL_INCOME_KEYS);
    if annual_income == 0 && monthly_income > 0 {
        annual_income = monthly_income.saturating_mul(12);
    }

    let fixed_deposit = pick(object, &FIXED_DEPOSIT_KEYS).and_then(Value::as_object);
    let fixed_deposit_amount = fixed_deposit
        .map(|fd| amount_at(fd, &["amount", "value"]))
        .unwrap_or(0);
    let has_fixed_deposit = flag_at(object, &["hasFixedDeposit", "has_fixed_deposit", "hasFD"])
        .or_else(|| fixed_deposit.and_then(|fd| flag_at(fd, &["hasFd", "has_fd", "exists"])))
        .unwrap_or(fixed_deposit_amount > 0);

    let goals = array_at(object, &["goals"]);
    let primary_goal = pick(object, &["primaryGoal", "primary_goal", "goal"])
        .and_then(text)
        .and_then(|goal| PrimaryGoal::parse(&goal))
        .or_else(|| goals.iter().find_map(|goal| PrimaryGoal::parse(goal)));
    let mut secondary_goals = array_at(object, &["secondaryGoals", "secondary_goals"]);
    secondary_goals.extend(
        goals
            .into_iter()
            .filter(|goal| PrimaryGoal::parse(goal) != primary_goal),
    );

    let follow_up_raw = follow_up_map(raw);

    UserProfile {
        age: amount_at(object, &["age"]).min(u8::MAX as u64) as u8,
        monthly_income,
        annual_income,
        employment: EmploymentType::parse(&text_at(object, &EMPLOYMENT_KEYS)),
        city: text_at(object, &CITY_KEYS),
        primary_bank: text_at(object, &PRIMARY_BANK_KEYS),
        existing_cards: existing_cards(object),
        has_fixed_deposit,
        fixed_deposit_amount,
        spend: spend_map(object),
        declared_top_categories: declared_top_categories(object),
        primary_goal,
        secondary_goals,
        credit_score: credit_score(object),
        follow_up: FollowUpAnswers::from_map(&follow_up_raw),
    }
}

/// Follow-up answers keyed in snake_case, empty values dropped.
pub fn follow_up_map(raw: &Value) -> BTreeMap<String, String> {
    let mut answers = BTreeMap::new();
    let Some(object) = raw.as_object() else {
        return answers;
    };
    if let Some(Value::Object(follow_ups)) = pick(object, &FOLLOW_UP_KEYS) {
        for (key, value) in follow_ups {
            if let Some(answer) = text(value).filter(|answer| !answer.is_empty()) {
                answers.insert(snake_case(key), answer);
            }
        }
    }
    answers
}

/// Adds observed spend per category when the declaration is sparse (fewer than two
/// categories with a positive amount). Only the most recent 30 days count, so the sum reads
/// as one month of spend. Declared amounts are kept, never replaced.
pub fn blend_transactions(profile: &mut UserProfile, transactions: &[TransactionEntry]) -> bool {
    let declared = profile.spend.values().filter(|amount| **amount > 0.0).count();
    if declared >= 2 || transactions.is_empty() {
        return false;
    }

    let mut blended = false;
    for entry in recent_window(transactions) {
        if !entry.amount.is_finite() || entry.amount <= 0.0 {
            continue;
        }
        let category = SpendCategory::normalize(&entry.category);
        *profile.spend.entry(category).or_insert(0.0) += entry.amount;
        blended = true;
    }
    blended
}

fn existing_cards(object: &Map<String, Value>) -> Vec<String> {
    match pick(object, &EXISTING_CARDS_KEYS) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(card) => Some(text_at(card, &["name", "cardName", "card_name"])),
                other => text(other),
            })
            .filter(|name| !name.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn spend_map(object: &Map<String, Value>) -> BTreeMap<SpendCategory, f64> {
    let mut spend = BTreeMap::new();
    let mut add = |category: &str, amount: Option<f64>| {
        let amount = amount.filter(|amount| *amount > 0.0).unwrap_or(0.0);
        *spend.entry(SpendCategory::normalize(category)).or_insert(0.0) += amount;
    };

    match pick(object, &SPEND_KEYS) {
        Some(Value::Object(categories)) => {
            for (category, amount) in categories {
                add(category.as_str(), number(amount));
            }
        }
        Some(Value::Array(entries)) => {
            for entry in entries.iter().filter_map(Value::as_object) {
                let category = text_at(entry, &["category", "name"]);
                if !category.is_empty() {
                    add(category.as_str(), pick(entry, &["amount", "monthly"]).and_then(number));
                }
            }
        }
        _ => {}
    }

    spend
}

fn declared_top_categories(object: &Map<String, Value>) -> Vec<SpendCategory> {
    let mut categories = Vec::new();
    for raw in array_at(
        object,
        &["topCategories", "top_categories", "spendCategories", "primaryCategories"],
    ) {
        let category = SpendCategory::normalize(&raw);
        if category != SpendCategory::Other && !categories.contains(&category) {
            categories.push(category);
        }
    }
    categories
}

fn credit_score(object: &Map<String, Value>) -> Option<CreditScoreEstimate> {
    let value = pick(object, &CREDIT_SCORE_KEYS)?;
    if let Some(score) = number(value) {
        if (300.0..=900.0).contains(&score) {
            return Some(CreditScoreEstimate::Score(score.round() as u16));
        }
    }
    text(value).and_then(|band| CreditScoreEstimate::parse_band(&band))
}

fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (index, ch) in key.trim().chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else if ch == '-' || ch == ' ' {
            out.push('_');
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::domain::{AgeBand, CreditBand, ValuePriority};
    use serde_json::json;

    #[test]
    fn beginner_payload_derives_annual_income() {
        let profile = normalize(&json!({
            "age": "22",
            "income": "35,000",
            "employment": "Salaried",
            "bankName": "HDFC",
            "spending": { "shopping": 4000, "food": "2500" },
            "goals": ["cashback", "travel"]
        }));

        assert_eq!(profile.age, 22);
        assert_eq!(profile.monthly_income, 35_000);
        assert_eq!(profile.annual_income, 420_000);
        assert_eq!(profile.employment, EmploymentType::Salaried);
        assert_eq!(profile.primary_bank, "HDFC");
        assert_eq!(profile.spend.get(&SpendCategory::OnlineShopping), Some(&4000.0));
        assert_eq!(profile.spend.get(&SpendCategory::Dining), Some(&2500.0));
        assert_eq!(profile.primary_goal, Some(PrimaryGoal::Cashback));
        assert_eq!(profile.secondary_goals, vec!["travel".to_string()]);
    }

    #[test]
    fn malformed_fields_fall_back_to_defaults() {
        let profile = normalize(&json!({
            "age": { "years": 30 },
            "monthlyIncome": [1, 2],
            "existingCards": "Millennia",
            "spendBreakdown": { "travel": -500, "fuel": "lots" },
            "city": 42
        }));

        assert_eq!(profile.age, 0);
        assert_eq!(profile.monthly_income, 0);
        assert!(profile.existing_cards.is_empty());
        assert!(profile.spend.values().all(|amount| *amount >= 0.0));
        assert_eq!(profile.city, "42");
    }

    #[test]
    fn shopping_synonyms_share_one_bucket() {
        let profile = normalize(&json!({
            "spendBreakdown": { "online_shopping": 1000, "shopping": 500 }
        }));
        assert_eq!(profile.spend.len(), 1);
        assert_eq!(
            profile.spend.get(&SpendCategory::OnlineShopping),
            Some(&1500.0)
        );
    }

    #[test]
    fn advisor_payload_reads_follow_ups_and_credit() {
        let raw = json!({
            "creditScore": 742,
            "annualIncome": 900000,
            "primaryBank": "Axis Bank",
            "existingCards": [{ "name": "Axis ACE" }, "ICICI Coral"],
            "fixedDeposit": { "hasFd": true, "amount": 50000 },
            "followUpAnswers": { "ageBand": "26_35", "valuePriority": "cashback", "upi_need": "" }
        });
        let profile = normalize(&raw);

        assert_eq!(profile.credit_score, Some(CreditScoreEstimate::Score(742)));
        assert_eq!(profile.existing_cards.len(), 2);
        assert!(profile.has_fixed_deposit);
        assert_eq!(profile.fixed_deposit_amount, 50_000);
        assert_eq!(profile.follow_up.age_band, Some(AgeBand::Age26To35));
        assert_eq!(profile.follow_up.value_priority, Some(ValuePriority::Cashback));

        let answers = follow_up_map(&raw);
        assert!(answers.contains_key("age_band"));
        assert!(!answers.contains_key("upi_need"));
    }

    #[test]
    fn credit_bands_are_accepted() {
        let profile = normalize(&json!({ "creditScore": "no_history" }));
        assert_eq!(
            profile.credit_score,
            Some(CreditScoreEstimate::Band(CreditBand::NoHistory))
        );
    }

    #[test]
    fn transactions_blend_into_sparse_spend() {
        let mut profile = normalize(&json!({ "spending": { "groceries": 3000 } }));
        let transactions = vec![
            TransactionEntry {
                posted_on: None,
                description: "BigBasket".to_string(),
                category: "grocery".to_string(),
                amount: 1200.0,
            },
            TransactionEntry {
                posted_on: None,
                description: "IndiGo".to_string(),
                category: "flights".to_string(),
                amount: 8000.0,
            },
        ];

        assert!(blend_transactions(&mut profile, &transactions));
        assert_eq!(profile.spend.get(&SpendCategory::Groceries), Some(&4200.0));
        assert_eq!(profile.spend.get(&SpendCategory::Travel), Some(&8000.0));
    }

    #[test]
    fn older_months_are_not_blended() {
        let mut profile = normalize(&json!({}));
        let trip = |month: u32| TransactionEntry {
            posted_on: chrono::NaiveDate::from_ymd_opt(2025, month, 15),
            description: "IndiGo".to_string(),
            category: "travel".to_string(),
            amount: 9000.0,
        };

        assert!(blend_transactions(&mut profile, &[trip(1), trip(4), trip(7)]));
        assert_eq!(profile.spend.get(&SpendCategory::Travel), Some(&9000.0));
    }

    #[test]
    fn huge_monthly_income_saturates_annual_income() {
        let profile = normalize(&json!({ "monthlyIncome": 2e18 }));
        assert_eq!(profile.monthly_income, 2_000_000_000_000_000_000);
        assert_eq!(profile.annual_income, u64::MAX);
        assert_eq!(profile.effective_annual_income(), u64::MAX);
    }

    #[test]
    fn rich_declarations_are_not_blended() {
        let mut profile = normalize(&json!({ "spending": { "groceries": 3000, "fuel": 2000 } }));
        let transactions = vec![TransactionEntry {
            posted_on: None,
            description: "IndiGo".to_string(),
            category: "travel".to_string(),
            amount: 8000.0,
        }];

        assert!(!blend_transactions(&mut profile, &transactions));
        assert!(!profile.spend.contains_key(&SpendCategory::Travel));
    }
}
