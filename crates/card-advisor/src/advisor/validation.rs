//! Strict schema checks for the advanced recommendation request.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::domain::CreditScoreEstimate;
use super::fields::pick;
use super::normalizer::{
    ANNUAL_INCOME_KEYS, CITY_KEYS, CREDIT_SCORE_KEYS, EMPLOYMENT_KEYS, EXISTING_CARDS_KEYS,
    FIXED_DEPOSIT_KEYS, FOLLOW_UP_KEYS, MONTHLY_INCOME_KEYS, PRIMARY_BANK_KEYS, SPEND_KEYS,
};

pub const MIN_CREDIT_SCORE: f64 = 300.0;
pub const MAX_CREDIT_SCORE: f64 = 900.0;

/// Field-level validation failure returned with HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub(crate) fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// True when the field was absent rather than malformed.
    pub fn is_missing(&self) -> bool {
        self.message == MISSING
    }
}

const MISSING: &str = "is required";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FixedDepositInput {
    #[serde(default, alias = "hasFd", alias = "has_fd")]
    pub has_fixed_deposit: Option<bool>,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Credit score as a number or a band such as `"no_history"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CreditScoreInput {
    Score(f64),
    Band(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SpendInput {
    #[default]
    Empty,
    Map(BTreeMap<String, f64>),
    Rows(Vec<SpendRow>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpendRow {
    pub category: String,
    pub amount: f64,
}

/// Typed view of a valid advanced-flow body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendRequest {
    pub credit_score: Option<CreditScoreInput>,
    pub annual_income: Option<f64>,
    pub monthly_income: Option<f64>,
    pub employment: String,
    pub primary_bank: String,
    pub city: String,
    pub existing_cards: Vec<Value>,
    pub fixed_deposit: Option<FixedDepositInput>,
    pub spend: SpendInput,
    pub follow_up_answers: BTreeMap<String, Value>,
}

/// Parses and range-checks the body, collecting every problem rather than stopping at the first.
pub fn validate_recommend(raw: &Value) -> Result<RecommendRequest, Vec<FieldError>> {
    let Some(object) = raw.as_object() else {
        return Err(vec![FieldError::new("body", "expected a JSON object")]);
    };
    let mut errors = Vec::new();

    let credit_score: Option<CreditScoreInput> =
        typed(object, "creditScore", &CREDIT_SCORE_KEYS, &mut errors);
    match &credit_score {
        Some(CreditScoreInput::Score(score))
            if !(MIN_CREDIT_SCORE..=MAX_CREDIT_SCORE).contains(score) =>
        {
            errors.push(FieldError::new("creditScore", "must be between 300 and 900"));
        }
        Some(CreditScoreInput::Band(band)) if CreditScoreEstimate::parse_band(band).is_none() => {
            errors.push(FieldError::new(
                "creditScore",
                format!("unknown credit band '{band}'"),
            ));
        }
        _ => {}
    }

    let annual_income: Option<f64> =
        typed(object, "annualIncome", &ANNUAL_INCOME_KEYS, &mut errors);
    non_negative("annualIncome", annual_income, &mut errors);
    let monthly_income: Option<f64> =
        typed(object, "monthlyIncome", &MONTHLY_INCOME_KEYS, &mut errors);
    non_negative("monthlyIncome", monthly_income, &mut errors);

    let employment = required_text(object, "employmentType", &EMPLOYMENT_KEYS, &mut errors);
    let primary_bank = required_text(object, "primaryBank", &PRIMARY_BANK_KEYS, &mut errors);
    let city = required_text(object, "city", &CITY_KEYS, &mut errors);

    let existing_cards: Option<Vec<Value>> =
        typed(object, "existingCards", &EXISTING_CARDS_KEYS, &mut errors);

    let fixed_deposit: Option<FixedDepositInput> =
        typed(object, "fixedDeposit", &FIXED_DEPOSIT_KEYS, &mut errors);
    if let Some(deposit) = &fixed_deposit {
        non_negative("fixedDeposit.amount", deposit.amount, &mut errors);
    }

    let spend: Option<SpendInput> = typed(object, "spendBreakdown", &SPEND_KEYS, &mut errors);
    let spend = spend.unwrap_or_default();
    let negative_spend: Vec<String> = match &spend {
        SpendInput::Empty => Vec::new(),
        SpendInput::Map(entries) => entries
            .iter()
            .filter(|(_, amount)| **amount < 0.0)
            .map(|(category, _)| category.clone())
            .collect(),
        SpendInput::Rows(rows) => rows
            .iter()
            .filter(|row| row.amount < 0.0)
            .map(|row| row.category.clone())
            .collect(),
    };
    for category in negative_spend {
        errors.push(FieldError::new(
            &format!("spendBreakdown.{category}"),
            "must be zero or greater",
        ));
    }

    let follow_up_answers: Option<BTreeMap<String, Value>> =
        typed(object, "followUpAnswers", &FOLLOW_UP_KEYS, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(RecommendRequest {
        credit_score,
        annual_income,
        monthly_income,
        employment,
        primary_bank,
        city,
        existing_cards: existing_cards.unwrap_or_default(),
        fixed_deposit,
        spend,
        follow_up_answers: follow_up_answers.unwrap_or_default(),
    })
}

fn typed<T: DeserializeOwned>(
    object: &Map<String, Value>,
    field: &str,
    keys: &[&str],
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    let value = pick(object, keys)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            errors.push(FieldError::new(field, err.to_string()));
            None
        }
    }
}

fn required_text(
    object: &Map<String, Value>,
    field: &str,
    keys: &[&str],
    errors: &mut Vec<FieldError>,
) -> String {
    match pick(object, keys) {
        Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
        Some(Value::String(_)) | None => {
            errors.push(FieldError::new(field, MISSING));
            String::new()
        }
        Some(_) => {
            errors.push(FieldError::new(field, "must be a string"));
            String::new()
        }
    }
}

fn non_negative(field: &str, value: Option<f64>, errors: &mut Vec<FieldError>) {
    if value.is_some_and(|value| value < 0.0) {
        errors.push(FieldError::new(field, "must be zero or greater"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Value {
        json!({
            "creditScore": 742,
            "annualIncome": 900000,
            "employmentType": "salaried",
            "primaryBank": "HDFC Bank",
            "city": "Pune"
        })
    }

    #[test]
    fn accepts_minimal_body() {
        let request = validate_recommend(&base()).expect("valid");
        assert_eq!(request.city, "Pune");
        assert!(request.follow_up_answers.is_empty());
    }

    #[test]
    fn reports_every_failing_field() {
        let body = json!({
            "creditScore": 950,
            "annualIncome": -1,
            "employmentType": "",
            "primaryBank": 42,
            "spendBreakdown": { "travel": -5.0, "dining": 2000 }
        });
        let errors = validate_recommend(&body).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|error| error.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "creditScore",
                "annualIncome",
                "employmentType",
                "primaryBank",
                "city",
                "spendBreakdown.travel"
            ]
        );
    }

    #[test]
    fn wrong_types_name_the_field() {
        let mut body = base();
        body["annualIncome"] = json!("a lot");
        body["existingCards"] = json!("Millennia");
        let errors = validate_recommend(&body).unwrap_err();
        assert_eq!(errors[0].field, "annualIncome");
        assert_eq!(errors[1].field, "existingCards");
    }

    #[test]
    fn absent_fields_are_distinguished_from_malformed_ones() {
        let errors = validate_recommend(&json!({ "primaryBank": 7 })).unwrap_err();
        let missing: Vec<&str> = errors
            .iter()
            .filter(|error| error.is_missing())
            .map(|error| error.field.as_str())
            .collect();
        assert_eq!(missing, vec!["employmentType", "city"]);
    }

    #[test]
    fn aliased_keys_are_checked_like_canonical_ones() {
        let body = json!({
            "credit_history": 950,
            "yearlyIncome": -5,
            "employmentType": "salaried",
            "primaryBank": "HDFC Bank",
            "city": "Pune",
            "spending": { "dining": -1.0 }
        });
        let errors = validate_recommend(&body).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|error| error.field.as_str()).collect();
        assert_eq!(fields, vec!["creditScore", "annualIncome", "spendBreakdown.dining"]);
    }

    #[test]
    fn aliased_profile_fields_satisfy_required_checks() {
        let body = json!({
            "credit_history": "no_history",
            "occupation": "student",
            "bank": "SBI",
            "location": "Kochi"
        });
        let request = validate_recommend(&body).expect("aliases accepted");
        assert_eq!(request.primary_bank, "SBI");
        assert_eq!(request.city, "Kochi");
    }

    #[test]
    fn credit_band_strings_are_accepted() {
        let mut body = base();
        body["creditScore"] = json!("no_history");
        assert!(validate_recommend(&body).is_ok());
        body["creditScore"] = json!("stellar");
        assert!(validate_recommend(&body).is_err());
    }
}
