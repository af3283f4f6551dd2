//! One-round clarification protocol for the advanced flow.

use std::collections::BTreeMap;

use serde::Serialize;

use super::persona::Persona;

pub const REQUIRED_KEYS: [&str; 5] = [
    "age_band",
    "income_band",
    "secured_readiness",
    "primary_spend_focus",
    "value_priority",
];

pub const OPTIONAL_KEYS: [&str; 4] =
    ["fee_tolerance", "reward_type", "travel_frequency", "upi_need"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUpQuestion {
    pub id: &'static str,
    pub question: String,
    pub options: Vec<QuestionOption>,
    pub required: bool,
}

/// Required keys with no non-blank answer.
pub fn missing_required(answers: &BTreeMap<String, String>) -> Vec<&'static str> {
    REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| answers.get(*key).map_or(true, |value| value.trim().is_empty()))
        .collect()
}

/// Scoring waits until every required key is answered.
pub fn needs_more_info(answers: &BTreeMap<String, String>) -> bool {
    !missing_required(answers).is_empty()
}

const fn option(value: &'static str, label: &'static str) -> QuestionOption {
    QuestionOption { value, label }
}

/// The five required questions, worded for the detected persona.
pub fn follow_up_questions(persona: Persona) -> Vec<FollowUpQuestion> {
    vec![
        FollowUpQuestion {
            id: "age_band",
            question: "Which age group are you in?".to_string(),
            options: vec![
                option("18_20", "18-20"),
                option("21_25", "21-25"),
                option("26_35", "26-35"),
                option("36_50", "36-50"),
                option("51_plus", "51 and above"),
            ],
            required: true,
        },
        FollowUpQuestion {
            id: "income_band",
            question: match persona {
                Persona::StudentFirsttime => {
                    "Do you have any income of your own, such as a stipend or part-time pay?"
                }
                Persona::SelfEmployed => "What is your annual income as shown in your latest ITR?",
                _ => "What is your annual income before tax?",
            }
            .to_string(),
            options: vec![
                option("none", "No income yet"),
                option("below_3l", "Below ₹3 lakh"),
                option("3l_6l", "₹3-6 lakh"),
                option("6l_12l", "₹6-12 lakh"),
                option("12l_plus", "Above ₹12 lakh"),
            ],
            required: true,
        },
        FollowUpQuestion {
            id: "secured_readiness",
            question: match persona {
                Persona::StudentFirsttime | Persona::CreditBuilder => {
                    "An FD-backed card is the surest first approval. Could you open a deposit?"
                }
                _ => "Would you consider a card issued against a fixed deposit?",
            }
            .to_string(),
            options: vec![
                option("has_fd", "I already have an FD"),
                option("fd_ready", "I can open one"),
                option("open_to_secured", "Maybe, if it helps approval"),
                option("unsecured_only", "No, unsecured cards only"),
            ],
            required: true,
        },
        FollowUpQuestion {
            id: "primary_spend_focus",
            question: match persona {
                Persona::FrequentTraveller => {
                    "Besides travel, where does most of your card spend go?"
                }
                Persona::OnlineShopper => "Which kind of spend do you want rewarded the most?",
                _ => "Where do you spend the most each month?",
            }
            .to_string(),
            options: vec![
                option("online_shopping", "Online shopping"),
                option("groceries", "Groceries"),
                option("dining", "Dining and food delivery"),
                option("travel", "Travel"),
                option("fuel", "Fuel"),
                option("utilities", "Bills and utilities"),
                option("upi", "UPI payments"),
            ],
            required: true,
        },
        FollowUpQuestion {
            id: "value_priority",
            question: match persona {
                Persona::RewardsMaximizer => "Which return matters most to you from a card?",
                Persona::CreditBuilder => "What should your next card help you with most?",
                _ => "What do you value most in a credit card?",
            }
            .to_string(),
            options: vec![
                option("low_fee", "Low or no fees"),
                option("build_credit", "Building my credit score"),
                option("cashback", "Cashback"),
                option("travel", "Travel perks and lounges"),
                option("upi", "Paying by UPI"),
                option("rewards", "Reward points"),
            ],
            required: true,
        },
    ]
}
