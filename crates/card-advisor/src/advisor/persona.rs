//! Persona classification used to tailor follow-up questions and benefit narratives.

use serde::{Deserialize, Serialize};

use super::domain::{
    CreditBand, CreditScoreEstimate, EmploymentType, PrimaryGoal, SpendCategory, UserProfile,
};

/// Annual income (rupees) at which any profile counts as a rewards maximizer.
pub const HIGH_INCOME_THRESHOLD: u64 = 1_800_000;
/// Annual income at which a cashback-focused profile counts as a rewards maximizer.
pub const CASHBACK_MAXIMIZER_INCOME: u64 = 1_200_000;

const STUDENT_AGE_CEILING: u8 = 23;
const SUBPRIME_SCORE: u16 = 600;
const TOP_CATEGORY_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    StudentFirsttime,
    CreditBuilder,
    SelfEmployed,
    FrequentTraveller,
    OnlineShopper,
    RewardsMaximizer,
    SalariedEveryday,
}

impl Persona {
    pub const fn label(self) -> &'static str {
        match self {
            Self::StudentFirsttime => "Student / first-time cardholder",
            Self::CreditBuilder => "Credit builder",
            Self::SelfEmployed => "Self-employed professional",
            Self::FrequentTraveller => "Frequent traveller",
            Self::OnlineShopper => "Online shopper",
            Self::RewardsMaximizer => "Rewards maximizer",
            Self::SalariedEveryday => "Salaried everyday spender",
        }
    }

    /// One-line narrative of what this persona should look for in a card.
    pub const fn benefit_focus(self) -> &'static str {
        match self {
            Self::StudentFirsttime => {
                "Start with a low-cost card that reports to bureaus so your first score builds fast"
            }
            Self::CreditBuilder => {
                "Put approval odds and on-time payments ahead of rewards while your score recovers"
            }
            Self::SelfEmployed => {
                "Look for flexible income documentation and rewards on business-heavy categories"
            }
            Self::FrequentTraveller => {
                "Lounge access and accelerated travel rewards return the most value on your trips"
            }
            Self::OnlineShopper => {
                "Merchant-linked cashback on e-commerce spends beats flat rewards for your pattern"
            }
            Self::RewardsMaximizer => {
                "Your spend volume justifies a fee if accelerated rewards outweigh it"
            }
            Self::SalariedEveryday => {
                "A fee-waivable card with steady rewards on groceries and bills fits daily spending"
            }
        }
    }

    pub fn education_tips(self) -> Vec<&'static str> {
        let mut tips = match self {
            Self::StudentFirsttime | Self::CreditBuilder => vec![
                "Keep utilisation under 30% of your limit, even on a small secured limit",
                "Set up auto-debit for the full statement amount to avoid missed payments",
            ],
            Self::SelfEmployed => vec![
                "Keep ITR acknowledgements for the last two years handy for income verification",
                "Separate business and personal spends to keep utilisation readable",
            ],
            Self::FrequentTraveller => vec![
                "Check forex markup before using the card abroad",
                "Lounge visits are often unlocked by a minimum quarterly spend",
            ],
            Self::OnlineShopper | Self::RewardsMaximizer | Self::SalariedEveryday => vec![
                "Pay the total due, not the minimum due, to avoid 36-42% annual interest",
                "Track fee-waiver spend thresholds so the annual fee is reversed",
            ],
        };
        tips.push("Avoid applying for several cards at once; each hard enquiry dents your score");
        tips
    }
}

/// First matching rule wins; thin-file and credit-risk signals outrank spend patterns.
pub fn detect(profile: &UserProfile) -> Persona {
    let young_thin_file = profile
        .effective_age()
        .is_some_and(|age| age <= STUDENT_AGE_CEILING && profile.has_no_credit_history());
    if profile.employment == EmploymentType::Student || young_thin_file {
        return Persona::StudentFirsttime;
    }

    let subprime = match profile.credit_score {
        Some(CreditScoreEstimate::Band(CreditBand::NoHistory | CreditBand::Unknown)) => true,
        Some(estimate) => estimate.numeric().is_some_and(|score| score < SUBPRIME_SCORE),
        None => false,
    };
    if matches!(
        profile.primary_goal,
        Some(PrimaryGoal::CreditBuilding | PrimaryGoal::DebtManagement)
    ) || subprime
    {
        return Persona::CreditBuilder;
    }

    if profile.employment.is_self_employed() {
        return Persona::SelfEmployed;
    }

    let top = profile.top_categories(TOP_CATEGORY_COUNT);
    if profile.primary_goal == Some(PrimaryGoal::TravelPerks)
        || top.contains(&SpendCategory::Travel)
    {
        return Persona::FrequentTraveller;
    }

    if profile.primary_goal == Some(PrimaryGoal::OnlineShopping)
        || top.contains(&SpendCategory::OnlineShopping)
    {
        return Persona::OnlineShopper;
    }

    let income = profile.effective_annual_income();
    let cashback_maximizer = profile.primary_goal == Some(PrimaryGoal::Cashback)
        && income >= CASHBACK_MAXIMIZER_INCOME;
    if profile.primary_goal == Some(PrimaryGoal::PremiumLifestyle)
        || income >= HIGH_INCOME_THRESHOLD
        || cashback_maximizer
    {
        return Persona::RewardsMaximizer;
    }

    Persona::SalariedEveryday
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::domain::{AgeBand, FollowUpAnswers};
    use std::collections::BTreeMap;

    fn with_travel_spend(mut profile: UserProfile) -> UserProfile {
        profile.spend = BTreeMap::from([(SpendCategory::Travel, 15_000.0)]);
        profile
    }

    #[test]
    fn student_outranks_traveller() {
        let profile = with_travel_spend(UserProfile {
            employment: EmploymentType::Student,
            primary_goal: Some(PrimaryGoal::TravelPerks),
            ..UserProfile::default()
        });
        assert_eq!(detect(&profile), Persona::StudentFirsttime);
    }

    #[test]
    fn young_thin_file_is_first_timer() {
        let profile = UserProfile {
            age: 22,
            employment: EmploymentType::Salaried,
            ..UserProfile::default()
        };
        assert_eq!(detect(&profile), Persona::StudentFirsttime);
    }

    #[test]
    fn age_band_answer_alone_marks_first_timer() {
        let profile = UserProfile {
            employment: EmploymentType::Salaried,
            follow_up: FollowUpAnswers {
                age_band: Some(AgeBand::Age18To20),
                ..FollowUpAnswers::default()
            },
            ..UserProfile::default()
        };
        assert_eq!(detect(&profile), Persona::StudentFirsttime);

        let older = UserProfile {
            follow_up: FollowUpAnswers {
                age_band: Some(AgeBand::Age26To35),
                ..FollowUpAnswers::default()
            },
            ..profile
        };
        assert_eq!(detect(&older), Persona::SalariedEveryday);
    }

    #[test]
    fn low_score_is_credit_builder() {
        let profile = UserProfile {
            age: 34,
            credit_score: Some(CreditScoreEstimate::Score(580)),
            employment: EmploymentType::Salaried,
            ..UserProfile::default()
        };
        assert_eq!(detect(&profile), Persona::CreditBuilder);
    }

    #[test]
    fn self_employed_outranks_travel_and_income() {
        let profile = with_travel_spend(UserProfile {
            age: 40,
            employment: EmploymentType::BusinessOwner,
            annual_income: 5_000_000,
            credit_score: Some(CreditScoreEstimate::Score(790)),
            ..UserProfile::default()
        });
        assert_eq!(detect(&profile), Persona::SelfEmployed);
    }

    #[test]
    fn travel_goal_is_frequent_traveller() {
        let profile = UserProfile {
            primary_goal: Some(PrimaryGoal::TravelPerks),
            declared_top_categories: vec![SpendCategory::Travel],
            ..UserProfile::default()
        };
        assert_eq!(detect(&profile), Persona::FrequentTraveller);
    }

    #[test]
    fn cashback_with_high_income_is_rewards_maximizer() {
        let profile = UserProfile {
            age: 35,
            primary_goal: Some(PrimaryGoal::Cashback),
            annual_income: 1_500_000,
            credit_score: Some(CreditScoreEstimate::Score(780)),
            ..UserProfile::default()
        };
        assert_eq!(detect(&profile), Persona::RewardsMaximizer);
    }

    #[test]
    fn default_is_salaried_everyday() {
        let profile = UserProfile {
            age: 30,
            annual_income: 600_000,
            employment: EmploymentType::Salaried,
            credit_score: Some(CreditScoreEstimate::Score(740)),
            ..UserProfile::default()
        };
        assert_eq!(detect(&profile), Persona::SalariedEveryday);
    }
}
