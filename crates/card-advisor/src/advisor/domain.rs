use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for catalog cards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(pub String);

/// Identifier of the authenticated caller, resolved by the session verifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier assigned to a persisted recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecommendationId(pub String);

/// Entry flow that produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorFlow {
    Beginner,
    Advanced,
}

impl AdvisorFlow {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Advanced => "advanced",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "advanced" | "advisor" | "recommend" => Some(Self::Advanced),
            _ => None,
        }
    }
}

/// Product tier declared by the issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    EntryLevel,
    Cashback,
    Rewards,
    Travel,
    Fuel,
    Premium,
    SuperPremium,
    Business,
    Secured,
}

impl CardType {
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let card_type = match key.as_str() {
            "entry_level" | "entry" | "basic" | "beginner" => Self::EntryLevel,
            "cashback" | "cash_back" => Self::Cashback,
            "rewards" | "reward" | "lifestyle" | "shopping" => Self::Rewards,
            "travel" => Self::Travel,
            "fuel" => Self::Fuel,
            "premium" => Self::Premium,
            "super_premium" | "superpremium" | "luxury" => Self::SuperPremium,
            "business" | "corporate" => Self::Business,
            "secured" | "fd_backed" => Self::Secured,
            _ => return None,
        };
        Some(card_type)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::EntryLevel => "Entry level",
            Self::Cashback => "Cashback",
            Self::Rewards => "Rewards",
            Self::Travel => "Travel",
            Self::Fuel => "Fuel",
            Self::Premium => "Premium",
            Self::SuperPremium => "Super premium",
            Self::Business => "Business",
            Self::Secured => "Secured",
        }
    }
}

/// Airport lounge entitlement tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoungeAccess {
    None,
    Domestic,
    International,
    Unlimited,
}

impl LoungeAccess {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "domestic" => Self::Domestic,
            "international" | "domestic_international" | "both" => Self::International,
            "unlimited" => Self::Unlimited,
            _ => Self::None,
        }
    }
}

/// Canonical spend category shared by profiles and card "best for" tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendCategory {
    OnlineShopping,
    Groceries,
    Dining,
    Travel,
    Fuel,
    Entertainment,
    Utilities,
    Upi,
    Other,
}

impl SpendCategory {
    /// Collapses the synonyms used across questionnaire flows and catalog exports.
    pub fn normalize(raw: &str) -> Self {
        let key = raw
            .to_ascii_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        match key.as_str() {
            "online_shopping" | "shopping" | "online" | "ecommerce" | "e_commerce"
            | "onlineshopping" => Self::OnlineShopping,
            "groceries" | "grocery" | "supermarket" | "supermarkets" => Self::Groceries,
            "dining" | "food" | "restaurants" | "restaurant" | "food_delivery"
            | "food_dining" => Self::Dining,
            "travel" | "flights" | "hotels" | "airline" | "airlines" => Self::Travel,
            "fuel" | "petrol" | "diesel" => Self::Fuel,
            "entertainment" | "movies" | "ott" | "streaming" => Self::Entertainment,
            "utilities" | "utility" | "bills" | "bill_payments" | "bill_payment" | "recharge" => {
                Self::Utilities
            }
            "upi" | "upi_payments" | "rupay_upi" => Self::Upi,
            _ => Self::Other,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnlineShopping => "online_shopping",
            Self::Groceries => "groceries",
            Self::Dining => "dining",
            Self::Travel => "travel",
            Self::Fuel => "fuel",
            Self::Entertainment => "entertainment",
            Self::Utilities => "utilities",
            Self::Upi => "upi",
            Self::Other => "other",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::OnlineShopping => "online shopping",
            Self::Groceries => "groceries",
            Self::Dining => "dining",
            Self::Travel => "travel",
            Self::Fuel => "fuel",
            Self::Entertainment => "entertainment",
            Self::Utilities => "bill payments",
            Self::Upi => "UPI payments",
            Self::Other => "everyday",
        }
    }
}

/// Reward earn rate in percent, with optional per-category overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRate {
    pub default_pct: f64,
    #[serde(default)]
    pub category_pct: BTreeMap<SpendCategory, f64>,
}

impl RewardRate {
    pub fn flat(default_pct: f64) -> Self {
        Self {
            default_pct,
            category_pct: BTreeMap::new(),
        }
    }

    pub fn best_pct(&self) -> f64 {
        self.category_pct
            .values()
            .copied()
            .fold(self.default_pct, f64::max)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFeatures {
    pub fuel_surcharge_waiver: bool,
    pub emi_conversion: bool,
    pub golf_access: bool,
    pub concierge: bool,
}

/// Structured capability tags derived when a card enters the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardCapabilities {
    pub cashback: bool,
    pub travel: bool,
    pub upi: bool,
    pub secured: bool,
}

/// Normalized credit card product. Read-only once it enters a catalog snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: CardId,
    pub bank: String,
    pub name: String,
    pub network: String,
    pub card_type: CardType,
    pub joining_fee: u32,
    pub annual_fee: u32,
    pub fee_waiver_spend: Option<u32>,
    pub min_income_salaried: Option<u32>,
    pub min_income_self_employed: Option<u32>,
    pub min_credit_score: Option<u16>,
    pub min_age: Option<u8>,
    pub max_age: Option<u8>,
    pub reward_rate: RewardRate,
    pub lounge_access: LoungeAccess,
    pub features: CardFeatures,
    pub description: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub best_for: Vec<SpendCategory>,
    pub popularity_score: u32,
    pub active: bool,
    pub capabilities: CardCapabilities,
}

impl CardRecord {
    /// Minimum annual income for the applicant's employment type, if the issuer publishes one.
    pub fn min_income_for(&self, employment: EmploymentType) -> Option<u32> {
        if employment.is_self_employed() {
            self.min_income_self_employed.or(self.min_income_salaried)
        } else {
            self.min_income_salaried.or(self.min_income_self_employed)
        }
    }

    pub fn requires_income(&self) -> bool {
        self.min_income_salaried.unwrap_or(0) > 0 || self.min_income_self_employed.unwrap_or(0) > 0
    }

    pub fn is_secured(&self) -> bool {
        self.capabilities.secured
    }

    pub fn is_lifetime_free(&self) -> bool {
        self.joining_fee == 0 && self.annual_fee == 0
    }

    pub fn serves(&self, category: SpendCategory) -> bool {
        self.best_for.contains(&category)
    }
}

/// Employment classification used by eligibility and persona detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    Salaried,
    SelfEmployed,
    BusinessOwner,
    Freelancer,
    Student,
    Retired,
    Homemaker,
    Unemployed,
    #[default]
    Unknown,
}

impl EmploymentType {
    pub fn parse(raw: &str) -> Self {
        let key = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "salaried" | "employed" | "full_time" | "government" => Self::Salaried,
            "self_employed" | "selfemployed" | "professional" => Self::SelfEmployed,
            "business" | "business_owner" | "entrepreneur" => Self::BusinessOwner,
            "freelancer" | "freelance" | "gig" | "contract" => Self::Freelancer,
            "student" => Self::Student,
            "retired" | "pensioner" => Self::Retired,
            "homemaker" => Self::Homemaker,
            "unemployed" | "none" => Self::Unemployed,
            _ => Self::Unknown,
        }
    }

    pub const fn is_self_employed(self) -> bool {
        matches!(
            self,
            Self::SelfEmployed | Self::BusinessOwner | Self::Freelancer
        )
    }
}

/// Primary goal declared in the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryGoal {
    CreditBuilding,
    DebtManagement,
    TravelPerks,
    OnlineShopping,
    Cashback,
    PremiumLifestyle,
    Rewards,
    FuelSavings,
    EverydaySavings,
}

impl PrimaryGoal {
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let goal = match key.as_str() {
            "credit_building" | "build_credit" | "credit_builder" | "first_card" => {
                Self::CreditBuilding
            }
            "debt_management" | "manage_debt" | "balance_transfer" => Self::DebtManagement,
            "travel_perks" | "travel" | "lounge_access" | "air_miles" => Self::TravelPerks,
            "online_shopping" | "shopping" => Self::OnlineShopping,
            "cashback" | "cash_back" => Self::Cashback,
            "premium_lifestyle" | "premium" | "lifestyle" => Self::PremiumLifestyle,
            "rewards" | "reward_points" => Self::Rewards,
            "fuel" | "fuel_savings" => Self::FuelSavings,
            "everyday" | "everyday_savings" | "savings" => Self::EverydaySavings,
            _ => return None,
        };
        Some(goal)
    }
}

/// Self-reported credit standing when a numeric score is not known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditBand {
    NoHistory,
    Unknown,
    Poor,
    Fair,
    Good,
    Excellent,
}

/// Credit score as a number (300-900) or a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditScoreEstimate {
    Score(u16),
    Band(CreditBand),
}

impl CreditScoreEstimate {
    pub fn parse_band(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let band = match key.as_str() {
            "no_history" | "none" | "new" | "no_credit_history" => CreditBand::NoHistory,
            "unknown" | "not_sure" | "dont_know" => CreditBand::Unknown,
            "poor" | "below_600" => CreditBand::Poor,
            "fair" | "600_700" => CreditBand::Fair,
            "good" | "700_750" => CreditBand::Good,
            "excellent" | "750_plus" | "above_750" => CreditBand::Excellent,
            _ => return None,
        };
        Some(Self::Band(band))
    }

    /// Numeric value used for threshold comparisons; bands map to their midpoint.
    pub fn numeric(self) -> Option<u16> {
        match self {
            Self::Score(score) => Some(score),
            Self::Band(CreditBand::Poor) => Some(550),
            Self::Band(CreditBand::Fair) => Some(650),
            Self::Band(CreditBand::Good) => Some(725),
            Self::Band(CreditBand::Excellent) => Some(800),
            Self::Band(CreditBand::NoHistory | CreditBand::Unknown) => None,
        }
    }

    pub fn is_thin_file(self) -> bool {
        matches!(
            self,
            Self::Band(CreditBand::NoHistory | CreditBand::Unknown)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBand {
    #[serde(rename = "18_20")]
    Age18To20,
    #[serde(rename = "21_25")]
    Age21To25,
    #[serde(rename = "26_35")]
    Age26To35,
    #[serde(rename = "36_50")]
    Age36To50,
    #[serde(rename = "51_plus")]
    Age51Plus,
}

impl AgeBand {
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let band = match key.as_str() {
            "18_20" => Self::Age18To20,
            "21_25" => Self::Age21To25,
            "26_35" => Self::Age26To35,
            "36_50" => Self::Age36To50,
            "51_plus" | "51+" | "50_plus" | "51_and_above" => Self::Age51Plus,
            _ => return None,
        };
        Some(band)
    }

    pub fn from_age(age: u8) -> Option<Self> {
        match age {
            0..=17 => None,
            18..=20 => Some(Self::Age18To20),
            21..=25 => Some(Self::Age21To25),
            26..=35 => Some(Self::Age26To35),
            36..=50 => Some(Self::Age36To50),
            _ => Some(Self::Age51Plus),
        }
    }

    /// Representative age used when only the band is known.
    pub const fn estimated_age(self) -> u8 {
        match self {
            Self::Age18To20 => 19,
            Self::Age21To25 => 23,
            Self::Age26To35 => 30,
            Self::Age36To50 => 43,
            Self::Age51Plus => 56,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncomeBand {
    #[serde(rename = "none")]
    NoIncome,
    #[serde(rename = "below_3l")]
    Below3L,
    #[serde(rename = "3l_6l")]
    From3LTo6L,
    #[serde(rename = "6l_12l")]
    From6LTo12L,
    #[serde(rename = "12l_plus")]
    Above12L,
}

impl IncomeBand {
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let band = match key.as_str() {
            "none" | "no_income" | "zero" | "0" => Self::NoIncome,
            "below_3l" | "under_3l" | "0_3l" => Self::Below3L,
            "3l_6l" | "3_6l" => Self::From3LTo6L,
            "6l_12l" | "6_12l" => Self::From6LTo12L,
            "12l_plus" | "above_12l" | "12l+" => Self::Above12L,
            _ => return None,
        };
        Some(band)
    }

    /// Representative annual income in rupees.
    pub const fn estimated_annual_income(self) -> u64 {
        match self {
            Self::NoIncome => 0,
            Self::Below3L => 200_000,
            Self::From3LTo6L => 450_000,
            Self::From6LTo12L => 900_000,
            Self::Above12L => 1_500_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecuredReadiness {
    HasFd,
    FdReady,
    OpenToSecured,
    UnsecuredOnly,
}

impl SecuredReadiness {
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let readiness = match key.as_str() {
            "has_fd" | "existing_fd" => Self::HasFd,
            "fd_ready" | "can_open_fd" | "yes" => Self::FdReady,
            "open_to_secured" | "maybe" | "open" => Self::OpenToSecured,
            "unsecured_only" | "no" | "no_fd" => Self::UnsecuredOnly,
            _ => return None,
        };
        Some(readiness)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuePriority {
    LowFee,
    BuildCredit,
    Cashback,
    Travel,
    Upi,
    Rewards,
}

impl ValuePriority {
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let priority = match key.as_str() {
            "low_fee" | "no_fee" | "zero_fee" => Self::LowFee,
            "build_credit" | "credit_building" => Self::BuildCredit,
            "cashback" | "cash_back" => Self::Cashback,
            "travel" | "travel_perks" | "lounge" => Self::Travel,
            "upi" | "upi_payments" => Self::Upi,
            "rewards" | "reward_points" => Self::Rewards,
            _ => return None,
        };
        Some(priority)
    }

    pub const fn favors_low_fee(self) -> bool {
        matches!(self, Self::LowFee | Self::BuildCredit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeTolerance {
    Zero,
    UpTo1000,
    UpTo5000,
    PremiumOk,
}

impl FeeTolerance {
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let tolerance = match key.as_str() {
            "zero" | "none" | "0" | "lifetime_free" => Self::Zero,
            "up_to_1000" | "upto_1000" | "1000" | "low" => Self::UpTo1000,
            "up_to_5000" | "upto_5000" | "5000" | "medium" => Self::UpTo5000,
            "premium_ok" | "premium" | "any" | "high" => Self::PremiumOk,
            _ => return None,
        };
        Some(tolerance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardPreference {
    Cashback,
    Points,
    Miles,
}

impl RewardPreference {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cashback" | "cash_back" => Some(Self::Cashback),
            "points" | "reward_points" => Some(Self::Points),
            "miles" | "air_miles" => Some(Self::Miles),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelFrequency {
    Rarely,
    Occasionally,
    Frequently,
}

impl TravelFrequency {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rarely" | "never" => Some(Self::Rarely),
            "occasionally" | "sometimes" => Some(Self::Occasionally),
            "frequently" | "often" | "monthly" => Some(Self::Frequently),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpiNeed {
    None,
    Some,
    Heavy,
}

impl UpiNeed {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" | "no" => Some(Self::None),
            "some" | "occasional" => Some(Self::Some),
            "heavy" | "daily" | "essential" => Some(Self::Heavy),
            _ => None,
        }
    }
}

/// Categorical refinements collected by the follow-up round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowUpAnswers {
    pub age_band: Option<AgeBand>,
    pub income_band: Option<IncomeBand>,
    pub secured_readiness: Option<SecuredReadiness>,
    pub primary_spend_focus: Option<SpendCategory>,
    pub value_priority: Option<ValuePriority>,
    pub fee_tolerance: Option<FeeTolerance>,
    pub reward_type: Option<RewardPreference>,
    pub travel_frequency: Option<TravelFrequency>,
    pub upi_need: Option<UpiNeed>,
}

impl FollowUpAnswers {
    /// Parses the raw answer map; unrecognized values are left unset.
    pub fn from_map(raw: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| raw.get(key).map(String::as_str);
        Self {
            age_band: get("age_band").and_then(AgeBand::parse),
            income_band: get("income_band").and_then(IncomeBand::parse),
            secured_readiness: get("secured_readiness").and_then(SecuredReadiness::parse),
            primary_spend_focus: get("primary_spend_focus")
                .map(SpendCategory::normalize)
                .filter(|category| *category != SpendCategory::Other),
            value_priority: get("value_priority").and_then(ValuePriority::parse),
            fee_tolerance: get("fee_tolerance").and_then(FeeTolerance::parse),
            reward_type: get("reward_type").and_then(RewardPreference::parse),
            travel_frequency: get("travel_frequency").and_then(TravelFrequency::parse),
            upi_need: get("upi_need").and_then(UpiNeed::parse),
        }
    }
}

/// Normalized financial snapshot for a single recommendation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Declared age in years; 0 when not supplied.
    pub age: u8,
    pub monthly_income: u64,
    pub annual_income: u64,
    pub employment: EmploymentType,
    pub city: String,
    pub primary_bank: String,
    pub existing_cards: Vec<String>,
    pub has_fixed_deposit: bool,
    pub fixed_deposit_amount: u64,
    pub spend: BTreeMap<SpendCategory, f64>,
    pub declared_top_categories: Vec<SpendCategory>,
    pub primary_goal: Option<PrimaryGoal>,
    pub secondary_goals: Vec<String>,
    pub credit_score: Option<CreditScoreEstimate>,
    pub follow_up: FollowUpAnswers,
}

impl UserProfile {
    /// Declared age, or the follow-up band's representative age.
    pub fn effective_age(&self) -> Option<u8> {
        if self.age > 0 {
            return Some(self.age);
        }
        self.follow_up.age_band.map(AgeBand::estimated_age)
    }

    pub fn age_band(&self) -> Option<AgeBand> {
        self.follow_up
            .age_band
            .or_else(|| AgeBand::from_age(self.age))
    }

    /// Annual income in rupees: declared, derived from monthly, or estimated from the band.
    pub fn effective_annual_income(&self) -> u64 {
        if self.annual_income > 0 {
            return self.annual_income;
        }
        if self.monthly_income > 0 {
            return self.monthly_income.saturating_mul(12);
        }
        self.follow_up
            .income_band
            .map(IncomeBand::estimated_annual_income)
            .unwrap_or(0)
    }

    pub fn credit_score_value(&self) -> Option<u16> {
        self.credit_score.and_then(CreditScoreEstimate::numeric)
    }

    pub fn has_no_credit_history(&self) -> bool {
        match self.credit_score {
            Some(estimate) => estimate == CreditScoreEstimate::Band(CreditBand::NoHistory),
            None => self.existing_cards.is_empty(),
        }
    }

    pub fn monthly_spend(&self) -> f64 {
        self.spend.values().sum()
    }

    /// Declared top categories first, then categories ranked by monthly spend.
    pub fn top_categories(&self, limit: usize) -> Vec<SpendCategory> {
        let mut ranked: Vec<(SpendCategory, f64)> = self
            .spend
            .iter()
            .filter(|(category, amount)| **amount > 0.0 && **category != SpendCategory::Other)
            .map(|(category, amount)| (*category, *amount))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut top = Vec::with_capacity(limit);
        let candidates = self
            .declared_top_categories
            .iter()
            .copied()
            .chain(ranked.into_iter().map(|(category, _)| category));
        for category in candidates {
            if top.len() == limit {
                break;
            }
            if category != SpendCategory::Other && !top.contains(&category) {
                top.push(category);
            }
        }
        top
    }

    /// Case-insensitive match against declared cards. A declared short name such as
    /// "Millennia" matches the catalog name when every distinctive word of it appears there;
    /// generic words ("credit", "card") never match on their own.
    pub fn holds_card_named(&self, card_name: &str) -> bool {
        let name = card_name.trim().to_lowercase();
        let catalog_words: Vec<&str> = name_words(&name).collect();
        self.existing_cards.iter().any(|existing| {
            let existing = existing.trim().to_lowercase();
            if existing.is_empty() {
                return false;
            }
            if existing == name {
                return true;
            }
            let mut distinctive = name_words(&existing)
                .filter(|word| !GENERIC_CARD_WORDS.contains(word))
                .peekable();
            distinctive.peek().is_some()
                && distinctive.all(|word| catalog_words.contains(&word))
        })
    }
}

const GENERIC_CARD_WORDS: [&str; 6] = ["credit", "card", "cards", "debit", "bank", "the"];

fn name_words(name: &str) -> impl Iterator<Item = &str> {
    name.split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
}
