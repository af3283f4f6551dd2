//! Ranking, backfill and narrative assembly for a recommendation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::domain::{AdvisorFlow, CardId, CardRecord, EmploymentType, SpendCategory, UserProfile};
use super::eligibility::{passes_hard_constraints, EligibilityReport, EligibilityTier};
use super::persona::Persona;
use super::scoring::{CardScore, ScoreFactor, ScoringEngine};

/// Share of monthly income assumed to go on the card when no spend is declared.
const ASSUMED_SPEND_SHARE: f64 = 0.30;
/// Floor on the reward rate used for value estimates.
const MIN_REWARD_RATE: f64 = 0.005;
pub const MAX_KEY_PERKS: usize = 4;
pub const MAX_BENEFIT_SUMMARY: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCard {
    pub card: CardRecord,
    pub score: CardScore,
    /// Appended from outside the eligible pool to reach the minimum result count.
    pub backfilled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedCard {
    pub card_id: CardId,
    pub card_name: String,
    pub bank: String,
    pub score: u8,
    pub reasoning: String,
    pub annual_value: u64,
    pub annual_fee: u32,
    pub key_perks: Vec<String>,
    pub benefit_summary: Vec<String>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub best_categories: Vec<SpendCategory>,
    #[serde(default)]
    pub backfilled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub age: Option<u8>,
    pub annual_income: u64,
    pub employment: EmploymentType,
    pub credit_score: Option<u16>,
    pub monthly_spend: f64,
    pub top_categories: Vec<SpendCategory>,
}

impl ProfileSummary {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            age: profile.effective_age(),
            annual_income: profile.effective_annual_income(),
            employment: profile.employment,
            credit_score: profile.credit_score_value(),
            monthly_spend: profile.monthly_spend(),
            top_categories: profile.top_categories(3),
        }
    }
}

/// Ranked cards with their narrative, as returned and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub flow: AdvisorFlow,
    pub cards: Vec<RecommendedCard>,
    pub overall_analysis: String,
    pub persona: Option<Persona>,
    pub profile_summary: Option<ProfileSummary>,
    #[serde(default)]
    pub application_guide: Vec<String>,
    #[serde(default)]
    pub credit_education: Vec<String>,
}

/// Scores every card in `pool` and orders them by descending score.
///
/// The sort is stable, so equal scores keep catalog (popularity) order.
pub fn rank(engine: &ScoringEngine, profile: &UserProfile, pool: &[CardRecord]) -> Vec<ScoredCard> {
    let mut ranked: Vec<ScoredCard> = pool
        .iter()
        .map(|card| ScoredCard {
            score: engine.score(profile, card),
            card: card.clone(),
            backfilled: false,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total.cmp(&a.score.total));
    ranked
}

pub struct RecommendationAssembler {
    engine: ScoringEngine,
    min_results: usize,
}

impl RecommendationAssembler {
    pub fn new(engine: ScoringEngine, min_results: usize) -> Self {
        Self {
            engine,
            min_results: min_results.max(1),
        }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Top `min_results` cards from the eligible pool, backfilled from `catalog` when short.
    ///
    /// Backfill candidates that pass the hard constraints are preferred over the rest.
    pub fn select(
        &self,
        profile: &UserProfile,
        eligibility: &EligibilityReport,
        catalog: &[CardRecord],
    ) -> Vec<ScoredCard> {
        let mut selected: Vec<ScoredCard> = rank(&self.engine, profile, &eligibility.cards);
        let mut seen = HashSet::new();
        selected.retain(|scored| seen.insert(scored.card.id.clone()));
        selected.truncate(self.min_results);

        if selected.len() < self.min_results {
            let remaining: Vec<CardRecord> = catalog
                .iter()
                .filter(|card| !seen.contains(&card.id))
                .cloned()
                .collect();
            let (preferred, others): (Vec<CardRecord>, Vec<CardRecord>) = remaining
                .into_iter()
                .partition(|card| passes_hard_constraints(profile, card));

            let backfill = rank(&self.engine, profile, &preferred)
                .into_iter()
                .chain(rank(&self.engine, profile, &others));
            for mut scored in backfill {
                if selected.len() == self.min_results {
                    break;
                }
                if seen.insert(scored.card.id.clone()) {
                    scored.backfilled = true;
                    selected.push(scored);
                }
            }
        }

        selected
    }

    pub fn assemble(
        &self,
        flow: AdvisorFlow,
        profile: &UserProfile,
        persona: Persona,
        eligibility: &EligibilityReport,
        catalog: &[CardRecord],
    ) -> Recommendation {
        let selected = self.select(profile, eligibility, catalog);
        let cards: Vec<RecommendedCard> = selected
            .iter()
            .map(|scored| describe(profile, scored, eligibility.tier))
            .collect();

        let top_secured = selected.first().is_some_and(|scored| scored.card.is_secured());
        Recommendation {
            flow,
            overall_analysis: overall_analysis(profile, persona, &cards),
            application_guide: application_guide(profile, top_secured),
            credit_education: persona
                .education_tips()
                .into_iter()
                .map(str::to_string)
                .collect(),
            persona: Some(persona),
            profile_summary: Some(ProfileSummary::from_profile(profile)),
            cards,
        }
    }
}

/// Monthly card spend: declared total, or a share of monthly income.
pub fn estimated_monthly_spend(profile: &UserProfile) -> f64 {
    let declared = profile.monthly_spend();
    if declared > 0.0 {
        return declared;
    }
    let monthly_income = if profile.monthly_income > 0 {
        profile.monthly_income as f64
    } else {
        profile.effective_annual_income() as f64 / 12.0
    };
    monthly_income * ASSUMED_SPEND_SHARE
}

/// Spend-weighted reward rate in percent; the default rate when no spend is declared.
fn blended_reward_pct(profile: &UserProfile, card: &CardRecord) -> f64 {
    let total = profile.monthly_spend();
    if total <= 0.0 {
        return card.reward_rate.default_pct;
    }
    profile
        .spend
        .iter()
        .map(|(category, amount)| {
            let rate = card
                .reward_rate
                .category_pct
                .get(category)
                .copied()
                .unwrap_or(card.reward_rate.default_pct);
            rate * amount / total
        })
        .sum()
}

/// `monthly spend x max(0.5%, rate) x 12 - annual fee`, floored at zero.
pub fn annual_value(profile: &UserProfile, card: &CardRecord) -> u64 {
    let rate = (blended_reward_pct(profile, card) / 100.0).max(MIN_REWARD_RATE);
    let value = estimated_monthly_spend(profile) * rate * 12.0 - f64::from(card.annual_fee);
    value.max(0.0).round() as u64
}

fn describe(profile: &UserProfile, scored: &ScoredCard, tier: EligibilityTier) -> RecommendedCard {
    let card = &scored.card;
    RecommendedCard {
        card_id: card.id.clone(),
        card_name: card.name.clone(),
        bank: card.bank.clone(),
        score: scored.score.total,
        reasoning: reasoning(profile, scored, tier),
        annual_value: annual_value(profile, card),
        annual_fee: card.annual_fee,
        key_perks: key_perks(profile, scored),
        benefit_summary: benefit_summary(profile, scored),
        pros: card.pros.clone(),
        cons: card.cons.clone(),
        best_categories: card.best_for.clone(),
        backfilled: scored.backfilled,
    }
}

fn spend_focus(profile: &UserProfile, card: &CardRecord) -> Option<SpendCategory> {
    if let Some(focus) = profile.follow_up.primary_spend_focus {
        return Some(focus);
    }
    let top = profile.top_categories(3);
    top.iter()
        .copied()
        .find(|category| card.serves(*category))
        .or_else(|| top.first().copied())
}

fn fee_phrase(card: &CardRecord) -> String {
    if card.is_lifetime_free() {
        return "with no joining or annual fee".to_string();
    }
    match card.fee_waiver_spend {
        Some(waiver) => format!(
            "with a ₹{} annual fee that is waived above ₹{} yearly spend",
            card.annual_fee, waiver
        ),
        None if card.annual_fee == 0 => "with no annual fee".to_string(),
        None => format!("for a ₹{} annual fee", card.annual_fee),
    }
}

fn reasoning(profile: &UserProfile, scored: &ScoredCard, tier: EligibilityTier) -> String {
    let card = &scored.card;
    let focus = spend_focus(profile, card)
        .map(|category| category.label().to_lowercase())
        .unwrap_or_else(|| "everyday".to_string());
    let mut text = format!(
        "{} from {} suits your {} spending {}.",
        card.name,
        card.bank,
        focus,
        fee_phrase(card)
    );

    if card.is_secured() {
        text.push_str(" It is issued against a fixed deposit, so approval needs no income proof.");
    } else if scored.score.has_factor(ScoreFactor::BankAffinity) {
        text.push_str(" Your existing relationship with the bank improves approval odds.");
    }

    if scored.backfilled {
        text.push_str(" Added to widen your options; confirm eligibility before applying.");
    } else if tier != EligibilityTier::Strict && card.requires_income() {
        text.push_str(" Income criteria were relaxed for this card; check the issuer's minimum.");
    }
    text
}

fn push_unique(list: &mut Vec<String>, candidate: String, limit: usize) {
    if list.len() >= limit || candidate.trim().is_empty() {
        return;
    }
    let lowered = candidate.trim().to_lowercase();
    if list.iter().all(|existing| existing.to_lowercase() != lowered) {
        list.push(candidate.trim().to_string());
    }
}

fn fee_observation(card: &CardRecord) -> String {
    if card.is_lifetime_free() {
        "Lifetime free".to_string()
    } else if let Some(waiver) = card.fee_waiver_spend {
        format!("Annual fee waived on ₹{waiver} spend")
    } else {
        format!("Annual fee ₹{}", card.annual_fee)
    }
}

fn reward_observation(card: &CardRecord) -> String {
    let best = card
        .reward_rate
        .category_pct
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1));
    match best {
        Some((category, pct)) if *pct > card.reward_rate.default_pct => {
            format!("Up to {pct:.1}% back on {}", category.label().to_lowercase())
        }
        _ => format!("{:.1}% value back on all spends", card.reward_rate.default_pct),
    }
}

fn key_perks(profile: &UserProfile, scored: &ScoredCard) -> Vec<String> {
    let card = &scored.card;
    let mut perks = Vec::with_capacity(MAX_KEY_PERKS);
    for pro in &card.pros {
        push_unique(&mut perks, pro.clone(), MAX_KEY_PERKS);
    }
    push_unique(&mut perks, fee_observation(card), MAX_KEY_PERKS);
    push_unique(&mut perks, reward_observation(card), MAX_KEY_PERKS);
    if card.is_secured() && profile.has_no_credit_history() {
        push_unique(&mut perks, "Builds a credit history from day one".to_string(), MAX_KEY_PERKS);
    }
    if scored.score.has_factor(ScoreFactor::BankAffinity) {
        push_unique(&mut perks, format!("Same bank as your {} account", card.bank), MAX_KEY_PERKS);
    }
    perks
}

fn benefit_summary(profile: &UserProfile, scored: &ScoredCard) -> Vec<String> {
    let card = &scored.card;
    let mut summary = Vec::with_capacity(MAX_BENEFIT_SUMMARY);
    let value = annual_value(profile, card);
    if value > 0 {
        push_unique(
            &mut summary,
            format!("Estimated net value of ₹{value} a year on your spends"),
            MAX_BENEFIT_SUMMARY,
        );
    }
    push_unique(&mut summary, reward_observation(card), MAX_BENEFIT_SUMMARY);
    if card.is_secured() {
        push_unique(
            &mut summary,
            "Secured by a fixed deposit that keeps earning interest".to_string(),
            MAX_BENEFIT_SUMMARY,
        );
    }
    push_unique(&mut summary, fee_observation(card), MAX_BENEFIT_SUMMARY);
    summary
}

fn overall_analysis(profile: &UserProfile, persona: Persona, cards: &[RecommendedCard]) -> String {
    let Some(top) = cards.first() else {
        return "No cards could be matched to this profile.".to_string();
    };
    let mut text = format!(
        "As a {} profile, {} from {} is your strongest match with a score of {}. {}.",
        persona.label().to_lowercase(),
        top.card_name,
        top.bank,
        top.score,
        persona.benefit_focus()
    );
    let spend = estimated_monthly_spend(profile);
    if spend > 0.0 {
        text.push_str(&format!(
            " Estimates assume about ₹{:.0} of monthly card spend.",
            spend
        ));
    }
    text
}

fn application_guide(profile: &UserProfile, top_secured: bool) -> Vec<String> {
    let mut steps = Vec::new();
    if top_secured {
        steps.push(
            "Open or earmark a fixed deposit with the issuing bank; limits run 80-90% of it"
                .to_string(),
        );
        steps.push(
            "Apply online with PAN and Aadhaar; no income proof is needed against an FD"
                .to_string(),
        );
    } else {
        steps.push("Check your credit report for errors before applying".to_string());
        let proof = if profile.employment.is_self_employed() {
            "Keep your last two years of ITR and bank statements ready"
        } else {
            "Keep your last three salary slips or Form 16 ready"
        };
        steps.push(proof.to_string());
        steps.push(
            "Apply to your top choice first; wait for a decision before the next application"
                .to_string(),
        );
    }
    steps.push("Complete video KYC and activate the card within 30 days".to_string());
    steps.push("Set up auto-pay for the full statement balance".to_string());
    steps
}
