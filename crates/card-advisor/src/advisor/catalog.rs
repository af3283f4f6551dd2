//! Card catalog sourcing: primary source, built-in fallback, and row normalization.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::domain::{
    CardCapabilities, CardFeatures, CardId, CardRecord, CardType, LoungeAccess, RewardRate,
    SpendCategory,
};
use super::fields::{amount_at, flag_at, number, number_at, pick, text_at, text_list_at};

/// Failure reported by a primary catalog source.
#[derive(Debug, thiserror::Error)]
pub enum CatalogSourceError {
    #[error("catalog table is missing")]
    Missing,
    #[error("catalog source unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to the live card table.
pub trait CatalogSource: Send + Sync {
    /// Active rows ordered by popularity, at most `limit` of them.
    fn fetch_active(&self, limit: usize) -> Result<Vec<Value>, CatalogSourceError>;
}

/// Catalog failure that prevents scoring.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("card catalog unavailable: {0}")]
    Unavailable(String),
    #[error("card catalog is empty")]
    Empty,
}

/// Where the working set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogOrigin {
    Primary,
    Fallback,
}

impl CatalogOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

/// Normalized working set for one request.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub cards: Vec<CardRecord>,
    pub origin: CatalogOrigin,
    /// Fallback records merged in to reach the minimum size.
    pub supplemented: usize,
}

impl CatalogSnapshot {
    pub fn uses_fallback(&self) -> bool {
        self.origin == CatalogOrigin::Fallback || self.supplemented > 0
    }
}

/// Combines the primary source with the built-in fallback list.
pub struct CatalogProvider<C> {
    source: C,
    page_size: usize,
}

impl<C: CatalogSource> CatalogProvider<C> {
    pub fn new(source: C, page_size: usize) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
        }
    }

    pub fn fetch(&self, min_size: usize) -> Result<CatalogSnapshot, CatalogError> {
        let (mut cards, origin) = match self.source.fetch_active(self.page_size) {
            Ok(rows) => {
                let cards = normalize_rows(&rows);
                if cards.is_empty() {
                    debug!("primary catalog returned no usable rows, using fallback");
                    (fallback_catalog(), CatalogOrigin::Fallback)
                } else {
                    (cards, CatalogOrigin::Primary)
                }
            }
            Err(CatalogSourceError::Missing) => {
                warn!("primary catalog table missing, using fallback");
                (fallback_catalog(), CatalogOrigin::Fallback)
            }
            Err(CatalogSourceError::Unavailable(reason)) => {
                return Err(CatalogError::Unavailable(reason));
            }
        };

        let mut supplemented = 0;
        if cards.len() < min_size {
            let mut known: HashSet<CardId> = cards.iter().map(|card| card.id.clone()).collect();
            for card in fallback_catalog() {
                if known.insert(card.id.clone()) {
                    cards.push(card);
                    supplemented += 1;
                }
            }
            debug!(supplemented, "merged fallback cards into small catalog");
        }

        if cards.is_empty() {
            return Err(CatalogError::Empty);
        }

        Ok(CatalogSnapshot {
            cards,
            origin,
            supplemented,
        })
    }
}

/// JSON array export on disk; a missing file behaves like a missing table.
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CatalogSource for JsonFileCatalog {
    fn fetch_active(&self, limit: usize) -> Result<Vec<Value>, CatalogSourceError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogSourceError::Missing)
            }
            Err(err) => return Err(CatalogSourceError::Unavailable(err.to_string())),
        };
        let parsed: Value = serde_json::from_str(&raw)
            .map_err(|err| CatalogSourceError::Unavailable(err.to_string()))?;
        let rows = match parsed {
            Value::Array(rows) => rows,
            Value::Object(mut object) => match object.remove("cards") {
                Some(Value::Array(rows)) => rows,
                _ => return Err(CatalogSourceError::Missing),
            },
            _ => return Err(CatalogSourceError::Missing),
        };
        Ok(active_by_popularity(rows, limit))
    }
}

/// In-memory rows, ordered and filtered like a live query.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    rows: Vec<Value>,
}

impl StaticCatalog {
    pub fn new(rows: Vec<Value>) -> Self {
        Self { rows }
    }
}

impl CatalogSource for StaticCatalog {
    fn fetch_active(&self, limit: usize) -> Result<Vec<Value>, CatalogSourceError> {
        Ok(active_by_popularity(self.rows.clone(), limit))
    }
}

/// Source with no backing table; every request is served from the fallback list.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrimaryCatalog;

impl CatalogSource for NoPrimaryCatalog {
    fn fetch_active(&self, _limit: usize) -> Result<Vec<Value>, CatalogSourceError> {
        Err(CatalogSourceError::Missing)
    }
}

fn active_by_popularity(rows: Vec<Value>, limit: usize) -> Vec<Value> {
    let mut active: Vec<(f64, Value)> = rows
        .into_iter()
        .filter(|row| {
            row.as_object()
                .and_then(|object| flag_at(object, &["is_active", "isActive", "active"]))
                .unwrap_or(true)
        })
        .map(|row| {
            let popularity = row
                .as_object()
                .and_then(|object| number_at(object, &POPULARITY_KEYS))
                .unwrap_or(0.0);
            (popularity, row)
        })
        .collect();
    active.sort_by(|a, b| b.0.total_cmp(&a.0));
    active.into_iter().take(limit).map(|(_, row)| row).collect()
}

const POPULARITY_KEYS: [&str; 3] = ["popularity_score", "popularityScore", "popularity"];

pub fn normalize_rows(rows: &[Value]) -> Vec<CardRecord> {
    rows.iter().filter_map(normalize_row).collect()
}

/// Maps one heterogeneous catalog row onto the canonical record.
pub fn normalize_row(row: &Value) -> Option<CardRecord> {
    let Some(object) = row.as_object() else {
        warn!("skipping non-object catalog row");
        return None;
    };

    let id = text_at(object, &["id", "card_id", "cardId", "slug"]);
    let name = text_at(object, &["name", "card_name", "cardName", "display_name"]);
    if id.is_empty() || name.is_empty() {
        warn!(%id, %name, "skipping catalog row without id or name");
        return None;
    }

    let min_age = optional_amount(object, &["min_age", "minAge"]).map(clamp_u8);
    let max_age = optional_amount(object, &["max_age", "maxAge"]).map(clamp_u8);
    if let (Some(min), Some(max)) = (min_age, max_age) {
        if min > max {
            warn!(%id, min, max, "skipping catalog row with inverted age window");
            return None;
        }
    }

    let best_for: Vec<SpendCategory> = {
        let mut categories = Vec::new();
        for tag in text_list_at(
            object,
            &["best_for", "bestFor", "best_for_categories", "categories"],
        ) {
            let category = SpendCategory::normalize(&tag);
            if category != SpendCategory::Other && !categories.contains(&category) {
                categories.push(category);
            }
        }
        categories
    };

    let card_type = CardType::parse(&text_at(object, &["card_type", "cardType", "type", "tier"]))
        .unwrap_or(CardType::EntryLevel);
    let lounge_access = LoungeAccess::parse(&text_at(object, &["lounge_access", "loungeAccess"]));
    let network = text_at(object, &["network", "card_network"]);
    let description = text_at(object, &["description", "summary", "tagline"]);
    let pros = text_list_at(object, &["pros", "benefits", "key_benefits"]);
    let cons = text_list_at(object, &["cons", "drawbacks"]);

    let features = CardFeatures {
        fuel_surcharge_waiver: feature(object, &["fuel_surcharge_waiver", "fuelSurchargeWaiver"]),
        emi_conversion: feature(object, &["emi_conversion", "emiConversion"]),
        golf_access: feature(object, &["golf_access", "golfAccess"]),
        concierge: feature(object, &["concierge"]),
    };

    let name_text = [name.as_str(), description.as_str(), network.as_str()]
        .into_iter()
        .chain(pros.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    let capabilities = derive_capabilities(&name_text, card_type, lounge_access, &best_for);

    Some(CardRecord {
        id: CardId(id),
        bank: text_at(object, &["bank", "issuer", "bank_name", "bankName"]),
        name,
        network,
        card_type,
        joining_fee: clamp_u32(amount_at(object, &["joining_fee", "joiningFee"])),
        annual_fee: clamp_u32(amount_at(object, &["annual_fee", "annualFee", "renewal_fee"])),
        fee_waiver_spend: optional_amount(
            object,
            &[
                "annual_fee_waiver_spend",
                "fee_waiver_spend",
                "feeWaiverSpend",
                "fee_waiver_threshold",
            ],
        )
        .map(clamp_u32),
        min_income_salaried: optional_amount(
            object,
            &["min_income_salaried", "minIncomeSalaried", "min_income", "minIncome"],
        )
        .map(clamp_u32),
        min_income_self_employed: optional_amount(
            object,
            &["min_income_self_employed", "minIncomeSelfEmployed"],
        )
        .map(clamp_u32),
        min_credit_score: optional_amount(object, &["min_credit_score", "minCreditScore"])
            .map(|score| score.min(u16::MAX as u64) as u16),
        min_age,
        max_age,
        reward_rate: reward_rate(object),
        lounge_access,
        features,
        description,
        pros,
        cons,
        best_for,
        popularity_score: clamp_u32(amount_at(object, &POPULARITY_KEYS)),
        active: flag_at(object, &["is_active", "isActive", "active"]).unwrap_or(true),
        capabilities,
    })
}

/// Feature flags may sit at the top level or under a nested `features` object.
fn feature(object: &Map<String, Value>, keys: &[&str]) -> bool {
    flag_at(object, keys)
        .or_else(|| {
            pick(object, &["features"])
                .and_then(Value::as_object)
                .and_then(|features| flag_at(features, keys))
        })
        .unwrap_or(false)
}

fn optional_amount(object: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    number_at(object, keys).map(|n| n.max(0.0).round() as u64)
}

fn clamp_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}

fn clamp_u8(value: u64) -> u8 {
    value.min(u8::MAX as u64) as u8
}

fn reward_rate(object: &Map<String, Value>) -> RewardRate {
    match pick(object, &["reward_rate", "rewardRate", "base_reward_rate"]) {
        Some(Value::Object(rates)) => {
            let default_pct = number_at(rates, &["default", "base", "default_pct"])
                .unwrap_or(0.0)
                .max(0.0);
            let mut category_pct = BTreeMap::new();
            if let Some(Value::Object(categories)) = pick(rates, &["categories", "category"]) {
                for (category, rate) in categories {
                    let category = SpendCategory::normalize(category);
                    if let Some(rate) = number(rate) {
                        if category != SpendCategory::Other {
                            category_pct.insert(category, rate.max(0.0));
                        }
                    }
                }
            }
            RewardRate {
                default_pct,
                category_pct,
            }
        }
        Some(value) => RewardRate::flat(number(value).unwrap_or(0.0).max(0.0)),
        None => RewardRate::flat(0.0),
    }
}

struct KeywordFamilies {
    cashback: Regex,
    travel: Regex,
    upi: Regex,
    secured: Regex,
}

fn keyword_families() -> &'static KeywordFamilies {
    static FAMILIES: OnceLock<KeywordFamilies> = OnceLock::new();
    FAMILIES.get_or_init(|| KeywordFamilies {
        cashback: Regex::new(r"(?i)cash\s?back|statement credit|value\s?back")
            .expect("cashback pattern compiles"),
        travel: Regex::new(r"(?i)travel|lounge|\bmiles?\b|air\s?miles|flight|hotel|forex")
            .expect("travel pattern compiles"),
        upi: Regex::new(r"(?i)\bupi\b|rupay|\bqr\b|scan\s?(and|&)\s?pay")
            .expect("upi pattern compiles"),
        secured: Regex::new(r"(?i)\bsecured\b|fixed deposit|\bfd\b")
            .expect("secured pattern compiles"),
    })
}

/// Tags a card once at ingestion so scoring works on flags instead of free text.
pub fn derive_capabilities(
    text: &str,
    card_type: CardType,
    lounge_access: LoungeAccess,
    best_for: &[SpendCategory],
) -> CardCapabilities {
    let families = keyword_families();
    CardCapabilities {
        cashback: card_type == CardType::Cashback || families.cashback.is_match(text),
        travel: card_type == CardType::Travel
            || lounge_access != LoungeAccess::None
            || best_for.contains(&SpendCategory::Travel)
            || families.travel.is_match(text),
        upi: best_for.contains(&SpendCategory::Upi) || families.upi.is_match(text),
        secured: card_type == CardType::Secured || families.secured.is_match(text),
    }
}

/// Built-in catalog used when the primary source is absent or too small.
pub fn fallback_catalog() -> Vec<CardRecord> {
    normalize_rows(&fallback_rows())
}

fn fallback_rows() -> Vec<Value> {
    vec![
        json!({
            "id": "amazon-pay-icici", "bank": "ICICI Bank", "name": "Amazon Pay ICICI Credit Card",
            "network": "Visa", "card_type": "cashback", "joining_fee": 0, "annual_fee": 0,
            "min_income_salaried": 300000, "min_income_self_employed": 300000,
            "min_credit_score": 700, "min_age": 18, "max_age": 60,
            "reward_rate": {
                "default": 1.0,
                "categories": { "online_shopping": 5.0, "groceries": 2.0 }
            },
            "lounge_access": "none", "emi_conversion": true, "fuel_surcharge_waiver": true,
            "description": "Lifetime free cashback card for Amazon shoppers",
            "pros": ["Lifetime free", "5% back on Amazon for Prime members",
                "Cashback credited to Amazon Pay balance"],
            "cons": ["Rewards tied to Amazon ecosystem"],
            "best_for": ["online_shopping", "groceries"], "popularity_score": 97
        }),
        json!({
            "id": "hdfc-millennia", "bank": "HDFC Bank", "name": "HDFC Bank Millennia Credit Card",
            "network": "Mastercard", "card_type": "cashback", "joining_fee": 1000,
            "annual_fee": 1000,
            "annual_fee_waiver_spend": 100000,
            "min_income_salaried": 420000, "min_income_self_employed": 720000,
            "min_credit_score": 720, "min_age": 21, "max_age": 60,
            "reward_rate": {
                "default": 1.0,
                "categories": { "online_shopping": 5.0, "entertainment": 5.0 }
            },
            "lounge_access": "domestic", "emi_conversion": true,
            "description": "5% cashback on popular online merchants",
            "pros": ["5% cashback on Amazon, Flipkart and Swiggy",
                "Quarterly domestic lounge access"],
            "cons": ["Cashback capped monthly"],
            "best_for": ["online_shopping", "entertainment", "dining"], "popularity_score": 95
        }),
        json!({
            "id": "axis-ace", "bank": "Axis Bank", "name": "Axis Bank ACE Credit Card",
            "network": "Visa", "card_type": "cashback", "joining_fee": 499, "annual_fee": 499,
            "annual_fee_waiver_spend": 200000,
            "min_income_salaried": 300000, "min_income_self_employed": 600000,
            "min_credit_score": 720, "min_age": 18, "max_age": 70,
            "reward_rate": { "default": 1.5, "categories": { "utilities": 5.0, "dining": 4.0 } },
            "lounge_access": "none", "fuel_surcharge_waiver": true,
            "description": "Flat cashback with 5% on bill payments via Google Pay",
            "pros": ["5% cashback on bill payments", "1.5% flat cashback on other spends"],
            "cons": ["No lounge access"],
            "best_for": ["utilities", "dining"], "popularity_score": 90
        }),
        json!({
            "id": "icici-coral", "bank": "ICICI Bank", "name": "ICICI Bank Coral Credit Card",
            "network": "Visa", "card_type": "rewards", "joining_fee": 500, "annual_fee": 500,
            "annual_fee_waiver_spend": 150000,
            "min_income_salaried": 300000, "min_income_self_employed": 360000,
            "min_credit_score": 700, "min_age": 21, "max_age": 65,
            "reward_rate": 1.0, "lounge_access": "domestic",
            "description": "Entry rewards card with movie and dining offers",
            "pros": ["Buy one get one on movie tickets", "Domestic lounge access"],
            "cons": ["Modest reward rate"],
            "best_for": ["dining", "entertainment"], "popularity_score": 88
        }),
        json!({
            "id": "hdfc-regalia-gold", "bank": "HDFC Bank",
            "name": "HDFC Bank Regalia Gold Credit Card",
            "network": "Visa", "card_type": "premium", "joining_fee": 2500, "annual_fee": 2500,
            "annual_fee_waiver_spend": 400000,
            "min_income_salaried": 1200000, "min_income_self_employed": 1800000,
            "min_credit_score": 750, "min_age": 21, "max_age": 60,
            "reward_rate": { "default": 1.3, "categories": { "travel": 6.6 } },
            "lounge_access": "international", "golf_access": true, "concierge": true,
            "description": "Travel and lifestyle card with international lounge access",
            "pros": ["12 domestic and 6 international lounge visits",
                "Accelerated rewards on flights and hotels"],
            "cons": ["High income requirement"],
            "best_for": ["travel", "dining"], "popularity_score": 80
        }),
        json!({
            "id": "idfc-first-wow", "bank": "IDFC FIRST Bank",
            "name": "IDFC FIRST WOW! Credit Card",
            "network": "Visa", "card_type": "secured", "joining_fee": 0, "annual_fee": 0,
            "min_age": 18, "max_age": 70,
            "reward_rate": 1.0, "lounge_access": "none",
            "description": "Secured card issued against a fixed deposit with zero forex markup",
            "pros": ["Lifetime free", "No income proof needed", "Zero forex markup"],
            "cons": ["Limit tied to FD amount"],
            "best_for": ["travel", "online_shopping"], "popularity_score": 74
        }),
        json!({
            "id": "sbi-unnati", "bank": "SBI Card", "name": "SBI Card Unnati",
            "network": "Visa", "card_type": "secured", "joining_fee": 0, "annual_fee": 0,
            "min_age": 18, "max_age": 70,
            "reward_rate": 0.5, "lounge_access": "none",
            "description": "Secured credit card against an SBI fixed deposit",
            "pros": ["Builds credit history from scratch", "Available against FD of ₹25,000"],
            "cons": ["Low reward rate"],
            "best_for": ["groceries", "utilities"], "popularity_score": 70
        }),
        json!({
            "id": "hdfc-upi-rupay", "bank": "HDFC Bank", "name": "HDFC Bank UPI RuPay Credit Card",
            "network": "RuPay", "card_type": "entry_level", "joining_fee": 250, "annual_fee": 250,
            "annual_fee_waiver_spend": 25000,
            "min_income_salaried": 150000, "min_income_self_employed": 200000,
            "min_credit_score": 680, "min_age": 21, "max_age": 60,
            "reward_rate": { "default": 1.0, "categories": { "upi": 3.0, "groceries": 3.0 } },
            "lounge_access": "none",
            "description": "RuPay card linked to UPI for scan and pay",
            "pros": ["Pay any UPI QR with credit", "3% back on groceries"],
            "cons": ["Low credit limit for new users"],
            "best_for": ["upi", "groceries"], "popularity_score": 68
        }),
        json!({
            "id": "kotak-811-dream-different", "bank": "Kotak Mahindra Bank",
            "name": "Kotak 811 #DreamDifferent Credit Card",
            "network": "Mastercard", "card_type": "secured", "joining_fee": 0, "annual_fee": 0,
            "min_age": 18, "max_age": 65,
            "reward_rate": 0.5, "lounge_access": "none",
            "description": "Lifetime free secured card against a Kotak fixed deposit",
            "pros": ["Lifetime free", "Card limit up to 90% of FD"],
            "cons": ["Requires a Kotak 811 account"],
            "best_for": ["online_shopping", "utilities"], "popularity_score": 66
        }),
        json!({
            "id": "bpcl-sbi-octane", "bank": "SBI Card", "name": "BPCL SBI Card OCTANE",
            "network": "Visa", "card_type": "fuel", "joining_fee": 1499, "annual_fee": 1499,
            "annual_fee_waiver_spend": 200000,
            "min_income_salaried": 360000, "min_income_self_employed": 480000,
            "min_credit_score": 720, "min_age": 21, "max_age": 65,
            "reward_rate": { "default": 1.0, "categories": { "fuel": 7.25 } },
            "lounge_access": "domestic", "fuel_surcharge_waiver": true,
            "description": "Fuel rewards at BPCL outlets",
            "pros": ["7.25% value back on BPCL fuel", "Fuel surcharge waiver"],
            "cons": ["Rewards concentrated on fuel"],
            "best_for": ["fuel", "groceries"], "popularity_score": 65
        }),
    ]
}
