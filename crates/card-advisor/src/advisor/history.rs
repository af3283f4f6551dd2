//! Recent transaction history used to enrich sparse spend declarations.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use super::domain::UserId;

/// One categorized debit from the user's recent statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub posted_on: Option<NaiveDate>,
    pub description: String,
    pub category: String,
    pub amount: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("transaction history unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read transaction ledger: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid transaction ledger: {0}")]
    Csv(#[from] csv::Error),
}

/// Length of the "recent" window, in days.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Entries posted within [`RECENT_WINDOW_DAYS`] of the newest dated entry. Undated entries
/// are kept; a ledger without dates is returned whole.
pub fn recent_window(entries: &[TransactionEntry]) -> Vec<TransactionEntry> {
    let Some(latest) = entries.iter().filter_map(|entry| entry.posted_on).max() else {
        return entries.to_vec();
    };
    let start = latest - Duration::days(RECENT_WINDOW_DAYS);
    entries
        .iter()
        .filter(|entry| entry.posted_on.map_or(true, |posted| posted > start))
        .cloned()
        .collect()
}

/// Read-only access to the last 30 days of categorized transactions.
pub trait TransactionHistory: Send + Sync {
    fn recent(&self, user: &UserId) -> Result<Vec<TransactionEntry>, HistoryError>;
}

/// History collaborator for deployments without statement imports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransactionHistory;

impl TransactionHistory for NoTransactionHistory {
    fn recent(&self, _user: &UserId) -> Result<Vec<TransactionEntry>, HistoryError> {
        Ok(Vec::new())
    }
}

/// Per-user history held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactionHistory {
    entries: Arc<Mutex<HashMap<UserId, Vec<TransactionEntry>>>>,
}

impl InMemoryTransactionHistory {
    pub fn record(&self, user: UserId, entries: Vec<TransactionEntry>) {
        let mut guard = self.entries.lock().unwrap_or_else(|err| err.into_inner());
        guard.entry(user).or_default().extend(entries);
    }
}

impl TransactionHistory for InMemoryTransactionHistory {
    fn recent(&self, user: &UserId) -> Result<Vec<TransactionEntry>, HistoryError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| HistoryError::Unavailable("history lock poisoned".to_string()))?;
        Ok(guard.get(user).cloned().unwrap_or_default())
    }
}

/// Single-user ledger loaded from a `Date,Description,Category,Amount` CSV export.
#[derive(Debug, Clone, Default)]
pub struct CsvTransactionLedger {
    entries: Vec<TransactionEntry>,
}

impl CsvTransactionLedger {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, HistoryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut entries = Vec::new();
        for row in csv_reader.deserialize::<LedgerRow>() {
            let row = row?;
            let amount = row.amount.abs();
            if amount <= 0.0 || row.is_credit() {
                continue;
            }
            entries.push(TransactionEntry {
                posted_on: row.date.as_deref().and_then(parse_date),
                description: row.description.unwrap_or_default(),
                category: row.category.unwrap_or_default(),
                amount,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[TransactionEntry] {
        &self.entries
    }
}

impl TransactionHistory for CsvTransactionLedger {
    fn recent(&self, _user: &UserId) -> Result<Vec<TransactionEntry>, HistoryError> {
        Ok(recent_window(&self.entries))
    }
}

#[derive(Debug, Deserialize)]
struct LedgerRow {
    #[serde(rename = "Date", alias = "date", default, deserialize_with = "empty_string_as_none")]
    date: Option<String>,
    #[serde(
        rename = "Description",
        alias = "description",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    description: Option<String>,
    #[serde(
        rename = "Category",
        alias = "category",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    category: Option<String>,
    #[serde(rename = "Amount", alias = "amount")]
    amount: f64,
    #[serde(rename = "Type", alias = "type", default, deserialize_with = "empty_string_as_none")]
    kind: Option<String>,
}

impl LedgerRow {
    fn is_credit(&self) -> bool {
        self.kind
            .as_deref()
            .map(|kind| kind.eq_ignore_ascii_case("credit") || kind.eq_ignore_ascii_case("cr"))
            .unwrap_or(false)
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}
