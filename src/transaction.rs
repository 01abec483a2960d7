// 💸 Transaction Model
// Normalized records served by the store, plus the lenient input payload used by
// bulk load, create and update

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Placeholder for sender/receiver when the text gives nothing usable
pub const UNKNOWN_PARTY: &str = "Unknown";

/// Amount sentinel: the SMS did not yield a parseable amount.
/// A record with this amount is "not determined", not a zero-value transfer.
pub const UNDETERMINED_AMOUNT: f64 = 0.0;

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Sent,
    Received,
    Deposit,
    Withdrawal,
    Payment,
    Transfer,
    Airtime,
    #[default]
    Unknown,
}

impl TransactionType {
    pub const ALL: [TransactionType; 8] = [
        TransactionType::Sent,
        TransactionType::Received,
        TransactionType::Deposit,
        TransactionType::Withdrawal,
        TransactionType::Payment,
        TransactionType::Transfer,
        TransactionType::Airtime,
        TransactionType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sent => "sent",
            TransactionType::Received => "received",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Payment => "payment",
            TransactionType::Transfer => "transfer",
            TransactionType::Airtime => "airtime",
            TransactionType::Unknown => "unknown",
        }
    }

    /// Lenient conversion used for API payloads: anything unrecognised is `Unknown`
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or(TransactionType::Unknown)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| format!("unknown transaction type: {}", s))
    }
}

// ============================================================================
// TRANSACTION RECORD
// ============================================================================

/// A normalized transaction. All six fields are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub sender: String,
    pub receiver: String,
    pub timestamp: String,
}

impl TransactionRecord {
    /// False when `amount` holds the "not determined" sentinel
    pub fn has_amount(&self) -> bool {
        self.amount != UNDETERMINED_AMOUNT
    }

    /// Merge the fields present in `input`. The id never changes here.
    pub fn apply(&mut self, input: &TransactionInput) {
        if let Some(transaction_type) = input.transaction_type {
            self.transaction_type = transaction_type;
        }
        if let Some(amount) = input.amount {
            self.amount = amount;
        }
        if let Some(sender) = &input.sender {
            self.sender = sender.clone();
        }
        if let Some(receiver) = &input.receiver {
            self.receiver = receiver.clone();
        }
        if let Some(timestamp) = &input.timestamp {
            self.timestamp = timestamp.clone();
        }
    }
}

// ============================================================================
// TRANSACTION INPUT (partial / untrusted)
// ============================================================================

/// Partial record as it arrives from a snapshot, the extractor or an API payload.
///
/// Every field is optional. Values of the wrong type are coerced instead of
/// rejected: amounts that are not non-negative numbers become `0.0`, non-string
/// text becomes its JSON rendering (or `""` for null/arrays/objects), and
/// unknown type names become `unknown`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionInput {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "lenient_type")]
    pub transaction_type: Option<TransactionType>,

    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub sender: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub receiver: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
}

impl TransactionInput {
    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(coerce_amount(amount));
        self
    }

    pub fn with_sender(mut self, sender: &str) -> Self {
        self.sender = Some(sender.to_string());
        self
    }

    pub fn with_receiver(mut self, receiver: &str) -> Self {
        self.receiver = Some(receiver.to_string());
        self
    }

    pub fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    pub fn with_timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = Some(timestamp.to_string());
        self
    }

    /// Source id with surrounding whitespace removed; blank ids count as absent
    pub fn source_id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    /// Build a full record, filling every unset field with its placeholder
    pub fn into_record(self, id: String, default_timestamp: impl FnOnce() -> String) -> TransactionRecord {
        TransactionRecord {
            id,
            transaction_type: self.transaction_type.unwrap_or_default(),
            amount: self.amount.unwrap_or(UNDETERMINED_AMOUNT),
            sender: self.sender.unwrap_or_else(|| UNKNOWN_PARTY.to_string()),
            receiver: self.receiver.unwrap_or_else(|| UNKNOWN_PARTY.to_string()),
            timestamp: self.timestamp.unwrap_or_else(default_timestamp),
        }
    }
}

impl From<TransactionRecord> for TransactionInput {
    fn from(record: TransactionRecord) -> Self {
        TransactionInput {
            id: Some(record.id),
            transaction_type: Some(record.transaction_type),
            amount: Some(record.amount),
            sender: Some(record.sender),
            receiver: Some(record.receiver),
            timestamp: Some(record.timestamp),
        }
    }
}

fn coerce_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount >= 0.0 {
        amount
    } else {
        UNDETERMINED_AMOUNT
    }
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let amount = match value {
        Value::Number(n) => n.as_f64().unwrap_or(UNDETERMINED_AMOUNT),
        Value::String(s) => s.trim().replace(',', "").parse().unwrap_or(UNDETERMINED_AMOUNT),
        _ => UNDETERMINED_AMOUNT,
    };
    Ok(Some(coerce_amount(amount)))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let text = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    };
    Ok(Some(text))
}

fn lenient_type<'de, D>(deserializer: D) -> Result<Option<TransactionType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let transaction_type = match value {
        Value::String(s) => TransactionType::parse_lenient(&s),
        _ => TransactionType::Unknown,
    };
    Ok(Some(transaction_type))
}

// ============================================================================
// TESTS
// ============================================================================
