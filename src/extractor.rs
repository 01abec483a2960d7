// 🔎 Extractor - SMS body → TransactionRecord
// Heuristic field extraction. Never fails: every miss degrades to a placeholder.

use crate::config::ExtractorConfig;
use crate::parser::RawMessage;
use crate::rules::RuleEngine;
use crate::transaction::{TransactionInput, TransactionType, UNKNOWN_PARTY};
use anyhow::{Context, Result};
use chrono::{SecondsFormat, TimeZone, Utc};
use regex::Regex;
use tracing::debug;

/// Thousands-separated decimal ("10,900", "1,000.50") or a plain number ("2000")
const NUMBER_PATTERN: &str = r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?";

pub struct Extractor {
    rules: RuleEngine,
    currency_marker: Regex,
    marked_amount: Regex,
    bare_amount: Regex,
    sender: Regex,
    receiver: Regex,
}

impl Extractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let rules = match &config.rules_path {
            Some(path) => RuleEngine::from_file(path)?,
            None => RuleEngine::standard(),
        };
        Extractor::with_rules(&config.currency_markers, rules)
    }

    pub fn with_rules(currency_markers: &[String], rules: RuleEngine) -> Result<Self> {
        let markers: Vec<String> = currency_markers
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(regex::escape)
            .collect();
        if markers.is_empty() {
            anyhow::bail!("At least one currency marker is required");
        }
        let markers = markers.join("|");

        Ok(Extractor {
            rules,
            currency_marker: Regex::new(&format!(r"(?i)(?:{})", markers))
                .context("Invalid currency marker pattern")?,
            marked_amount: Regex::new(&format!(
                r"(?i)\b(?P<amount>{})\s*(?:{})",
                NUMBER_PATTERN, markers
            ))
            .context("Invalid amount pattern")?,
            bare_amount: Regex::new(&format!(r"\b(?P<amount>{})", NUMBER_PATTERN))
                .context("Invalid amount pattern")?,
            sender: Regex::new(r"\bfrom\s+(?P<party>\S+)").context("Invalid sender pattern")?,
            receiver: Regex::new(r"\bto\s+(?P<party>\S+)").context("Invalid receiver pattern")?,
        })
    }

    /// Extract a transaction from one SMS. `None` means the message carries no
    /// currency marker and is not financial traffic.
    pub fn extract(&self, message: &RawMessage) -> Option<TransactionInput> {
        if !self.is_financial(&message.body) {
            debug!(address = %message.address, "skipping non-financial sms");
            return None;
        }

        let transaction_type = self.classify(&message.body);
        let mut input = TransactionInput {
            id: message.source_id.clone(),
            transaction_type: Some(transaction_type),
            amount: None,
            sender: Some(self.extract_sender(&message.body)),
            receiver: Some(self.extract_receiver(&message.body)),
            timestamp: Some(convert_timestamp(&message.date)),
        };
        if let Some(amount) = self.extract_amount(&message.body) {
            input = input.with_amount(amount);
        }

        Some(input)
    }

    /// Run the extractor over a whole corpus, dropping non-financial messages
    pub fn extract_all(&self, messages: &[RawMessage]) -> Vec<TransactionInput> {
        let extracted: Vec<TransactionInput> =
            messages.iter().filter_map(|m| self.extract(m)).collect();
        debug!(
            total = messages.len(),
            kept = extracted.len(),
            "extraction finished"
        );
        extracted
    }

    pub fn is_financial(&self, body: &str) -> bool {
        self.currency_marker.is_match(body)
    }

    pub fn classify(&self, body: &str) -> TransactionType {
        self.rules.classify(body).transaction_type
    }

    /// First amount followed by a currency marker, else the first bare number.
    /// Separators are stripped before parsing.
    pub fn extract_amount(&self, body: &str) -> Option<f64> {
        let token = self
            .marked_amount
            .captures(body)
            .or_else(|| self.bare_amount.captures(body))?
            .name("amount")?
            .as_str()
            .replace(',', "");

        token.parse::<f64>().ok().filter(|a| a.is_finite())
    }

    pub fn extract_sender(&self, body: &str) -> String {
        let text = body.to_lowercase();
        match next_token(&self.sender, &text) {
            Some(party) => party,
            None if text.contains("you ") => "You".to_string(),
            None => UNKNOWN_PARTY.to_string(),
        }
    }

    pub fn extract_receiver(&self, body: &str) -> String {
        let text = body.to_lowercase();
        next_token(&self.receiver, &text).unwrap_or_else(|| UNKNOWN_PARTY.to_string())
    }
}

fn next_token(pattern: &Regex, text: &str) -> Option<String> {
    let token = pattern
        .captures(text)?
        .name("party")?
        .as_str()
        .trim_end_matches(|c: char| matches!(c, ',' | '.' | ';' | ':'));

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Epoch milliseconds → RFC 3339 (UTC). Non-numeric or out-of-range input is
/// returned unchanged.
pub fn convert_timestamp(raw: &str) -> String {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| raw.to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new(&ExtractorConfig::default()).unwrap()
    }

    fn sms(body: &str, date: &str) -> RawMessage {
        RawMessage {
            address: "M-Money".to_string(),
            body: body.to_string(),
            date: date.to_string(),
            kind: "1".to_string(),
            source_id: None,
        }
    }

    #[test]
    fn test_non_financial_sms_is_dropped() {
        let ex = extractor();

        assert!(ex.extract(&sms("Your bundle expires tomorrow. Dial *345#", "1")).is_none());
        assert!(ex.extract(&sms("", "1")).is_none());
    }

    #[test]
    fn test_amount_strips_separators() {
        let ex = extractor();

        assert_eq!(ex.extract_amount("You have received 10,900 RWF from Bob"), Some(10900.0));
        assert_eq!(ex.extract_amount("Payment of 1,234,567.50 RWF"), Some(1234567.5));
        assert_eq!(ex.extract_amount("2000 RWF sent"), Some(2000.0));
    }

    #[test]
    fn test_amount_prefers_currency_marked_number() {
        let ex = extractor();
        let body = "TxId: 73214484437. Your payment of 1,500 RWF to Jane 12845 has been completed.";

        assert_eq!(ex.extract_amount(body), Some(1500.0));
    }

    #[test]
    fn test_amount_falls_back_to_first_number() {
        let ex = extractor();

        assert_eq!(ex.extract_amount("RWF balance: 3,200 after fee 20"), Some(3200.0));
        assert_eq!(ex.extract_amount("no digits here RWF"), None);
    }

    #[test]
    fn test_missing_amount_defaults_to_sentinel() {
        let ex = extractor();
        let input = ex.extract(&sms("RWF notice: check your balance", "1")).unwrap();
        let record = input.into_record("1".to_string(), String::new);

        assert_eq!(record.amount, 0.0);
        assert!(!record.has_amount());
    }

    #[test]
    fn test_sender_and_receiver_tokens() {
        let ex = extractor();

        assert_eq!(ex.extract_sender("You have received 2,000 RWF from Alice (*1)"), "alice");
        assert_eq!(ex.extract_receiver("10,000 RWF transferred to Jane, fee 100"), "jane");
        assert_eq!(ex.extract_receiver("You have received 2,000 RWF"), "Unknown");
        assert_eq!(ex.extract_sender("You have sent 2,000 RWF"), "You");
        assert_eq!(ex.extract_sender("Balance 2,000 RWF"), "Unknown");
    }

    #[test]
    fn test_to_requires_word_boundary() {
        let ex = extractor();

        assert_eq!(ex.extract_receiver("Your total is 500 RWF"), "Unknown");
    }

    #[test]
    fn test_timestamp_conversion() {
        assert_eq!(convert_timestamp("1715000000000"), "2024-05-06T12:53:20Z");
        assert_eq!(convert_timestamp("yesterday"), "yesterday");
        assert_eq!(convert_timestamp(""), "");
        assert_eq!(convert_timestamp("9223372036854775807"), "9223372036854775807");
    }

    #[test]
    fn test_classification_order_through_extractor() {
        let ex = extractor();

        assert_eq!(
            ex.classify("You have received 500 RWF. You sent 100 RWF earlier."),
            TransactionType::Received
        );
        assert_eq!(ex.classify("Account notice 500 RWF"), TransactionType::Unknown);
    }

    #[test]
    fn test_received_message_end_to_end() {
        let ex = extractor();
        let message = sms(
            "You have received 2,000 RWF from Alice (*********1)",
            "1715000000000",
        );

        let input = ex.extract(&message).unwrap();
        let record = input.into_record("1".to_string(), String::new);

        assert_eq!(record.transaction_type, TransactionType::Received);
        assert_eq!(record.amount, 2000.0);
        assert_eq!(record.sender, "alice");
        assert_eq!(record.receiver, "Unknown");
        assert_eq!(record.timestamp, "2024-05-06T12:53:20Z");
    }

    #[test]
    fn test_source_id_is_carried() {
        let ex = extractor();
        let mut message = sms("You have received 10 RWF from Bob", "1");
        message.source_id = Some("42".to_string());

        assert_eq!(ex.extract(&message).unwrap().id, Some("42".to_string()));
    }

    #[test]
    fn test_custom_currency_markers() {
        let ex = Extractor::with_rules(&["UGX".to_string()], RuleEngine::standard()).unwrap();

        assert!(ex.is_financial("You have received 5,000 UGX"));
        assert!(!ex.is_financial("You have received 5,000 RWF"));
        assert!(Extractor::with_rules(&[], RuleEngine::standard()).is_err());
    }

    #[test]
    fn test_rules_loaded_from_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "airtime", "keywords": ["Airtime"], "transaction_type": "payment"},
                {"id": "received", "keywords": ["received"], "transaction_type": "received"}
            ]"#,
        )
        .unwrap();

        let config = ExtractorConfig {
            rules_path: Some(path),
            ..Default::default()
        };
        let ex = Extractor::new(&config).unwrap();

        let input = ex
            .extract(&sms("You have received 500 RWF of airtime", "1"))
            .unwrap();
        assert_eq!(input.transaction_type, Some(TransactionType::Payment));

        let input = ex.extract(&sms("2,000 RWF deposited", "1")).unwrap();
        assert_eq!(input.transaction_type, Some(TransactionType::Unknown));
    }

    #[test]
    fn test_missing_rules_file_is_an_error() {
        let config = ExtractorConfig {
            rules_path: Some("/nonexistent/rules.json".into()),
            ..Default::default()
        };
        assert!(Extractor::new(&config).is_err());
    }
}
