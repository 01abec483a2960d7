// 🏷️ Classification Rules - Rules as Data
// Ordered keyword → transaction type table. First matching rule wins.

use crate::transaction::TransactionType;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Rule ID for tracking
    pub id: String,

    /// Keywords searched in the lowercased body (any one matches)
    pub keywords: Vec<String>,

    /// Type assigned when the rule matches
    pub transaction_type: TransactionType,

    /// Description/notes about this rule
    #[serde(default)]
    pub description: Option<String>,
}

impl ClassificationRule {
    pub fn new(id: &str, keywords: &[&str], transaction_type: TransactionType) -> Self {
        ClassificationRule {
            id: id.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            transaction_type,
            description: None,
        }
    }

    /// `text` must already be lowercased
    pub fn matches(&self, text: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && text.contains(keyword.as_str()))
    }
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub transaction_type: TransactionType,
    pub rule_id: Option<String>,
}

impl Default for ClassificationResult {
    fn default() -> Self {
        ClassificationResult {
            transaction_type: TransactionType::Unknown,
            rule_id: None,
        }
    }
}

// ============================================================================
// RULE ENGINE
// ============================================================================

/// Rules are evaluated in table order. Keyword sets overlap ("payment" bodies
/// often say "sent" too), so the order is part of the contract.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<ClassificationRule>,
}

impl RuleEngine {
    /// received → withdraw → deposit → transferred/payment/sent
    pub fn standard() -> Self {
        RuleEngine::from_rules(vec![
            ClassificationRule::new("received", &["received"], TransactionType::Received),
            ClassificationRule::new("withdrawal", &["withdraw"], TransactionType::Withdrawal),
            ClassificationRule::new("deposit", &["deposit"], TransactionType::Deposit),
            ClassificationRule::new(
                "sent",
                &["transferred", "payment", "sent"],
                TransactionType::Sent,
            ),
        ])
    }

    /// Load an ordered rule table from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let rules: Vec<ClassificationRule> =
            serde_json::from_str(&content).context("Failed to parse rules JSON")?;

        Ok(RuleEngine::from_rules(rules))
    }

    /// Create engine from a list of rules, keeping their order
    pub fn from_rules(rules: Vec<ClassificationRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|mut rule| {
                rule.keywords = rule.keywords.iter().map(|k| k.to_lowercase()).collect();
                rule
            })
            .collect();
        RuleEngine { rules }
    }

    /// Append a rule after the existing ones (lowest precedence)
    pub fn add_rule(&mut self, rule: ClassificationRule) {
        self.rules.extend(RuleEngine::from_rules(vec![rule]).rules);
    }

    pub fn classify(&self, body: &str) -> ClassificationResult {
        let text = body.to_lowercase();

        for rule in &self.rules {
            if rule.matches(&text) {
                return ClassificationResult {
                    transaction_type: rule.transaction_type,
                    rule_id: Some(rule.id.clone()),
                };
            }
        }

        ClassificationResult::default()
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// TESTS
// ============================================================================
