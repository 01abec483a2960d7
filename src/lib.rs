// MoMo SMS Ledger - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod config;
pub mod error;
pub mod transaction;
pub mod parser;
pub mod rules;
pub mod extractor;
pub mod store;
pub mod pipeline;
pub mod benchmark;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{AppConfig, AuthConfig, DataConfig, ExtractorConfig, ServerConfig};
pub use error::{StoreError, StoreResult};
pub use transaction::{
    TransactionInput, TransactionRecord, TransactionType, UNDETERMINED_AMOUNT, UNKNOWN_PARTY,
};
pub use parser::{parse_sms_file, parse_sms_str, RawMessage};
pub use rules::{ClassificationResult, ClassificationRule, RuleEngine};
pub use extractor::{convert_timestamp, Extractor};
pub use store::{TransactionFilter, TransactionStats, TransactionStore};
pub use pipeline::{ingest_xml, load_store};
pub use benchmark::{compare_lookups, pad_store, LookupReport, LookupTiming};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
