// 🔄 Load Pipeline
// SMS export → Extractor → TransactionStore, with an optional JSON snapshot cache

use crate::config::DataConfig;
use crate::extractor::Extractor;
use crate::parser::parse_sms_file;
use crate::store::TransactionStore;
use crate::transaction::TransactionInput;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Parse an SMS export and keep only the financial messages
pub fn ingest_xml(path: &Path, extractor: &Extractor) -> Result<Vec<TransactionInput>> {
    let messages = parse_sms_file(path)?;
    let inputs = extractor.extract_all(&messages);

    info!(
        messages = messages.len(),
        transactions = inputs.len(),
        "ingested {}",
        path.display()
    );
    Ok(inputs)
}

/// Build the process-wide store.
///
/// An existing snapshot wins over the XML export. Any read or parse failure is
/// returned as-is; there is no fallback to a partial or empty store.
pub fn load_store(config: &DataConfig, extractor: &Extractor) -> Result<TransactionStore> {
    if let Some(snapshot) = &config.snapshot_path {
        if snapshot.exists() {
            let store = TransactionStore::from_snapshot(snapshot)?;
            info!(count = store.len(), "loaded snapshot {}", snapshot.display());
            return Ok(store);
        }
    }

    let inputs = ingest_xml(&config.xml_path, extractor)?;
    let mut store = TransactionStore::new();
    store
        .bulk_load(inputs)
        .with_context(|| format!("Failed to load {}", config.xml_path.display()))?;

    if config.cache_snapshot {
        if let Some(snapshot) = &config.snapshot_path {
            store.export_json(snapshot)?;
        }
    }

    Ok(store)
}
