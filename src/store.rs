// 🗄️ Transaction Store
// In-memory CRUD over normalized records: an ordered Vec plus an id → position
// index, kept in lockstep by every mutating operation

use crate::error::{StoreError, StoreResult};
use crate::transaction::{TransactionInput, TransactionRecord, TransactionType};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct TransactionStore {
    records: Vec<TransactionRecord>,
    index: HashMap<String, usize>,
    /// Next allocator value; only ever grows between bulk loads
    next_id: u64,
}

impl TransactionStore {
    pub fn new() -> Self {
        TransactionStore {
            records: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
        }
    }

    // ========================================================================
    // BULK LOAD
    // ========================================================================

    /// Replace the whole collection.
    ///
    /// Blank or missing ids are allocated after `max(numeric source ids)`.
    /// Duplicate source ids fail the load and leave the store untouched.
    /// Loading the same input twice yields the same state.
    pub fn bulk_load<I>(&mut self, inputs: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = TransactionInput>,
    {
        let inputs: Vec<TransactionInput> = inputs.into_iter().collect();

        let mut next_id = inputs
            .iter()
            .filter_map(|input| input.source_id())
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .map_or(1, |max| max.saturating_add(1));

        let mut records = Vec::with_capacity(inputs.len());
        let mut index = HashMap::with_capacity(inputs.len());

        for input in inputs {
            let id = match input.source_id() {
                Some(id) => id.to_string(),
                None => allocate(&mut next_id, &index)?,
            };
            if index.contains_key(&id) {
                return Err(StoreError::DuplicateId(id));
            }

            index.insert(id.clone(), records.len());
            records.push(input.into_record(id, String::new));
        }

        self.records = records;
        self.index = index;
        self.next_id = next_id;

        info!(count = self.records.len(), next_id = self.next_id, "store loaded");
        Ok(self.records.len())
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Copy of every record in insertion order
    pub fn list(&self) -> Vec<TransactionRecord> {
        self.records.clone()
    }

    pub fn get(&self, id: &str) -> Option<TransactionRecord> {
        self.indexed_lookup(id).cloned()
    }

    /// Always allocates a fresh id; any id in `input` is ignored
    pub fn create(&mut self, input: TransactionInput) -> StoreResult<TransactionRecord> {
        let id = allocate(&mut self.next_id, &self.index)?;
        let record = input.into_record(id, now_iso);

        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record.clone());

        debug!(id = %record.id, "transaction created");
        Ok(record)
    }

    /// Merge the fields present in `input`; `None` when `id` is absent
    pub fn update(&mut self, id: &str, input: &TransactionInput) -> Option<TransactionRecord> {
        let position = *self.index.get(id)?;
        let record = self.records.get_mut(position)?;
        record.apply(input);

        debug!(id, "transaction updated");
        Some(record.clone())
    }

    /// `false` when `id` is absent
    pub fn delete(&mut self, id: &str) -> bool {
        let Some(position) = self.index.remove(id) else {
            return false;
        };
        self.records.remove(position);

        // Everything after the removed slot shifted left by one
        for (offset, record) in self.records[position..].iter().enumerate() {
            if let Some(slot) = self.index.get_mut(&record.id) {
                *slot = position + offset;
            }
        }

        debug!(id, "transaction deleted");
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // ========================================================================
    // LOOKUP PATHS (compared by the benchmark)
    // ========================================================================

    /// O(n) scan of the ordered sequence
    pub fn linear_scan(&self, id: &str) -> Option<&TransactionRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// O(1) lookup through the id index
    pub fn indexed_lookup(&self, id: &str) -> Option<&TransactionRecord> {
        self.index.get(id).and_then(|&position| self.records.get(position))
    }

    /// Sequence and index describe exactly the same records
    pub fn is_consistent(&self) -> bool {
        self.records.len() == self.index.len()
            && self
                .records
                .iter()
                .enumerate()
                .all(|(position, record)| self.index.get(&record.id) == Some(&position))
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn search(&self, filter: &TransactionFilter) -> Vec<TransactionRecord> {
        self.records
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> TransactionStats {
        let total = self.records.len();
        let total_amount: f64 = self.records.iter().map(|r| r.amount).sum();
        let avg_amount = if total == 0 {
            0.0
        } else {
            (total_amount / total as f64 * 100.0).round() / 100.0
        };

        let mut by_type = BTreeMap::new();
        for record in &self.records {
            *by_type
                .entry(record.transaction_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        TransactionStats {
            total,
            total_amount,
            avg_amount,
            undetermined_amounts: self.records.iter().filter(|r| !r.has_amount()).count(),
            by_type,
        }
    }

    // ========================================================================
    // SNAPSHOTS & EXPORT
    // ========================================================================

    /// Write the ordered records as a JSON array
    pub fn export_json(&self, path: &Path) -> StoreResult<()> {
        let write = || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &self.records)?;
            Ok(())
        };
        write().map_err(|source| StoreError::Export {
            path: path.to_path_buf(),
            source,
        })?;

        info!(count = self.records.len(), path = %path.display(), "snapshot written");
        Ok(())
    }

    /// Replace the collection with the contents of a JSON snapshot
    pub fn load_snapshot(&mut self, path: &Path) -> StoreResult<usize> {
        let content = fs::read_to_string(path).map_err(|source| StoreError::SnapshotRead {
            path: path.to_path_buf(),
            source,
        })?;
        let inputs: Vec<TransactionInput> =
            serde_json::from_str(&content).map_err(|source| StoreError::SnapshotFormat {
                path: path.to_path_buf(),
                source,
            })?;

        self.bulk_load(inputs)
    }

    pub fn from_snapshot(path: &Path) -> StoreResult<Self> {
        let mut store = TransactionStore::new();
        store.load_snapshot(path)?;
        Ok(store)
    }

    /// Flat CSV of the six record fields
    pub fn export_csv(&self, path: &Path) -> StoreResult<()> {
        let write = || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let mut writer = csv::Writer::from_path(path)?;
            for record in &self.records {
                writer.serialize(record)?;
            }
            writer.flush()?;
            Ok(())
        };
        write().map_err(|source| StoreError::Export {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for TransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `u64::MAX` is never handed out; once `next_id` reaches it the id space is spent
fn allocate(next_id: &mut u64, taken: &HashMap<String, usize>) -> StoreResult<String> {
    loop {
        let current = *next_id;
        *next_id = current.checked_add(1).ok_or(StoreError::IdSpaceExhausted)?;
        let candidate = current.to_string();
        if !taken.contains_key(&candidate) {
            return Ok(candidate);
        }
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ============================================================================
// FILTER & STATS
// ============================================================================

/// Search criteria; unset fields match everything
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub amount_min: Option<f64>,
    pub amount_max: Option<f64>,
    /// Matched case-insensitively; unrecognised names select `unknown`
    #[serde(default, deserialize_with = "lenient_filter_type")]
    pub transaction_type: Option<TransactionType>,
    /// Case-insensitive substring
    pub sender: Option<String>,
    /// Case-insensitive substring
    pub receiver: Option<String>,
}

fn lenient_filter_type<'de, D>(deserializer: D) -> Result<Option<TransactionType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|name| TransactionType::parse_lenient(name.trim())))
}

impl TransactionFilter {
    pub fn is_empty(&self) -> bool {
        self.amount_min.is_none()
            && self.amount_max.is_none()
            && self.transaction_type.is_none()
            && self.sender.is_none()
            && self.receiver.is_none()
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        let contains = |haystack: &str, needle: &Option<String>| {
            needle
                .as_ref()
                .map_or(true, |n| haystack.to_lowercase().contains(&n.to_lowercase()))
        };

        self.amount_min.map_or(true, |min| record.amount >= min)
            && self.amount_max.map_or(true, |max| record.amount <= max)
            && self
                .transaction_type
                .map_or(true, |t| record.transaction_type == t)
            && contains(&record.sender, &self.sender)
            && contains(&record.receiver, &self.receiver)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionStats {
    pub total: usize,
    pub total_amount: f64,
    pub avg_amount: f64,
    /// Records still carrying the "amount not determined" sentinel
    pub undetermined_amounts: usize,
    pub by_type: BTreeMap<String, usize>,
}

impl TransactionStats {
    pub fn determined_amounts(&self) -> usize {
        self.total - self.undetermined_amounts
    }
}

// ============================================================================
// TESTS
// ============================================================================
