// ⏱️ Lookup Comparison
// Times the O(n) linear scan against the O(1) index lookup on a live store

use crate::error::StoreResult;
use crate::store::TransactionStore;
use crate::transaction::{TransactionInput, TransactionType};
use serde::Serialize;
use std::hint::black_box;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct LookupTiming {
    pub id: String,
    pub linear_scan: Duration,
    pub indexed_lookup: Duration,
    /// Both paths returned the same record
    pub agreed: bool,
}

impl LookupTiming {
    pub fn speedup(&self) -> f64 {
        ratio(self.linear_scan, self.indexed_lookup)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupReport {
    pub store_size: usize,
    pub repeats: u32,
    pub timings: Vec<LookupTiming>,
}

impl LookupReport {
    pub fn mean_linear(&self) -> Duration {
        mean(self.timings.iter().map(|t| t.linear_scan))
    }

    pub fn mean_indexed(&self) -> Duration {
        mean(self.timings.iter().map(|t| t.indexed_lookup))
    }

    pub fn speedup(&self) -> f64 {
        ratio(self.mean_linear(), self.mean_indexed())
    }

    pub fn all_agreed(&self) -> bool {
        self.timings.iter().all(|t| t.agreed)
    }
}

/// Create placeholder records until the store holds `minimum` of them
pub fn pad_store(store: &mut TransactionStore, minimum: usize) -> StoreResult<usize> {
    let mut created = 0;
    while store.len() < minimum {
        store.create(
            TransactionInput::default()
                .with_type(TransactionType::Unknown)
                .with_amount((created + 1) as f64)
                .with_sender("A")
                .with_receiver("B"),
        )?;
        created += 1;
    }
    Ok(created)
}

/// Average each lookup path over `repeats` calls for the first `sample` ids
pub fn compare_lookups(store: &TransactionStore, sample: usize, repeats: u32) -> LookupReport {
    let repeats = repeats.max(1);
    let ids: Vec<String> = store
        .list()
        .into_iter()
        .take(sample)
        .map(|record| record.id)
        .collect();

    let timings = ids
        .into_iter()
        .map(|id| {
            let agreed = store.linear_scan(&id) == store.indexed_lookup(&id);
            LookupTiming {
                linear_scan: time_average(repeats, || store.linear_scan(&id).is_some()),
                indexed_lookup: time_average(repeats, || store.indexed_lookup(&id).is_some()),
                agreed,
                id,
            }
        })
        .collect();

    LookupReport {
        store_size: store.len(),
        repeats,
        timings,
    }
}

fn time_average(repeats: u32, mut lookup: impl FnMut() -> bool) -> Duration {
    let start = Instant::now();
    for _ in 0..repeats {
        black_box(lookup());
    }
    start.elapsed() / repeats
}

fn mean(durations: impl Iterator<Item = Duration>) -> Duration {
    let (sum, count) = durations.fold((Duration::ZERO, 0u32), |(sum, n), d| (sum + d, n + 1));
    if count == 0 {
        Duration::ZERO
    } else {
        sum / count
    }
}

fn ratio(slow: Duration, fast: Duration) -> f64 {
    if fast.is_zero() {
        f64::INFINITY
    } else {
        slow.as_secs_f64() / fast.as_secs_f64()
    }
}
