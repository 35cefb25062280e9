//! Single-pass scan aggregation: predicate, extractor, accumulator.
//!
//! Rows are visited once in row-key order. A row whose values cannot be
//! interpreted is excluded and counted; only a failure of the store cursor
//! ends the scan.

use std::hash::Hash;

use holo_table::TableStore;
use indexmap::IndexMap;

use crate::error::{RowFault, ScanFailure};
use crate::row::TweetRow;

/// Folds extracted `(key, value)` pairs into a result.
pub trait Accumulator {
    type Key;
    type Value;
    type Output;

    fn accumulate(&mut self, key: Self::Key, value: Self::Value);

    fn finish(self) -> Self::Output;
}

/// Row counters of one scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub rows_scanned: u64,
    pub rows_matched: u64,
    pub rows_malformed: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanOutcome<T> {
    pub output: T,
    pub stats: ScanStats,
}

/// Runs aggregations over one table.
pub struct ScanEngine<'a> {
    store: &'a dyn TableStore,
    table: &'a str,
}

impl<'a> ScanEngine<'a> {
    pub fn new(store: &'a dyn TableStore, table: &'a str) -> Self {
        Self { store, table }
    }

    pub fn table(&self) -> &str {
        self.table
    }

    /// One ordered pass over the rows having cells in `groups`.
    ///
    /// Rows failing `predicate` are dropped before extraction. A [`RowFault`]
    /// from either closure excludes that row only. The cursor is released on
    /// every return path.
    pub fn run<P, E, A>(
        &self,
        groups: &[&str],
        mut predicate: P,
        mut extract: E,
        mut accumulator: A,
    ) -> Result<ScanOutcome<A::Output>, ScanFailure>
    where
        P: FnMut(&TweetRow) -> Result<bool, RowFault>,
        E: FnMut(&TweetRow) -> Result<(A::Key, A::Value), RowFault>,
        A: Accumulator,
    {
        let mut stats = ScanStats::default();
        let scanner = self.store.scan(self.table, groups).map_err(|source| ScanFailure {
            table: self.table.to_string(),
            rows_processed: 0,
            source,
        })?;

        for row in scanner {
            let row = row.map_err(|source| ScanFailure {
                table: self.table.to_string(),
                rows_processed: stats.rows_scanned,
                source,
            })?;
            stats.rows_scanned += 1;
            let row = TweetRow::new(row);

            let visited = predicate(&row).and_then(|keep| {
                if keep {
                    extract(&row).map(Some)
                } else {
                    Ok(None)
                }
            });
            match visited {
                Ok(Some((key, value))) => {
                    stats.rows_matched += 1;
                    accumulator.accumulate(key, value);
                }
                Ok(None) => {}
                Err(fault) => {
                    stats.rows_malformed += 1;
                    tracing::debug!(row_key = %row.key(), error = %fault, "row excluded");
                }
            }
        }

        tracing::debug!(
            table = self.table,
            scanned = stats.rows_scanned,
            matched = stats.rows_matched,
            malformed = stats.rows_malformed,
            "scan finished"
        );
        Ok(ScanOutcome {
            output: accumulator.finish(),
            stats,
        })
    }
}

/// Counter per group key. Finishes sorted by descending count, ties in
/// first-seen order.
#[derive(Debug)]
pub struct CountByGroup<K> {
    counts: IndexMap<K, u64>,
}

impl<K: Hash + Eq> Default for CountByGroup<K> {
    fn default() -> Self {
        Self {
            counts: IndexMap::new(),
        }
    }
}

impl<K: Hash + Eq> Accumulator for CountByGroup<K> {
    type Key = K;
    type Value = ();
    type Output = Vec<(K, u64)>;

    fn accumulate(&mut self, key: K, _value: ()) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    fn finish(self) -> Vec<(K, u64)> {
        let mut counts: Vec<_> = self.counts.into_iter().collect();
        // Stable sort keeps first-seen order among equal counts.
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }
}

/// Every extracted value, in scan order.
#[derive(Debug)]
pub struct CollectValues<V> {
    values: Vec<V>,
}

impl<V> Default for CollectValues<V> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<V> Accumulator for CollectValues<V> {
    type Key = ();
    type Value = V;
    type Output = Vec<V>;

    fn accumulate(&mut self, _key: (), value: V) {
        self.values.push(value);
    }

    fn finish(self) -> Vec<V> {
        self.values
    }
}

/// Deduplicates by key, keeping the value of the first encounter. Finishes
/// in first-seen order.
#[derive(Debug)]
pub struct FirstSeen<K, V> {
    entries: IndexMap<K, V>,
}

impl<K: Hash + Eq, V> Default for FirstSeen<K, V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<K: Hash + Eq, V> Accumulator for FirstSeen<K, V> {
    type Key = K;
    type Value = V;
    type Output = Vec<(K, V)>;

    fn accumulate(&mut self, key: K, value: V) {
        self.entries.entry(key).or_insert(value);
    }

    fn finish(self) -> Vec<(K, V)> {
        self.entries.into_iter().collect()
    }
}
