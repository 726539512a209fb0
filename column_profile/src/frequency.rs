//! Distinct-value frequency tables.

use std::{num::NonZeroUsize, time::Instant};

use arrow::array::Array;
use hashbrown::{hash_map::Entry, HashMap};
use observability_deps::tracing::debug;

use crate::{
    column::{display_name, Column, ExecutionModel},
    value::{visit_values, InferredKind, Value},
    Result, TypeMismatchSnafu,
};

/// How [`compute_frequencies`] builds the table.
///
/// Both strategies produce identical [`FrequencyStats::value_counts`], they
/// differ in cost and in whether the distinct count including missing
/// values is known.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyStrategy {
    /// Count the unfiltered column and a missing-value-free copy separately.
    SplitCounts,

    /// Drop missing values first, then count once.
    #[default]
    DropMissingFirst,
}

impl From<clap_blocks::profiling::FrequencyStrategy> for FrequencyStrategy {
    fn from(strategy: clap_blocks::profiling::FrequencyStrategy) -> Self {
        match strategy {
            clap_blocks::profiling::FrequencyStrategy::SplitCounts => Self::SplitCounts,
            clap_blocks::profiling::FrequencyStrategy::DropMissingFirst => Self::DropMissingFirst,
        }
    }
}

/// Distinct value → number of occurrences.
///
/// Entries are ordered by descending count, ties are broken by the position
/// of the first occurrence of the value in the column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    entries: Vec<(Value, u64)>,
}

impl FrequencyTable {
    /// Count every element of `array`, missing values included.
    pub fn from_array(array: &dyn Array) -> Result<Self> {
        let mut counter = FrequencyCounter::default();
        counter.count_array(array)?;
        Ok(counter.finish())
    }

    /// Number of distinct values, [`Value::Null`] included if present.
    pub fn distinct_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of counted elements.
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, u64)> + '_ {
        self.entries.iter().map(|(value, count)| (value, *count))
    }

    /// Distinct values in table order.
    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.entries.iter().map(|(value, _)| value)
    }

    pub fn get(&self, value: &Value) -> Option<u64> {
        self.entries
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, count)| *count)
    }

    pub fn missing_count(&self) -> u64 {
        self.get(&Value::Null).unwrap_or_default()
    }

    /// Copy of this table without the missing-value group.
    pub fn without_missing(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(value, _)| !value.is_null())
                .cloned()
                .collect(),
        }
    }

    /// The `n` most frequent entries.
    pub fn head(&self, n: usize) -> &[(Value, u64)] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// All entries in table order.
    pub fn entries(&self) -> &[(Value, u64)] {
        &self.entries
    }

    /// Element kind of the `sample` most frequent values.
    pub fn inferred_kind(&self, sample: usize) -> InferredKind {
        InferredKind::infer(self.values().take(sample))
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    count: u64,
    first_seen: usize,
}

/// Incrementally builds a [`FrequencyTable`].
///
/// Counters of consecutive chunks of a column can be [merged](Self::merge),
/// the result is identical to counting the concatenated chunks.
#[derive(Debug, Default)]
pub(crate) struct FrequencyCounter {
    slots: HashMap<Value, Slot>,
    rows: usize,
}

impl FrequencyCounter {
    pub(crate) fn push(&mut self, value: Value) {
        let row = self.rows;
        self.rows += 1;

        match self.slots.entry(value) {
            Entry::Occupied(mut o) => o.get_mut().count += 1,
            Entry::Vacant(v) => {
                v.insert(Slot {
                    count: 1,
                    first_seen: row,
                });
            }
        }
    }

    pub(crate) fn count_array(&mut self, array: &dyn Array) -> Result<()> {
        visit_values(array, &mut |value| self.push(value))
    }

    /// Append the counts of `other`, which covers the rows following the
    /// rows already counted by `self`.
    pub(crate) fn merge(&mut self, other: Self) {
        let offset = self.rows;
        self.rows += other.rows;

        for (value, slot) in other.slots {
            match self.slots.entry(value) {
                Entry::Occupied(mut o) => o.get_mut().count += slot.count,
                Entry::Vacant(v) => {
                    v.insert(Slot {
                        count: slot.count,
                        first_seen: offset + slot.first_seen,
                    });
                }
            }
        }
    }

    pub(crate) fn finish(self) -> FrequencyTable {
        let mut entries: Vec<_> = self.slots.into_iter().collect();
        entries.sort_unstable_by(|(_, a), (_, b)| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.first_seen.cmp(&b.first_seen))
        });

        FrequencyTable {
            entries: entries
                .into_iter()
                .map(|(value, slot)| (value, slot.count))
                .collect(),
        }
    }
}

/// Result of [`compute_frequencies`], memoized per column identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyStats {
    value_counts: FrequencyTable,
    distinct_count_with_missing: Option<usize>,
}

impl FrequencyStats {
    pub fn new(value_counts: FrequencyTable, distinct_count_with_missing: Option<usize>) -> Self {
        Self {
            value_counts,
            distinct_count_with_missing,
        }
    }

    /// Frequencies of the non-missing values.
    pub fn value_counts(&self) -> &FrequencyTable {
        &self.value_counts
    }

    /// Number of distinct non-missing values.
    pub fn distinct_count(&self) -> usize {
        self.value_counts.distinct_count()
    }

    /// Number of distinct values counting "missing" as one more value.
    ///
    /// Only known when computed with [`FrequencyStrategy::SplitCounts`].
    pub fn distinct_count_with_missing(&self) -> Option<usize> {
        self.distinct_count_with_missing
    }
}

/// Build the frequency table of `column`, excluding missing values.
///
/// For [eager](ExecutionModel::Eager) columns this fails with
/// [`Error::TypeMismatch`](crate::Error::TypeMismatch) when the
/// `mixed_type_sample_size` most frequent values have heterogeneous kinds.
/// Lazy columns skip that check.
pub fn compute_frequencies(
    column: &dyn Column,
    strategy: FrequencyStrategy,
    mixed_type_sample_size: NonZeroUsize,
) -> Result<FrequencyStats> {
    let start = Instant::now();

    let stats = match strategy {
        FrequencyStrategy::SplitCounts => {
            let with_missing = column.frequency_count()?;
            let without_missing = column.drop_missing()?.frequency_count()?;
            FrequencyStats::new(without_missing, Some(with_missing.distinct_count()))
        }
        FrequencyStrategy::DropMissingFirst => {
            FrequencyStats::new(column.drop_missing()?.frequency_count()?, None)
        }
    };

    // TODO: lazy columns skip this check, needs a product decision before it is unified
    if column.execution() == ExecutionModel::Eager {
        let sample = mixed_type_sample_size.get();
        if let InferredKind::Mixed(kinds) = stats.value_counts.inferred_kind(sample) {
            return TypeMismatchSnafu {
                sampled: sample.min(stats.distinct_count()),
                kinds: kinds.into_iter().collect::<Vec<_>>(),
            }
            .fail();
        }
    }

    debug!(
        column = display_name(column),
        ?strategy,
        distinct_count = stats.distinct_count(),
        elapsed = ?start.elapsed(),
        "computed frequencies",
    );

    Ok(stats)
}
