//! Report-facing views of a [`FrequencyTable`].
//!
//! These produce data only, rendering is left to the report layer.

use crate::{classify::TypeTag, frequency::FrequencyTable, value::Value};

/// Top rows of a frequency table plus the aggregate "other" and "missing"
/// rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencySummary {
    /// Most frequent values, at most `max_rows` of them.
    pub rows: Vec<(Value, u64)>,

    /// Summed count of the values not in `rows`.
    pub other_count: u64,

    /// Number of distinct values not in `rows`.
    pub other_distinct: usize,

    /// Observations not accounted for by the table.
    pub missing_count: u64,

    /// Largest count over rows, "other" and "missing", used to scale bars.
    pub max_count: u64,

    /// Whether the "other values" row is worth displaying.
    pub show_other: bool,

    /// Whether the "missing" row is worth displaying.
    pub show_missing: bool,
}

impl FrequencySummary {
    /// Summarize `table` (missing values excluded) of a column with `n_obs`
    /// elements.
    ///
    /// The aggregate rows are only shown when their count exceeds the
    /// largest count that did not make it into `rows`.
    pub fn new(table: &FrequencyTable, n_obs: u64, max_rows: usize) -> Self {
        let max_rows = max_rows.min(usize::try_from(n_obs).unwrap_or(usize::MAX));
        let entries = table.entries();

        let (other_count, first_hidden_count) = match entries.get(max_rows..) {
            Some(hidden @ [(_, first), ..]) => (hidden.iter().map(|(_, c)| c).sum::<u64>(), *first),
            _ => (0, 0),
        };
        let missing_count = n_obs.saturating_sub(table.total_count());
        let max_count = entries
            .first()
            .map(|(_, c)| *c)
            .unwrap_or_default()
            .max(other_count)
            .max(missing_count);

        Self {
            rows: table.head(max_rows).to_vec(),
            other_count,
            other_distinct: entries.len().saturating_sub(max_rows),
            missing_count,
            max_count,
            show_other: other_count > first_hidden_count,
            show_missing: missing_count > first_hidden_count,
        }
    }
}

/// Which end of the value range [`extreme_values`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// The smallest values.
    Ascending,

    /// The largest values.
    Descending,
}

/// The `n` smallest or largest values of `table` with their counts.
///
/// Both ends are returned in ascending value order. Tables mixing element
/// kinds are ordered by the string form of their values.
pub fn extreme_values(table: &FrequencyTable, n: usize, order: Order) -> Vec<(Value, u64)> {
    let mut sorted = table.entries().to_vec();
    if table.inferred_kind(usize::MAX).is_mixed() {
        sorted.sort_by_cached_key(|(value, _)| value.to_string());
    } else {
        sorted.sort_by(|(a, _), (b, _)| a.natural_cmp(b));
    }

    match order {
        Order::Ascending => {
            sorted.truncate(n);
            sorted
        }
        Order::Descending => sorted.split_off(sorted.len().saturating_sub(n)),
    }
}

/// The first `n` values in table order.
pub fn first_values(table: &FrequencyTable, n: usize) -> Vec<Value> {
    table.values().take(n).cloned().collect()
}

/// The last `n` values in table order.
pub fn last_values(table: &FrequencyTable, n: usize) -> Vec<Value> {
    let skip = table.distinct_count().saturating_sub(n);
    table.values().skip(skip).cloned().collect()
}

/// Message attached to a column in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnWarning {
    /// A categorical or boolean column with many distinct values.
    HighCardinality { distinct_count: usize },

    /// The column holds at most one distinct value.
    Constant,

    /// The column could not be classified.
    Unsupported,
}

/// Warnings for a column classified as `tag` with `distinct_count` distinct
/// non-missing values.
pub fn column_warnings(
    tag: TypeTag,
    distinct_count: usize,
    threshold: usize,
) -> Vec<ColumnWarning> {
    match tag {
        TypeTag::Cat | TypeTag::Bool if distinct_count > threshold => {
            vec![ColumnWarning::HighCardinality { distinct_count }]
        }
        TypeTag::Const => vec![ColumnWarning::Constant],
        TypeTag::Unsupported => vec![ColumnWarning::Unsupported],
        _ => vec![],
    }
}
