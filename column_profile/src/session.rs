//! Profiling session: the explicit context threaded through every profiling
//! call.

use std::{num::NonZeroUsize, sync::Arc, time::Instant};

use clap_blocks::profiling::ProfilingConfig;
use observability_deps::tracing::{debug, info, warn};

use crate::{
    cache::{hook::Hook, CacheKind, CacheLookup, ProfileCache},
    classify::{infer_type_tag, TypeTag},
    column::{display_name, Column, ColumnId},
    frequency::{compute_frequencies, FrequencyStats, FrequencyStrategy},
    summary::{column_warnings, extreme_values, ColumnWarning, FrequencySummary, Order},
    value::Value,
    Result,
};

/// Tunables of a [`ProfileSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub frequency_strategy: FrequencyStrategy,

    /// Number of most frequent values inspected for mixed element kinds.
    pub mixed_type_sample_size: NonZeroUsize,

    /// Categorical and boolean columns with more distinct values are flagged.
    pub high_cardinality_threshold: usize,

    /// Rows of a [`FrequencySummary`].
    pub frequency_table_rows: usize,

    /// Rows of each [extreme value](extreme_values) table.
    pub extreme_value_rows: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frequency_strategy: FrequencyStrategy::default(),
            mixed_type_sample_size: NonZeroUsize::MIN.saturating_add(49),
            high_cardinality_threshold: 50,
            frequency_table_rows: 10,
            extreme_value_rows: 5,
        }
    }
}

impl From<&ProfilingConfig> for SessionConfig {
    fn from(config: &ProfilingConfig) -> Self {
        Self {
            frequency_strategy: config.frequency_strategy.into(),
            mixed_type_sample_size: config.mixed_type_sample_size,
            high_cardinality_threshold: config.high_cardinality_threshold,
            frequency_table_rows: config.frequency_table_rows,
            extreme_value_rows: config.extreme_value_rows,
        }
    }
}

/// State of one profiling run.
///
/// Frequency statistics and type tags are memoized per column identity for
/// the lifetime of the session or until [`reset`](Self::reset). Sessions are
/// independent of each other and may be shared between threads.
#[derive(Debug, Default)]
pub struct ProfileSession {
    config: SessionConfig,
    cache: ProfileCache,
}

impl ProfileSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            cache: ProfileCache::new(),
        }
    }

    pub fn new_with_hook(config: SessionConfig, hook: Arc<dyn Hook>) -> Self {
        Self {
            config,
            cache: ProfileCache::new_with_hook(hook),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn cache(&self) -> &ProfileCache {
        &self.cache
    }

    /// Frequency statistics of `column`, missing values excluded.
    ///
    /// Memoized by column identity, columns without identity are recomputed
    /// on every call. Errors are not cached.
    pub fn compute(&self, column: &dyn Column) -> Result<Arc<FrequencyStats>> {
        let Some(id) = column.identity() else {
            return self.compute_uncached(column).map(Arc::new);
        };

        let generation = match self.cache.get_frequencies(id) {
            CacheLookup::Hit(stats) => return Ok(stats),
            CacheLookup::Miss { generation } => generation,
        };

        let stats = Arc::new(self.compute_uncached(column)?);
        self.cache
            .insert_frequencies(id, generation, Arc::clone(&stats));
        Ok(stats)
    }

    fn compute_uncached(&self, column: &dyn Column) -> Result<FrequencyStats> {
        compute_frequencies(
            column,
            self.config.frequency_strategy,
            self.config.mixed_type_sample_size,
        )
    }

    /// Classify `column`, surfacing the cause of an [`TypeTag::Unsupported`]
    /// result.
    ///
    /// `distinct_count` is the number of distinct non-missing values if the
    /// caller already knows it, otherwise it is derived through
    /// [`compute`](Self::compute).
    ///
    /// A failed classification is memoized as [`TypeTag::Unsupported`], the
    /// error is only returned by the call that computed it.
    pub fn try_classify(
        &self,
        column: &dyn Column,
        distinct_count: Option<usize>,
    ) -> Result<TypeTag> {
        let generation = match column.identity().map(|id| self.cache.get_type_tag(id)) {
            Some(CacheLookup::Hit(tag)) => return Ok(tag),
            Some(CacheLookup::Miss { generation }) => Some(generation),
            None => None,
        };

        let start = Instant::now();
        let res = match distinct_count {
            Some(distinct_count) => infer_type_tag(column, distinct_count),
            None => self
                .compute(column)
                .and_then(|stats| infer_type_tag(column, stats.distinct_count())),
        };

        if let (Some(id), Some(generation)) = (column.identity(), generation) {
            let tag = res.as_ref().copied().unwrap_or(TypeTag::Unsupported);
            self.cache.insert_type_tag(id, generation, tag);
        }

        debug!(
            column = display_name(column),
            tag = ?res.as_ref().ok(),
            elapsed = ?start.elapsed(),
            "classified column",
        );

        res
    }

    /// Classify `column`.
    ///
    /// Never fails: any error raised while classifying turns the column
    /// [`TypeTag::Unsupported`], so that one bad column does not abort a
    /// whole report.
    pub fn classify(&self, column: &dyn Column, distinct_count: Option<usize>) -> TypeTag {
        match self.try_classify(column, distinct_count) {
            Ok(tag) => tag,
            Err(e) => {
                warn!(
                    column = display_name(column),
                    %e,
                    "cannot classify column, marking it as unsupported",
                );
                TypeTag::Unsupported
            }
        }
    }

    /// Drop every memoized frequency table and type tag.
    pub fn reset(&self) {
        let evicted = self.cache.reset();
        info!(evicted, "profile session reset");
    }

    pub fn is_classified(&self, id: &ColumnId) -> bool {
        self.cache.contains(CacheKind::TypeTag, id)
    }

    pub fn has_frequencies(&self, id: &ColumnId) -> bool {
        self.cache.contains(CacheKind::Frequencies, id)
    }

    /// Frequency table summary of `column` sized by
    /// [`SessionConfig::frequency_table_rows`].
    pub fn frequency_summary(&self, column: &dyn Column) -> Result<FrequencySummary> {
        let stats = self.compute(column)?;
        let n_obs = column.len()? as u64;

        Ok(FrequencySummary::new(
            stats.value_counts(),
            n_obs,
            self.config.frequency_table_rows,
        ))
    }

    /// Smallest or largest values of `column` with their counts, sized by
    /// [`SessionConfig::extreme_value_rows`].
    pub fn extreme_values(&self, column: &dyn Column, order: Order) -> Result<Vec<(Value, u64)>> {
        let stats = self.compute(column)?;

        Ok(extreme_values(
            stats.value_counts(),
            self.config.extreme_value_rows,
            order,
        ))
    }

    /// Report warnings for `column`, classifying it if needed.
    pub fn column_warnings(&self, column: &dyn Column) -> Vec<ColumnWarning> {
        let tag = self.classify(column, None);
        let distinct_count = match tag {
            TypeTag::Unsupported => 0,
            _ => match self.compute(column) {
                Ok(stats) => stats.distinct_count(),
                Err(_) => return vec![ColumnWarning::Unsupported],
            },
        };

        column_warnings(tag, distinct_count, self.config.high_cardinality_threshold)
    }
}
