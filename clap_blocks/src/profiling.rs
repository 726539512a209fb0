//! Column profiling configs.

use std::num::NonZeroUsize;

/// How the distinct-value frequency table of a column is computed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FrequencyStrategy {
    /// Count the unfiltered column and a missing-value-free copy separately.
    ///
    /// Costs an extra pass, but also yields the distinct count including
    /// missing values.
    SplitCounts,

    /// Drop missing values first, then count once.
    #[default]
    DropMissingFirst,
}

/// CLI config for column profiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::Parser)]
pub struct ProfilingConfig {
    /// Strategy used to build per-column frequency tables.
    #[clap(
        long = "frequency-strategy",
        env = "PROFILING_FREQUENCY_STRATEGY",
        value_enum,
        default_value_t = FrequencyStrategy::DropMissingFirst,
        action
    )]
    pub frequency_strategy: FrequencyStrategy,

    /// Number of most frequent distinct values inspected when checking an
    /// in-memory column for mixed element types.
    #[clap(
        long = "mixed-type-sample-size",
        env = "PROFILING_MIXED_TYPE_SAMPLE_SIZE",
        default_value = "50",
        action
    )]
    pub mixed_type_sample_size: NonZeroUsize,

    /// Categorical and boolean columns with more distinct values than this
    /// are flagged as high-cardinality.
    #[clap(
        long = "high-cardinality-threshold",
        env = "PROFILING_HIGH_CARDINALITY_THRESHOLD",
        default_value = "50",
        action
    )]
    pub high_cardinality_threshold: usize,

    /// Maximum number of rows of a full frequency table.
    #[clap(
        long = "frequency-table-rows",
        env = "PROFILING_FREQUENCY_TABLE_ROWS",
        default_value = "10",
        action
    )]
    pub frequency_table_rows: usize,

    /// Number of rows in the minimum / maximum value tables.
    #[clap(
        long = "extreme-value-rows",
        env = "PROFILING_EXTREME_VALUE_ROWS",
        default_value = "5",
        action
    )]
    pub extreme_value_rows: usize,
}
