//! Semantic type inference and frequency statistics for profiling the
//! columns of large tabular datasets.
//!
//! # Design
//!
//! There are two cooperating components:
//!
//! - **Frequency cache** ([`frequency`]): computes the distinct-value
//!   frequency table of a [`Column`] (missing values excluded) and memoizes
//!   it per column identity.
//! - **Type classifier** ([`classify`]): assigns exactly one [`TypeTag`] to a
//!   column based on its storage type and distinct count, memoized per column
//!   identity.
//!
//! Both memo tables live in a [`ProfileCache`] owned by a [`ProfileSession`].
//! Callers construct a session per profiling run and thread it through every
//! call; [`ProfileSession::reset`] clears both tables at once.
//!
//! ```text
//!    +----------------+   classify    +------------+
//!    | ProfileSession |-------------->| classifier |
//!    +----------------+               +------------+
//!        |      |                           |
//!        |      | compute             (distinct count)
//!        |      v                           |
//!        |  +-----------------+             |
//!        |  | frequency table |<------------+
//!        |  +-----------------+
//!        v
//!    +--------------+
//!    | ProfileCache |---(informs)---> Hook
//!    +--------------+
//! ```
//!
//! Columns are backend agnostic: [`ArrowColumn`] holds a materialized arrow
//! array, [`PartitionedColumn`] holds deferred partitions that are only
//! realized when a statistic needs them.

use arrow::{datatypes::DataType, error::ArrowError};
use snafu::Snafu;

pub mod cache;
pub mod classify;
pub mod column;
pub mod frequency;
pub mod session;
pub mod storage;
pub mod summary;
pub mod value;

#[cfg(test)]
mod test_util;

pub use cache::{CacheKind, ProfileCache};
pub use classify::TypeTag;
pub use column::{ArrowColumn, Column, ColumnId, ExecutionModel, PartitionedColumn};
pub use frequency::{FrequencyStats, FrequencyStrategy, FrequencyTable};
pub use session::{ProfileSession, SessionConfig};
pub use storage::StorageType;
pub use value::{InferredKind, Value, ValueKind};

/// Boxed error returned by deferred partition loaders.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Column profiling errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unsupported data type for column profiling: {data_type}"))]
    UnsupportedDataType { data_type: DataType },

    #[snafu(display(
        "Not supported mixed type: the {sampled} most frequent values have kinds {kinds:?}"
    ))]
    TypeMismatch {
        sampled: usize,
        kinds: Vec<ValueKind>,
    },

    #[snafu(display("Arrow error: {source}"))]
    Arrow { source: ArrowError },

    #[snafu(display("Cannot realize partition {partition}: {source}"))]
    Realize { partition: usize, source: DynError },

    #[snafu(display(
        "Partition {partition} produced data of type {actual} but the column is declared as {expected}"
    ))]
    PartitionTypeMismatch {
        partition: usize,
        expected: DataType,
        actual: DataType,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
