//! Backend-agnostic column abstraction.
//!
//! The profiling core only talks to columns through [`Column`]; it never
//! inspects which backend it holds. Backends differ in how they answer
//! [`Column::len`] and in whether answering requires running deferred work.

use std::{fmt, sync::Arc};

use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, UnionArray},
    buffer::ScalarBuffer,
    compute::filter,
    datatypes::{DataType, Float32Type, Float64Type},
};
use snafu::ResultExt;

use crate::{frequency::FrequencyTable, storage::StorageType, value::Value, ArrowSnafu, Result};

mod eager;
mod partitioned;

pub use eager::ArrowColumn;
pub use partitioned::{PartitionLoader, PartitionedColumn};

/// Stable key identifying a column for caching purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(Arc<str>);

impl ColumnId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ColumnId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ColumnId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// When the data of a column is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionModel {
    /// Materialized in memory, every accessor is cheap.
    Eager,

    /// Deferred computation, accessors that need data block until it is
    /// realized.
    Lazy,
}

/// A sequence of values of a single declared storage type.
pub trait Column: fmt::Debug + Send + Sync {
    /// Identity used as cache key, `None` disables caching for this column.
    fn identity(&self) -> Option<&ColumnId>;

    /// Declared arrow type of the elements.
    fn data_type(&self) -> &DataType;

    fn execution(&self) -> ExecutionModel;

    /// Number of elements, missing ones included.
    ///
    /// Blocks on lazy columns.
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Materialize the whole column as a single array.
    fn realize(&self) -> Result<ArrayRef>;

    /// Same column without missing values. Lazy columns stay lazy.
    fn drop_missing(&self) -> Result<Arc<dyn Column>>;

    /// Count occurrences of every value, missing values grouped under
    /// [`Value::Null`].
    fn frequency_count(&self) -> Result<FrequencyTable>;

    fn storage_type(&self) -> Result<StorageType> {
        StorageType::try_from(self.data_type())
    }

    fn is_numeric(&self) -> Result<bool> {
        Ok(self.storage_type()?.is_numeric())
    }

    fn is_boolean(&self) -> Result<bool> {
        Ok(self.storage_type()?.is_boolean())
    }

    fn is_datetime(&self) -> Result<bool> {
        Ok(self.storage_type()?.is_datetime())
    }
}

/// Name used for `column` in log lines.
pub(crate) fn display_name(column: &dyn Column) -> &str {
    column
        .identity()
        .map(ColumnId::as_str)
        .unwrap_or("<anonymous>")
}

/// Remove nulls and float `NaN`s from `array`.
pub(crate) fn drop_missing_array(array: &ArrayRef) -> Result<ArrayRef> {
    let Some(keep) = present_mask(array.as_ref())? else {
        return Ok(Arc::clone(array));
    };

    match array.data_type() {
        DataType::Union(_, _) => filter_union(array.as_union(), &keep),
        _ => filter(array.as_ref(), &keep).context(ArrowSnafu),
    }
}

/// `true` for every present element, `None` if nothing is missing.
fn present_mask(array: &dyn Array) -> Result<Option<BooleanArray>> {
    let mask: BooleanArray = match array.data_type() {
        DataType::Float32 => array
            .as_primitive::<Float32Type>()
            .iter()
            .map(|v| Some(v.is_some_and(|v| !v.is_nan())))
            .collect(),
        DataType::Float64 => array
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| Some(v.is_some_and(|v| !v.is_nan())))
            .collect(),
        DataType::Union(_, _) => (0..array.len())
            .map(|row| Value::from_array(array, row).map(|v| Some(!v.is_null())))
            .collect::<Result<_>>()?,
        _ => match array.logical_nulls() {
            Some(nulls) => BooleanArray::new(nulls.into_inner(), None),
            None => return Ok(None),
        },
    };

    if mask.true_count() == mask.len() {
        Ok(None)
    } else {
        Ok(Some(mask))
    }
}

/// Union arrays are filtered by hand: the type ids (and offsets for dense
/// unions) are filtered, sparse children are filtered alongside.
fn filter_union(union: &UnionArray, keep: &BooleanArray) -> Result<ArrayRef> {
    let (fields, type_ids, offsets, children) = union.clone().into_parts();

    let kept = |row: &usize| keep.value(*row);
    let type_ids: ScalarBuffer<i8> = (0..type_ids.len())
        .filter(kept)
        .map(|row| type_ids[row])
        .collect::<Vec<_>>()
        .into();

    let (offsets, children) = match offsets {
        Some(offsets) => {
            let offsets: ScalarBuffer<i32> = (0..offsets.len())
                .filter(kept)
                .map(|row| offsets[row])
                .collect::<Vec<_>>()
                .into();
            (Some(offsets), children)
        }
        None => {
            let children = children
                .iter()
                .map(|child| filter(child.as_ref(), keep))
                .collect::<Result<Vec<_>, _>>()
                .context(ArrowSnafu)?;
            (None, children)
        }
    };

    let filtered = UnionArray::try_new(fields, type_ids, offsets, children).context(ArrowSnafu)?;
    Ok(Arc::new(filtered))
}

#[cfg(test)]
mod tests {
    use arrow::array::{Float64Array, Int64Array, NullArray, StringArray};

    use super::*;
    use crate::test_util::mixed_union;

    fn values(array: &ArrayRef) -> Vec<Value> {
        (0..array.len())
            .map(|row| Value::from_array(array.as_ref(), row).unwrap())
            .collect()
    }

    #[test]
    fn test_drop_missing_nulls() {
        let array: ArrayRef = Arc::new(Int64Array::from(vec![Some(1), None, Some(3)]));
        let dropped = drop_missing_array(&array).unwrap();

        assert_eq!(values(&dropped), [Value::Integer(1), Value::Integer(3)]);
    }

    #[test]
    fn test_drop_missing_nan() {
        let array: ArrayRef = Arc::new(Float64Array::from(vec![Some(f64::NAN), None, Some(0.5)]));
        let dropped = drop_missing_array(&array).unwrap();

        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped.null_count(), 0);
    }

    #[test]
    fn test_drop_missing_nothing_missing_is_noop() {
        let array: ArrayRef = Arc::new(StringArray::from(vec!["a", "b"]));
        let dropped = drop_missing_array(&array).unwrap();

        assert!(Arc::ptr_eq(&array, &dropped));
    }

    #[test]
    fn test_drop_missing_all_null() {
        let array: ArrayRef = Arc::new(NullArray::new(3));
        let dropped = drop_missing_array(&array).unwrap();

        assert_eq!(dropped.len(), 0);
    }

    #[test]
    fn test_drop_missing_dense_union() {
        let array: ArrayRef = Arc::new(mixed_union(false));
        let dropped = drop_missing_array(&array).unwrap();

        assert_eq!(
            values(&dropped),
            [
                Value::Integer(1),
                Value::Utf8("x".into()),
                Value::Integer(1)
            ]
        );
    }

    #[test]
    fn test_drop_missing_sparse_union() {
        let array: ArrayRef = Arc::new(mixed_union(true));
        let dropped = drop_missing_array(&array).unwrap();

        assert_eq!(
            values(&dropped),
            [
                Value::Integer(1),
                Value::Utf8("x".into()),
                Value::Integer(1)
            ]
        );
    }

    #[test]
    fn test_column_id() {
        let id = ColumnId::from("price");
        assert_eq!(id.as_str(), "price");
        assert_eq!(id.to_string(), "price");
        assert_eq!(id, ColumnId::from(String::from("price")));
    }
}
