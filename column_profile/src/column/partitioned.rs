use std::{fmt, sync::Arc};

use arrow::{
    array::{new_empty_array, Array, ArrayRef},
    compute::concat,
    datatypes::DataType,
};
use snafu::ResultExt;

use super::{drop_missing_array, Column, ColumnId, ExecutionModel};
use crate::{
    frequency::{FrequencyCounter, FrequencyTable},
    storage::StorageType,
    ArrowSnafu, DynError, PartitionTypeMismatchSnafu, RealizeSnafu, Result,
};

/// Deferred producer of one partition.
///
/// Called every time the partition is needed, so it should be cheap to call
/// more than once or memoize internally.
pub type PartitionLoader = Arc<dyn Fn() -> Result<ArrayRef, DynError> + Send + Sync>;

/// Lazily evaluated column split into partitions.
///
/// Nothing is loaded until a statistic needs the data. Frequencies are
/// counted per partition and merged, the merged table is identical to the
/// one of the concatenated column.
#[derive(Clone)]
pub struct PartitionedColumn {
    identity: Option<ColumnId>,
    data_type: DataType,
    partitions: Vec<PartitionLoader>,
}

impl fmt::Debug for PartitionedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionedColumn")
            .field("identity", &self.identity)
            .field("data_type", &self.data_type)
            .field("partitions", &self.partitions.len())
            .finish()
    }
}

impl PartitionedColumn {
    pub fn new(identity: Option<ColumnId>, data_type: DataType) -> Self {
        Self {
            identity,
            data_type,
            partitions: vec![],
        }
    }

    /// Append a partition produced by `loader`.
    pub fn with_partition<F>(mut self, loader: F) -> Self
    where
        F: Fn() -> Result<ArrayRef, DynError> + Send + Sync + 'static,
    {
        self.partitions.push(Arc::new(loader));
        self
    }

    /// Column over already materialized partitions, still evaluated
    /// partition by partition.
    pub fn from_arrays(
        identity: Option<ColumnId>,
        data_type: DataType,
        arrays: Vec<ArrayRef>,
    ) -> Self {
        arrays
            .into_iter()
            .fold(Self::new(identity, data_type), |column, array| {
                column.with_partition(move || Ok(Arc::clone(&array)))
            })
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    fn realize_partition(&self, partition: usize, loader: &PartitionLoader) -> Result<ArrayRef> {
        let array = loader().context(RealizeSnafu { partition })?;

        if array.data_type() != &self.data_type {
            return PartitionTypeMismatchSnafu {
                partition,
                expected: self.data_type.clone(),
                actual: array.data_type().clone(),
            }
            .fail();
        }

        Ok(array)
    }

    fn realize_partitions(&self) -> impl Iterator<Item = Result<ArrayRef>> + '_ {
        self.partitions
            .iter()
            .enumerate()
            .map(|(partition, loader)| self.realize_partition(partition, loader))
    }
}

impl Column for PartitionedColumn {
    fn identity(&self) -> Option<&ColumnId> {
        self.identity.as_ref()
    }

    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn execution(&self) -> ExecutionModel {
        ExecutionModel::Lazy
    }

    fn len(&self) -> Result<usize> {
        self.realize_partitions()
            .try_fold(0, |len, array| Ok(len + array?.len()))
    }

    fn realize(&self) -> Result<ArrayRef> {
        let arrays = self.realize_partitions().collect::<Result<Vec<_>>>()?;
        if arrays.is_empty() {
            return Ok(new_empty_array(&self.data_type));
        }

        let arrays: Vec<&dyn Array> = arrays.iter().map(|a| a.as_ref()).collect();
        concat(&arrays).context(ArrowSnafu)
    }

    fn drop_missing(&self) -> Result<Arc<dyn Column>> {
        StorageType::try_from(&self.data_type)?;

        let partitions = self
            .partitions
            .iter()
            .map(|loader| {
                let loader = Arc::clone(loader);
                let filtered: PartitionLoader = Arc::new(move || {
                    let array = loader()?;
                    drop_missing_array(&array).map_err(DynError::from)
                });
                filtered
            })
            .collect();

        Ok(Arc::new(Self {
            identity: self.identity.clone(),
            data_type: self.data_type.clone(),
            partitions,
        }))
    }

    fn frequency_count(&self) -> Result<FrequencyTable> {
        let mut counter = FrequencyCounter::default();
        for array in self.realize_partitions() {
            let mut partition = FrequencyCounter::default();
            partition.count_array(array?.as_ref())?;
            counter.merge(partition);
        }
        Ok(counter.finish())
    }
}
