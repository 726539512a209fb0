use std::sync::Arc;

use arrow::{array::ArrayRef, datatypes::DataType, record_batch::RecordBatch};

use super::{drop_missing_array, Column, ColumnId, ExecutionModel};
use crate::{frequency::FrequencyTable, storage::StorageType, Result};

/// Column backed by a materialized arrow array.
#[derive(Debug, Clone)]
pub struct ArrowColumn {
    identity: Option<ColumnId>,
    array: ArrayRef,
}

impl ArrowColumn {
    pub fn new(identity: impl Into<ColumnId>, array: ArrayRef) -> Self {
        Self {
            identity: Some(identity.into()),
            array,
        }
    }

    /// Column without identity, its statistics are never cached.
    pub fn anonymous(array: ArrayRef) -> Self {
        Self {
            identity: None,
            array,
        }
    }

    /// Column `name` of `batch`, identified by its field name.
    pub fn from_batch(batch: &RecordBatch, name: &str) -> Option<Self> {
        batch
            .column_by_name(name)
            .map(|array| Self::new(name, Arc::clone(array)))
    }

    /// Every column of `batch`, in schema order.
    pub fn all_from_batch(batch: &RecordBatch) -> Vec<Self> {
        batch
            .schema()
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, array)| Self::new(field.name().as_str(), Arc::clone(array)))
            .collect()
    }

    pub fn array(&self) -> &ArrayRef {
        &self.array
    }
}

impl Column for ArrowColumn {
    fn identity(&self) -> Option<&ColumnId> {
        self.identity.as_ref()
    }

    fn data_type(&self) -> &DataType {
        self.array.data_type()
    }

    fn execution(&self) -> ExecutionModel {
        ExecutionModel::Eager
    }

    fn len(&self) -> Result<usize> {
        Ok(self.array.len())
    }

    fn realize(&self) -> Result<ArrayRef> {
        Ok(Arc::clone(&self.array))
    }

    fn drop_missing(&self) -> Result<Arc<dyn Column>> {
        StorageType::try_from(self.data_type())?;

        Ok(Arc::new(Self {
            identity: self.identity.clone(),
            array: drop_missing_array(&self.array)?,
        }))
    }

    fn frequency_count(&self) -> Result<FrequencyTable> {
        FrequencyTable::from_array(self.array.as_ref())
    }
}
