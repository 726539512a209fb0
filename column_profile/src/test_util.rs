//! Shared fixtures for the unit tests of this crate.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use arrow::{
    array::{ArrayRef, Int64Array, StringArray, UnionArray},
    buffer::ScalarBuffer,
    datatypes::{DataType, Field, UnionFields},
};
use parking_lot::Mutex;

use crate::{
    cache::{hook::Hook, CacheKind},
    column::{ArrowColumn, Column, ColumnId, ExecutionModel},
    frequency::FrequencyTable,
    Result,
};

pub(crate) fn int_column(name: &str, values: &[Option<i64>]) -> ArrowColumn {
    ArrowColumn::new(name, Arc::new(Int64Array::from(values.to_vec())))
}

pub(crate) fn str_column(name: &str, values: &[Option<&str>]) -> ArrowColumn {
    ArrowColumn::new(name, Arc::new(StringArray::from(values.to_vec())))
}

/// In-memory column `[1, "x", 1, null]`.
pub(crate) fn mixed_column(name: &str) -> ArrowColumn {
    ArrowColumn::new(name, Arc::new(mixed_union(false)))
}

/// Union array `[1, "x", 1, null]`, sparse or dense.
pub(crate) fn mixed_union(sparse: bool) -> UnionArray {
    let fields = UnionFields::new(
        [0, 1],
        [
            Field::new("int", DataType::Int64, true),
            Field::new("str", DataType::Utf8, true),
        ],
    );
    let type_ids = ScalarBuffer::from(vec![0_i8, 1, 0, 0]);

    if sparse {
        let children: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![Some(1), None, Some(1), None])),
            Arc::new(StringArray::from(vec![None, Some("x"), None, None])),
        ];
        UnionArray::try_new(fields, type_ids, None, children).unwrap()
    } else {
        let children: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![Some(1), Some(1), None])),
            Arc::new(StringArray::from(vec!["x"])),
        ];
        let offsets = ScalarBuffer::from(vec![0_i32, 0, 1, 2]);
        UnionArray::try_new(fields, type_ids, Some(offsets), children).unwrap()
    }
}

#[derive(Debug, Default)]
struct Calls {
    frequency_count: AtomicUsize,
    len: AtomicUsize,
}

/// Wraps a column and counts the expensive calls made on it.
///
/// Columns derived through [`Column::drop_missing`] share the counters.
#[derive(Debug, Clone)]
pub(crate) struct CountingColumn {
    inner: Arc<dyn Column>,
    calls: Arc<Calls>,
}

impl CountingColumn {
    pub(crate) fn new(inner: impl Column + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            calls: Default::default(),
        }
    }

    pub(crate) fn frequency_count_calls(&self) -> usize {
        self.calls.frequency_count.load(Ordering::SeqCst)
    }

    pub(crate) fn len_calls(&self) -> usize {
        self.calls.len.load(Ordering::SeqCst)
    }
}

impl Column for CountingColumn {
    fn identity(&self) -> Option<&ColumnId> {
        self.inner.identity()
    }

    fn data_type(&self) -> &DataType {
        self.inner.data_type()
    }

    fn execution(&self) -> ExecutionModel {
        self.inner.execution()
    }

    fn len(&self) -> Result<usize> {
        self.calls.len.fetch_add(1, Ordering::SeqCst);
        self.inner.len()
    }

    fn realize(&self) -> Result<ArrayRef> {
        self.inner.realize()
    }

    fn drop_missing(&self) -> Result<Arc<dyn Column>> {
        Ok(Arc::new(Self {
            inner: self.inner.drop_missing()?,
            calls: Arc::clone(&self.calls),
        }))
    }

    fn frequency_count(&self) -> Result<FrequencyTable> {
        self.calls.frequency_count.fetch_add(1, Ordering::SeqCst);
        self.inner.frequency_count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TestHookRecord {
    Hit(CacheKind, ColumnId),
    Miss(CacheKind, ColumnId, u64),
    Inserted(CacheKind, ColumnId, u64),
    Discarded(CacheKind, ColumnId, u64),
    Reset(u64, usize),
}

/// Records every cache event.
#[derive(Debug, Default)]
pub(crate) struct TestHook {
    records: Mutex<Vec<TestHookRecord>>,
}

impl TestHook {
    pub(crate) fn records(&self) -> Vec<TestHookRecord> {
        self.records.lock().clone()
    }

    pub(crate) fn hits(&self, kind: CacheKind) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| matches!(r, TestHookRecord::Hit(k, _) if *k == kind))
            .count()
    }
}

impl Hook for TestHook {
    fn hit(&self, kind: CacheKind, id: &ColumnId) {
        self.records
            .lock()
            .push(TestHookRecord::Hit(kind, id.clone()));
    }

    fn miss(&self, kind: CacheKind, id: &ColumnId, generation: u64) {
        self.records
            .lock()
            .push(TestHookRecord::Miss(kind, id.clone(), generation));
    }

    fn inserted(&self, kind: CacheKind, id: &ColumnId, generation: u64) {
        self.records
            .lock()
            .push(TestHookRecord::Inserted(kind, id.clone(), generation));
    }

    fn discarded(&self, kind: CacheKind, id: &ColumnId, generation: u64) {
        self.records
            .lock()
            .push(TestHookRecord::Discarded(kind, id.clone(), generation));
    }

    fn reset(&self, generation: u64, evicted: usize) {
        self.records
            .lock()
            .push(TestHookRecord::Reset(generation, evicted));
    }
}
