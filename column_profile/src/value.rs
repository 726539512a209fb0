//! Scalar values used as frequency table keys.

use std::{cmp::Ordering, collections::BTreeSet, fmt};

use arrow::{
    array::{Array, AsArray},
    datatypes::{
        ArrowPrimitiveType, DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int16Type,
        Int32Type, Int64Type, Int8Type, TimeUnit, TimestampMicrosecondType,
        TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt16Type,
        UInt32Type, UInt64Type, UInt8Type,
    },
};
use chrono::{DateTime, NaiveDate, SecondsFormat};
use ordered_float::OrderedFloat;

use crate::{Error, Result};

const MILLIS_PER_DAY: i64 = 86_400_000;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Days between 0001-01-01 (CE day 1) and the unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A single, hashable, totally ordered element of a column.
///
/// Missing elements, i.e. arrow nulls and float `NaN`s, are all
/// represented by [`Value::Null`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    UInteger(u64),
    Float(OrderedFloat<f64>),
    Utf8(String),
    /// Days since the unix epoch.
    Date(i32),
    /// Milliseconds since the unix epoch.
    Date64(i64),
    /// Nanoseconds since the unix epoch, wide enough for every time unit.
    Timestamp(i128),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Kind of the value, `None` for missing values.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Boolean(_) => Some(ValueKind::Boolean),
            Self::Integer(_) | Self::UInteger(_) => Some(ValueKind::Integer),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Utf8(_) => Some(ValueKind::String),
            Self::Date(_) | Self::Date64(_) => Some(ValueKind::Date),
            Self::Timestamp(_) => Some(ValueKind::Timestamp),
        }
    }

    /// Numeric value as float, `None` for non-numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::UInteger(v) => Some(*v as f64),
            Self::Float(v) => Some(v.into_inner()),
            _ => None,
        }
    }

    /// Order values the way a person reading a report expects.
    ///
    /// Integers and floats compare by magnitude even across variants,
    /// everything else falls back to the derived [`Ord`].
    pub fn natural_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Integer(a), Self::UInteger(b)) => i128::from(*a).cmp(&i128::from(*b)),
            (Self::UInteger(a), Self::Integer(b)) => i128::from(*a).cmp(&i128::from(*b)),
            (Self::Float(_), Self::Integer(_) | Self::UInteger(_))
            | (Self::Integer(_) | Self::UInteger(_), Self::Float(_)) => {
                match (self.as_f64(), other.as_f64()) {
                    (Some(a), Some(b)) => OrderedFloat(a).cmp(&OrderedFloat(b)),
                    _ => self.cmp(other),
                }
            }
            _ => self.cmp(other),
        }
    }

    /// Extract the element at `row` of `array`.
    pub fn from_array(array: &dyn Array, row: usize) -> Result<Self> {
        if array.is_null(row) {
            return Ok(Self::Null);
        }

        let value = match array.data_type() {
            DataType::Null => Self::Null,
            DataType::Boolean => Self::Boolean(array.as_boolean().value(row)),
            DataType::Int8 => Self::Integer(array.as_primitive::<Int8Type>().value(row).into()),
            DataType::Int16 => Self::Integer(array.as_primitive::<Int16Type>().value(row).into()),
            DataType::Int32 => Self::Integer(array.as_primitive::<Int32Type>().value(row).into()),
            DataType::Int64 => Self::Integer(array.as_primitive::<Int64Type>().value(row)),
            DataType::UInt8 => Self::UInteger(array.as_primitive::<UInt8Type>().value(row).into()),
            DataType::UInt16 => {
                Self::UInteger(array.as_primitive::<UInt16Type>().value(row).into())
            }
            DataType::UInt32 => {
                Self::UInteger(array.as_primitive::<UInt32Type>().value(row).into())
            }
            DataType::UInt64 => Self::UInteger(array.as_primitive::<UInt64Type>().value(row)),
            DataType::Float32 => float(array.as_primitive::<Float32Type>().value(row).into()),
            DataType::Float64 => float(array.as_primitive::<Float64Type>().value(row)),
            DataType::Utf8 => Self::Utf8(array.as_string::<i32>().value(row).to_owned()),
            DataType::LargeUtf8 => Self::Utf8(array.as_string::<i64>().value(row).to_owned()),
            DataType::Date32 => Self::Date(array.as_primitive::<Date32Type>().value(row)),
            DataType::Date64 => Self::Date64(array.as_primitive::<Date64Type>().value(row)),
            DataType::Timestamp(unit, _) => {
                let raw = match unit {
                    TimeUnit::Second => array.as_primitive::<TimestampSecondType>().value(row),
                    TimeUnit::Millisecond => {
                        array.as_primitive::<TimestampMillisecondType>().value(row)
                    }
                    TimeUnit::Microsecond => {
                        array.as_primitive::<TimestampMicrosecondType>().value(row)
                    }
                    TimeUnit::Nanosecond => {
                        array.as_primitive::<TimestampNanosecondType>().value(row)
                    }
                };
                timestamp(raw, *unit)
            }
            DataType::Dictionary(_, _) => {
                let dictionary = array
                    .as_any_dictionary_opt()
                    .ok_or_else(|| unsupported(array))?;
                let key = match Self::from_array(dictionary.keys(), row)? {
                    Self::Integer(key) => usize::try_from(key).ok(),
                    Self::UInteger(key) => usize::try_from(key).ok(),
                    _ => None,
                }
                .ok_or_else(|| unsupported(array))?;
                Self::from_array(dictionary.values().as_ref(), key)?
            }
            DataType::Union(_, _) => {
                let union = array.as_union();
                let child = union.child(union.type_id(row));
                Self::from_array(child.as_ref(), union.value_offset(row))?
            }
            _ => return Err(unsupported(array)),
        };

        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "(missing)"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::UInteger(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
            Self::Date(days) => match days
                .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
            {
                Some(date) => write!(f, "{date}"),
                None => write!(f, "{days} days"),
            },
            Self::Date64(millis) => match DateTime::from_timestamp_millis(*millis) {
                Some(dt) if millis.rem_euclid(MILLIS_PER_DAY) == 0 => {
                    write!(f, "{}", dt.date_naive())
                }
                Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                None => write!(f, "{millis} ms"),
            },
            Self::Timestamp(nanos) => {
                let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SECOND)).ok();
                let subsec = u32::try_from(nanos.rem_euclid(NANOS_PER_SECOND)).ok();
                match secs
                    .zip(subsec)
                    .and_then(|(secs, subsec)| DateTime::from_timestamp(secs, subsec))
                {
                    Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                    None => write!(f, "{nanos} ns"),
                }
            }
        }
    }
}

/// Coarse kind of a non-missing [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Boolean,
    Integer,
    Float,
    String,
    Date,
    Timestamp,
}

/// Element kind inferred from a set of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferredKind {
    /// No non-missing values.
    Empty,
    /// All values share one kind.
    Homogeneous(ValueKind),
    /// Integers and floats, which still form a numeric set.
    Numeric,
    /// Any other combination of kinds.
    Mixed(BTreeSet<ValueKind>),
}

impl InferredKind {
    /// Infer the kind of `values`, missing values are ignored.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let kinds: BTreeSet<_> = values.into_iter().filter_map(Value::kind).collect();

        let mut iter = kinds.iter();
        match (iter.next(), iter.next(), iter.next()) {
            (None, _, _) => Self::Empty,
            (Some(kind), None, _) => Self::Homogeneous(*kind),
            (Some(ValueKind::Integer), Some(ValueKind::Float), None) => Self::Numeric,
            _ => Self::Mixed(kinds),
        }
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, Self::Mixed(_))
    }
}

/// Call `f` for every element of `array`, in row order.
///
/// Dispatches on the data type once instead of per row, except for unions
/// whose element type varies per row anyway.
pub(crate) fn visit_values(array: &dyn Array, f: &mut dyn FnMut(Value)) -> Result<()> {
    match array.data_type() {
        DataType::Null => (0..array.len()).for_each(|_| f(Value::Null)),
        DataType::Boolean => array
            .as_boolean()
            .iter()
            .for_each(|v| f(v.map_or(Value::Null, Value::Boolean))),
        DataType::Int8 => visit_primitive::<Int8Type>(array, |v| Value::Integer(v.into()), f),
        DataType::Int16 => visit_primitive::<Int16Type>(array, |v| Value::Integer(v.into()), f),
        DataType::Int32 => visit_primitive::<Int32Type>(array, |v| Value::Integer(v.into()), f),
        DataType::Int64 => visit_primitive::<Int64Type>(array, Value::Integer, f),
        DataType::UInt8 => visit_primitive::<UInt8Type>(array, |v| Value::UInteger(v.into()), f),
        DataType::UInt16 => {
            visit_primitive::<UInt16Type>(array, |v| Value::UInteger(v.into()), f)
        }
        DataType::UInt32 => {
            visit_primitive::<UInt32Type>(array, |v| Value::UInteger(v.into()), f)
        }
        DataType::UInt64 => visit_primitive::<UInt64Type>(array, Value::UInteger, f),
        DataType::Float32 => visit_primitive::<Float32Type>(array, |v| float(v.into()), f),
        DataType::Float64 => visit_primitive::<Float64Type>(array, float, f),
        DataType::Utf8 => array
            .as_string::<i32>()
            .iter()
            .for_each(|v| f(v.map_or(Value::Null, |s| Value::Utf8(s.to_owned())))),
        DataType::LargeUtf8 => array
            .as_string::<i64>()
            .iter()
            .for_each(|v| f(v.map_or(Value::Null, |s| Value::Utf8(s.to_owned())))),
        DataType::Date32 => visit_primitive::<Date32Type>(array, Value::Date, f),
        DataType::Date64 => visit_primitive::<Date64Type>(array, Value::Date64, f),
        DataType::Timestamp(unit, _) => {
            let unit = *unit;
            match unit {
                TimeUnit::Second => {
                    visit_primitive::<TimestampSecondType>(array, |v| timestamp(v, unit), f)
                }
                TimeUnit::Millisecond => {
                    visit_primitive::<TimestampMillisecondType>(array, |v| timestamp(v, unit), f)
                }
                TimeUnit::Microsecond => {
                    visit_primitive::<TimestampMicrosecondType>(array, |v| timestamp(v, unit), f)
                }
                TimeUnit::Nanosecond => {
                    visit_primitive::<TimestampNanosecondType>(array, |v| timestamp(v, unit), f)
                }
            }
        }
        DataType::Dictionary(_, _) => {
            let dictionary = array
                .as_any_dictionary_opt()
                .ok_or_else(|| unsupported(array))?;

            // decode every dictionary entry once
            let mut decoded = Vec::with_capacity(dictionary.values().len());
            visit_values(dictionary.values().as_ref(), &mut |v| decoded.push(v))?;

            let keys = dictionary.keys();
            for (row, key) in dictionary.normalized_keys().into_iter().enumerate() {
                if keys.is_null(row) {
                    f(Value::Null);
                } else {
                    f(decoded[key].clone());
                }
            }
        }
        DataType::Union(_, _) => {
            for row in 0..array.len() {
                f(Value::from_array(array, row)?);
            }
        }
        _ => return Err(unsupported(array)),
    }

    Ok(())
}

fn visit_primitive<T: ArrowPrimitiveType>(
    array: &dyn Array,
    to_value: impl Fn(T::Native) -> Value,
    f: &mut dyn FnMut(Value),
) {
    for v in array.as_primitive::<T>().iter() {
        f(v.map_or(Value::Null, &to_value));
    }
}

fn float(v: f64) -> Value {
    if v.is_nan() {
        Value::Null
    } else {
        Value::Float(OrderedFloat(v))
    }
}

fn timestamp(raw: i64, unit: TimeUnit) -> Value {
    let factor: i128 = match unit {
        TimeUnit::Second => 1_000_000_000,
        TimeUnit::Millisecond => 1_000_000,
        TimeUnit::Microsecond => 1_000,
        TimeUnit::Nanosecond => 1,
    };
    Value::Timestamp(i128::from(raw) * factor)
}

fn unsupported(array: &dyn Array) -> Error {
    Error::UnsupportedDataType {
        data_type: array.data_type().clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{
            ArrayRef, BooleanArray, Date32Array, Date64Array, DictionaryArray, Float64Array,
            Int32Array, Int64Array, StringArray, TimestampMicrosecondArray,
            TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray, UnionArray,
        },
        buffer::ScalarBuffer,
        datatypes::{Field, UnionFields},
    };
    use rstest::rstest;

    use super::*;

    fn collect(array: &dyn Array) -> Vec<Value> {
        let mut out = vec![];
        visit_values(array, &mut |v| out.push(v)).unwrap();
        out
    }

    fn utf8(s: &str) -> Value {
        Value::Utf8(s.to_owned())
    }

    #[test]
    fn test_visit_primitive_with_nulls() {
        let array = Int32Array::from(vec![Some(1), None, Some(-3)]);
        assert_eq!(
            collect(&array),
            vec![Value::Integer(1), Value::Null, Value::Integer(-3)]
        );
    }

    #[test]
    fn test_nan_is_missing() {
        let array = Float64Array::from(vec![Some(1.5), Some(f64::NAN), None]);
        assert_eq!(
            collect(&array),
            vec![Value::Float(OrderedFloat(1.5)), Value::Null, Value::Null]
        );
        assert_eq!(Value::from_array(&array, 1).unwrap(), Value::Null);
    }

    #[test]
    fn test_dictionary() {
        let array: DictionaryArray<Int32Type> =
            vec![Some("a"), None, Some("b"), Some("a")].into_iter().collect();

        let expected = vec![utf8("a"), Value::Null, utf8("b"), utf8("a")];
        assert_eq!(collect(&array), expected);

        let per_row: Vec<_> = (0..array.len())
            .map(|row| Value::from_array(&array, row).unwrap())
            .collect();
        assert_eq!(per_row, expected);
    }

    #[test]
    fn test_union() {
        let array = mixed_union();
        assert_eq!(
            collect(&array),
            vec![Value::Integer(1), utf8("x"), Value::Null]
        );
    }

    #[test]
    fn test_unsupported() {
        let array = arrow::array::BinaryArray::from(vec![b"a".as_ref()]);
        let err = visit_values(&array, &mut |_| {}).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDataType { .. }));
    }

    #[test]
    fn test_timestamp_normalized_to_nanos() {
        let array = TimestampSecondArray::from(vec![Some(1)]);
        assert_eq!(collect(&array), vec![Value::Timestamp(1_000_000_000)]);
        assert_eq!(collect(&array)[0].to_string(), "1970-01-01T00:00:01Z");

        let millis = TimestampMillisecondArray::from(vec![1_000]);
        assert_eq!(collect(&millis), collect(&array));
    }

    const EDGES: [i64; 5] = [i64::MIN, i64::MIN + 1, 10_000_000_000, i64::MAX - 1, i64::MAX];

    #[rstest]
    #[case::date32(Arc::new(Date32Array::from(vec![i32::MIN, i32::MIN + 1, 0, i32::MAX])))]
    #[case::date64_same_day(Arc::new(Date64Array::from(vec![0, 1_000, 2_000])))]
    #[case::date64(Arc::new(Date64Array::from(EDGES.to_vec())))]
    #[case::second(Arc::new(TimestampSecondArray::from(EDGES.to_vec())))]
    #[case::millisecond(Arc::new(TimestampMillisecondArray::from(EDGES.to_vec())))]
    #[case::microsecond(Arc::new(TimestampMicrosecondArray::from(EDGES.to_vec())))]
    #[case::nanosecond(Arc::new(TimestampNanosecondArray::from(EDGES.to_vec())))]
    fn test_temporal_values_stay_distinct(#[case] array: ArrayRef) {
        let values = collect(array.as_ref());
        let distinct: BTreeSet<_> = values.iter().collect();
        assert_eq!(distinct.len(), array.len());

        // keys keep the order of the raw values
        let mut sorted = values.clone();
        sorted.sort();
        assert_eq!(sorted, values);

        for (row, value) in values.iter().enumerate() {
            assert_eq!(&Value::from_array(array.as_ref(), row).unwrap(), value);
            assert!(matches!(
                value.kind(),
                Some(ValueKind::Date | ValueKind::Timestamp)
            ));
        }
    }

    #[test]
    fn test_temporal_display() {
        let dates = Date64Array::from(vec![0, 1_500, MILLIS_PER_DAY]);
        let shown: Vec<_> = collect(&dates).iter().map(ToString::to_string).collect();
        assert_eq!(shown, ["1970-01-01", "1970-01-01T00:00:01.500Z", "1970-01-02"]);

        // out of range for a calendar date, falls back to the raw value
        assert_eq!(Value::Date64(i64::MAX).to_string(), format!("{} ms", i64::MAX));

        let far = collect(&TimestampSecondArray::from(vec![i64::MAX]));
        assert_eq!(
            far[0].to_string(),
            format!("{} ns", i128::from(i64::MAX) * 1_000_000_000)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "(missing)");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Float(OrderedFloat(2.5)).to_string(), "2.5");
        assert_eq!(utf8("abc").to_string(), "abc");

        let dates = Date32Array::from(vec![19_723]);
        assert_eq!(collect(&dates)[0].to_string(), "2024-01-01");
    }

    #[test]
    fn test_infer_kind() {
        assert_eq!(InferredKind::infer(std::iter::empty()), InferredKind::Empty);
        assert_eq!(InferredKind::infer(&[Value::Null]), InferredKind::Empty);
        assert_eq!(
            InferredKind::infer(&[Value::Integer(1), Value::UInteger(2), Value::Null]),
            InferredKind::Homogeneous(ValueKind::Integer)
        );
        assert_eq!(
            InferredKind::infer(&[Value::Integer(1), Value::Float(OrderedFloat(2.0))]),
            InferredKind::Numeric
        );

        let mixed = InferredKind::infer(&[Value::Integer(1), utf8("x")]);
        assert!(mixed.is_mixed());
        assert_eq!(
            mixed,
            InferredKind::Mixed([ValueKind::Integer, ValueKind::String].into())
        );

        assert!(InferredKind::infer(&[
            Value::Integer(1),
            Value::Float(OrderedFloat(2.0)),
            Value::Boolean(true)
        ])
        .is_mixed());
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(
            Value::Integer(-1).natural_cmp(&Value::UInteger(0)),
            Ordering::Less
        );
        assert_eq!(
            Value::Float(OrderedFloat(2.5)).natural_cmp(&Value::Integer(2)),
            Ordering::Greater
        );
        assert_eq!(utf8("a").natural_cmp(&utf8("b")), Ordering::Less);
    }

    #[test]
    fn test_boolean_and_strings() {
        let bools = BooleanArray::from(vec![Some(true), None]);
        assert_eq!(collect(&bools), vec![Value::Boolean(true), Value::Null]);

        let strings = StringArray::from(vec![Some("a"), None]);
        assert_eq!(collect(&strings), vec![utf8("a"), Value::Null]);

        let ints = Int64Array::from(vec![i64::MAX]);
        assert_eq!(collect(&ints), vec![Value::Integer(i64::MAX)]);
    }

    /// Dense union `[1, "x", null]`.
    fn mixed_union() -> UnionArray {
        let fields = UnionFields::new(
            [0, 1],
            [
                Field::new("int", DataType::Int64, true),
                Field::new("str", DataType::Utf8, true),
            ],
        );
        let children: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![Some(1), None])),
            Arc::new(StringArray::from(vec!["x"])),
        ];
        UnionArray::try_new(
            fields,
            ScalarBuffer::from(vec![0_i8, 1, 0]),
            Some(ScalarBuffer::from(vec![0_i32, 0, 1])),
            children,
        )
        .unwrap()
    }
}
