//! Declared element types of a column, independent of its semantic
//! [`TypeTag`](crate::TypeTag).

use std::fmt;

use arrow::datatypes::DataType;

use crate::{Error, Result};

/// Storage type of a column, derived from its arrow [`DataType`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum StorageType {
    /// Every element is missing.
    Null,
    /// true or false
    Boolean,
    /// Signed integers of any width
    Integer,
    /// Unsigned integers of any width
    UInteger,
    /// 32 or 64-bit floating point numbers, `NaN` is treated as missing
    Float,
    /// UTF-8 strings, plain or dictionary encoded
    Utf8,
    /// Calendar dates
    Date,
    /// Timestamps of any unit, with or without time zone
    Timestamp,
    /// Union of several storage types, the element type varies per row.
    Mixed,
}

impl StorageType {
    /// Numbers of any kind.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::UInteger | Self::Float)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean)
    }

    /// Dates and timestamps.
    pub fn is_datetime(&self) -> bool {
        matches!(self, Self::Date | Self::Timestamp)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::UInteger => "uinteger",
            Self::Float => "float",
            Self::Utf8 => "utf8",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<&DataType> for StorageType {
    type Error = Error;

    fn try_from(data_type: &DataType) -> Result<Self> {
        let unsupported = || Error::UnsupportedDataType {
            data_type: data_type.clone(),
        };

        match data_type {
            DataType::Null => Ok(Self::Null),
            DataType::Boolean => Ok(Self::Boolean),
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
                Ok(Self::Integer)
            }
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
                Ok(Self::UInteger)
            }
            DataType::Float32 | DataType::Float64 => Ok(Self::Float),
            DataType::Utf8 | DataType::LargeUtf8 => Ok(Self::Utf8),
            DataType::Dictionary(key, value) => {
                if DataType::is_dictionary_key_type(key)
                    && matches!(value.as_ref(), DataType::Utf8 | DataType::LargeUtf8)
                {
                    Ok(Self::Utf8)
                } else {
                    Err(unsupported())
                }
            }
            DataType::Date32 | DataType::Date64 => Ok(Self::Date),
            DataType::Timestamp(_, _) => Ok(Self::Timestamp),
            DataType::Union(fields, _) => {
                // nested unions are not supported, every variant must be a plain type
                for (_, field) in fields.iter() {
                    match Self::try_from(field.data_type()) {
                        Ok(Self::Mixed) | Err(_) => return Err(unsupported()),
                        Ok(_) => {}
                    }
                }
                Ok(Self::Mixed)
            }
            _ => Err(unsupported()),
        }
    }
}
