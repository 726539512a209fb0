//! Semantic type classification of columns.

use std::{fmt, str::FromStr};

use snafu::Snafu;

use crate::{column::Column, Result};

/// Semantic type of a column, exactly one per column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Categorical
    Cat,
    /// Boolean, or numeric with exactly two distinct values
    Bool,
    /// Numeric
    Num,
    /// Dates and timestamps
    Date,
    /// At most one distinct value
    Const,
    /// Every element is distinct
    Unique,
    /// The column could not be classified
    Unsupported,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cat => "CAT",
            Self::Bool => "BOOL",
            Self::Num => "NUM",
            Self::Date => "DATE",
            Self::Const => "CONST",
            Self::Unique => "UNIQUE",
            Self::Unsupported => "UNSUPPORTED",
        }
    }

    /// Tags for which no regular statistics are reported.
    pub fn is_special(&self) -> bool {
        matches!(self, Self::Const | Self::Unique | Self::Unsupported)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("Unknown type tag: {tag:?}"))]
pub struct ParseTypeTagError {
    tag: String,
}

impl FromStr for TypeTag {
    type Err = ParseTypeTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CAT" => Ok(Self::Cat),
            "BOOL" => Ok(Self::Bool),
            "NUM" => Ok(Self::Num),
            "DATE" => Ok(Self::Date),
            "CONST" => Ok(Self::Const),
            "UNIQUE" => Ok(Self::Unique),
            "UNSUPPORTED" => Ok(Self::Unsupported),
            _ => ParseTypeTagSnafu { tag: s }.fail(),
        }
    }
}

/// Assign a [`TypeTag`] to `column` given its number of distinct non-missing
/// values.
///
/// Rules are evaluated in order, the first match wins:
///
/// 1. `distinct_count <= 1` → [`TypeTag::Const`]
/// 2. boolean storage, or numeric storage with exactly two distinct values
///    → [`TypeTag::Bool`]
/// 3. numeric storage → [`TypeTag::Num`]
/// 4. date/time storage → [`TypeTag::Date`]
/// 5. `distinct_count` equals the number of elements → [`TypeTag::Unique`]
/// 6. otherwise [`TypeTag::Cat`]
///
/// The element count is only requested when rule 5 is reached, as it forces
/// lazy columns to be realized.
///
/// Errors are returned as is; mapping them to [`TypeTag::Unsupported`] is up
/// to the caller.
pub fn infer_type_tag(column: &dyn Column, distinct_count: usize) -> Result<TypeTag> {
    if distinct_count <= 1 {
        return Ok(TypeTag::Const);
    }

    let storage = column.storage_type()?;
    if storage.is_boolean() || (distinct_count == 2 && storage.is_numeric()) {
        return Ok(TypeTag::Bool);
    }
    if storage.is_numeric() {
        return Ok(TypeTag::Num);
    }
    if storage.is_datetime() {
        return Ok(TypeTag::Date);
    }

    if distinct_count == column.len()? {
        Ok(TypeTag::Unique)
    } else {
        Ok(TypeTag::Cat)
    }
}
