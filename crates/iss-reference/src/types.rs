//! Type resolution: ISS primitive type names to schema scalar kinds, and
//! row value normalization.

use crate::error::{IssError, IssResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Offset appended to ISS date-times, which are Moscow local time without a
/// zone marker.
pub const MOSCOW_OFFSET: &str = "+03:00";

/// A primitive type name as declared by ISS documentation and metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Int32,
    Int64,
    Number,
    String,
    Var,
    Double,
    Date,
    DateTime,
}

/// Scalar category a primitive type maps to in the generated schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Integer,
    String,
    Float,
    Date,
    DateTime,
}

impl PrimitiveType {
    /// The exact ISS spelling of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Number => "number",
            Self::String => "string",
            Self::Var => "var",
            Self::Double => "double",
            Self::Date => "date",
            Self::DateTime => "datetime",
        }
    }

    pub fn scalar_kind(&self) -> ScalarKind {
        match self {
            Self::Int32 | Self::Int64 | Self::Number => ScalarKind::Integer,
            Self::String | Self::Var => ScalarKind::String,
            Self::Double => ScalarKind::Float,
            Self::Date => ScalarKind::Date,
            Self::DateTime => ScalarKind::DateTime,
        }
    }
}

impl FromStr for PrimitiveType {
    type Err = IssError;

    /// Case-sensitive, exact match only.
    fn from_str(s: &str) -> IssResult<Self> {
        match s {
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "number" => Ok(Self::Number),
            "string" => Ok(Self::String),
            "var" => Ok(Self::Var),
            "double" => Ok(Self::Double),
            "date" => Ok(Self::Date),
            "datetime" => Ok(Self::DateTime),
            other => Err(IssError::UnknownPrimitiveType(other.to_string())),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ScalarKind {
    /// Name of the corresponding GraphQL scalar.
    pub fn graphql_name(&self) -> &'static str {
        match self {
            Self::Integer => "Int",
            Self::String => "String",
            Self::Float => "Float",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
        }
    }
}

/// Map an ISS primitive type name to its scalar kind.
pub fn scalar_kind(type_name: &str) -> IssResult<ScalarKind> {
    type_name.parse::<PrimitiveType>().map(|t| t.scalar_kind())
}

/// Normalize one raw row value according to its declared type.
///
/// Only `datetime` is rewritten: `"2021-05-03 10:15:00"` becomes
/// `"2021-05-03T10:15:00+03:00"`. Null, empty and non-string values pass
/// through, as does everything of any other type.
pub fn normalize(ty: PrimitiveType, raw: Value) -> Value {
    match (ty, raw) {
        (PrimitiveType::DateTime, Value::String(s)) if !s.is_empty() => {
            let iso = s.trim().replacen(' ', "T", 1);
            Value::String(format!("{iso}{MOSCOW_OFFSET}"))
        }
        (_, raw) => raw,
    }
}
