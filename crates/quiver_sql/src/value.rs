//! Tagged SQL values.
//!
//! A [`Value`] is the wire representation: a type tag plus the textual/binary
//! payload bytes. Numbers are stored in their decimal string form, the same
//! form they travel in result rows and bind variables.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::types::SqlType;

/// An immutable SQL value: type tag plus raw payload bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Value {
    typ: SqlType,
    bytes: Vec<u8>,
}

impl Value {
    /// Builds a value from a tag and raw bytes without validation. The caller
    /// vouches that the bytes are a legal literal for the tag.
    pub fn new_trusted(typ: SqlType, bytes: Vec<u8>) -> Self {
        Value { typ, bytes }
    }

    pub fn null() -> Self {
        Value { typ: SqlType::Null, bytes: Vec::new() }
    }

    pub fn new_int64(v: i64) -> Self {
        Value { typ: SqlType::Int64, bytes: v.to_string().into_bytes() }
    }

    pub fn new_uint64(v: u64) -> Self {
        Value { typ: SqlType::Uint64, bytes: v.to_string().into_bytes() }
    }

    pub fn new_float64(v: f64) -> Self {
        Value { typ: SqlType::Float64, bytes: format_f64(v).into_bytes() }
    }

    pub fn new_decimal(repr: &str) -> Self {
        Value { typ: SqlType::Decimal, bytes: repr.as_bytes().to_vec() }
    }

    pub fn new_varchar(v: impl Into<String>) -> Self {
        Value { typ: SqlType::VarChar, bytes: v.into().into_bytes() }
    }

    pub fn new_binary(v: impl Into<Vec<u8>>) -> Self {
        Value { typ: SqlType::VarBinary, bytes: v.into() }
    }

    pub fn new_date(repr: &str) -> Self {
        Value { typ: SqlType::Date, bytes: repr.as_bytes().to_vec() }
    }

    pub fn new_time(repr: &str) -> Self {
        Value { typ: SqlType::Time, bytes: repr.as_bytes().to_vec() }
    }

    pub fn new_datetime(repr: &str) -> Self {
        Value { typ: SqlType::Datetime, bytes: repr.as_bytes().to_vec() }
    }

    pub fn new_timestamp(repr: &str) -> Self {
        Value { typ: SqlType::Timestamp, bytes: repr.as_bytes().to_vec() }
    }

    pub fn typ(&self) -> SqlType {
        self.typ
    }

    pub fn is_null(&self) -> bool {
        self.typ == SqlType::Null
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload as text. Values are produced from UTF-8 literals in practice;
    /// non-UTF-8 binaries are replaced lossily.
    pub fn raw_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn to_i64(&self) -> Result<i64, ValueError> {
        self.raw_str()
            .parse::<i64>()
            .map_err(|_| self.parse_error(SqlType::Int64))
    }

    pub fn to_u64(&self) -> Result<u64, ValueError> {
        self.raw_str()
            .parse::<u64>()
            .map_err(|_| self.parse_error(SqlType::Uint64))
    }

    pub fn to_f64(&self) -> Result<f64, ValueError> {
        self.raw_str()
            .parse::<f64>()
            .map_err(|_| self.parse_error(SqlType::Float64))
    }

    fn parse_error(&self, target: SqlType) -> ValueError {
        ValueError::Parse { text: self.raw_str().into_owned(), target }
    }
}

/// Shortest decimal form that round-trips, no exponent notation.
fn format_f64(v: f64) -> String {
    format!("{v}")
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            return f.write_str("NULL");
        }
        write!(f, "{}({})", self.typ, self.raw_str())
    }
}
