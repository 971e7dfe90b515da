//! SQL type tags and the classification predicates the evaluation engine
//! keys its promotion rules off of.

use serde::{Deserialize, Serialize};

/// Tag identifying the SQL type of a [`crate::Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Null,
    Int8,
    Int16,
    Int24,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint24,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Decimal,
    Char,
    VarChar,
    Text,
    Binary,
    VarBinary,
    Blob,
    Date,
    Time,
    Datetime,
    Timestamp,
    Year,
    Enum,
    Set,
    Json,
    Bit,
    Tuple,
}

impl SqlType {
    /// Wire-compatible uppercase name, matching the MySQL protocol type names.
    pub fn as_str(self) -> &'static str {
        match self {
            SqlType::Null => "NULL",
            SqlType::Int8 => "INT8",
            SqlType::Int16 => "INT16",
            SqlType::Int24 => "INT24",
            SqlType::Int32 => "INT32",
            SqlType::Int64 => "INT64",
            SqlType::Uint8 => "UINT8",
            SqlType::Uint16 => "UINT16",
            SqlType::Uint24 => "UINT24",
            SqlType::Uint32 => "UINT32",
            SqlType::Uint64 => "UINT64",
            SqlType::Float32 => "FLOAT32",
            SqlType::Float64 => "FLOAT64",
            SqlType::Decimal => "DECIMAL",
            SqlType::Char => "CHAR",
            SqlType::VarChar => "VARCHAR",
            SqlType::Text => "TEXT",
            SqlType::Binary => "BINARY",
            SqlType::VarBinary => "VARBINARY",
            SqlType::Blob => "BLOB",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::Datetime => "DATETIME",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Year => "YEAR",
            SqlType::Enum => "ENUM",
            SqlType::Set => "SET",
            SqlType::Json => "JSON",
            SqlType::Bit => "BIT",
            SqlType::Tuple => "TUPLE",
        }
    }

    pub fn is_null(self) -> bool {
        self == SqlType::Null
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            SqlType::Int8 | SqlType::Int16 | SqlType::Int24 | SqlType::Int32 | SqlType::Int64
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            SqlType::Uint8 | SqlType::Uint16 | SqlType::Uint24 | SqlType::Uint32 | SqlType::Uint64
        )
    }

    pub fn is_integral(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_float(self) -> bool {
        matches!(self, SqlType::Float32 | SqlType::Float64)
    }

    /// Numbers for promotion purposes: integrals, floats, and decimals.
    pub fn is_number(self) -> bool {
        self.is_integral() || self.is_float() || self == SqlType::Decimal
    }

    pub fn is_text(self) -> bool {
        matches!(self, SqlType::Char | SqlType::VarChar | SqlType::Text)
    }

    pub fn is_binary(self) -> bool {
        matches!(self, SqlType::Binary | SqlType::VarBinary | SqlType::Blob)
    }

    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            SqlType::Date | SqlType::Time | SqlType::Datetime | SqlType::Timestamp
        )
    }

    /// Types whose literal form is quoted on the wire.
    pub fn is_quoted(self) -> bool {
        self.is_text()
            || self.is_binary()
            || self.is_temporal()
            || matches!(
                self,
                SqlType::Year | SqlType::Enum | SqlType::Set | SqlType::Json | SqlType::Bit
            )
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
