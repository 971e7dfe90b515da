//! Evaluation failure taxonomy.

use quiver_sql::{CollationId, SqlType, ValueError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("types are not comparable: {left} vs {right}")]
    UnsupportedComparison { left: SqlType, right: SqlType },

    #[error("cannot compare strings, collation is unknown or unsupported (collation ID: {0})")]
    UnsupportedCollation(CollationId),

    #[error("{type_name} value is out of range in {lhs} {op} {rhs}")]
    DataOutOfRange {
        type_name: &'static str,
        op: &'static str,
        lhs: String,
        rhs: String,
    },

    #[error("coercion should not try to coerce this value to {target}: {value}")]
    InternalCoercion { value: String, target: SqlType },

    #[error("invalid arithmetic between: {0} {1}")]
    InvalidArithmetic(String, String),

    #[error("type does not support hashcode yet: {0}")]
    UnsupportedHash(SqlType),

    #[error(transparent)]
    Value(#[from] ValueError),
}

impl EvalError {
    pub(crate) fn out_of_range(
        type_name: &'static str,
        op: &'static str,
        lhs: impl ToString,
        rhs: impl ToString,
    ) -> Self {
        EvalError::DataOutOfRange {
            type_name,
            op,
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        }
    }
}
