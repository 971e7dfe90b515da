//! Errors produced by the value model.

use thiserror::Error;

use crate::types::SqlType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("could not parse value: {text:?} as {target}")]
    Parse { text: String, target: SqlType },

    #[error("value of type {actual} is not a {expected}")]
    WrongType { expected: SqlType, actual: SqlType },

    #[error("bind variable {0:?} is not a tuple")]
    NotATuple(String),

    #[error("missing bind variable {0:?}")]
    MissingBindVar(String),
}
