//! Routing failure taxonomy and the SQL error mapping used for warnings.

use thiserror::Error;

use crate::eval::EvalError;

/// MySQL error codes surfaced in warnings and client errors.
pub const ER_UNKNOWN_ERROR: u16 = 1105;
pub const ER_BAD_DB_ERROR: u16 = 1049;
pub const ER_NOT_SUPPORTED_YET: u16 = 1235;
pub const ER_QUERY_INTERRUPTED: u16 = 1317;

/// A shard error rendered in wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlError {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("specifying two different database in the query is not supported")]
    UnsupportedMultiSchema,

    #[error("cannot send the query to multiple keyspace due to different table_name: {0}, {1}")]
    CrossKeyspace(String, String),

    #[error("unknown database '{0}'")]
    BadKeyspace(String),

    #[error("failed to find information about keyspace `{keyspace}`: {message}")]
    KeyspaceUnavailable { keyspace: String, message: String },

    #[error("no shards for keyspace: {0}")]
    NoShards(String),

    #[error("shard {shard} error: {message}")]
    Shard { shard: String, code: u16, message: String },

    #[error("query execution was interrupted")]
    Cancelled,

    #[error("{}", format_aggregate(.0))]
    Aggregate(Vec<RouteError>),

    #[error("{0}")]
    Internal(String),
}

fn format_aggregate(errors: &[RouteError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl RouteError {
    /// Collapses per-shard errors into one. A single error passes through
    /// untouched so its kind survives for callers that match on it.
    pub fn aggregate(mut errors: Vec<RouteError>) -> RouteError {
        match errors.len() {
            0 => RouteError::Internal("aggregate of zero errors".to_string()),
            1 => errors.remove(0),
            _ => RouteError::Aggregate(errors),
        }
    }

    /// Stable wire form used when the error is demoted to a warning.
    pub fn sql_error(&self) -> SqlError {
        let code = match self {
            RouteError::Shard { code, .. } => *code,
            RouteError::Cancelled => ER_QUERY_INTERRUPTED,
            RouteError::BadKeyspace(_) => ER_BAD_DB_ERROR,
            RouteError::UnsupportedMultiSchema | RouteError::CrossKeyspace(..) => {
                ER_NOT_SUPPORTED_YET
            }
            _ => ER_UNKNOWN_ERROR,
        };
        SqlError { code, message: self.to_string() }
    }

    pub fn is_bad_keyspace(&self) -> bool {
        matches!(self, RouteError::BadKeyspace(_))
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, RouteError::Cancelled)
    }
}

/// Cancellation is never demoted to a warning; a batch containing one must
/// surface as an error.
pub(crate) fn contains_cancellation(errors: &[RouteError]) -> bool {
    errors.iter().any(RouteError::is_cancellation)
}
