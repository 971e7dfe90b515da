//! Query results assembled from shard replies.

use serde::{Deserialize, Serialize};

use crate::types::SqlType;
use crate::value::Value;

/// Column metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub typ: SqlType,
}

impl Field {
    pub fn new(name: impl Into<String>, typ: SqlType) -> Self {
        Field { name: name.into(), typ }
    }
}

/// One result row.
pub type Row = Vec<Value>;

/// A complete or partial result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub fields: Vec<Field>,
    pub rows: Vec<Row>,
    pub rows_affected: u64,
    pub insert_id: u64,
}

impl QueryResult {
    pub fn with_fields(fields: Vec<Field>) -> Self {
        QueryResult { fields, ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.rows.is_empty() && self.rows_affected == 0
    }

    /// Trims the result to its `count` leading columns. A count of zero means
    /// no truncation. Idempotent.
    pub fn truncated(mut self, count: usize) -> Self {
        if count == 0 {
            return self;
        }
        self.fields.truncate(count);
        for row in &mut self.rows {
            row.truncate(count);
        }
        self
    }

    /// Folds another shard's reply into this result. Fields are taken from
    /// the first reply that has them; rows concatenate in arrival order.
    pub fn append(&mut self, other: QueryResult) {
        if self.fields.is_empty() {
            self.fields = other.fields;
        }
        self.rows.extend(other.rows);
        self.rows_affected += other.rows_affected;
        if other.insert_id != 0 {
            self.insert_id = other.insert_id;
        }
    }
}
