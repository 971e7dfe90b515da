//! The Route primitive: an immutable plan for fanning one SELECT fragment
//! out to the shards of a keyspace.
//!
//! A Route is pure configuration, safe to share across concurrent
//! executions. All mutable state for one execution lives on the stack of
//! [`Route::execute`] / [`Route::stream_execute`] and inside the injected
//! [`Cursor`].

mod cursor;
mod error;
mod exec;
mod merge_sort;
mod metrics;
mod sort;
mod systable;
mod vindex;

use std::collections::HashMap;
use std::sync::Arc;

use quiver_sql::{BindVars, CollationId, CollationRegistry, Value, COLLATION_UNKNOWN};
use serde::{Serialize, Serializer};

use crate::eval::Expr;

pub use cursor::{
    BoundQuery, CancelGuard, Cursor, Destination, Keyspace, ResolvedShard, RoutedTable, Session,
    StreamCallback, StreamExecutor, TableIdent, TabletType, Warning,
};
pub use error::{
    RouteError, SqlError, ER_BAD_DB_ERROR, ER_NOT_SUPPORTED_YET, ER_QUERY_INTERRUPTED,
    ER_UNKNOWN_ERROR,
};
pub use merge_sort::MergeSort;
pub use metrics::{RouteMetrics, RouteMetricsSnapshot};
pub use vindex::Vindex;

/// Execution opcode selecting the shard-resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Route to the single shard of an unsharded keyspace.
    Unsharded,
    /// Route to one shard via a unique vindex and a single value.
    EqualUnique,
    /// Route via a non-unique vindex and a single value.
    Equal,
    /// Route an IN clause via a vindex and a list of values.
    In,
    /// Route on multiple vindex values, same query to each shard.
    MultiEqual,
    /// Fan out to every shard of the keyspace.
    Scatter,
    /// Fetch from a sequence.
    Next,
    /// Route an information_schema query.
    Dba,
    /// Fetch from a reference table.
    Reference,
    /// A query that always returns no rows.
    None,
}

impl Opcode {
    pub fn as_str(self) -> &'static str {
        match self {
            Opcode::Unsharded => "Unsharded",
            Opcode::EqualUnique => "EqualUnique",
            Opcode::Equal => "Equal",
            Opcode::In => "IN",
            Opcode::MultiEqual => "MultiEqual",
            Opcode::Scatter => "Scatter",
            Opcode::Next => "Next",
            Opcode::Dba => "DBA",
            Opcode::Reference => "Reference",
            Opcode::None => "None",
        }
    }

    /// Opcodes that resolve shards through a vindex. A route carries a
    /// vindex exactly when its opcode is one of these.
    pub fn uses_vindex(self) -> bool {
        matches!(
            self,
            Opcode::EqualUnique | Opcode::Equal | Opcode::In | Opcode::MultiEqual
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Opcode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The routing value a vindex-backed opcode feeds into its vindex.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteValue {
    /// A value fixed at plan time.
    Literal(Value),
    /// A single value drawn from a bind variable.
    BindVar(String),
    /// A tuple fixed at plan time.
    InlineTuple(Vec<Value>),
    /// A tuple drawn from a list bind variable (`::name`).
    ListArg(String),
}

impl RouteValue {
    pub fn resolve_scalar(&self, bind_vars: &BindVars) -> Result<Value, RouteError> {
        match self {
            RouteValue::Literal(v) => Ok(v.clone()),
            RouteValue::BindVar(name) => {
                let bv = bind_vars
                    .get(name)
                    .ok_or_else(|| missing_bind_var(name))?;
                bv.to_value().map_err(|e| RouteError::Internal(e.to_string()))
            }
            RouteValue::InlineTuple(_) | RouteValue::ListArg(_) => Err(RouteError::Internal(
                format!("cannot resolve a single value from {self}"),
            )),
        }
    }

    pub fn resolve_list(&self, bind_vars: &BindVars) -> Result<Vec<Value>, RouteError> {
        match self {
            RouteValue::InlineTuple(values) => Ok(values.clone()),
            RouteValue::ListArg(name) => {
                let bv = bind_vars
                    .get(name)
                    .ok_or_else(|| missing_bind_var(name))?;
                bv.tuple_values()
                    .map(<[Value]>::to_vec)
                    .map_err(|e| RouteError::Internal(e.to_string()))
            }
            RouteValue::Literal(_) | RouteValue::BindVar(_) => Err(RouteError::Internal(
                format!("cannot resolve a value list from {self}"),
            )),
        }
    }
}

fn missing_bind_var(name: &str) -> RouteError {
    RouteError::Internal(format!("missing bind variable {name:?}"))
}

impl std::fmt::Display for RouteValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteValue::Literal(v) => write!(f, "{v}"),
            RouteValue::BindVar(name) => write!(f, ":{name}"),
            RouteValue::InlineTuple(values) => {
                f.write_str("(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(")")
            }
            RouteValue::ListArg(name) => write!(f, "::{name}"),
        }
    }
}

/// One merge-sort ordering term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByParams {
    /// Result column the ordering applies to.
    pub col: usize,
    /// Companion weight-string column, preferred over `col` when present.
    pub weight_string_col: Option<usize>,
    pub descending: bool,
    /// Adjusted index when a `select *` shifted columns; overrides `col`
    /// when it points past it.
    pub star_col_fixed_index: usize,
    /// Collation for textual comparison; unknown means untyped.
    pub collation_id: CollationId,
}

impl OrderByParams {
    pub fn ascending(col: usize) -> Self {
        OrderByParams {
            col,
            weight_string_col: None,
            descending: false,
            star_col_fixed_index: col,
            collation_id: COLLATION_UNKNOWN,
        }
    }

    pub fn descending(col: usize) -> Self {
        OrderByParams { descending: true, ..OrderByParams::ascending(col) }
    }

    /// The column this term actually compares.
    pub(crate) fn effective_column(&self) -> usize {
        if let Some(ws) = self.weight_string_col {
            if ws != self.col {
                return ws;
            }
        }
        if self.star_col_fixed_index > self.col {
            return self.star_col_fixed_index;
        }
        self.col
    }
}

impl std::fmt::Display for OrderByParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let col = if self.star_col_fixed_index > self.col {
            self.star_col_fixed_index
        } else {
            self.col
        };
        match self.weight_string_col {
            Some(ws) if ws != self.col => write!(f, "({col}|{ws})")?,
            _ => write!(f, "{col}")?,
        }
        f.write_str(if self.descending { " DESC" } else { " ASC" })?;
        if !self.collation_id.is_unknown() {
            match CollationRegistry::global().lookup(self.collation_id) {
                Some(collation) => write!(f, " COLLATE {}", collation.name())?,
                None => write!(f, " COLLATE <{}>", self.collation_id)?,
            }
        }
        Ok(())
    }
}

/// An immutable routing plan for one SELECT fragment.
pub struct Route {
    /// Shard-resolution strategy.
    pub opcode: Opcode,
    /// Keyspace the query is sent to.
    pub keyspace: Keyspace,
    /// Explicit destination override bypassing vindex logic.
    pub target_destination: Option<Destination>,
    /// Replica class to target.
    pub target_tablet_type: TabletType,
    /// Query sent to the shards.
    pub query: String,
    /// Impossible-where variant used only to fetch column metadata.
    pub field_query: String,
    /// Table the query reads, informational.
    pub table_name: String,
    /// Partitioning function; present exactly for the vindex opcodes.
    pub vindex: Option<Arc<dyn Vindex>>,
    /// Routing value consumed by the vindex opcodes.
    pub value: Option<RouteValue>,
    /// Merge-sort ordering; empty means no ordering guarantees.
    pub order_by: Vec<OrderByParams>,
    /// Trim results to this many leading columns; zero means no trim.
    pub truncate_column_count: usize,
    /// Per-execution deadline in milliseconds; zero means none.
    pub query_timeout_ms: u64,
    /// Demote failed shards to warnings when at least one shard succeeds.
    pub scatter_errors_as_warnings: bool,
    /// Expressions producing the desired `table_schema` for DBA routing.
    pub sys_table_schema: Vec<Expr>,
    /// Bind-variable name to expression producing a `table_name`.
    pub sys_table_name: HashMap<String, Expr>,
}

impl Route {
    /// A route with the bare minimum of parameters.
    pub fn new_simple(opcode: Opcode, keyspace: Keyspace) -> Self {
        Route {
            opcode,
            keyspace,
            target_destination: Option::None,
            target_tablet_type: TabletType::Primary,
            query: String::new(),
            field_query: String::new(),
            table_name: String::new(),
            vindex: Option::None,
            value: Option::None,
            order_by: Vec::new(),
            truncate_column_count: 0,
            query_timeout_ms: 0,
            scatter_errors_as_warnings: false,
            sys_table_schema: Vec::new(),
            sys_table_name: HashMap::new(),
        }
    }

    pub fn new(
        opcode: Opcode,
        keyspace: Keyspace,
        query: impl Into<String>,
        field_query: impl Into<String>,
    ) -> Self {
        Route {
            query: query.into(),
            field_query: field_query.into(),
            ..Route::new_simple(opcode, keyspace)
        }
    }

    pub fn route_type(&self) -> &'static str {
        self.opcode.as_str()
    }

    pub fn keyspace_name(&self) -> &str {
        &self.keyspace.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn set_truncate_column_count(&mut self, count: usize) {
        self.truncate_column_count = count;
    }

    /// EXPLAIN-style description of this plan, with only populated
    /// attributes present.
    pub fn description(&self) -> serde_json::Value {
        let mut other = serde_json::Map::new();
        other.insert("Query".to_string(), self.query.clone().into());
        other.insert("Table".to_string(), self.table_name.clone().into());
        other.insert("FieldQuery".to_string(), self.field_query.clone().into());
        if let Some(vindex) = &self.vindex {
            other.insert("Vindex".to_string(), vindex.name().to_string().into());
        }
        if let Some(value) = &self.value {
            other.insert("Values".to_string(), value.to_string().into());
        }
        if !self.sys_table_schema.is_empty() {
            let schemas: Vec<String> =
                self.sys_table_schema.iter().map(|e| e.to_string()).collect();
            other.insert(
                "SysTableTableSchema".to_string(),
                format!("[{}]", schemas.join(", ")).into(),
            );
        }
        if !self.sys_table_name.is_empty() {
            let mut names: Vec<String> = self
                .sys_table_name
                .iter()
                .map(|(k, v)| format!("{k}:{v}"))
                .collect();
            names.sort();
            other.insert(
                "SysTableTableName".to_string(),
                format!("[{}]", names.join(", ")).into(),
            );
        }
        if !self.order_by.is_empty() {
            let terms: Vec<String> = self.order_by.iter().map(|p| p.to_string()).collect();
            other.insert("OrderBy".to_string(), terms.join(", ").into());
        }
        if self.truncate_column_count > 0 {
            other.insert("ResultColumns".to_string(), self.truncate_column_count.into());
        }
        if self.scatter_errors_as_warnings {
            other.insert("ScatterErrorsAsWarnings".to_string(), true.into());
        }
        if self.query_timeout_ms > 0 {
            other.insert("QueryTimeout".to_string(), self.query_timeout_ms.into());
        }

        serde_json::json!({
            "OperatorType": "Route",
            "Variant": self.opcode,
            "Keyspace": self.keyspace,
            "TargetDestination": self.target_destination,
            "Other": other,
        })
    }
}
