//! Bind variables and the reserved names the routing layer rewrites.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::types::SqlType;
use crate::value::Value;

/// Bind variable holding the schema name an information_schema query was
/// constrained to. Wire-compatible; must not change.
pub const SCHEMA_NAME_VAR: &str = "__vtschemaname";

/// Marker bind variable telling the receiving tablet to rewrite
/// `table_schema` predicates. Wire-compatible; must not change.
pub const REPLACE_SCHEMA_NAME_VAR: &str = "__replacevtschemaname";

/// List bind variable carrying the per-shard vindex keys of an IN route
/// (`::__vals` in the rewritten query). Wire-compatible; must not change.
pub const LIST_VAR_NAME: &str = "__vals";

/// A query parameter: either a single typed payload or a tuple of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindVariable {
    pub typ: SqlType,
    /// Payload for non-tuple variables, in literal form.
    pub value: Vec<u8>,
    /// Members of a `Tuple` variable; empty otherwise.
    pub values: Vec<Value>,
}

/// Name-keyed bind variable set attached to one query.
pub type BindVars = HashMap<String, BindVariable>;

impl BindVariable {
    pub fn string(v: impl Into<String>) -> Self {
        BindVariable {
            typ: SqlType::VarChar,
            value: v.into().into_bytes(),
            values: Vec::new(),
        }
    }

    pub fn int64(v: i64) -> Self {
        BindVariable {
            typ: SqlType::Int64,
            value: v.to_string().into_bytes(),
            values: Vec::new(),
        }
    }

    pub fn uint64(v: u64) -> Self {
        BindVariable {
            typ: SqlType::Uint64,
            value: v.to_string().into_bytes(),
            values: Vec::new(),
        }
    }

    pub fn tuple(values: Vec<Value>) -> Self {
        BindVariable { typ: SqlType::Tuple, value: Vec::new(), values }
    }

    pub fn from_value(v: Value) -> Self {
        let typ = v.typ();
        BindVariable { typ, value: v.into_bytes(), values: Vec::new() }
    }

    pub fn is_tuple(&self) -> bool {
        self.typ == SqlType::Tuple
    }

    /// Single value carried by a non-tuple variable.
    pub fn to_value(&self) -> Result<Value, ValueError> {
        if self.is_tuple() {
            return Err(ValueError::WrongType { expected: self.typ, actual: SqlType::Tuple });
        }
        Ok(Value::new_trusted(self.typ, self.value.clone()))
    }

    /// Members of a tuple variable.
    pub fn tuple_values(&self) -> Result<&[Value], ValueError> {
        if !self.is_tuple() {
            return Err(ValueError::WrongType { expected: SqlType::Tuple, actual: self.typ });
        }
        Ok(&self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_and_scalar_accessors_reject_each_other() {
        let scalar = BindVariable::int64(7);
        assert_eq!(scalar.to_value().expect("scalar"), Value::new_int64(7));
        assert!(scalar.tuple_values().is_err());

        let tuple = BindVariable::tuple(vec![Value::new_int64(1), Value::new_int64(2)]);
        assert!(tuple.to_value().is_err());
        assert_eq!(tuple.tuple_values().expect("tuple").len(), 2);
    }

    #[test]
    fn reserved_names_are_bit_exact() {
        assert_eq!(SCHEMA_NAME_VAR, "__vtschemaname");
        assert_eq!(REPLACE_SCHEMA_NAME_VAR, "__replacevtschemaname");
        assert_eq!(LIST_VAR_NAME, "__vals");
    }
}
