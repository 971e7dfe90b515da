//! Evaluable expressions for plan-time computed parameters.
//!
//! The routing layer only needs literals, bind-variable references, and row
//! column references, so that is the whole language. A sum type, matched
//! exhaustively.

use quiver_sql::{BindVars, Value, ValueError};

use super::error::EvalError;

/// Runtime inputs an expression can draw from.
pub struct ExpressionEnv<'a> {
    pub bind_vars: &'a BindVars,
    pub row: &'a [Value],
}

impl<'a> ExpressionEnv<'a> {
    pub fn new(bind_vars: &'a BindVars) -> Self {
        ExpressionEnv { bind_vars, row: &[] }
    }
}

/// One evaluable expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    BindVar(String),
    Column(usize),
}

impl Expr {
    pub fn evaluate(&self, env: &ExpressionEnv<'_>) -> Result<Value, EvalError> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::BindVar(name) => {
                let bv = env
                    .bind_vars
                    .get(name)
                    .ok_or_else(|| ValueError::MissingBindVar(name.clone()))?;
                Ok(bv.to_value()?)
            }
            Expr::Column(offset) => env
                .row
                .get(*offset)
                .cloned()
                .ok_or_else(|| {
                    EvalError::from(ValueError::MissingBindVar(format!("[COLUMN {offset}]")))
                }),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::BindVar(name) => write!(f, ":{name}"),
            Expr::Column(offset) => write!(f, "[COLUMN {offset}]"),
        }
    }
}
