//! MySQL-compatible value evaluation: arithmetic, comparison, hashing, and
//! the coercion rules that make the three agree with each other.

mod arith;
mod compare;
mod error;
mod expr;
mod hash;
mod result;

pub use arith::{add, add_numeric, div, mul, null_safe_add, sub, to_float64};
pub use compare::{max, min, null_safe_compare};
pub use error::EvalError;
pub use expr::{Expr, ExpressionEnv};
pub use hash::null_safe_hashcode;
pub use result::{cast_to, coerce_to, EvalResult};
