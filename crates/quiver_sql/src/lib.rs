//! SQL data model shared by the Quiver routing and evaluation layers.
//!
//! This crate is pure data: type tags, tagged values, bind variables, query
//! results, and the collation lookup service. It performs no I/O and holds no
//! global mutable state beyond the process collation registry.

pub mod bind;
pub mod collation;
pub mod error;
pub mod result;
pub mod types;
pub mod value;

pub use bind::{
    BindVariable, BindVars, LIST_VAR_NAME, REPLACE_SCHEMA_NAME_VAR, SCHEMA_NAME_VAR,
};
pub use collation::{
    Collation, CollationId, CollationRegistry, COLLATION_ASCII_GENERAL_CI, COLLATION_BINARY,
    COLLATION_UNKNOWN,
};
pub use error::ValueError;
pub use result::{Field, QueryResult, Row};
pub use types::SqlType;
pub use value::Value;
