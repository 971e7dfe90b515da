//! Quiver query routing core.
//!
//! Two halves live here:
//! - [`eval`]: a MySQL-compatible value evaluation engine with null-safe
//!   arithmetic, comparison, and hashing. Pure, no I/O.
//! - [`route`]: the Route primitive that fans a SELECT fragment out to the
//!   shards of a keyspace, reconciles partial failures, and reassembles the
//!   replies, merge-sorted when the plan orders them.
//!
//! The route layer consumes two injected capabilities: a [`route::Cursor`]
//! owning shard resolution and dispatch, and a [`route::Vindex`] mapping
//! column values to shard destinations.

pub mod eval;
pub mod route;
