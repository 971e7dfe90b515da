//! Capabilities the Route consumes.
//!
//! The [`Cursor`] owns everything that touches the network: destination
//! resolution, multi-shard dispatch, routed-table lookup, deadlines, and the
//! session warnings sink. The Route itself stays pure configuration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quiver_sql::{BindVars, QueryResult, Value};
use serde::Serialize;

use super::error::RouteError;

/// A logical database partitioned across shards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyspace {
    pub name: String,
    pub sharded: bool,
}

impl Keyspace {
    pub fn new(name: impl Into<String>, sharded: bool) -> Self {
        Keyspace { name: name.into(), sharded }
    }
}

/// Which replica class a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TabletType {
    Primary,
    Replica,
    ReadOnly,
}

/// Abstract routing target produced by a vindex or an explicit override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Destination {
    /// A specific position in the keyspace-id ring.
    KeyspaceId(Vec<u8>),
    /// Every shard of the keyspace.
    AllShards,
    /// One arbitrary shard of the keyspace.
    AnyShard,
    /// No shard at all; the value does not map anywhere.
    None,
}

/// A destination resolved to a concrete backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedShard {
    pub keyspace: String,
    pub shard: String,
    pub tablet_type: TabletType,
}

/// SQL text plus the bind variables it ships with.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub bind_vars: BindVars,
}

/// A possibly schema-qualified table reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIdent {
    pub qualifier: String,
    pub name: String,
}

/// Where a routed table actually lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedTable {
    pub keyspace: Keyspace,
    pub name: String,
}

/// One warning surfaced to the client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub code: u16,
    pub message: String,
}

/// Releases a deadline when dropped, so every exit path of an execution
/// tears its timeout down.
pub struct CancelGuard(Option<Box<dyn FnOnce() + Send>>);

impl CancelGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        CancelGuard(Some(Box::new(release)))
    }

    pub fn noop() -> Self {
        CancelGuard(None)
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if let Some(release) = self.0.take() {
            release();
        }
    }
}

/// Per-connection state owned by the caller. Synchronization is the
/// session's own concern.
pub trait Session: Send + Sync {
    fn record_warning(&self, warning: Warning);
}

/// Callback receiving result chunks from a streaming execution.
pub type StreamCallback<'a> = &'a mut (dyn FnMut(QueryResult) -> Result<(), RouteError> + Send);

/// A primitive that can stream results through a cursor.
#[async_trait]
pub trait StreamExecutor: Send + Sync {
    async fn stream_execute(
        &self,
        cursor: &dyn Cursor,
        want_fields: bool,
        callback: StreamCallback<'_>,
    ) -> Result<(), RouteError>;
}

/// The execution capability injected into a Route.
///
/// Any method here may block on the network; the Route treats these as its
/// only suspension points. Cancellation installed via
/// [`Cursor::set_context_timeout`] propagates to in-flight shard RPCs.
#[async_trait]
pub trait Cursor: Send + Sync {
    /// Maps destinations of a keyspace to concrete shards. When `ids` are
    /// supplied (one per destination), the second return groups them by the
    /// shard each one resolved to, aligned with the shard list.
    async fn resolve_destinations(
        &self,
        keyspace: &str,
        ids: &[Value],
        destinations: &[Destination],
    ) -> Result<(Vec<ResolvedShard>, Vec<Vec<Value>>), RouteError>;

    /// Fans queries out to shards and gathers the combined result. The error
    /// list is aligned with `shards`; `None` marks a shard that succeeded.
    async fn execute_multi_shard(
        &self,
        shards: &[ResolvedShard],
        queries: &[BoundQuery],
        rollback_on_error: bool,
        autocommit: bool,
    ) -> (QueryResult, Vec<Option<RouteError>>);

    /// Streams one query across shards, pushing chunks to the callback as
    /// they arrive. Returns per-shard errors aligned with `shards`.
    async fn stream_execute_multi(
        &self,
        query: &str,
        shards: &[ResolvedShard],
        bind_vars: &[BindVars],
        rollback_on_error: bool,
        autocommit: bool,
        callback: StreamCallback<'_>,
    ) -> Vec<Option<RouteError>>;

    /// Runs a streaming primitive through this cursor, giving the cursor a
    /// chance to instrument the stream. Implementations typically delegate
    /// straight to [`StreamExecutor::stream_execute`].
    async fn stream_execute_primitive(
        &self,
        primitive: &dyn StreamExecutor,
        want_fields: bool,
        callback: StreamCallback<'_>,
    ) -> Result<(), RouteError>;

    /// Looks a table reference up in the routing rules.
    async fn find_routed_table(
        &self,
        table: &TableIdent,
    ) -> Result<Option<RoutedTable>, RouteError>;

    /// Installs an execution deadline. The returned guard releases it on
    /// drop.
    fn set_context_timeout(&self, timeout: Duration) -> CancelGuard;

    /// Whether the session allows single-shard autocommit optimizations.
    fn autocommit_approval(&self) -> bool;

    fn session(&self) -> Arc<dyn Session>;
}
