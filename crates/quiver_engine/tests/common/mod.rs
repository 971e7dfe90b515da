//! Shared scripted cursor, vindex, and session for route execution tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quiver_engine::route::{
    BoundQuery, CancelGuard, Cursor, Destination, ResolvedShard, RouteError, RoutedTable, Session,
    StreamCallback, StreamExecutor, TableIdent, TabletType, Vindex, Warning,
};
use quiver_sql::{BindVars, QueryResult, Value};

/// Session that just accumulates warnings.
#[derive(Default)]
pub struct FakeSession {
    warnings: Mutex<Vec<Warning>>,
}

impl FakeSession {
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().expect("session lock").clone()
    }
}

impl Session for FakeSession {
    fn record_warning(&self, warning: Warning) {
        self.warnings.lock().expect("session lock").push(warning);
    }
}

/// Scripted behavior of one shard.
#[derive(Default, Clone)]
struct ShardScript {
    /// Result for blocking execution.
    result: QueryResult,
    /// Chunks for streaming execution; falls back to `result` when empty.
    chunks: Vec<QueryResult>,
    /// Error returned instead of any result.
    error: Option<(u16, String)>,
    /// Report the shard as cancelled instead of returning anything.
    cancelled: bool,
}

/// A scripted cursor: keyspaces, shard results, routed tables, and call
/// recording, with no network anywhere.
pub struct FakeCursor {
    keyspaces: HashMap<String, Vec<String>>,
    keyspace_ids: HashMap<Vec<u8>, String>,
    scripts: HashMap<String, ShardScript>,
    routed_tables: HashMap<(String, String), RoutedTable>,
    session: Arc<FakeSession>,
    executed: Mutex<Vec<(Vec<ResolvedShard>, Vec<BoundQuery>)>>,
    streamed: Mutex<Vec<(String, Vec<ResolvedShard>, Vec<BindVars>)>>,
    timeouts_set: AtomicU64,
    timeouts_released: Arc<AtomicU64>,
    autocommit: bool,
}

impl FakeCursor {
    pub fn new() -> Self {
        FakeCursor {
            keyspaces: HashMap::new(),
            keyspace_ids: HashMap::new(),
            scripts: HashMap::new(),
            routed_tables: HashMap::new(),
            session: Arc::new(FakeSession::default()),
            executed: Mutex::new(Vec::new()),
            streamed: Mutex::new(Vec::new()),
            timeouts_set: AtomicU64::new(0),
            timeouts_released: Arc::new(AtomicU64::new(0)),
            autocommit: false,
        }
    }

    pub fn with_keyspace(mut self, name: &str, shards: &[&str]) -> Self {
        self.keyspaces
            .insert(name.to_string(), shards.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Maps a keyspace-id to the shard owning it.
    pub fn with_keyspace_id(mut self, id: &[u8], shard: &str) -> Self {
        self.keyspace_ids.insert(id.to_vec(), shard.to_string());
        self
    }

    pub fn with_result(mut self, keyspace: &str, shard: &str, result: QueryResult) -> Self {
        self.script_mut(keyspace, shard).result = result;
        self
    }

    pub fn with_chunks(mut self, keyspace: &str, shard: &str, chunks: Vec<QueryResult>) -> Self {
        self.script_mut(keyspace, shard).chunks = chunks;
        self
    }

    pub fn with_shard_error(mut self, keyspace: &str, shard: &str, code: u16, message: &str) -> Self {
        self.script_mut(keyspace, shard).error = Some((code, message.to_string()));
        self
    }

    pub fn with_shard_cancelled(mut self, keyspace: &str, shard: &str) -> Self {
        self.script_mut(keyspace, shard).cancelled = true;
        self
    }

    pub fn with_routed_table(
        mut self,
        qualifier: &str,
        name: &str,
        target: RoutedTable,
    ) -> Self {
        self.routed_tables
            .insert((qualifier.to_string(), name.to_string()), target);
        self
    }

    fn script_mut(&mut self, keyspace: &str, shard: &str) -> &mut ShardScript {
        self.scripts
            .entry(format!("{keyspace}:{shard}"))
            .or_default()
    }

    fn script_of(&self, shard: &ResolvedShard) -> ShardScript {
        self.scripts
            .get(&format!("{}:{}", shard.keyspace, shard.shard))
            .cloned()
            .unwrap_or_default()
    }

    pub fn fake_session(&self) -> &FakeSession {
        &self.session
    }

    /// Blocking dispatches recorded so far.
    pub fn executed(&self) -> Vec<(Vec<ResolvedShard>, Vec<BoundQuery>)> {
        self.executed.lock().expect("executed lock").clone()
    }

    /// Streaming dispatches recorded so far.
    pub fn streamed(&self) -> Vec<(String, Vec<ResolvedShard>, Vec<BindVars>)> {
        self.streamed.lock().expect("streamed lock").clone()
    }

    pub fn timeouts_set(&self) -> u64 {
        self.timeouts_set.load(Ordering::SeqCst)
    }

    pub fn timeouts_released(&self) -> u64 {
        self.timeouts_released.load(Ordering::SeqCst)
    }

    fn shard_error(&self, shard: &ResolvedShard, code: u16, message: &str) -> RouteError {
        RouteError::Shard {
            shard: format!("{}/{}", shard.keyspace, shard.shard),
            code,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Cursor for FakeCursor {
    async fn resolve_destinations(
        &self,
        keyspace: &str,
        ids: &[Value],
        destinations: &[Destination],
    ) -> Result<(Vec<ResolvedShard>, Vec<Vec<Value>>), RouteError> {
        let shard_names = self
            .keyspaces
            .get(keyspace)
            .ok_or_else(|| RouteError::BadKeyspace(keyspace.to_string()))?;

        fn push_shard(
            keyspace: &str,
            name: &str,
            shards: &mut Vec<ResolvedShard>,
            values: &mut Vec<Vec<Value>>,
        ) -> usize {
            if let Some(pos) = shards.iter().position(|s| s.shard == name) {
                return pos;
            }
            shards.push(ResolvedShard {
                keyspace: keyspace.to_string(),
                shard: name.to_string(),
                tablet_type: TabletType::Primary,
            });
            values.push(Vec::new());
            shards.len() - 1
        }

        let mut shards = Vec::new();
        let mut values = Vec::new();
        for (i, destination) in destinations.iter().enumerate() {
            match destination {
                Destination::AnyShard => {
                    let name = shard_names
                        .first()
                        .ok_or_else(|| RouteError::NoShards(keyspace.to_string()))?;
                    push_shard(keyspace, name, &mut shards, &mut values);
                }
                Destination::AllShards => {
                    for name in shard_names {
                        push_shard(keyspace, name, &mut shards, &mut values);
                    }
                }
                Destination::KeyspaceId(id) => {
                    let name = self.keyspace_ids.get(id).ok_or_else(|| {
                        RouteError::Internal(format!("no shard for keyspace id {id:?}"))
                    })?;
                    let index = push_shard(keyspace, name, &mut shards, &mut values);
                    if let Some(value) = ids.get(i) {
                        values[index].push(value.clone());
                    }
                }
                Destination::None => {}
            }
        }
        Ok((shards, values))
    }

    async fn execute_multi_shard(
        &self,
        shards: &[ResolvedShard],
        queries: &[BoundQuery],
        _rollback_on_error: bool,
        _autocommit: bool,
    ) -> (QueryResult, Vec<Option<RouteError>>) {
        self.executed
            .lock()
            .expect("executed lock")
            .push((shards.to_vec(), queries.to_vec()));

        let mut combined = QueryResult::default();
        let mut errors = Vec::with_capacity(shards.len());
        for shard in shards {
            let script = self.script_of(shard);
            if script.cancelled {
                errors.push(Some(RouteError::Cancelled));
                continue;
            }
            match script.error {
                Some((code, message)) => {
                    errors.push(Some(self.shard_error(shard, code, &message)));
                }
                None => {
                    combined.append(script.result);
                    errors.push(None);
                }
            }
        }
        (combined, errors)
    }

    async fn stream_execute_multi(
        &self,
        query: &str,
        shards: &[ResolvedShard],
        bind_vars: &[BindVars],
        _rollback_on_error: bool,
        _autocommit: bool,
        callback: StreamCallback<'_>,
    ) -> Vec<Option<RouteError>> {
        self.streamed.lock().expect("streamed lock").push((
            query.to_string(),
            shards.to_vec(),
            bind_vars.to_vec(),
        ));

        let mut errors = Vec::with_capacity(shards.len());
        for shard in shards {
            let script = self.script_of(shard);
            if script.cancelled {
                errors.push(Some(RouteError::Cancelled));
                continue;
            }
            if let Some((code, message)) = script.error {
                errors.push(Some(self.shard_error(shard, code, &message)));
                continue;
            }
            let chunks = if script.chunks.is_empty() {
                vec![script.result]
            } else {
                script.chunks
            };
            let mut failed = None;
            for chunk in chunks {
                if let Err(err) = callback(chunk) {
                    failed = Some(err);
                    break;
                }
            }
            errors.push(failed);
        }
        errors
    }

    async fn stream_execute_primitive(
        &self,
        primitive: &dyn StreamExecutor,
        want_fields: bool,
        callback: StreamCallback<'_>,
    ) -> Result<(), RouteError> {
        primitive.stream_execute(self, want_fields, callback).await
    }

    async fn find_routed_table(
        &self,
        table: &TableIdent,
    ) -> Result<Option<RoutedTable>, RouteError> {
        Ok(self
            .routed_tables
            .get(&(table.qualifier.clone(), table.name.clone()))
            .cloned())
    }

    fn set_context_timeout(&self, _timeout: Duration) -> CancelGuard {
        self.timeouts_set.fetch_add(1, Ordering::SeqCst);
        let released = self.timeouts_released.clone();
        CancelGuard::new(move || {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn autocommit_approval(&self) -> bool {
        self.autocommit
    }

    fn session(&self) -> Arc<dyn Session> {
        self.session.clone()
    }
}

/// Vindex scripted by value literal.
pub struct FakeVindex {
    name: String,
    mapping: HashMap<String, Destination>,
}

impl FakeVindex {
    pub fn new(name: &str) -> Self {
        FakeVindex { name: name.to_string(), mapping: HashMap::new() }
    }

    pub fn with_mapping(mut self, value: Value, destination: Destination) -> Self {
        self.mapping.insert(value.raw_str().into_owned(), destination);
        self
    }
}

#[async_trait]
impl Vindex for FakeVindex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn map(
        &self,
        _cursor: &dyn Cursor,
        values: &[Value],
    ) -> Result<Vec<Destination>, RouteError> {
        Ok(values
            .iter()
            .map(|v| {
                self.mapping
                    .get(v.raw_str().as_ref())
                    .cloned()
                    .unwrap_or(Destination::None)
            })
            .collect())
    }
}

/// One-column integer rows for scripted results.
pub fn int_rows(values: &[i64]) -> Vec<Vec<Value>> {
    values.iter().map(|v| vec![Value::new_int64(*v)]).collect()
}

/// Installs a test-writer subscriber once so failing runs show the route
/// layer's tracing output.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}
