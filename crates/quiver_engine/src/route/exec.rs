//! Route execution: parameter fan-out, dispatch, and result reassembly.

use std::sync::Arc;
use std::time::Duration;

use quiver_sql::{BindVariable, BindVars, QueryResult, Value, LIST_VAR_NAME};
use tracing::{debug, warn};

use super::cursor::{
    BoundQuery, CancelGuard, Cursor, Destination, Keyspace, ResolvedShard, StreamCallback,
    StreamExecutor,
};
use super::error::{contains_cancellation, RouteError};
use super::merge_sort::{MergeSort, ShardRoute};
use super::metrics::RouteMetrics;
use super::sort::sort_result;
use super::systable::params_system_query;
use super::vindex::Vindex;
use super::{Opcode, Route};

impl Route {
    /// Blocking fan-out execution returning the fully assembled result.
    pub async fn execute(
        &self,
        cursor: &dyn Cursor,
        bind_vars: &BindVars,
        want_fields: bool,
    ) -> Result<QueryResult, RouteError> {
        let _deadline = self.deadline_guard(cursor);
        RouteMetrics::global().record_execute();
        let result = self.execute_internal(cursor, bind_vars, want_fields).await?;
        Ok(result.truncated(self.truncate_column_count))
    }

    async fn execute_internal(
        &self,
        cursor: &dyn Cursor,
        bind_vars: &BindVars,
        want_fields: bool,
    ) -> Result<QueryResult, RouteError> {
        let (shards, shard_binds) = self.route_params(cursor, bind_vars).await?;

        if shards.is_empty() {
            if want_fields {
                return self.get_fields(cursor, bind_vars).await;
            }
            return Ok(QueryResult::default());
        }

        debug!(
            opcode = self.opcode.as_str(),
            keyspace = %self.keyspace.name,
            shards = shards.len(),
            "dispatching route"
        );

        let queries = bound_queries(&self.query, shard_binds);
        let (result, shard_errors) = cursor
            .execute_multi_shard(&shards, &queries, false, false)
            .await;

        let errors: Vec<RouteError> = shard_errors.into_iter().flatten().collect();
        if !errors.is_empty() {
            if !self.scatter_errors_as_warnings
                || errors.len() == shards.len()
                || contains_cancellation(&errors)
            {
                return Err(RouteError::aggregate(errors));
            }
            self.demote_to_warnings(cursor, errors);
        }

        if self.order_by.is_empty() {
            return Ok(result);
        }
        sort_result(&self.order_by, result)
    }

    /// Streaming fan-out execution, merge-sorted when the plan orders rows.
    pub async fn stream_execute(
        &self,
        cursor: &dyn Cursor,
        bind_vars: &BindVars,
        want_fields: bool,
        callback: StreamCallback<'_>,
    ) -> Result<(), RouteError> {
        let _deadline = self.deadline_guard(cursor);
        RouteMetrics::global().record_stream_execute();

        let (shards, shard_binds) = self.route_params(cursor, bind_vars).await?;

        if shards.is_empty() {
            if want_fields {
                let result = self.get_fields(cursor, bind_vars).await?;
                return callback(result);
            }
            return Ok(());
        }

        if self.order_by.is_empty() {
            let truncate = self.truncate_column_count;
            let mut truncating = |result: QueryResult| callback(result.truncated(truncate));
            let shard_errors = cursor
                .stream_execute_multi(
                    &self.query,
                    &shards,
                    &shard_binds,
                    false,
                    false,
                    &mut truncating,
                )
                .await;
            let errors: Vec<RouteError> = shard_errors.into_iter().flatten().collect();
            if !errors.is_empty() {
                if !self.scatter_errors_as_warnings
                    || errors.len() == shards.len()
                    || contains_cancellation(&errors)
                {
                    return Err(RouteError::aggregate(errors));
                }
                self.demote_to_warnings(cursor, errors);
            }
            return Ok(());
        }

        // Ordered results from many shards: merge-sort the streams.
        let primitives: Vec<Arc<dyn StreamExecutor>> = shards
            .iter()
            .zip(shard_binds)
            .map(|(shard, binds)| {
                Arc::new(ShardRoute::new(self.query.clone(), shard.clone(), binds))
                    as Arc<dyn StreamExecutor>
            })
            .collect();
        let merge_sort = MergeSort::new(
            primitives,
            self.order_by.clone(),
            self.scatter_errors_as_warnings,
        );
        let truncate = self.truncate_column_count;
        let mut truncating = |result: QueryResult| callback(result.truncated(truncate));
        cursor
            .stream_execute_primitive(&merge_sort, want_fields, &mut truncating)
            .await
    }

    /// Fetches field metadata by running the impossible-where variant on one
    /// arbitrary shard of the keyspace.
    pub async fn get_fields(
        &self,
        cursor: &dyn Cursor,
        bind_vars: &BindVars,
    ) -> Result<QueryResult, RouteError> {
        let (shards, _) = cursor
            .resolve_destinations(&self.keyspace.name, &[], &[Destination::AnyShard])
            .await?;
        if shards.len() != 1 {
            return Err(RouteError::NoShards(self.keyspace.name.clone()));
        }
        let result =
            exec_shard(cursor, &self.field_query, bind_vars, &shards[0], false, false).await?;
        Ok(result.truncated(self.truncate_column_count))
    }

    /// Produces the `(shards, per-shard binds)` fan-out for this opcode.
    async fn route_params(
        &self,
        cursor: &dyn Cursor,
        bind_vars: &BindVars,
    ) -> Result<(Vec<ResolvedShard>, Vec<BindVars>), RouteError> {
        // An explicit destination overrides the opcode's vindex logic.
        if let Some(destination) = &self.target_destination {
            let (shards, _) = cursor
                .resolve_destinations(
                    &self.keyspace.name,
                    &[],
                    std::slice::from_ref(destination),
                )
                .await?;
            let binds = replicate_binds(bind_vars, shards.len());
            return Ok((shards, binds));
        }
        match self.opcode {
            Opcode::Dba => params_system_query(self, cursor, bind_vars).await,
            Opcode::Unsharded | Opcode::Next | Opcode::Reference => {
                self.params_any_shard(cursor, bind_vars).await
            }
            Opcode::Scatter => self.params_all_shards(cursor, bind_vars).await,
            Opcode::Equal | Opcode::EqualUnique => self.params_equal(cursor, bind_vars).await,
            Opcode::In => self.params_in(cursor, bind_vars).await,
            Opcode::MultiEqual => self.params_multi_equal(cursor, bind_vars).await,
            Opcode::None => Ok((Vec::new(), Vec::new())),
        }
    }

    async fn params_any_shard(
        &self,
        cursor: &dyn Cursor,
        bind_vars: &BindVars,
    ) -> Result<(Vec<ResolvedShard>, Vec<BindVars>), RouteError> {
        let (shards, _) = cursor
            .resolve_destinations(&self.keyspace.name, &[], &[Destination::AnyShard])
            .await?;
        let binds = replicate_binds(bind_vars, shards.len());
        Ok((shards, binds))
    }

    async fn params_all_shards(
        &self,
        cursor: &dyn Cursor,
        bind_vars: &BindVars,
    ) -> Result<(Vec<ResolvedShard>, Vec<BindVars>), RouteError> {
        let (shards, _) = cursor
            .resolve_destinations(&self.keyspace.name, &[], &[Destination::AllShards])
            .await?;
        let binds = replicate_binds(bind_vars, shards.len());
        Ok((shards, binds))
    }

    async fn params_equal(
        &self,
        cursor: &dyn Cursor,
        bind_vars: &BindVars,
    ) -> Result<(Vec<ResolvedShard>, Vec<BindVars>), RouteError> {
        let value = self.route_value()?.resolve_scalar(bind_vars)?;
        let (shards, _) =
            resolve_shards(cursor, self.route_vindex()?, &self.keyspace, vec![value]).await?;
        let binds = replicate_binds(bind_vars, shards.len());
        Ok((shards, binds))
    }

    async fn params_in(
        &self,
        cursor: &dyn Cursor,
        bind_vars: &BindVars,
    ) -> Result<(Vec<ResolvedShard>, Vec<BindVars>), RouteError> {
        let values = self.route_value()?.resolve_list(bind_vars)?;
        let (shards, shard_values) =
            resolve_shards(cursor, self.route_vindex()?, &self.keyspace, values).await?;
        let binds = shard_vars(bind_vars, shard_values);
        Ok((shards, binds))
    }

    async fn params_multi_equal(
        &self,
        cursor: &dyn Cursor,
        bind_vars: &BindVars,
    ) -> Result<(Vec<ResolvedShard>, Vec<BindVars>), RouteError> {
        let values = self.route_value()?.resolve_list(bind_vars)?;
        let (shards, _) =
            resolve_shards(cursor, self.route_vindex()?, &self.keyspace, values).await?;
        let binds = replicate_binds(bind_vars, shards.len());
        Ok((shards, binds))
    }

    fn route_vindex(&self) -> Result<&dyn Vindex, RouteError> {
        self.vindex
            .as_deref()
            .ok_or_else(|| RouteError::Internal(format!("{} route without a vindex", self.opcode)))
    }

    fn route_value(&self) -> Result<&super::RouteValue, RouteError> {
        self.value
            .as_ref()
            .ok_or_else(|| RouteError::Internal(format!("{} route without a value", self.opcode)))
    }

    fn deadline_guard(&self, cursor: &dyn Cursor) -> Option<CancelGuard> {
        if self.query_timeout_ms == 0 {
            return None;
        }
        Some(cursor.set_context_timeout(Duration::from_millis(self.query_timeout_ms)))
    }

    /// Records each failed shard as a session warning and counts the scatter
    /// as a partial success.
    pub(crate) fn demote_to_warnings(&self, cursor: &dyn Cursor, errors: Vec<RouteError>) {
        RouteMetrics::global().record_partial_success_scatter();
        let session = cursor.session();
        for error in errors {
            let sql_error = error.sql_error();
            warn!(code = sql_error.code, "scatter shard error demoted to warning: {error}");
            RouteMetrics::global().record_demoted_shard_error();
            session.record_warning(super::Warning {
                code: sql_error.code,
                message: sql_error.message,
            });
        }
    }
}

/// Maps the vindex keys to destinations and resolves them to shards. The
/// second return groups the keys by the shard each one landed on.
pub(crate) async fn resolve_shards(
    cursor: &dyn Cursor,
    vindex: &dyn Vindex,
    keyspace: &Keyspace,
    keys: Vec<Value>,
) -> Result<(Vec<ResolvedShard>, Vec<Vec<Value>>), RouteError> {
    let destinations = vindex.map(cursor, &keys).await?;
    cursor
        .resolve_destinations(&keyspace.name, &keys, &destinations)
        .await
}

/// Runs one query on one shard, consulting the session before autocommit.
pub(crate) async fn exec_shard(
    cursor: &dyn Cursor,
    query: &str,
    bind_vars: &BindVars,
    shard: &ResolvedShard,
    rollback_on_error: bool,
    can_autocommit: bool,
) -> Result<QueryResult, RouteError> {
    let autocommit = can_autocommit && cursor.autocommit_approval();
    let (result, shard_errors) = cursor
        .execute_multi_shard(
            std::slice::from_ref(shard),
            &[BoundQuery { sql: query.to_string(), bind_vars: bind_vars.clone() }],
            rollback_on_error,
            autocommit,
        )
        .await;
    let errors: Vec<RouteError> = shard_errors.into_iter().flatten().collect();
    if errors.is_empty() {
        Ok(result)
    } else {
        Err(RouteError::aggregate(errors))
    }
}

fn replicate_binds(bind_vars: &BindVars, count: usize) -> Vec<BindVars> {
    vec![bind_vars.clone(); count]
}

fn bound_queries(query: &str, shard_binds: Vec<BindVars>) -> Vec<BoundQuery> {
    shard_binds
        .into_iter()
        .map(|bind_vars| BoundQuery { sql: query.to_string(), bind_vars })
        .collect()
}

/// Builds per-shard binds for an IN route: the base binds plus a list
/// variable holding only the vindex keys that mapped to that shard.
fn shard_vars(bind_vars: &BindVars, shard_values: Vec<Vec<Value>>) -> Vec<BindVars> {
    shard_values
        .into_iter()
        .map(|values| {
            let mut binds = bind_vars.clone();
            binds.insert(LIST_VAR_NAME.to_string(), BindVariable::tuple(values));
            binds
        })
        .collect()
}
