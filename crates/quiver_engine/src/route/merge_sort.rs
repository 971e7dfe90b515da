//! Streaming k-way merge of ordered shard streams.
//!
//! Each shard stream runs behind a channel; the merger repeatedly picks the
//! least head row across the streams, so the output is totally ordered by
//! the plan's comparator while rows from one shard keep their arrival
//! order. Fields are emitted exactly once, taken from the first producer
//! that reports them.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::{join, join_all};
use quiver_sql::{BindVars, Field, QueryResult, Row};
use tokio::sync::mpsc;
use tracing::warn;

use super::cursor::{Cursor, ResolvedShard, StreamCallback, StreamExecutor};
use super::error::{contains_cancellation, RouteError};
use super::metrics::RouteMetrics;
use super::sort::compare_rows;
use super::OrderByParams;

/// One shard's slice of a streaming route: the query plus the binds and
/// endpoint it was fanned out with.
pub(crate) struct ShardRoute {
    query: String,
    shard: ResolvedShard,
    bind_vars: BindVars,
}

impl ShardRoute {
    pub(crate) fn new(query: String, shard: ResolvedShard, bind_vars: BindVars) -> Self {
        ShardRoute { query, shard, bind_vars }
    }
}

#[async_trait]
impl StreamExecutor for ShardRoute {
    async fn stream_execute(
        &self,
        cursor: &dyn Cursor,
        _want_fields: bool,
        callback: StreamCallback<'_>,
    ) -> Result<(), RouteError> {
        let shard_errors = cursor
            .stream_execute_multi(
                &self.query,
                std::slice::from_ref(&self.shard),
                std::slice::from_ref(&self.bind_vars),
                false,
                false,
                callback,
            )
            .await;
        let errors: Vec<RouteError> = shard_errors.into_iter().flatten().collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RouteError::aggregate(errors))
        }
    }
}

/// Merge-sorts the streams of its child primitives into one ordered stream.
pub struct MergeSort {
    primitives: Vec<Arc<dyn StreamExecutor>>,
    order_by: Vec<OrderByParams>,
    scatter_errors_as_warnings: bool,
}

impl MergeSort {
    pub fn new(
        primitives: Vec<Arc<dyn StreamExecutor>>,
        order_by: Vec<OrderByParams>,
        scatter_errors_as_warnings: bool,
    ) -> Self {
        MergeSort { primitives, order_by, scatter_errors_as_warnings }
    }

    async fn merge(
        &self,
        mut receivers: Vec<mpsc::UnboundedReceiver<QueryResult>>,
        want_fields: bool,
        callback: StreamCallback<'_>,
    ) -> Result<(), RouteError> {
        struct StreamState {
            receiver: mpsc::UnboundedReceiver<QueryResult>,
            rows: VecDeque<Row>,
            done: bool,
        }

        let mut fields: Option<Vec<Field>> = None;
        let mut states: Vec<StreamState> = Vec::with_capacity(receivers.len());

        // Prime every stream: pull until it yields its first row (or ends),
        // capturing fields along the way.
        for receiver in receivers.drain(..) {
            let mut state = StreamState { receiver, rows: VecDeque::new(), done: false };
            while state.rows.is_empty() && !state.done {
                match state.receiver.recv().await {
                    Some(chunk) => {
                        if fields.is_none() && !chunk.fields.is_empty() {
                            fields = Some(chunk.fields);
                        }
                        state.rows.extend(chunk.rows);
                    }
                    None => state.done = true,
                }
            }
            states.push(state);
        }

        if want_fields {
            callback(QueryResult::with_fields(fields.unwrap_or_default()))?;
        }

        loop {
            // Refill drained streams before choosing the next row.
            for state in &mut states {
                while state.rows.is_empty() && !state.done {
                    match state.receiver.recv().await {
                        Some(chunk) => state.rows.extend(chunk.rows),
                        None => state.done = true,
                    }
                }
            }

            let mut best: Option<usize> = None;
            for candidate in 0..states.len() {
                if states[candidate].rows.is_empty() {
                    continue;
                }
                best = match best {
                    None => Some(candidate),
                    Some(current) => {
                        let ordering = compare_rows(
                            &self.order_by,
                            &states[candidate].rows[0],
                            &states[current].rows[0],
                        )?;
                        // Ties keep the lower stream index for determinism.
                        if ordering == std::cmp::Ordering::Less {
                            Some(candidate)
                        } else {
                            Some(current)
                        }
                    }
                };
            }

            let Some(winner) = best else {
                return Ok(());
            };
            let row = states[winner]
                .rows
                .pop_front()
                .unwrap_or_default();
            callback(QueryResult { rows: vec![row], ..Default::default() })?;
        }
    }
}

#[async_trait]
impl StreamExecutor for MergeSort {
    async fn stream_execute(
        &self,
        cursor: &dyn Cursor,
        want_fields: bool,
        callback: StreamCallback<'_>,
    ) -> Result<(), RouteError> {
        let mut senders = Vec::with_capacity(self.primitives.len());
        let mut receivers = Vec::with_capacity(self.primitives.len());
        for _ in &self.primitives {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            receivers.push(rx);
        }

        let producers = join_all(self.primitives.iter().zip(senders).map(|(primitive, tx)| {
            async move {
                let mut forward = move |chunk: QueryResult| {
                    tx.send(chunk).map_err(|_| RouteError::Cancelled)
                };
                primitive.stream_execute(cursor, want_fields, &mut forward).await
            }
        }));
        let merger = self.merge(receivers, want_fields, callback);

        let (producer_results, merge_result) = join(producers, merger).await;
        merge_result?;

        let errors: Vec<RouteError> =
            producer_results.into_iter().filter_map(Result::err).collect();
        if !errors.is_empty() {
            if !self.scatter_errors_as_warnings
                || errors.len() == self.primitives.len()
                || contains_cancellation(&errors)
            {
                return Err(RouteError::aggregate(errors));
            }
            RouteMetrics::global().record_partial_success_scatter();
            let session = cursor.session();
            for error in errors {
                let sql_error = error.sql_error();
                warn!(
                    code = sql_error.code,
                    "merge-sort shard error demoted to warning: {error}"
                );
                RouteMetrics::global().record_demoted_shard_error();
                session.record_warning(super::Warning {
                    code: sql_error.code,
                    message: sql_error.message,
                });
            }
        }
        Ok(())
    }
}
