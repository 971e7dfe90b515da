//! information_schema routing for the DBA opcode.
//!
//! The plan carries expressions producing the `table_schema` and
//! `table_name` predicates of the original query. Resolving them decides
//! whether the query stays on the route's default keyspace, follows a
//! routed table to another keyspace, or targets the named schema directly
//! with a rewrite marker for the receiving tablet.

use std::collections::BTreeMap;

use quiver_sql::{BindVariable, BindVars, REPLACE_SCHEMA_NAME_VAR, SCHEMA_NAME_VAR};
use tracing::warn;

use super::cursor::{Cursor, Destination, Keyspace, ResolvedShard, TableIdent};
use super::error::RouteError;
use super::Route;
use crate::eval::ExpressionEnv;

/// Schemas owned by the database itself; queries against them never follow
/// routing rules.
fn is_system_schema(schema: &str) -> bool {
    matches!(
        schema.to_ascii_lowercase().as_str(),
        "information_schema" | "mysql" | "performance_schema" | "sys"
    )
}

/// Parameter fan-out for the DBA opcode. The returned binds are the caller's
/// binds plus the schema/table rewrites the decision tree settled on.
pub(crate) async fn params_system_query(
    route: &Route,
    cursor: &dyn Cursor,
    bind_vars: &BindVars,
) -> Result<(Vec<ResolvedShard>, Vec<BindVars>), RouteError> {
    let mut binds = bind_vars.clone();
    let shards = route_info_schema_query(route, cursor, &mut binds).await?;
    Ok((shards, vec![binds]))
}

async fn default_route(
    route: &Route,
    cursor: &dyn Cursor,
) -> Result<Vec<ResolvedShard>, RouteError> {
    let keyspace = &route.keyspace.name;
    let (shards, _) = cursor
        .resolve_destinations(keyspace, &[], &[Destination::AnyShard])
        .await
        .map_err(|err| RouteError::KeyspaceUnavailable {
            keyspace: keyspace.clone(),
            message: err.to_string(),
        })?;
    Ok(shards)
}

async fn route_info_schema_query(
    route: &Route,
    cursor: &dyn Cursor,
    binds: &mut BindVars,
) -> Result<Vec<ResolvedShard>, RouteError> {
    if route.sys_table_name.is_empty() && route.sys_table_schema.is_empty() {
        return default_route(route, cursor).await;
    }

    // Every schema expression must agree on a single keyspace.
    let mut specified_schema = String::new();
    {
        let env = ExpressionEnv::new(binds);
        for expr in &route.sys_table_schema {
            let schema = expr.evaluate(&env)?.raw_str().into_owned();
            if specified_schema.is_empty() {
                specified_schema = schema;
            } else if specified_schema != schema {
                return Err(RouteError::UnsupportedMultiSchema);
            }
        }
    }
    if !specified_schema.is_empty() {
        binds.insert(
            SCHEMA_NAME_VAR.to_string(),
            BindVariable::string(specified_schema.clone()),
        );
    }

    let mut table_names = BTreeMap::new();
    {
        let env = ExpressionEnv::new(binds);
        for (bind_name, expr) in &route.sys_table_name {
            let table = expr.evaluate(&env)?.raw_str().into_owned();
            table_names.insert(bind_name.clone(), table);
        }
    }
    for (bind_name, table) in &table_names {
        binds.insert(bind_name.clone(), BindVariable::string(table.clone()));
    }

    // Queries about the database's own schemas stay on the default keyspace.
    if is_system_schema(&specified_schema) {
        return default_route(route, cursor).await;
    }

    if !table_names.is_empty() {
        match params_routed_table(cursor, binds, &specified_schema, &table_names).await {
            Ok(Some(shards)) => return Ok(shards),
            Ok(None) => {}
            // A schema name that is not a keyspace can still be legal: the
            // table_schema predicate may name the backing database. Fall
            // back to the default keyspace.
            Err(err) if err.is_bad_keyspace() => return default_route(route, cursor).await,
            Err(err) => return Err(err),
        }
    }

    // No routed table and no schema to look up.
    if specified_schema.is_empty() {
        return default_route(route, cursor).await;
    }

    // Only a schema name to work with: target it directly and ask the
    // tablet to rewrite the schema predicate.
    match cursor
        .resolve_destinations(&specified_schema, &[], &[Destination::AnyShard])
        .await
    {
        Ok((shards, _)) => {
            set_replace_schema_name(binds);
            Ok(shards)
        }
        Err(_) => {
            warn!(
                keyspace = %specified_schema,
                "failed to route information_schema query to keyspace"
            );
            binds.insert(
                SCHEMA_NAME_VAR.to_string(),
                BindVariable::string(specified_schema),
            );
            default_route(route, cursor).await
        }
    }
}

/// Resolves the named tables against the routing rules. All routed tables
/// must land in one keyspace; their bind variables are rewritten to the
/// targets' real names.
async fn params_routed_table(
    cursor: &dyn Cursor,
    binds: &mut BindVars,
    table_schema: &str,
    table_names: &BTreeMap<String, String>,
) -> Result<Option<Vec<ResolvedShard>>, RouteError> {
    let mut routed_keyspace: Option<Keyspace> = None;
    for (bind_name, table_name) in table_names {
        let table = TableIdent {
            qualifier: table_schema.to_string(),
            name: table_name.clone(),
        };
        match cursor.find_routed_table(&table).await? {
            Some(routed) => {
                if let Some(keyspace) = &routed_keyspace {
                    if keyspace.name != routed.keyspace.name {
                        return Err(RouteError::CrossKeyspace(
                            keyspace.name.clone(),
                            routed.keyspace.name,
                        ));
                    }
                } else {
                    routed_keyspace = Some(routed.keyspace.clone());
                }
                binds.insert(bind_name.clone(), BindVariable::string(routed.name));
            }
            None => {
                binds.insert(bind_name.clone(), BindVariable::string(table_name.clone()));
            }
        }
    }

    let Some(keyspace) = routed_keyspace else {
        return Ok(None);
    };
    let (shards, _) = cursor
        .resolve_destinations(&keyspace.name, &[], &[Destination::AnyShard])
        .await?;
    if !table_schema.is_empty() {
        set_replace_schema_name(binds);
    }
    Ok(Some(shards))
}

/// Marks the query for schema-name rewriting on the tablet and drops the
/// now-stale schema bind.
fn set_replace_schema_name(binds: &mut BindVars) {
    binds.remove(SCHEMA_NAME_VAR);
    binds.insert(REPLACE_SCHEMA_NAME_VAR.to_string(), BindVariable::int64(1));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_schemas_are_recognized_case_insensitively() {
        assert!(is_system_schema("mysql"));
        assert!(is_system_schema("INFORMATION_SCHEMA"));
        assert!(is_system_schema("Performance_Schema"));
        assert!(!is_system_schema("commerce"));
        assert!(!is_system_schema(""));
    }

    #[test]
    fn replace_schema_marker_evicts_the_schema_bind() {
        let mut binds = BindVars::new();
        binds.insert(SCHEMA_NAME_VAR.to_string(), BindVariable::string("shop"));
        set_replace_schema_name(&mut binds);
        assert!(!binds.contains_key(SCHEMA_NAME_VAR));
        assert_eq!(
            binds.get(REPLACE_SCHEMA_NAME_VAR),
            Some(&BindVariable::int64(1))
        );
    }
}
