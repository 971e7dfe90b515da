//! Hash codes consistent with null-safe comparison.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use quiver_sql::{CollationId, CollationRegistry, SqlType, Value};

use super::error::EvalError;
use super::result::{cast_to, EvalResult};

/// Every NULL hashes to the same sentinel.
const NULL_HASH: u64 = u64::MAX;

/// Hashes a value so that any two values equal under
/// [`super::null_safe_compare`] (after coercion to `coerce_type`) collide.
pub fn null_safe_hashcode(
    v: &Value,
    collation: CollationId,
    coerce_type: SqlType,
) -> Result<u64, EvalError> {
    let mut cast = cast_to(v, coerce_type)?;
    cast.collation = collation;
    eval_result_hashcode(&cast)
}

fn eval_result_hashcode(er: &EvalResult) -> Result<u64, EvalError> {
    if er.typ.is_null() {
        return Ok(NULL_HASH);
    }
    if er.typ.is_number() {
        // After coercion, equal numerics share their raw bit pattern.
        return Ok(er.numval);
    }
    if er.typ.is_text() {
        let collation = CollationRegistry::global()
            .lookup(er.collation)
            .ok_or(EvalError::UnsupportedCollation(er.collation))?;
        return Ok(collation.hash(&er.bytes, 0));
    }
    if er.typ.is_binary() {
        let collation = CollationRegistry::global()
            .lookup(quiver_sql::COLLATION_BINARY)
            .ok_or(EvalError::UnsupportedCollation(quiver_sql::COLLATION_BINARY))?;
        return Ok(collation.hash(&er.bytes, 0));
    }
    if er.typ.is_temporal() {
        return Ok(temporal_unix_nanos(er)? as u64);
    }
    Err(EvalError::UnsupportedHash(er.typ))
}

/// Parses the literal form of a temporal value into UNIX nanoseconds.
fn temporal_unix_nanos(er: &EvalResult) -> Result<i64, EvalError> {
    let text = String::from_utf8_lossy(&er.bytes);
    let parse_failure = || EvalError::InternalCoercion {
        value: text.clone().into_owned(),
        target: er.typ,
    };

    let datetime = match er.typ {
        SqlType::Date => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map_err(|_| parse_failure())?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| parse_failure())?,
        SqlType::Time => {
            let time = NaiveTime::parse_from_str(&text, "%H:%M:%S%.f")
                .map_err(|_| parse_failure())?;
            NaiveDateTime::UNIX_EPOCH.date().and_time(time)
        }
        SqlType::Datetime | SqlType::Timestamp => {
            NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|_| parse_failure())?
        }
        _ => return Err(parse_failure()),
    };

    datetime
        .and_utc()
        .timestamp_nanos_opt()
        .ok_or_else(|| parse_failure())
}
