//! Null-safe SQL comparison.

use std::cmp::Ordering;

use quiver_sql::{CollationId, CollationRegistry, SqlType, Value};

use super::error::EvalError;
use super::result::{cast_to, coerce_to, EvalResult};

/// Three-way comparison with NULL as the least element.
///
/// Byte-comparable types (binary, temporal, ENUM, SET, JSON, BIT) compare as
/// raw bytes. Everything else is coerced to a common type first: numerics
/// compare in the promoted domain, text through the named collation.
pub fn null_safe_compare(
    v1: &Value,
    v2: &Value,
    collation_id: CollationId,
) -> Result<Ordering, EvalError> {
    match (v1.is_null(), v2.is_null()) {
        (true, true) => return Ok(Ordering::Equal),
        (true, false) => return Ok(Ordering::Less),
        (false, true) => return Ok(Ordering::Greater),
        (false, false) => {}
    }

    if is_byte_comparable(v1.typ()) && is_byte_comparable(v2.typ()) {
        return Ok(v1.raw_bytes().cmp(v2.raw_bytes()));
    }

    let typ = coerce_to(v1.typ(), v2.typ())?;
    let v1_cast = cast_to(v1, typ)?;
    let v2_cast = cast_to(v2, typ)?;

    if typ.is_number() {
        return Ok(compare_numeric(v1_cast, v2_cast));
    }
    if typ.is_text() || typ.is_binary() {
        let collation = CollationRegistry::global()
            .lookup(collation_id)
            .ok_or(EvalError::UnsupportedCollation(collation_id))?;
        let cmp = collation.collate(v1.raw_bytes(), v2.raw_bytes(), false);
        return Ok(cmp.cmp(&0));
    }
    Err(EvalError::UnsupportedComparison { left: v1.typ(), right: v2.typ() })
}

/// Smaller of the two values; NULL loses unless both sides are NULL.
pub fn min(v1: &Value, v2: &Value, collation_id: CollationId) -> Result<Value, EvalError> {
    min_max(v1, v2, true, collation_id)
}

/// Larger of the two values; NULL loses unless both sides are NULL.
pub fn max(v1: &Value, v2: &Value, collation_id: CollationId) -> Result<Value, EvalError> {
    min_max(v1, v2, false, collation_id)
}

fn min_max(
    v1: &Value,
    v2: &Value,
    want_min: bool,
    collation_id: CollationId,
) -> Result<Value, EvalError> {
    if v1.is_null() {
        return Ok(v2.clone());
    }
    if v2.is_null() {
        return Ok(v1.clone());
    }

    let v1_is_smaller = null_safe_compare(v1, v2, collation_id)? == Ordering::Less;
    if want_min == v1_is_smaller {
        Ok(v1.clone())
    } else {
        Ok(v2.clone())
    }
}

/// Types whose literal bytes order the same way their values do.
pub(crate) fn is_byte_comparable(typ: SqlType) -> bool {
    typ.is_binary()
        || matches!(
            typ,
            SqlType::Timestamp
                | SqlType::Date
                | SqlType::Time
                | SqlType::Datetime
                | SqlType::Enum
                | SqlType::Set
                | SqlType::Json
                | SqlType::Bit
        )
}

/// Numeric comparison across the Int64/Uint64/Float64 domains. Mixed
/// signedness short-circuits when one side cannot reach the other's range.
pub(crate) fn compare_numeric(mut v1: EvalResult, mut v2: EvalResult) -> Ordering {
    // Equalize the types pairwise.
    match (v1.typ, v2.typ) {
        (SqlType::Int64, SqlType::Uint64) => {
            if v2.numval > i64::MAX as u64 {
                return Ordering::Less;
            }
            v2 = EvalResult::int64(v2.numval as i64);
        }
        (SqlType::Int64, SqlType::Float64) => {
            v1 = EvalResult::float64(v1.numval as i64 as f64);
        }
        (SqlType::Uint64, SqlType::Int64) => {
            if v1.numval > i64::MAX as u64 {
                return Ordering::Greater;
            }
            v1 = EvalResult::int64(v1.numval as i64);
        }
        (SqlType::Uint64, SqlType::Float64) => {
            v1 = EvalResult::float64(v1.numval as f64);
        }
        (SqlType::Float64, SqlType::Int64) => {
            v2 = EvalResult::float64(v2.numval as i64 as f64);
        }
        (SqlType::Float64, SqlType::Uint64) => {
            v2 = EvalResult::float64(v2.numval as f64);
        }
        _ => {}
    }

    match v1.typ {
        SqlType::Int64 => (v1.numval as i64).cmp(&(v2.numval as i64)),
        SqlType::Uint64 => v1.numval.cmp(&v2.numval),
        _ => f64::from_bits(v1.numval)
            .partial_cmp(&f64::from_bits(v2.numval))
            .unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_sql::{COLLATION_ASCII_GENERAL_CI, COLLATION_BINARY, COLLATION_UNKNOWN};

    fn cmp(v1: &Value, v2: &Value) -> Ordering {
        null_safe_compare(v1, v2, COLLATION_BINARY).expect("comparable")
    }

    #[test]
    fn null_is_the_least_element() {
        assert_eq!(cmp(&Value::null(), &Value::new_int64(0)), Ordering::Less);
        assert_eq!(cmp(&Value::new_int64(0), &Value::null()), Ordering::Greater);
        assert_eq!(cmp(&Value::null(), &Value::null()), Ordering::Equal);
    }

    #[test]
    fn comparison_is_antisymmetric() {
        let samples = [
            Value::null(),
            Value::new_int64(-3),
            Value::new_int64(7),
            Value::new_uint64(u64::MAX),
            Value::new_float64(2.25),
            Value::new_varchar("7"),
        ];
        for a in &samples {
            for b in &samples {
                assert_eq!(
                    cmp(a, b),
                    cmp(b, a).reverse(),
                    "compare({a}, {b}) should mirror compare({b}, {a})"
                );
            }
        }
    }

    #[test]
    fn unsigned_beyond_signed_range_compares_greater() {
        let big = Value::new_uint64(u64::MAX);
        let small = Value::new_int64(i64::MAX);
        assert_eq!(cmp(&small, &big), Ordering::Less);
        assert_eq!(cmp(&big, &small), Ordering::Greater);
    }

    #[test]
    fn numbers_compare_against_numeric_strings() {
        assert_eq!(cmp(&Value::new_int64(10), &Value::new_varchar("9.5")), Ordering::Greater);
        assert_eq!(cmp(&Value::new_int64(10), &Value::new_varchar("10")), Ordering::Equal);
    }

    #[test]
    fn text_comparison_uses_the_named_collation() {
        let a = Value::new_varchar("HELLO");
        let b = Value::new_varchar("hello");
        let ci = null_safe_compare(&a, &b, COLLATION_ASCII_GENERAL_CI).expect("ci compare");
        assert_eq!(ci, Ordering::Equal);
        let bin = null_safe_compare(&a, &b, COLLATION_BINARY).expect("binary compare");
        assert_ne!(bin, Ordering::Equal);
    }

    #[test]
    fn unknown_collation_fails_text_comparison() {
        let a = Value::new_varchar("x");
        let b = Value::new_varchar("y");
        let err = null_safe_compare(&a, &b, COLLATION_UNKNOWN).expect_err("no collation");
        assert!(matches!(err, EvalError::UnsupportedCollation(_)));
    }

    #[test]
    fn temporal_values_compare_as_bytes() {
        let early = Value::new_datetime("2024-01-01 00:00:00");
        let late = Value::new_datetime("2024-06-15 12:00:00");
        assert_eq!(cmp(&early, &late), Ordering::Less);
    }

    #[test]
    fn min_max_absorb_null_only_when_both_null() {
        let five = Value::new_int64(5);
        assert_eq!(min(&Value::null(), &five, COLLATION_BINARY).expect("min"), five);
        assert_eq!(max(&five, &Value::null(), COLLATION_BINARY).expect("max"), five);
        assert_eq!(
            min(&Value::null(), &Value::null(), COLLATION_BINARY).expect("min"),
            Value::null()
        );
        assert_eq!(
            min(&Value::new_int64(3), &five, COLLATION_BINARY).expect("min"),
            Value::new_int64(3)
        );
    }
}
