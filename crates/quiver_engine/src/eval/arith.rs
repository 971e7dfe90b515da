//! Null-safe SQL arithmetic with MySQL overflow semantics.
//!
//! Every binary operation normalizes its operands to numerics, reorders them
//! so the richer type leads (Float64 > Uint64 > Int64), then dispatches to a
//! type-pair kernel. The kernels come in two flavors: the checked ones fail
//! with `DataOutOfRange` on overflow and back the public operations; the
//! unchecked ones promote overflowing integers to Float64 and exist for
//! callers that must stay total, such as streaming aggregators.

use quiver_sql::{SqlType, Value};

use super::error::EvalError;
use super::result::{
    coerce_to_float, make_numeric, make_numeric_and_prioritize, EvalResult,
};

/// Adds two values. NULL on either side yields NULL; integer overflow fails.
pub fn add(v1: &Value, v2: &Value) -> Result<Value, EvalError> {
    if v1.is_null() || v2.is_null() {
        return Ok(Value::null());
    }
    let lv1 = EvalResult::from_value(v1)?;
    let lv2 = EvalResult::from_value(v2)?;
    let result = add_numeric_with_error(lv1, lv2)?;
    Ok(result.to_sql_value(result.typ))
}

/// Subtracts `v2` from `v1` with the same null and overflow rules as [`add`].
pub fn sub(v1: &Value, v2: &Value) -> Result<Value, EvalError> {
    if v1.is_null() || v2.is_null() {
        return Ok(Value::null());
    }
    let lv1 = EvalResult::from_value(v1)?;
    let lv2 = EvalResult::from_value(v2)?;
    let result = subtract_numeric_with_error(lv1, lv2)?;
    Ok(result.to_sql_value(result.typ))
}

/// Multiplies two values with the same null and overflow rules as [`add`].
pub fn mul(v1: &Value, v2: &Value) -> Result<Value, EvalError> {
    if v1.is_null() || v2.is_null() {
        return Ok(Value::null());
    }
    let lv1 = EvalResult::from_value(v1)?;
    let lv2 = EvalResult::from_value(v2)?;
    let result = multiply_numeric_with_error(lv1, lv2)?;
    Ok(result.to_sql_value(result.typ))
}

/// Float division, replicating the SQL `/` operator: a zero divisor yields
/// NULL rather than an error.
///
/// Kept quirk: the divisor is float-converted up front, so a divisor that
/// fails conversion surfaces that error here and the NULL-for-zero check
/// runs against the converted value only.
pub fn div(v1: &Value, v2: &Value) -> Result<Value, EvalError> {
    if v1.is_null() || v2.is_null() {
        return Ok(Value::null());
    }

    let divisor = to_float64(v2)?;
    if divisor == 0.0 {
        return Ok(Value::null());
    }

    let lv1 = EvalResult::from_value(v1)?;
    let lv2 = EvalResult::from_value(v2)?;
    let result = divide_numeric_with_error(lv1, lv2)?;
    Ok(result.to_sql_value(result.typ))
}

/// Adds two values treating NULL as the zero of `result_type`; only two NULL
/// inputs can produce a NULL-typed zero result. The sum is rendered under
/// `result_type`.
pub fn null_safe_add(v1: &Value, v2: &Value, result_type: SqlType) -> Result<Value, EvalError> {
    let zero = || Value::new_trusted(result_type, b"0".to_vec());
    let v1 = if v1.is_null() { zero() } else { v1.clone() };
    let v2 = if v2.is_null() { zero() } else { v2.clone() };

    let lv1 = EvalResult::from_value(&v1)?;
    let lv2 = EvalResult::from_value(&v2)?;
    let result = add_numeric_with_error(lv1, lv2)?;
    Ok(result.to_sql_value(result_type))
}

/// Converts a value to a float for divisor checks and float kernels.
pub fn to_float64(v: &Value) -> Result<f64, EvalError> {
    let typ = v.typ();
    if typ.is_null() {
        return Ok(0.0);
    }
    if typ.is_signed() {
        return Ok(v.to_i64()? as f64);
    }
    if typ.is_unsigned() {
        return Ok(v.to_u64()? as f64);
    }
    if typ.is_float() || typ == SqlType::Decimal || typ.is_text() || typ.is_binary() {
        return Ok(v.to_f64()?);
    }
    Err(EvalError::InvalidArithmetic(v.to_string(), "FLOAT64".to_string()))
}

fn invalid_arithmetic(v1: &EvalResult, v2: &EvalResult) -> EvalError {
    EvalError::InvalidArithmetic(v1.value().to_string(), v2.value().to_string())
}

/// Total addition kernel: integer overflow promotes to Float64 instead of
/// failing. Retained for callers that cannot fail mid-stream; the public
/// operations use [`add_numeric_with_error`]'s checked semantics instead.
pub fn add_numeric(i1: EvalResult, i2: EvalResult) -> EvalResult {
    let (v1, v2) = make_numeric_and_prioritize(i1, i2);
    match v1.typ {
        SqlType::Int64 => int_plus_int(v1.numval as i64, v2.numval as i64),
        SqlType::Uint64 => match v2.typ {
            SqlType::Int64 => uint_plus_int(v1.numval, v2.numval),
            SqlType::Uint64 => uint_plus_uint(v1.numval, v2.numval),
            // After prioritization the second operand is never richer.
            _ => unreachable!("prioritized operands out of order"),
        },
        SqlType::Float64 => float_plus_any(f64::from_bits(v1.numval), &v2),
        _ => unreachable!("make_numeric produced a non-numeric type"),
    }
}

pub(crate) fn add_numeric_with_error(
    i1: EvalResult,
    i2: EvalResult,
) -> Result<EvalResult, EvalError> {
    let (v1, v2) = make_numeric_and_prioritize(i1, i2);
    match v1.typ {
        SqlType::Int64 => int_plus_int_with_error(v1.numval as i64, v2.numval as i64),
        SqlType::Uint64 => match v2.typ {
            SqlType::Int64 => uint_plus_int_with_error(v1.numval, v2.numval as i64),
            SqlType::Uint64 => uint_plus_uint_with_error(v1.numval, v2.numval),
            _ => Err(invalid_arithmetic(&v1, &v2)),
        },
        SqlType::Float64 => Ok(float_plus_any(f64::from_bits(v1.numval), &v2)),
        _ => Err(invalid_arithmetic(&v1, &v2)),
    }
}

pub(crate) fn subtract_numeric_with_error(
    i1: EvalResult,
    i2: EvalResult,
) -> Result<EvalResult, EvalError> {
    let v1 = make_numeric(i1);
    let v2 = make_numeric(i2);
    match (v1.typ, v2.typ) {
        (SqlType::Int64, SqlType::Int64) => {
            int_minus_int_with_error(v1.numval as i64, v2.numval as i64)
        }
        (SqlType::Int64, SqlType::Uint64) => {
            int_minus_uint_with_error(v1.numval as i64, v2.numval)
        }
        (SqlType::Int64, SqlType::Float64) => {
            Ok(any_minus_float(&v1, f64::from_bits(v2.numval)))
        }
        (SqlType::Uint64, SqlType::Int64) => {
            uint_minus_int_with_error(v1.numval, v2.numval as i64)
        }
        (SqlType::Uint64, SqlType::Uint64) => uint_minus_uint_with_error(v1.numval, v2.numval),
        (SqlType::Uint64, SqlType::Float64) => {
            Ok(any_minus_float(&v1, f64::from_bits(v2.numval)))
        }
        (SqlType::Float64, _) => Ok(float_minus_any(f64::from_bits(v1.numval), &v2)),
        _ => Err(invalid_arithmetic(&v1, &v2)),
    }
}

pub(crate) fn multiply_numeric_with_error(
    i1: EvalResult,
    i2: EvalResult,
) -> Result<EvalResult, EvalError> {
    let (v1, v2) = make_numeric_and_prioritize(i1, i2);
    match v1.typ {
        SqlType::Int64 => int_times_int_with_error(v1.numval as i64, v2.numval as i64),
        SqlType::Uint64 => match v2.typ {
            SqlType::Int64 => uint_times_int_with_error(v1.numval, v2.numval as i64),
            SqlType::Uint64 => uint_times_uint_with_error(v1.numval, v2.numval),
            _ => Err(invalid_arithmetic(&v1, &v2)),
        },
        SqlType::Float64 => Ok(float_times_any(f64::from_bits(v1.numval), &v2)),
        _ => Err(invalid_arithmetic(&v1, &v2)),
    }
}

pub(crate) fn divide_numeric_with_error(
    i1: EvalResult,
    i2: EvalResult,
) -> Result<EvalResult, EvalError> {
    let v1 = make_numeric(i1);
    let v2 = make_numeric(i2);
    match v1.typ {
        SqlType::Int64 => float_divide_any_with_error(v1.numval as i64 as f64, &v2),
        SqlType::Uint64 => float_divide_any_with_error(v1.numval as f64, &v2),
        SqlType::Float64 => float_divide_any_with_error(f64::from_bits(v1.numval), &v2),
        _ => Err(invalid_arithmetic(&v1, &v2)),
    }
}

fn int_plus_int(v1: i64, v2: i64) -> EvalResult {
    let result = v1.wrapping_add(v2);
    if (v1 > 0 && v2 > 0 && result < 0) || (v1 < 0 && v2 < 0 && result > 0) {
        return EvalResult::float64(v1 as f64 + v2 as f64);
    }
    EvalResult::int64(result)
}

fn int_plus_int_with_error(v1: i64, v2: i64) -> Result<EvalResult, EvalError> {
    let result = v1.wrapping_add(v2);
    if (result > v1) != (v2 > 0) {
        return Err(EvalError::out_of_range("BIGINT", "+", v1, v2));
    }
    Ok(EvalResult::int64(result))
}

fn int_minus_int_with_error(v1: i64, v2: i64) -> Result<EvalResult, EvalError> {
    let result = v1.wrapping_sub(v2);
    if (result < v1) != (v2 > 0) {
        return Err(EvalError::out_of_range("BIGINT", "-", v1, v2));
    }
    Ok(EvalResult::int64(result))
}

fn int_times_int_with_error(v1: i64, v2: i64) -> Result<EvalResult, EvalError> {
    let result = v1.wrapping_mul(v2);
    if v1 != 0 && result.wrapping_div(v1) != v2 {
        return Err(EvalError::out_of_range("BIGINT", "*", v1, v2));
    }
    Ok(EvalResult::int64(result))
}

fn int_minus_uint_with_error(v1: i64, v2: u64) -> Result<EvalResult, EvalError> {
    // The result must fit in the unsigned domain.
    if v1 < 0 || v1 < v2 as i64 {
        return Err(EvalError::out_of_range("BIGINT UNSIGNED", "-", v1, v2));
    }
    uint_minus_uint_with_error(v1 as u64, v2)
}

fn uint_plus_int(v1: u64, v2: u64) -> EvalResult {
    uint_plus_uint(v1, v2)
}

fn uint_plus_int_with_error(v1: u64, v2: i64) -> Result<EvalResult, EvalError> {
    let result = v1.wrapping_add(v2 as u64);
    if (v2 < 0 && v1 < v2.unsigned_abs()) || (v2 > 0 && (result < v1 || result < v2 as u64)) {
        return Err(EvalError::out_of_range("BIGINT UNSIGNED", "+", v1, v2));
    }
    // With one unsigned operand the result stays unsigned.
    Ok(EvalResult::uint64(result))
}

fn uint_minus_int_with_error(v1: u64, v2: i64) -> Result<EvalResult, EvalError> {
    if (v1 as i64) < v2 && v2 > 0 {
        return Err(EvalError::out_of_range("BIGINT UNSIGNED", "-", v1, v2));
    }
    // uint - (-int) = uint + int
    if v2 < 0 {
        return uint_plus_int_with_error(v1, v2.wrapping_neg());
    }
    uint_minus_uint_with_error(v1, v2 as u64)
}

fn uint_times_int_with_error(v1: u64, v2: i64) -> Result<EvalResult, EvalError> {
    // The reinterpretation check also rejects any v1 >= 2^63.
    if v2 < 0 || (v1 as i64) < 0 {
        return Err(EvalError::out_of_range("BIGINT UNSIGNED", "*", v1, v2));
    }
    uint_times_uint_with_error(v1, v2 as u64)
}

fn uint_plus_uint(v1: u64, v2: u64) -> EvalResult {
    let result = v1.wrapping_add(v2);
    if result < v2 {
        return EvalResult::float64(v1 as f64 + v2 as f64);
    }
    EvalResult::uint64(result)
}

fn uint_plus_uint_with_error(v1: u64, v2: u64) -> Result<EvalResult, EvalError> {
    let result = v1.wrapping_add(v2);
    if result < v1 || result < v2 {
        return Err(EvalError::out_of_range("BIGINT UNSIGNED", "+", v1, v2));
    }
    Ok(EvalResult::uint64(result))
}

fn uint_minus_uint_with_error(v1: u64, v2: u64) -> Result<EvalResult, EvalError> {
    if v2 > v1 {
        return Err(EvalError::out_of_range("BIGINT UNSIGNED", "-", v1, v2));
    }
    Ok(EvalResult::uint64(v1 - v2))
}

fn uint_times_uint_with_error(v1: u64, v2: u64) -> Result<EvalResult, EvalError> {
    let result = v1.wrapping_mul(v2);
    if result < v1 || result < v2 {
        return Err(EvalError::out_of_range("BIGINT UNSIGNED", "*", v1, v2));
    }
    Ok(EvalResult::uint64(result))
}

fn float_plus_any(v1: f64, v2: &EvalResult) -> EvalResult {
    EvalResult::float64(v1 + coerce_to_float(v2))
}

fn float_minus_any(v1: f64, v2: &EvalResult) -> EvalResult {
    EvalResult::float64(v1 - coerce_to_float(v2))
}

fn float_times_any(v1: f64, v2: &EvalResult) -> EvalResult {
    EvalResult::float64(v1 * coerce_to_float(v2))
}

fn float_divide_any_with_error(v1: f64, v2: &EvalResult) -> Result<EvalResult, EvalError> {
    let v2f = coerce_to_float(v2);
    let result = v1 / v2f;

    // A sub-unit divisor can push the quotient past the representable range;
    // the multiply-back check catches the magnitude loss.
    if v2f < 1.0 && v2f * result != v1 {
        return Err(EvalError::out_of_range("BIGINT", "/", v1, v2f));
    }
    Ok(EvalResult::float64(result))
}

fn any_minus_float(v1: &EvalResult, v2: f64) -> EvalResult {
    EvalResult::float64(coerce_to_float(v1) - v2)
}
