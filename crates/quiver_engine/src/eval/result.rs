//! Internal evaluation representation and the coercion rules.
//!
//! An [`EvalResult`] packs numerics into a raw 64-bit word: signed values are
//! reinterpreted, unsigned values stored directly, floats as their IEEE-754
//! bit pattern. Strings keep their bytes. The packing is what makes the
//! hashcode contract cheap: after coercion, equal numerics share `numval`.

use quiver_sql::{CollationId, SqlType, Value, COLLATION_UNKNOWN};

use super::error::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    pub(crate) typ: SqlType,
    /// Raw numeric bits: i64 reinterpreted, u64 direct, f64 bit pattern.
    pub(crate) numval: u64,
    pub(crate) bytes: Vec<u8>,
    pub(crate) collation: CollationId,
}

impl Default for EvalResult {
    fn default() -> Self {
        EvalResult {
            typ: SqlType::Null,
            numval: 0,
            bytes: Vec::new(),
            collation: COLLATION_UNKNOWN,
        }
    }
}

impl EvalResult {
    pub(crate) fn int64(v: i64) -> Self {
        EvalResult { typ: SqlType::Int64, numval: v as u64, ..Default::default() }
    }

    pub(crate) fn uint64(v: u64) -> Self {
        EvalResult { typ: SqlType::Uint64, numval: v, ..Default::default() }
    }

    pub(crate) fn float64(v: f64) -> Self {
        EvalResult { typ: SqlType::Float64, numval: v.to_bits(), ..Default::default() }
    }

    /// Parses a wire value into the evaluation form. Text and binary keep
    /// their bytes; decimals parse to float, matching the arithmetic rules.
    pub(crate) fn from_value(v: &Value) -> Result<EvalResult, EvalError> {
        let typ = v.typ();
        if typ.is_text() || typ.is_binary() {
            return Ok(EvalResult {
                typ: SqlType::VarBinary,
                bytes: v.raw_bytes().to_vec(),
                ..Default::default()
            });
        }
        if typ.is_signed() {
            return Ok(EvalResult::int64(v.to_i64()?));
        }
        if typ.is_unsigned() {
            return Ok(EvalResult::uint64(v.to_u64()?));
        }
        if typ.is_float() || typ == SqlType::Decimal {
            return Ok(EvalResult::float64(v.to_f64()?));
        }
        Ok(EvalResult {
            typ,
            bytes: v.raw_bytes().to_vec(),
            ..Default::default()
        })
    }

    /// Converts back to a wire value under the requested result type family.
    pub(crate) fn to_sql_value(&self, result_type: SqlType) -> Value {
        if result_type.is_signed() {
            let repr = match self.typ {
                SqlType::Int64 | SqlType::Uint64 => (self.numval as i64).to_string(),
                SqlType::Float64 => (f64::from_bits(self.numval) as i64).to_string(),
                _ => return Value::null(),
            };
            return Value::new_trusted(result_type, repr.into_bytes());
        }
        if result_type.is_unsigned() {
            let repr = match self.typ {
                SqlType::Int64 | SqlType::Uint64 => self.numval.to_string(),
                SqlType::Float64 => (f64::from_bits(self.numval) as u64).to_string(),
                _ => return Value::null(),
            };
            return Value::new_trusted(result_type, repr.into_bytes());
        }
        if result_type.is_float() || result_type == SqlType::Decimal {
            let repr = match self.typ {
                SqlType::Int64 => (self.numval as i64).to_string(),
                SqlType::Uint64 => self.numval.to_string(),
                SqlType::Float64 => format!("{}", f64::from_bits(self.numval)),
                _ => return Value::null(),
            };
            return Value::new_trusted(result_type, repr.into_bytes());
        }
        Value::new_trusted(result_type, self.bytes.clone())
    }

    /// Wire form under this result's own type, used in error messages.
    pub(crate) fn value(&self) -> Value {
        self.to_sql_value(self.typ)
    }
}

/// Decides the common type two operands are coerced to before comparison.
///
/// The ladder, in order: equal types stand; NULL absorbs; two textual or
/// binary sides meet at VarChar; any numeric side pulls text to Float64,
/// float or decimal to Float64, and mixed-signedness integers to Uint64.
pub fn coerce_to(t1: SqlType, t2: SqlType) -> Result<SqlType, EvalError> {
    if t1 == t2 {
        return Ok(t1);
    }
    if t1.is_null() || t2.is_null() {
        return Ok(SqlType::Null);
    }
    if (t1.is_text() || t1.is_binary()) && (t2.is_text() || t2.is_binary()) {
        return Ok(SqlType::VarChar);
    }
    if t1.is_number() || t2.is_number() {
        if t1.is_text() || t1.is_binary() || t2.is_text() || t2.is_binary() {
            return Ok(SqlType::Float64);
        }
        if t1.is_float() || t1 == SqlType::Decimal || t2.is_float() || t2 == SqlType::Decimal {
            return Ok(SqlType::Float64);
        }
        if t1.is_signed() {
            if t2.is_unsigned() {
                return Ok(SqlType::Uint64);
            }
            if t2.is_signed() {
                return Ok(SqlType::Int64);
            }
            return Err(EvalError::UnsupportedComparison { left: t1, right: t2 });
        }
        if t1.is_unsigned() && (t2.is_signed() || t2.is_unsigned()) {
            return Ok(SqlType::Uint64);
        }
    }
    Err(EvalError::UnsupportedComparison { left: t1, right: t2 })
}

/// Casts a wire value to the evaluation form of `typ`.
///
/// Signed parses feeding an unsigned target are reinterpreted, not range
/// checked, which is how `-1` compares above `5` once both sides land in the
/// unsigned domain.
pub fn cast_to(v: &Value, typ: SqlType) -> Result<EvalResult, EvalError> {
    let coercion_error = || EvalError::InternalCoercion {
        value: v.to_string(),
        target: typ,
    };

    if typ.is_null() {
        return Ok(EvalResult::default());
    }

    let vt = v.typ();
    if typ.is_float() || typ == SqlType::Decimal {
        if vt.is_signed() {
            return Ok(EvalResult::float64(v.to_i64()? as f64));
        }
        if vt.is_unsigned() {
            return Ok(EvalResult::float64(v.to_u64()? as f64));
        }
        if vt.is_float() || vt == SqlType::Decimal {
            return Ok(EvalResult::float64(v.to_f64()?));
        }
        if vt.is_text() || vt.is_binary() {
            return Ok(EvalResult::float64(parse_string_prefix_to_float(&v.raw_str())));
        }
        return Err(coercion_error());
    }
    if typ.is_signed() {
        if vt.is_signed() {
            return Ok(EvalResult::int64(v.to_i64()?));
        }
        if vt.is_unsigned() {
            return Ok(EvalResult {
                typ: SqlType::Int64,
                numval: v.to_u64()?,
                ..Default::default()
            });
        }
        return Err(coercion_error());
    }
    if typ.is_unsigned() {
        if vt.is_signed() {
            return Ok(EvalResult {
                typ: SqlType::Uint64,
                numval: v.to_i64()? as u64,
                ..Default::default()
            });
        }
        if vt.is_unsigned() {
            return Ok(EvalResult::uint64(v.to_u64()?));
        }
        return Err(coercion_error());
    }
    if typ.is_text() || typ.is_binary() {
        if vt.is_text() || vt.is_binary() {
            return Ok(EvalResult {
                typ: vt,
                bytes: v.raw_bytes().to_vec(),
                ..Default::default()
            });
        }
        return Err(coercion_error());
    }
    if typ.is_temporal() && vt.is_temporal() {
        return Ok(EvalResult {
            typ: vt,
            bytes: v.raw_bytes().to_vec(),
            ..Default::default()
        });
    }
    Err(coercion_error())
}

/// Reduces an evaluation result to a numeric form: numbers stand, strings
/// parse as integer first, then float, and fall back to integer zero.
pub(crate) fn make_numeric(v: EvalResult) -> EvalResult {
    if v.typ.is_number() {
        return v;
    }
    let text = String::from_utf8_lossy(&v.bytes);
    if let Ok(ival) = text.parse::<i64>() {
        return EvalResult::int64(ival);
    }
    if let Ok(fval) = text.parse::<f64>() {
        return EvalResult::float64(fval);
    }
    EvalResult::int64(0)
}

/// Normalizes both operands to numerics and reorders so the richer type
/// leads: Float64 > Uint64 > Int64.
pub(crate) fn make_numeric_and_prioritize(i1: EvalResult, i2: EvalResult) -> (EvalResult, EvalResult) {
    let v1 = make_numeric(i1);
    let v2 = make_numeric(i2);
    match v1.typ {
        SqlType::Int64 if v2.typ == SqlType::Uint64 || v2.typ == SqlType::Float64 => (v2, v1),
        SqlType::Uint64 if v2.typ == SqlType::Float64 => (v2, v1),
        _ => (v1, v2),
    }
}

pub(crate) fn coerce_to_float(v: &EvalResult) -> f64 {
    match v.typ {
        SqlType::Int64 => v.numval as i64 as f64,
        SqlType::Uint64 => v.numval as f64,
        _ => f64::from_bits(v.numval),
    }
}

/// Parses the longest numeric prefix of a string as a float; anything
/// without one is zero. Mirrors the relaxed string-to-number conversion of
/// the SQL comparison rules.
pub(crate) fn parse_string_prefix_to_float(s: &str) -> f64 {
    let s = s.trim();
    for end in (1..=s.len()).rev() {
        if !s.is_char_boundary(end) {
            continue;
        }
        if let Ok(v) = s[..end].parse::<f64>() {
            return v;
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion_ladder_matches_promotion_rules() {
        assert_eq!(coerce_to(SqlType::Int64, SqlType::Int64).unwrap(), SqlType::Int64);
        assert_eq!(coerce_to(SqlType::Null, SqlType::Int64).unwrap(), SqlType::Null);
        assert_eq!(coerce_to(SqlType::VarChar, SqlType::Blob).unwrap(), SqlType::VarChar);
        assert_eq!(coerce_to(SqlType::Int64, SqlType::VarChar).unwrap(), SqlType::Float64);
        assert_eq!(coerce_to(SqlType::Int64, SqlType::Decimal).unwrap(), SqlType::Float64);
        assert_eq!(coerce_to(SqlType::Int64, SqlType::Uint64).unwrap(), SqlType::Uint64);
        assert_eq!(coerce_to(SqlType::Int32, SqlType::Int64).unwrap(), SqlType::Int64);
        assert_eq!(coerce_to(SqlType::Uint32, SqlType::Uint64).unwrap(), SqlType::Uint64);
        assert!(coerce_to(SqlType::Int64, SqlType::Date).is_err());
    }

    #[test]
    fn cast_reinterprets_signed_into_unsigned_domain() {
        let cast = cast_to(&Value::new_int64(-1), SqlType::Uint64).expect("cast");
        assert_eq!(cast.typ, SqlType::Uint64);
        assert_eq!(cast.numval, u64::MAX);
    }

    #[test]
    fn make_numeric_falls_back_to_integer_zero() {
        let text = EvalResult {
            typ: SqlType::VarBinary,
            bytes: b"horse".to_vec(),
            ..Default::default()
        };
        let n = make_numeric(text);
        assert_eq!(n.typ, SqlType::Int64);
        assert_eq!(n.numval, 0);
    }

    #[test]
    fn prioritization_puts_the_richer_type_first() {
        let (a, b) = make_numeric_and_prioritize(EvalResult::int64(5), EvalResult::float64(1.5));
        assert_eq!(a.typ, SqlType::Float64);
        assert_eq!(b.typ, SqlType::Int64);

        let (a, b) = make_numeric_and_prioritize(EvalResult::int64(5), EvalResult::uint64(9));
        assert_eq!(a.typ, SqlType::Uint64);
        assert_eq!(b.typ, SqlType::Int64);
    }

    #[test]
    fn float_prefix_parsing_is_lenient() {
        assert_eq!(parse_string_prefix_to_float("  1.5x"), 1.5);
        assert_eq!(parse_string_prefix_to_float("-2e3garbage"), -2000.0);
        assert_eq!(parse_string_prefix_to_float("horse"), 0.0);
        assert_eq!(parse_string_prefix_to_float(""), 0.0);
    }
}
