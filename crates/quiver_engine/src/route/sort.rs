//! Row ordering for scattered results.

use std::cmp::Ordering;

use quiver_sql::{QueryResult, Value};

use super::error::RouteError;
use super::OrderByParams;
use crate::eval::null_safe_compare;

impl OrderByParams {
    /// Compares two rows under this ordering term. The weight-string column
    /// stands in for the value column when the plan added one.
    pub(crate) fn compare_rows(&self, left: &[Value], right: &[Value]) -> Result<Ordering, RouteError> {
        let index = self.effective_column();
        let lv = row_column(left, index)?;
        let rv = row_column(right, index)?;
        let cmp = null_safe_compare(lv, rv, self.collation_id)?;
        Ok(if self.descending { cmp.reverse() } else { cmp })
    }
}

fn row_column(row: &[Value], index: usize) -> Result<&Value, RouteError> {
    row.get(index).ok_or_else(|| {
        RouteError::Internal(format!(
            "order by column {index} out of range for row of {} columns",
            row.len()
        ))
    })
}

/// Compares two rows under the full ordering term list.
pub(crate) fn compare_rows(
    order_by: &[OrderByParams],
    left: &[Value],
    right: &[Value],
) -> Result<Ordering, RouteError> {
    for param in order_by {
        match param.compare_rows(left, right)? {
            Ordering::Equal => continue,
            decided => return Ok(decided),
        }
    }
    Ok(Ordering::Equal)
}

/// Stable in-memory sort of a complete result. The first comparator error
/// aborts the sort and propagates.
pub(crate) fn sort_result(
    order_by: &[OrderByParams],
    mut result: QueryResult,
) -> Result<QueryResult, RouteError> {
    let mut sort_error: Option<RouteError> = None;
    result.rows.sort_by(|a, b| {
        if sort_error.is_some() {
            // Once poisoned, report equality so the sort unwinds quickly.
            return Ordering::Equal;
        }
        match compare_rows(order_by, a, b) {
            Ok(ordering) => ordering,
            Err(err) => {
                sort_error = Some(err);
                Ordering::Equal
            }
        }
    });

    match sort_error {
        Some(err) => Err(err),
        None => Ok(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_sql::{CollationId, COLLATION_UNKNOWN};

    fn result_of(rows: Vec<Vec<Value>>) -> QueryResult {
        QueryResult { rows, ..Default::default() }
    }

    fn int_row(vals: &[i64]) -> Vec<Value> {
        vals.iter().copied().map(Value::new_int64).collect()
    }

    #[test]
    fn sorts_ascending_with_nulls_first() {
        let result = result_of(vec![
            vec![Value::new_int64(3)],
            vec![Value::null()],
            vec![Value::new_int64(1)],
        ]);
        let sorted = sort_result(&[OrderByParams::ascending(0)], result).expect("sort");
        assert_eq!(
            sorted.rows,
            vec![
                vec![Value::null()],
                vec![Value::new_int64(1)],
                vec![Value::new_int64(3)],
            ]
        );
    }

    #[test]
    fn descending_puts_nulls_last() {
        let result = result_of(vec![
            vec![Value::null()],
            vec![Value::new_int64(5)],
            vec![Value::new_int64(9)],
        ]);
        let sorted = sort_result(&[OrderByParams::descending(0)], result).expect("sort");
        assert_eq!(
            sorted.rows,
            vec![
                vec![Value::new_int64(9)],
                vec![Value::new_int64(5)],
                vec![Value::null()],
            ]
        );
    }

    #[test]
    fn equal_keys_preserve_arrival_order() {
        // Second column tags arrival order; it is not part of the ordering.
        let result = result_of(vec![
            int_row(&[1, 100]),
            int_row(&[0, 200]),
            int_row(&[1, 300]),
            int_row(&[0, 400]),
        ]);
        let sorted = sort_result(&[OrderByParams::ascending(0)], result).expect("sort");
        assert_eq!(
            sorted.rows,
            vec![
                int_row(&[0, 200]),
                int_row(&[0, 400]),
                int_row(&[1, 100]),
                int_row(&[1, 300]),
            ]
        );
    }

    #[test]
    fn weight_string_column_wins_over_value_column() {
        let rows = vec![
            vec![Value::new_varchar("b"), Value::new_binary(b"\x01".to_vec())],
            vec![Value::new_varchar("a"), Value::new_binary(b"\x02".to_vec())],
        ];
        let order = OrderByParams {
            weight_string_col: Some(1),
            ..OrderByParams::ascending(0)
        };
        let sorted = sort_result(&[order], result_of(rows)).expect("sort");
        // The weight bytes order "b" before "a".
        assert_eq!(sorted.rows[0][0], Value::new_varchar("b"));
    }

    #[test]
    fn secondary_terms_break_ties() {
        let result = result_of(vec![int_row(&[1, 2]), int_row(&[1, 1]), int_row(&[0, 9])]);
        let sorted = sort_result(
            &[OrderByParams::ascending(0), OrderByParams::ascending(1)],
            result,
        )
        .expect("sort");
        assert_eq!(sorted.rows, vec![int_row(&[0, 9]), int_row(&[1, 1]), int_row(&[1, 2])]);
    }

    #[test]
    fn first_comparator_error_aborts_the_sort() {
        let result = result_of(vec![
            vec![Value::new_varchar("x")],
            vec![Value::new_varchar("y")],
        ]);
        let order = OrderByParams {
            collation_id: COLLATION_UNKNOWN,
            ..OrderByParams::ascending(0)
        };
        // Text with no usable collation cannot be ordered.
        let err = sort_result(&[order], result).expect_err("uncomparable");
        assert!(matches!(err, RouteError::Eval(_)), "got: {err}");

        let result = result_of(vec![int_row(&[1]), int_row(&[2])]);
        let order = OrderByParams {
            collation_id: CollationId(0),
            ..OrderByParams::ascending(5)
        };
        let err = sort_result(&[order], result).expect_err("out of range");
        assert!(matches!(err, RouteError::Internal(_)));
    }
}
