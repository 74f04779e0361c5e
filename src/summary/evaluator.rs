//! Component B: the summary evaluator.
//!
//! A pure function over a flattened list of values plus optional
//! running `max`/`min` carriers. No knowledge of attributes, nodes, or
//! provenance lives here.

use crate::model::value::flatten;
use crate::model::{AttributeValue, SummaryKind};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvaluatorError {
    #[error("summary over an empty value list")]
    EmptyInput,
    #[error("`{0}` cannot be applied to keyword values")]
    NotNumeric(&'static str),
}

/// Carriers threaded through a summary chain for `max`/`min`.
#[derive(Debug, Clone, Default)]
pub struct Carriers {
    pub max_value: Option<AttributeValue>,
    pub min_value: Option<AttributeValue>,
}

/// Evaluate one summary over `values` (flattened first), folding
/// `max`/`min` with the incoming carriers. Returns the summarised
/// value and the carriers updated for `max`/`min` (unchanged for every
/// other summary).
pub fn evaluate(
    summary: SummaryKind,
    values: &[AttributeValue],
    carriers: Carriers,
) -> Result<(AttributeValue, Carriers), EvaluatorError> {
    let flattened = flatten(values);
    if flattened.is_empty() {
        return Err(EvaluatorError::EmptyInput);
    }

    let Carriers { max_value, min_value } = carriers;

    match summary {
        SummaryKind::Count => Ok((
            AttributeValue::Long(flattened.len() as i64),
            Carriers { max_value, min_value },
        )),
        SummaryKind::Max => {
            let candidate = extremum(&flattened, true)?;
            let folded = fold_extreme(candidate, max_value, true);
            Ok((folded.clone(), Carriers { max_value: Some(folded), min_value }))
        }
        SummaryKind::Min => {
            let candidate = extremum(&flattened, false)?;
            let folded = fold_extreme(candidate, min_value, false);
            Ok((folded.clone(), Carriers { max_value, min_value: Some(folded) }))
        }
        SummaryKind::Mean => {
            let mean = numeric_mean(&flattened)?;
            Ok((AttributeValue::Double(mean), Carriers { max_value, min_value }))
        }
        SummaryKind::Median | SummaryKind::MedianHigh | SummaryKind::MedianLow => {
            let value = numeric_median(&flattened, summary)?;
            Ok((value, Carriers { max_value, min_value }))
        }
        SummaryKind::Mode | SummaryKind::MostCommon => {
            Ok((mode(&flattened), Carriers { max_value, min_value }))
        }
        SummaryKind::List => Ok((AttributeValue::List(flattened), Carriers { max_value, min_value })),
    }
}

fn numeric(values: &[AttributeValue], name: &'static str) -> Result<Vec<f64>, EvaluatorError> {
    values
        .iter()
        .map(|v| v.as_f64().ok_or(EvaluatorError::NotNumeric(name)))
        .collect()
}

fn extremum(values: &[AttributeValue], want_max: bool) -> Result<AttributeValue, EvaluatorError> {
    if values.iter().all(|v| matches!(v, AttributeValue::Keyword(_))) {
        let mut strings: Vec<&String> = values
            .iter()
            .map(|v| match v {
                AttributeValue::Keyword(s) => s,
                _ => unreachable!("all-keyword check above guarantees this arm"),
            })
            .collect();
        strings.sort();
        let chosen = if want_max { strings.last() } else { strings.first() };
        return Ok(AttributeValue::Keyword(chosen.expect("non-empty").to_string()));
    }
    let name = if want_max { "max" } else { "min" };
    let nums = numeric(values, name)?;
    let chosen = if want_max {
        nums.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    } else {
        nums.iter().cloned().fold(f64::INFINITY, f64::min)
    };
    Ok(if values.iter().all(|v| matches!(v, AttributeValue::Long(_))) {
        AttributeValue::Long(chosen as i64)
    } else {
        AttributeValue::Double(chosen)
    })
}

/// Fold a freshly computed extremum with a carrier from an earlier
/// sibling's contribution (both already either min or max candidates).
fn fold_extreme(value: AttributeValue, carrier: Option<AttributeValue>, want_max: bool) -> AttributeValue {
    let Some(carried) = carrier else { return value };
    match (value.as_f64(), carried.as_f64()) {
        (Some(a), Some(b)) => {
            let pick_value = if want_max { a >= b } else { a <= b };
            if pick_value {
                value
            } else {
                carried
            }
        }
        _ => {
            let a = value.to_string();
            let b = carried.to_string();
            let pick_value = if want_max { a >= b } else { a <= b };
            if pick_value {
                value
            } else {
                carried
            }
        }
    }
}

fn numeric_mean(values: &[AttributeValue]) -> Result<f64, EvaluatorError> {
    let nums = numeric(values, "mean")?;
    Ok(nums.iter().sum::<f64>() / nums.len() as f64)
}

fn numeric_median(values: &[AttributeValue], which: SummaryKind) -> Result<AttributeValue, EvaluatorError> {
    let mut nums = numeric(values, "median")?;
    nums.sort_by(|a, b| a.partial_cmp(b).expect("non-NaN"));
    let len = nums.len();
    let mid = len / 2;
    let all_long = values.iter().all(|v| matches!(v, AttributeValue::Long(_)));

    // An odd count, or median_high/median_low on an even count, selects
    // one of the original values outright and keeps its type. A plain
    // median over an even count averages the middle pair, which is
    // always a division — the result is a double even when the inputs
    // were longs and the average happens to land on a whole number.
    let picked = match (len % 2, which) {
        (1, _) => Some(nums[mid]),
        (0, SummaryKind::MedianHigh) => Some(nums[mid]),
        (0, SummaryKind::MedianLow) => Some(nums[mid - 1]),
        _ => None,
    };

    Ok(match picked {
        Some(value) if all_long => AttributeValue::Long(value as i64),
        Some(value) => AttributeValue::Double(value),
        None => AttributeValue::Double((nums[mid - 1] + nums[mid]) / 2.0),
    })
}

/// First-seen value of the highest-frequency class.
fn mode(values: &[AttributeValue]) -> AttributeValue {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for v in values {
        let key = v.to_string();
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key, 1)),
        }
    }
    let best_count = counts.iter().map(|(_, n)| *n).max().expect("non-empty");
    let best_key = counts.iter().find(|(_, n)| *n == best_count).expect("present").0.clone();
    values
        .iter()
        .find(|v| v.to_string() == best_key)
        .cloned()
        .expect("mode value present in input")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn longs(values: &[i64]) -> Vec<AttributeValue> {
        values.iter().map(|v| AttributeValue::Long(*v)).collect()
    }

    #[test]
    fn median_of_odd_count_is_middle_element() {
        let (value, _) = evaluate(SummaryKind::Median, &longs(&[30, 10, 20]), Carriers::default()).unwrap();
        assert_eq!(value, AttributeValue::Long(20));
    }

    #[test]
    fn median_of_even_count_averages_the_middle_pair() {
        let (value, _) = evaluate(SummaryKind::Median, &longs(&[10, 20, 30, 40]), Carriers::default()).unwrap();
        assert_eq!(value, AttributeValue::Double(25.0));
    }

    #[test]
    fn median_high_and_low_pick_opposite_sides_of_an_even_split() {
        let (high, _) = evaluate(SummaryKind::MedianHigh, &longs(&[10, 20, 30, 40]), Carriers::default()).unwrap();
        let (low, _) = evaluate(SummaryKind::MedianLow, &longs(&[10, 20, 30, 40]), Carriers::default()).unwrap();
        assert_eq!(high, AttributeValue::Long(30));
        assert_eq!(low, AttributeValue::Long(20));
    }

    #[test]
    fn max_folds_with_an_incoming_carrier() {
        let carriers = Carriers { max_value: Some(AttributeValue::Long(50)), min_value: None };
        let (value, next) = evaluate(SummaryKind::Max, &longs(&[10, 20]), carriers).unwrap();
        assert_eq!(value, AttributeValue::Long(50));
        assert_eq!(next.max_value, Some(AttributeValue::Long(50)));
    }

    #[test]
    fn min_folds_with_an_incoming_carrier_picking_the_smaller() {
        let carriers = Carriers { max_value: None, min_value: Some(AttributeValue::Long(5)) };
        let (value, next) = evaluate(SummaryKind::Min, &longs(&[10, 20]), carriers).unwrap();
        assert_eq!(value, AttributeValue::Long(5));
        assert_eq!(next.min_value, Some(AttributeValue::Long(5)));
    }

    #[test]
    fn list_flattens_nested_lists_one_level() {
        let values = vec![
            AttributeValue::List(vec![AttributeValue::Long(1), AttributeValue::Long(2)]),
            AttributeValue::Long(2),
            AttributeValue::Long(3),
        ];
        let (value, _) = evaluate(SummaryKind::List, &values, Carriers::default()).unwrap();
        match value {
            AttributeValue::List(items) => {
                assert_eq!(items, longs(&[1, 2, 2, 3]));
            }
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn count_counts_flattened_length() {
        let values = vec![
            AttributeValue::List(vec![AttributeValue::Long(1), AttributeValue::Long(2)]),
            AttributeValue::Long(3),
        ];
        let (value, _) = evaluate(SummaryKind::Count, &values, Carriers::default()).unwrap();
        assert_eq!(value, AttributeValue::Long(3));
    }

    #[test]
    fn mode_returns_first_seen_value_of_the_largest_class() {
        let values = vec![
            AttributeValue::Keyword("b".into()),
            AttributeValue::Keyword("a".into()),
            AttributeValue::Keyword("a".into()),
            AttributeValue::Keyword("b".into()),
            AttributeValue::Keyword("a".into()),
        ];
        let (value, _) = evaluate(SummaryKind::Mode, &values, Carriers::default()).unwrap();
        assert_eq!(value, AttributeValue::Keyword("a".into()));
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = evaluate(SummaryKind::Mean, &[], Carriers::default()).unwrap_err();
        assert_eq!(err, EvaluatorError::EmptyInput);
    }

    #[test]
    fn mean_of_longs_is_a_double() {
        let (value, _) = evaluate(SummaryKind::Mean, &longs(&[10, 20, 30]), Carriers::default()).unwrap();
        assert_eq!(value, AttributeValue::Double(20.0));
    }

    /// A type-mismatched value (a keyword mixed into an otherwise
    /// numeric attribute, spec.md §7's "type mismatch" case) must
    /// surface as a `NotNumeric` error for the caller to log and skip,
    /// never panic.
    #[test]
    fn max_over_mixed_numeric_and_keyword_values_errors_instead_of_panicking() {
        let values = vec![AttributeValue::Long(10), AttributeValue::Keyword("oops".into())];
        let err = evaluate(SummaryKind::Max, &values, Carriers::default()).unwrap_err();
        assert_eq!(err, EvaluatorError::NotNumeric("max"));
    }
}
