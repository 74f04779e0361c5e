//! Component C: the attribute summariser.
//!
//! Applies the summary evaluator to a single attribute record using
//! its type metadata, producing the record's canonical summary fields
//! and the "traverse value" a parent or child should receive.

use super::evaluator::{self, Carriers, EvaluatorError};
use crate::model::value::flatten;
use crate::model::{AggregationSource, AttributeRecord, AttributeTypeMeta, AttributeValue, SummaryKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummariseError {
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),
}

/// The outcome of summarising one attribute: the value to propagate to
/// a parent/child (`None` means "no contribution"), and the updated
/// `max`/`min` carriers.
pub struct Summarised {
    pub traverse_value: Option<AttributeValue>,
    pub carriers: Carriers,
}

/// Override inputs used by the upward driver's descendant branch,
/// where the working values come from the accumulator rather than the
/// node's own raw observations.
#[derive(Default)]
pub struct Override {
    pub values: Option<Vec<AttributeValue>>,
    pub carriers: Carriers,
}

/// Summarise `attribute` in place using `meta`, per spec §4.C. Returns
/// `Ok(Summarised { traverse_value: None, .. })` ("no summary") when
/// there are no working values at all — the attribute is left as-is.
pub fn summarise(
    attribute: &mut AttributeRecord,
    meta: &AttributeTypeMeta,
    source: AggregationSource,
    over: Override,
) -> Result<Summarised, SummariseError> {
    let working_values: Option<Vec<AttributeValue>> = match over.values {
        Some(values) => Some(values),
        None => attribute
            .values
            .as_ref()
            .map(|observed| observed.iter().map(|o| o.value.clone()).collect()),
    };

    let Some(working_values) = working_values else {
        return Ok(Summarised {
            traverse_value: None,
            carriers: over.carriers,
        });
    };

    let flat = flatten(&working_values);
    if flat.is_empty() {
        return Ok(Summarised {
            traverse_value: None,
            carriers: over.carriers,
        });
    }

    let mut carriers = over.carriers;
    let mut traverse_value: Option<AttributeValue> = None;

    for (i, summary) in meta.summary.iter().copied().enumerate() {
        let (value, next_carriers) = evaluator::evaluate(summary, &working_values, carriers)?;
        carriers = next_carriers;

        if i == 0 {
            attribute.canonical_value = Some(value.clone());
            attribute.count = flat.len() as u64;
            attribute.aggregation_method = Some(summary.recorded_method());
            attribute.aggregation_source = Some(source);
            traverse_value = Some(value);
        } else if meta.traverse == Some(summary) {
            traverse_value = Some(value);
        }

        if summary == SummaryKind::List {
            traverse_value = traverse_value.map(AttributeValue::deduplicated);
        }

        match summary {
            SummaryKind::Max => attribute.max = carriers.max_value.clone(),
            SummaryKind::Min => attribute.min = carriers.min_value.clone(),
            _ => {}
        }
    }

    Ok(Summarised { traverse_value, carriers })
}
