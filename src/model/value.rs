//! Typed attribute values.
//!
//! The wire format embeds the value's type in the *field name*
//! (`long_value`, `double_value`, `keyword_value`, ...) rather than in
//! the value itself, so `AttributeValue` serialises untagged: only the
//! surrounding [`crate::model::attribute::AttributeRecord`] knows which
//! field name to use for a given tag.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The declared value type of an attribute, taken from the type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Long,
    Double,
    Keyword,
}

impl ValueType {
    /// The canonical field name for this type, e.g. `long_value`.
    pub fn field_name(self) -> &'static str {
        match self {
            ValueType::Long => "long_value",
            ValueType::Double => "double_value",
            ValueType::Keyword => "keyword_value",
        }
    }

    /// Recover a `ValueType` from a canonical field name, if it is one.
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "long_value" => Some(ValueType::Long),
            "double_value" => Some(ValueType::Double),
            "keyword_value" => Some(ValueType::Keyword),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A single typed attribute value. Serialises untagged to the bare
/// JSON scalar (or array, for `List`); the type tag only matters when
/// naming the canonical field on the containing record.
///
/// `List` holds the unflattened output of a `list` summary (or a raw
/// observation that was itself recorded as a list); [`flatten`] below
/// splices it into its caller's working value set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Long(i64),
    Double(f64),
    Keyword(String),
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            AttributeValue::Long(_) => ValueType::Long,
            AttributeValue::Double(_) => ValueType::Double,
            AttributeValue::Keyword(_) => ValueType::Keyword,
            AttributeValue::List(_) => ValueType::Keyword,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Long(v) => Some(*v as f64),
            AttributeValue::Double(v) => Some(*v),
            AttributeValue::Keyword(_) | AttributeValue::List(_) => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, AttributeValue::List(_))
    }

    /// Deduplicate a `List` value by set-equality, preserving first-seen
    /// order. A no-op on any other variant.
    pub fn deduplicated(self) -> Self {
        match self {
            AttributeValue::List(items) => {
                let mut seen: Vec<AttributeValue> = Vec::with_capacity(items.len());
                for item in items {
                    if !seen.iter().any(|s| *s == item) {
                        seen.push(item);
                    }
                }
                AttributeValue::List(seen)
            }
            other => other,
        }
    }
}

/// Flatten a list of values one level deep: any element that is itself
/// a [`AttributeValue::List`] is spliced in, mirroring the
/// specification's flattening step ahead of summary evaluation.
pub fn flatten(values: &[AttributeValue]) -> Vec<AttributeValue> {
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        match v {
            AttributeValue::List(inner) => out.extend(inner.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    out
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttributeValue::Long(a), AttributeValue::Long(b)) => a == b,
            (AttributeValue::Double(a), AttributeValue::Double(b)) => a == b,
            (AttributeValue::Keyword(a), AttributeValue::Keyword(b)) => a == b,
            (AttributeValue::List(a), AttributeValue::List(b)) => a == b,
            (a, b) => a.as_f64().zip(b.as_f64()).map(|(x, y)| x == y).unwrap_or(false),
        }
    }
}

impl PartialOrd for AttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (AttributeValue::Keyword(a), AttributeValue::Keyword(b)) => a.partial_cmp(b),
            (AttributeValue::List(_), _) | (_, AttributeValue::List(_)) => None,
            (AttributeValue::Keyword(_), _) | (_, AttributeValue::Keyword(_)) => None,
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Long(v) => write!(f, "{v}"),
            AttributeValue::Double(v) => write!(f, "{v}"),
            AttributeValue::Keyword(v) => write!(f, "{v}"),
            AttributeValue::List(v) => {
                write!(f, "[")?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
