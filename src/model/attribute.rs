//! Attribute records carried by a node.

use super::value::{AttributeValue, ValueType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use strum::{Display, EnumString};

/// Which part of the tree contributed an attribute's canonical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AggregationSource {
    /// Computed from the node's own raw observations.
    Direct,
    /// Computed from child summaries during the upward pass.
    Descendant,
    /// Copied down from an ancestor during the downward pass.
    Ancestor,
}

/// The summary that produced an attribute's canonical value, recorded
/// with `median_high`/`median_low` normalised to `median`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AggregationMethod {
    Count,
    Max,
    Min,
    Mean,
    Median,
    Mode,
    MostCommon,
    List,
}

/// A single per-observation record contributing to a raw attribute.
#[derive(Debug, Clone)]
pub struct ObservedValue {
    pub value: AttributeValue,
}

impl ObservedValue {
    fn from_json(vtype: ValueType, obj: &Map<String, Value>) -> Option<Self> {
        let raw = obj.get(vtype.field_name())?;
        let value: AttributeValue = serde_json::from_value(raw.clone()).ok()?;
        Some(ObservedValue { value })
    }

    fn to_json(&self, vtype: ValueType) -> Value {
        let mut map = Map::new();
        map.insert(
            vtype.field_name().to_string(),
            serde_json::to_value(&self.value).expect("AttributeValue always serialises"),
        );
        Value::Object(map)
    }
}

/// A typed, named attribute attached to a node: either a raw bag of
/// observed values, or a previously computed summary.
///
/// Serialises with the canonical value under a type-embedding field
/// name (`long_value`, `double_value`, `keyword_value`, ...) per the
/// wire schema in the specification; everything else is a plain field.
#[derive(Debug, Clone)]
pub struct AttributeRecord {
    pub key: String,
    pub value_type: ValueType,
    /// The canonical summarised (or passed-through) value. Absent only
    /// for a record that has not yet been summarised at all, which
    /// should not normally happen once `values` is consumed.
    pub canonical_value: Option<AttributeValue>,
    pub count: u64,
    pub aggregation_method: Option<AggregationMethod>,
    pub aggregation_source: Option<AggregationSource>,
    pub min: Option<AttributeValue>,
    pub max: Option<AttributeValue>,
    pub values: Option<Vec<ObservedValue>>,
}

impl AttributeRecord {
    pub fn raw(key: impl Into<String>, value_type: ValueType, values: Vec<ObservedValue>) -> Self {
        Self {
            key: key.into(),
            value_type,
            canonical_value: None,
            count: 0,
            aggregation_method: None,
            aggregation_source: None,
            min: None,
            max: None,
            values: Some(values),
        }
    }

    pub fn is_raw(&self) -> bool {
        self.aggregation_source.is_none() && self.values.is_some()
    }
}

impl Serialize for AttributeRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = Map::new();
        map.insert("key".to_string(), Value::String(self.key.clone()));
        if let Some(value) = &self.canonical_value {
            map.insert(
                self.value_type.field_name().to_string(),
                serde_json::to_value(value).map_err(serde::ser::Error::custom)?,
            );
        }
        map.insert("count".to_string(), Value::from(self.count));
        if let Some(method) = self.aggregation_method {
            map.insert(
                "aggregation_method".to_string(),
                Value::String(method.to_string()),
            );
        }
        if let Some(source) = self.aggregation_source {
            map.insert(
                "aggregation_source".to_string(),
                Value::String(source.to_string()),
            );
        }
        if let Some(min) = &self.min {
            map.insert("min".to_string(), serde_json::to_value(min).map_err(serde::ser::Error::custom)?);
        }
        if let Some(max) = &self.max {
            map.insert("max".to_string(), serde_json::to_value(max).map_err(serde::ser::Error::custom)?);
        }
        if let Some(values) = &self.values {
            let arr: Vec<Value> = values.iter().map(|v| v.to_json(self.value_type)).collect();
            map.insert("values".to_string(), Value::Array(arr));
        }
        Value::Object(map).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttributeRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let obj = value
            .as_object()
            .ok_or_else(|| serde::de::Error::custom("attribute record must be a JSON object"))?;

        let key = obj
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| serde::de::Error::custom("attribute record missing `key`"))?
            .to_string();

        let (value_type, canonical_value) = obj
            .iter()
            .find_map(|(field, v)| {
                ValueType::from_field_name(field).map(|vt| (vt, v.clone()))
            })
            .map(|(vt, v)| {
                let parsed: Option<AttributeValue> = if v.is_null() {
                    None
                } else {
                    serde_json::from_value(v).ok()
                };
                (vt, parsed)
            })
            .unwrap_or((ValueType::Keyword, None));

        let count = obj.get("count").and_then(Value::as_u64).unwrap_or(0);

        let aggregation_method = obj
            .get("aggregation_method")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok());

        let aggregation_source = obj
            .get("aggregation_source")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok());

        let min = obj
            .get("min")
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        let max = obj
            .get("max")
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok());

        let values = obj.get("values").and_then(Value::as_array).map(|arr| {
            arr.iter()
                .filter_map(|entry| {
                    let entry_obj = entry.as_object()?;
                    ObservedValue::from_json(value_type, entry_obj).or_else(|| {
                        // record had no canonical field to sniff its type from; take
                        // whichever `*_value` field the observation itself carries
                        entry_obj.iter().find_map(|(field, v)| {
                            ValueType::from_field_name(field)?;
                            serde_json::from_value(v.clone()).ok().map(|value| ObservedValue { value })
                        })
                    })
                })
                .collect::<Vec<_>>()
        });

        Ok(AttributeRecord {
            key,
            value_type,
            canonical_value,
            count,
            aggregation_method,
            aggregation_source,
            min,
            max,
            values,
        })
    }
}

impl fmt::Display for AttributeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        if let Some(v) = &self.canonical_value {
            write!(f, "={v}")?;
        }
        Ok(())
    }
}
